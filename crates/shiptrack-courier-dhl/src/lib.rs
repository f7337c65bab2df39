// # DHL Courier Client
//
// Talks to the mojdhl.pl public API. Sessions combine a bearer token with
// server-set cookies: every response's Set-Cookie headers are captured and
// replayed on subsequent requests, and an expired session is recovered with
// the device-bound `auth/recover` endpoint instead of a full SMS login.
//
// Constraints shared by all courier clients:
// - One parcel-list request per poll cycle; no retry or backoff here
// - Session upkeep (recover after a rejected token) is part of producing a
//   single successful fetch, not a retry policy
// - Tokens live in memory only and never appear in logs
//
// ## API Reference (reverse-engineered web app)
//
// - Session recovery: POST `auth/recover` with `{deviceName, deviceId}`
// - Parcel list: POST `user/shipment/v2.1/list/incoming/active/1`

use async_trait::async_trait;
use serde_json::{Value, json};
use shiptrack_core::config::{AccountConfig, AccountCredentials};
use shiptrack_core::traits::{CourierClient, CourierClientFactory};
use shiptrack_core::{Courier, Error, Result, parcel_array};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;

/// mojdhl.pl public API base URL
const DHL_API_BASE: &str = "https://mojdhl.pl/api/dhl/public";

/// Default HTTP timeout for API requests
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Device name reported during session recovery
const DEVICE_NAME: &str = "shiptrack";

#[derive(Default)]
struct SessionState {
    token: Option<String>,
    cookies: HashMap<String, String>,
}

/// DHL courier client
pub struct DhlClient {
    http: reqwest::Client,
    phone_number: String,
    device_id: String,
    session: Mutex<SessionState>,
}

impl std::fmt::Debug for DhlClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DhlClient")
            .field("phone_number", &self.phone_number)
            .field("device_id", &self.device_id)
            .field("session", &"<REDACTED>")
            .finish()
    }
}

impl DhlClient {
    /// Create a client for a device-registered account
    pub fn new(
        phone_number: impl Into<String>,
        device_id: impl Into<String>,
        access_token: Option<String>,
    ) -> Result<Self> {
        let device_id = device_id.into();
        if device_id.is_empty() {
            return Err(Error::config("DHL device id is required"));
        }

        let http = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            phone_number: phone_number.into(),
            device_id,
            session: Mutex::new(SessionState {
                token: access_token,
                cookies: HashMap::new(),
            }),
        })
    }

    async fn request(&self, path: &str, body: Value) -> Result<Value> {
        let url = format!("{}/{}", DHL_API_BASE, path.trim_start_matches('/'));

        let mut request = self
            .http
            .post(&url)
            .header("Content-Type", "application/json")
            .header(
                "User-Agent",
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36",
            )
            .header("Accept-Language", "pl-PL")
            .header("Origin", "https://mojdhl.pl")
            .json(&body);

        {
            let session = self.session.lock().await;
            if let Some(token) = &session.token {
                request = request.bearer_auth(token);
            }
            if !session.cookies.is_empty() {
                let cookie_header = session
                    .cookies
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, v))
                    .collect::<Vec<_>>()
                    .join("; ");
                request = request.header("Cookie", cookie_header);
            }
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::courier("dhl", format!("HTTP request failed: {}", e)))?;

        self.capture_cookies(&response).await;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::courier("dhl", format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(Error::from_http_status("dhl", status.as_u16(), &text));
        }

        Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
    }

    async fn capture_cookies(&self, response: &reqwest::Response) {
        let mut session = self.session.lock().await;
        for value in response.headers().get_all(reqwest::header::SET_COOKIE) {
            let Ok(cookie) = value.to_str() else { continue };
            let pair = cookie.split(';').next().unwrap_or_default();
            if let Some((name, value)) = pair.split_once('=') {
                session.cookies.insert(name.to_string(), value.to_string());
            }
        }
    }

    /// Recover the session using the registered device id
    async fn recover_session(&self) -> Result<()> {
        {
            // The recover endpoint expects the stale token as a cookie.
            let mut session = self.session.lock().await;
            if let Some(token) = session.token.clone() {
                session.cookies.insert("access-token".to_string(), token);
            }
        }

        let data = self
            .request(
                "auth/recover",
                json!({
                    "deviceName": DEVICE_NAME,
                    "deviceId": self.device_id,
                }),
            )
            .await?;

        let token = data
            .get("accessToken")
            .and_then(Value::as_str)
            .or_else(|| {
                data.get("data")
                    .and_then(|d| d.get("accessToken"))
                    .and_then(Value::as_str)
            })
            .map(str::to_string);

        let mut session = self.session.lock().await;
        match token {
            Some(token) => session.token = Some(token),
            None => return Err(Error::auth("DHL recovery did not return an access token")),
        }
        Ok(())
    }

    async fn list_parcels(&self) -> Result<Value> {
        self.request(
            "user/shipment/v2.1/list/incoming/active/1",
            json!({
                "shipmentFilterTypes": [],
                "shipmentFilterStatuses": [],
                "page": 1,
            }),
        )
        .await
    }
}

#[async_trait]
impl CourierClient for DhlClient {
    async fn fetch_parcels(&self) -> Result<Vec<Value>> {
        if self.session.lock().await.token.is_none() {
            self.recover_session().await?;
        }

        let response = match self.list_parcels().await {
            Ok(response) => response,
            Err(Error::Authentication(_)) => {
                tracing::debug!("DHL token rejected, recovering session");
                self.recover_session().await?;
                self.list_parcels().await?
            }
            Err(e) => return Err(e),
        };

        Ok(parcel_array(&response))
    }

    fn courier(&self) -> Courier {
        Courier::Dhl
    }
}

/// Factory for creating DHL clients
pub struct DhlFactory;

impl CourierClientFactory for DhlFactory {
    fn create(&self, config: &AccountConfig) -> Result<Box<dyn CourierClient>> {
        match &config.credentials {
            AccountCredentials::Dhl {
                phone_number,
                device_id,
                access_token,
            } => Ok(Box::new(DhlClient::new(
                phone_number.clone(),
                device_id.clone(),
                access_token.clone(),
            )?)),
            _ => Err(Error::config("invalid credentials for DHL client")),
        }
    }
}

/// Register the DHL client with a registry
pub fn register(registry: &shiptrack_core::CourierRegistry) {
    registry.register_client("dhl", Box::new(DhlFactory));
}
