// # InPost Courier Client
//
// Talks to the InPost mobile API used by the official app. The account is
// paired once via SMS code; after that the client holds a refresh token and
// exchanges it for short-lived bearer tokens as needed.
//
// Constraints shared by all courier clients:
// - One parcel-list request per poll cycle; no retry or backoff here
//   (a failed fetch is the engine's signal to skip reconciliation)
// - Session upkeep (token refresh, one re-auth after a rejected token) is
//   part of producing a single successful fetch, not a retry policy
// - Tokens live in memory only and never appear in logs
//
// ## API Reference (reverse-engineered mobile app)
//
// - Pairing: POST `/v1/account`, POST `/v1/account/verification`
// - Token refresh: POST `/v1/authenticate`
// - Parcel list: GET `/v4/parcels/tracked`

use async_trait::async_trait;
use serde_json::{Value, json};
use shiptrack_core::config::{AccountConfig, AccountCredentials};
use shiptrack_core::traits::{CourierClient, CourierClientFactory};
use shiptrack_core::{Courier, Error, Result, parcel_array};
use std::time::Duration;
use tokio::sync::Mutex;

/// InPost mobile API base URL
const INPOST_API_BASE: &str = "https://api-inmobile-pl.easypack24.net";

/// Default HTTP timeout for API requests
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Default)]
struct TokenState {
    auth_token: Option<String>,
    refresh_token: String,
}

/// InPost courier client
///
/// # Security
///
/// The Debug implementation intentionally does NOT expose tokens.
pub struct InpostClient {
    http: reqwest::Client,
    phone_number: String,
    device_uid: Option<String>,
    tokens: Mutex<TokenState>,
}

impl std::fmt::Debug for InpostClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InpostClient")
            .field("phone_number", &self.phone_number)
            .field("device_uid", &self.device_uid)
            .field("tokens", &"<REDACTED>")
            .finish()
    }
}

impl InpostClient {
    /// Create a client from an already paired account
    pub fn new(
        phone_number: impl Into<String>,
        refresh_token: impl Into<String>,
        device_uid: Option<String>,
    ) -> Result<Self> {
        let refresh_token = refresh_token.into();
        if refresh_token.is_empty() {
            return Err(Error::config("InPost refresh token is required"));
        }

        let http = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            phone_number: phone_number.into(),
            device_uid,
            tokens: Mutex::new(TokenState {
                auth_token: None,
                refresh_token,
            }),
        })
    }

    async fn request(&self, method: reqwest::Method, path: &str, body: Option<Value>) -> Result<Value> {
        let url = format!("{}/{}", INPOST_API_BASE, path.trim_start_matches('/'));

        let mut request = self
            .http
            .request(method, &url)
            .header("Content-Type", "application/json")
            .header("User-Agent", "InPost-Mobile")
            .header("Accept", "application/json");

        if let Some(device_uid) = &self.device_uid {
            request = request.header("device-uid", device_uid);
        }
        {
            let tokens = self.tokens.lock().await;
            if let Some(token) = &tokens.auth_token {
                request = request.bearer_auth(token);
            }
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::courier("inpost", format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::courier("inpost", format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(Error::from_http_status("inpost", status.as_u16(), &text));
        }

        // Some endpoints answer with an empty or non-JSON body.
        Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
    }

    /// Request an SMS pairing code for this account's phone number
    pub async fn send_sms_code(&self) -> Result<Value> {
        let payload = json!({
            "phoneNumber": {"value": self.phone_number, "prefix": "+48"}
        });
        self.request(reqwest::Method::POST, "v1/account", Some(payload))
            .await
    }

    /// Confirm the SMS code; stores the issued token pair
    pub async fn confirm_sms_code(&self, code: &str) -> Result<Value> {
        let payload = json!({
            "phoneNumber": {"value": self.phone_number, "prefix": "+48"},
            "smsCode": code,
            "devicePlatform": "Android",
        });
        let data = self
            .request(reqwest::Method::POST, "v1/account/verification", Some(payload))
            .await?;

        let mut tokens = self.tokens.lock().await;
        if let Some(auth) = data.get("authToken").and_then(Value::as_str) {
            tokens.auth_token = Some(auth.to_string());
        }
        if let Some(refresh) = data.get("refreshToken").and_then(Value::as_str) {
            tokens.refresh_token = refresh.to_string();
        }
        Ok(data)
    }

    /// Exchange the refresh token for a fresh bearer token
    async fn refresh_session(&self) -> Result<()> {
        let payload = {
            let tokens = self.tokens.lock().await;
            json!({
                "refreshToken": tokens.refresh_token,
                "phoneOS": "Android",
            })
        };

        let data = self
            .request(reqwest::Method::POST, "v1/authenticate", Some(payload))
            .await?;

        let mut tokens = self.tokens.lock().await;
        match data.get("authToken").and_then(Value::as_str) {
            Some(auth) => tokens.auth_token = Some(auth.to_string()),
            None => return Err(Error::auth("InPost did not return an auth token")),
        }
        if let Some(refresh) = data.get("refreshToken").and_then(Value::as_str) {
            tokens.refresh_token = refresh.to_string();
        }
        Ok(())
    }

    async fn has_auth_token(&self) -> bool {
        self.tokens.lock().await.auth_token.is_some()
    }
}

#[async_trait]
impl CourierClient for InpostClient {
    async fn fetch_parcels(&self) -> Result<Vec<Value>> {
        if !self.has_auth_token().await {
            self.refresh_session().await?;
        }

        let response = match self
            .request(reqwest::Method::GET, "v4/parcels/tracked", None)
            .await
        {
            Ok(response) => response,
            Err(Error::Authentication(_)) => {
                // Bearer token expired mid-session; one re-auth, then the
                // fetch either succeeds or the cycle fails.
                tracing::debug!("InPost token rejected, refreshing session");
                self.refresh_session().await?;
                self.request(reqwest::Method::GET, "v4/parcels/tracked", None)
                    .await?
            }
            Err(e) => return Err(e),
        };

        Ok(parcel_array(&response))
    }

    fn courier(&self) -> Courier {
        Courier::Inpost
    }
}

/// Factory for creating InPost clients
pub struct InpostFactory;

impl CourierClientFactory for InpostFactory {
    fn create(&self, config: &AccountConfig) -> Result<Box<dyn CourierClient>> {
        match &config.credentials {
            AccountCredentials::Inpost {
                phone_number,
                refresh_token,
                device_uid,
            } => Ok(Box::new(InpostClient::new(
                phone_number.clone(),
                refresh_token.clone(),
                device_uid.clone(),
            )?)),
            _ => Err(Error::config("invalid credentials for InPost client")),
        }
    }
}

/// Register the InPost client with a registry
pub fn register(registry: &shiptrack_core::CourierRegistry) {
    registry.register_client("inpost", Box::new(InpostFactory));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(refresh_token: &str) -> AccountConfig {
        AccountConfig::new(
            "inpost-1",
            AccountCredentials::Inpost {
                phone_number: "500100200".into(),
                refresh_token: refresh_token.into(),
                device_uid: None,
            },
        )
    }

    #[test]
    fn factory_creates_client() {
        let client = InpostFactory.create(&account("token"));
        assert!(client.is_ok());
        assert_eq!(client.unwrap().courier(), Courier::Inpost);
    }

    #[test]
    fn factory_rejects_empty_token() {
        assert!(InpostFactory.create(&account("")).is_err());
    }

    #[test]
    fn factory_rejects_foreign_credentials() {
        let config = AccountConfig::new(
            "dpd-1",
            AccountCredentials::Dpd {
                phone_number: "500100200".into(),
                refresh_token: "token".into(),
            },
        );
        assert!(InpostFactory.create(&config).is_err());
    }

    #[test]
    fn debug_does_not_expose_tokens() {
        let client = InpostClient::new("500100200", "secret_refresh_12345", None).unwrap();
        let debug = format!("{:?}", client);
        assert!(!debug.contains("secret_refresh_12345"));
        assert!(debug.contains("<REDACTED>"));
    }

    #[test]
    fn registry_registration() {
        let registry = shiptrack_core::CourierRegistry::new();
        register(&registry);
        assert!(registry.has_client("inpost"));
    }
}
