// # DPD Courier Client
//
// Talks to the DPD Polska mobile API. Authentication goes through the DPD
// Keycloak SSO realm with a standard OAuth refresh-token grant; the access
// token is refreshed shortly before it expires so each poll needs at most
// one extra round trip.
//
// Constraints shared by all courier clients:
// - One parcel-list request per poll cycle; no retry or backoff here
// - Tokens live in memory only and never appear in logs
//
// ## API Reference (reverse-engineered mobile app)
//
// - Token: POST `{SSO}/auth/realms/DPD/protocol/openid-connect/token`
// - Parcel list: POST `{API}/mdupackageservices/api/v1/packages?userContext=RECEIVER`

use async_trait::async_trait;
use serde_json::{Value, json};
use shiptrack_core::config::{AccountConfig, AccountCredentials};
use shiptrack_core::traits::{CourierClient, CourierClientFactory};
use shiptrack_core::{Courier, Error, Result, parcel_array};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// DPD SSO base URL (Keycloak)
const DPD_SSO_BASE: &str = "https://dpdsso.dpd.com.pl";

/// DPD mobile API base URL
const DPD_API_BASE: &str = "https://mobapp.dpd.com.pl";

/// OAuth client id of the mobile app
const DPD_CLIENT_ID: &str = "DPDClientMDU";

/// Default HTTP timeout for API requests
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Refresh the access token this long before it actually expires
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

struct TokenState {
    access_token: Option<String>,
    refresh_token: String,
    expires_at: Option<Instant>,
}

impl TokenState {
    fn needs_refresh(&self) -> bool {
        match (&self.access_token, self.expires_at) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(_), Some(expires_at)) => Instant::now() + TOKEN_EXPIRY_MARGIN >= expires_at,
        }
    }
}

/// DPD courier client
pub struct DpdClient {
    http: reqwest::Client,
    phone_number: String,
    tokens: Mutex<TokenState>,
}

impl std::fmt::Debug for DpdClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DpdClient")
            .field("phone_number", &self.phone_number)
            .field("tokens", &"<REDACTED>")
            .finish()
    }
}

impl DpdClient {
    /// Create a client from an already registered account
    pub fn new(phone_number: impl Into<String>, refresh_token: impl Into<String>) -> Result<Self> {
        let refresh_token = refresh_token.into();
        if refresh_token.is_empty() {
            return Err(Error::config("DPD refresh token is required"));
        }

        let http = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            phone_number: phone_number.into(),
            tokens: Mutex::new(TokenState {
                access_token: None,
                refresh_token,
                expires_at: None,
            }),
        })
    }

    fn token_url() -> String {
        format!("{}/auth/realms/DPD/protocol/openid-connect/token", DPD_SSO_BASE)
    }

    /// Refresh the access token via the OAuth refresh grant
    async fn refresh_access_token(&self) -> Result<()> {
        let form = {
            let tokens = self.tokens.lock().await;
            [
                ("refresh_token", tokens.refresh_token.clone()),
                ("grant_type", "refresh_token".to_string()),
                ("client_id", DPD_CLIENT_ID.to_string()),
            ]
        };

        let response = self
            .http
            .post(Self::token_url())
            .form(&form)
            .send()
            .await
            .map_err(|e| Error::courier("dpd", format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::courier("dpd", format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(Error::from_http_status("dpd", status.as_u16(), &text));
        }

        let data: Value = serde_json::from_str(&text)
            .map_err(|e| Error::courier("dpd", format!("failed to parse token response: {}", e)))?;

        let mut tokens = self.tokens.lock().await;
        match data.get("access_token").and_then(Value::as_str) {
            Some(access) => tokens.access_token = Some(access.to_string()),
            None => return Err(Error::auth("DPD did not return an access token")),
        }
        if let Some(refresh) = data.get("refresh_token").and_then(Value::as_str) {
            tokens.refresh_token = refresh.to_string();
        }
        let expires_in = data.get("expires_in").and_then(Value::as_u64).unwrap_or(300);
        tokens.expires_at = Some(Instant::now() + Duration::from_secs(expires_in));
        Ok(())
    }

    async fn ensure_token(&self) -> Result<()> {
        let needs_refresh = self.tokens.lock().await.needs_refresh();
        if needs_refresh {
            self.refresh_access_token().await?;
        }
        Ok(())
    }
}

#[async_trait]
impl CourierClient for DpdClient {
    async fn fetch_parcels(&self) -> Result<Vec<Value>> {
        self.ensure_token().await?;

        let url = format!(
            "{}/mdupackageservices/api/v1/packages?userContext=RECEIVER",
            DPD_API_BASE
        );
        let token = self
            .tokens
            .lock()
            .await
            .access_token
            .clone()
            .ok_or_else(|| Error::auth("DPD session has no access token"))?;

        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .header("Accept", "application/json")
            .header("User-Agent", "DPD Mobile")
            .header("X-Mobile-Platform", "android")
            .header("X-Mobile-Version", "2.10.2")
            .json(&json!({"alias": null, "sent": null}))
            .send()
            .await
            .map_err(|e| Error::courier("dpd", format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::courier("dpd", format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(Error::from_http_status("dpd", status.as_u16(), &text));
        }

        let data: Value = serde_json::from_str(&text)
            .map_err(|e| Error::courier("dpd", format!("failed to parse parcel list: {}", e)))?;
        Ok(parcel_array(&data))
    }

    fn courier(&self) -> Courier {
        Courier::Dpd
    }
}

/// Factory for creating DPD clients
pub struct DpdFactory;

impl CourierClientFactory for DpdFactory {
    fn create(&self, config: &AccountConfig) -> Result<Box<dyn CourierClient>> {
        match &config.credentials {
            AccountCredentials::Dpd {
                phone_number,
                refresh_token,
            } => Ok(Box::new(DpdClient::new(
                phone_number.clone(),
                refresh_token.clone(),
            )?)),
            _ => Err(Error::config("invalid credentials for DPD client")),
        }
    }
}

/// Register the DPD client with a registry
pub fn register(registry: &shiptrack_core::CourierRegistry) {
    registry.register_client("dpd", Box::new(DpdFactory));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(refresh_token: &str) -> AccountConfig {
        AccountConfig::new(
            "dpd-1",
            AccountCredentials::Dpd {
                phone_number: "500100200".into(),
                refresh_token: refresh_token.into(),
            },
        )
    }

    #[test]
    fn factory_creates_client() {
        let client = DpdFactory.create(&account("token"));
        assert!(client.is_ok());
        assert_eq!(client.unwrap().courier(), Courier::Dpd);
    }

    #[test]
    fn factory_rejects_empty_token() {
        assert!(DpdFactory.create(&account("")).is_err());
    }

    #[test]
    fn fresh_client_needs_token_refresh() {
        let state = TokenState {
            access_token: None,
            refresh_token: "r".into(),
            expires_at: None,
        };
        assert!(state.needs_refresh());

        let valid = TokenState {
            access_token: Some("a".into()),
            refresh_token: "r".into(),
            expires_at: Some(Instant::now() + Duration::from_secs(3600)),
        };
        assert!(!valid.needs_refresh());

        let expiring = TokenState {
            access_token: Some("a".into()),
            refresh_token: "r".into(),
            expires_at: Some(Instant::now() + Duration::from_secs(10)),
        };
        assert!(expiring.needs_refresh());
    }

    #[test]
    fn debug_does_not_expose_tokens() {
        let client = DpdClient::new("500100200", "secret_refresh_12345").unwrap();
        let debug = format!("{:?}", client);
        assert!(!debug.contains("secret_refresh_12345"));
    }

    #[test]
    fn registry_registration() {
        let registry = shiptrack_core::CourierRegistry::new();
        register(&registry);
        assert!(registry.has_client("dpd"));
    }
}
