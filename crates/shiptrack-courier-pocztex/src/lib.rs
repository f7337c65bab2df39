// # Pocztex Courier Client
//
// Talks to the Pocztex customer API. Authentication runs the mobile app's
// OAuth authorization-code flow against the Keycloak IdP by scripting the
// HTML login form:
//
// 1. GET the authorize page to obtain the form action and hidden fields
// 2. POST the login form with email and password
// 3. Follow redirects until the `pocztex://` scheme carries the code
// 4. Exchange the code at the token endpoint for access + refresh tokens
//
// Subsequent polls use the refresh grant; a full re-login only happens when
// the refresh token itself is gone or expired.
//
// Constraints shared by all courier clients:
// - One parcel-list request per poll cycle; no retry or backoff here
// - Tokens live in memory only and never appear in logs

use async_trait::async_trait;
use serde_json::Value;
use shiptrack_core::config::{AccountConfig, AccountCredentials};
use shiptrack_core::traits::{CourierClient, CourierClientFactory};
use shiptrack_core::{Courier, Error, Result, parcel_array};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Pocztex customer API base URL
const POCZTEX_API_BASE: &str = "https://aplikacja.pocztex.pl/api/customer";

/// Keycloak IdP base URL
const POCZTEX_AUTH_BASE: &str = "https://idm.pocztex.pl";

/// Keycloak realm
const AUTH_REALM: &str = "ppsa";

/// OAuth client id of the mobile app
const CLIENT_ID: &str = "mobile";

/// OAuth redirect URI; the code arrives on this custom scheme
const REDIRECT_URI: &str = "pocztex://auth/redirect";

/// OAuth scope; offline_access yields a refresh token
const SCOPE: &str = "offline_access";

/// App version header expected by the API
const APP_VERSION: &str = "1.0.12";

/// Language header and query parameter
const LANGUAGE: &str = "PL";

/// Browser-like user agent for the HTML login leg
const LOGIN_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:147.0) Gecko/20100101 Firefox/147.0";

/// Default HTTP timeout for API requests
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Treat tokens as expired this long before they actually are
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(30);

#[derive(Default)]
struct TokenState {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_at: Option<Instant>,
    refresh_expires_at: Option<Instant>,
}

impl TokenState {
    fn access_valid(&self) -> bool {
        self.access_token.is_some()
            && self
                .expires_at
                .is_none_or(|at| Instant::now() + TOKEN_EXPIRY_MARGIN < at)
    }

    fn refresh_valid(&self) -> bool {
        self.refresh_token.is_some()
            && self
                .refresh_expires_at
                .is_none_or(|at| Instant::now() + TOKEN_EXPIRY_MARGIN < at)
    }
}

/// Pocztex courier client
pub struct PocztexClient {
    http: reqwest::Client,
    email: String,
    password: String,
    tokens: Mutex<TokenState>,
}

impl std::fmt::Debug for PocztexClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PocztexClient")
            .field("email", &self.email)
            .field("password", &"<REDACTED>")
            .field("tokens", &"<REDACTED>")
            .finish()
    }
}

impl PocztexClient {
    /// Create a client for an email/password account
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Result<Self> {
        let email = email.into();
        let password = password.into();
        if email.is_empty() || password.is_empty() {
            return Err(Error::config("Pocztex email and password are required"));
        }

        // Redirects are followed manually: the authorization code lives in a
        // Location header pointing at a pocztex:// URL that reqwest could
        // not fetch anyway.
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| Error::http(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            email,
            password,
            tokens: Mutex::new(TokenState::default()),
        })
    }

    fn token_url() -> String {
        format!(
            "{}/realms/{}/protocol/openid-connect/token",
            POCZTEX_AUTH_BASE, AUTH_REALM
        )
    }

    fn authorize_url(state: &str) -> Result<reqwest::Url> {
        let mut url = reqwest::Url::parse(&format!(
            "{}/realms/{}/protocol/openid-connect/auth",
            POCZTEX_AUTH_BASE, AUTH_REALM
        ))
        .map_err(|e| Error::http(format!("invalid authorize URL: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("client_id", CLIENT_ID)
            .append_pair("response_type", "code")
            .append_pair("redirect_uri", REDIRECT_URI)
            .append_pair("scope", SCOPE)
            .append_pair("state", state);
        Ok(url)
    }

    /// Run the full form-login flow and return the authorization code
    async fn authorization_code(&self) -> Result<String> {
        let state = login_state();
        let auth_url = Self::authorize_url(&state)?;

        let response = self
            .http
            .get(auth_url.clone())
            .header(
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header("Accept-Language", "en-US,en;q=0.9")
            .header("User-Agent", LOGIN_USER_AGENT)
            .send()
            .await
            .map_err(|e| Error::courier("pocztex", format!("login page request failed: {}", e)))?;

        if response.status().as_u16() >= 400 {
            return Err(Error::auth(format!(
                "Pocztex login page error: {}",
                response.status()
            )));
        }
        let page_url = response.url().clone();
        let page_html = response
            .text()
            .await
            .map_err(|e| Error::courier("pocztex", format!("failed to read login page: {}", e)))?;

        let (action, hidden_inputs) = parse_login_form(&page_html);
        let action = action.ok_or_else(|| Error::auth("Pocztex login form action not found"))?;
        let post_url = page_url
            .join(&action)
            .map_err(|e| Error::auth(format!("invalid login form action: {}", e)))?;

        let mut form: Vec<(String, String)> = hidden_inputs;
        if !form.iter().any(|(name, _)| name == "credentialId") {
            form.push(("credentialId".to_string(), String::new()));
        }
        form.push(("username".to_string(), self.email.clone()));
        form.push(("password".to_string(), self.password.clone()));
        form.push(("login".to_string(), "Log in".to_string()));

        let response = self
            .http
            .post(post_url)
            .header(
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header("Accept-Language", "en-US,en;q=0.9")
            .header("Referer", auth_url.as_str())
            .header("User-Agent", LOGIN_USER_AGENT)
            .form(&form)
            .send()
            .await
            .map_err(|e| Error::courier("pocztex", format!("login submit failed: {}", e)))?;

        // Either the login POST redirects straight to the app scheme, or it
        // goes through one intermediate hop first.
        if let Some(location) = redirect_target(&response) {
            if location.starts_with("pocztex://") {
                return extract_code(&location);
            }
            let resolved = response
                .url()
                .join(&location)
                .map_err(|e| Error::auth(format!("invalid login redirect: {}", e)))?;
            let next = self
                .http
                .get(resolved)
                .header("User-Agent", LOGIN_USER_AGENT)
                .send()
                .await
                .map_err(|e| Error::courier("pocztex", format!("login redirect failed: {}", e)))?;
            if let Some(next_location) = redirect_target(&next) {
                if next_location.starts_with("pocztex://") {
                    return extract_code(&next_location);
                }
            }
        }

        Err(Error::auth(format!(
            "Pocztex login failed (status {})",
            response.status()
        )))
    }

    async fn exchange_token(&self, form: &[(String, String)]) -> Result<()> {
        let response = self
            .http
            .post(Self::token_url())
            .header("Accept", "application/json")
            .form(form)
            .send()
            .await
            .map_err(|e| Error::courier("pocztex", format!("token request failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::courier("pocztex", format!("failed to read token response: {}", e)))?;

        if !status.is_success() {
            return Err(Error::from_http_status("pocztex", status.as_u16(), &text));
        }

        let data: Value = serde_json::from_str(&text).map_err(|e| {
            Error::courier("pocztex", format!("failed to parse token response: {}", e))
        })?;

        let mut tokens = self.tokens.lock().await;
        match data.get("access_token").and_then(Value::as_str) {
            Some(access) => tokens.access_token = Some(access.to_string()),
            None => return Err(Error::auth("Pocztex did not return an access token")),
        }
        if let Some(refresh) = data.get("refresh_token").and_then(Value::as_str) {
            tokens.refresh_token = Some(refresh.to_string());
        }
        let now = Instant::now();
        tokens.expires_at = data
            .get("expires_in")
            .and_then(Value::as_u64)
            .map(|secs| now + Duration::from_secs(secs));
        tokens.refresh_expires_at = data
            .get("refresh_expires_in")
            .and_then(Value::as_u64)
            .map(|secs| now + Duration::from_secs(secs));
        Ok(())
    }

    /// Full login: authorization code, then code-for-token exchange
    async fn login(&self) -> Result<()> {
        let code = self.authorization_code().await?;
        self.exchange_token(&[
            ("grant_type".to_string(), "authorization_code".to_string()),
            ("client_id".to_string(), CLIENT_ID.to_string()),
            ("code".to_string(), code),
            ("redirect_uri".to_string(), REDIRECT_URI.to_string()),
        ])
        .await
    }

    async fn refresh_session(&self) -> Result<()> {
        let refresh_token = self
            .tokens
            .lock()
            .await
            .refresh_token
            .clone()
            .ok_or_else(|| Error::auth("missing Pocztex refresh token"))?;
        self.exchange_token(&[
            ("grant_type".to_string(), "refresh_token".to_string()),
            ("client_id".to_string(), CLIENT_ID.to_string()),
            ("refresh_token".to_string(), refresh_token),
        ])
        .await
    }

    async fn ensure_token(&self) -> Result<()> {
        let (access_valid, refresh_valid) = {
            let tokens = self.tokens.lock().await;
            (tokens.access_valid(), tokens.refresh_valid())
        };

        if access_valid {
            return Ok(());
        }
        if refresh_valid {
            match self.refresh_session().await {
                Ok(()) => return Ok(()),
                Err(e) => tracing::debug!("Pocztex refresh failed, logging in again: {}", e),
            }
        }
        self.login().await
    }
}

#[async_trait]
impl CourierClient for PocztexClient {
    async fn fetch_parcels(&self) -> Result<Vec<Value>> {
        self.ensure_token().await?;

        let token = self
            .tokens
            .lock()
            .await
            .access_token
            .clone()
            .ok_or_else(|| Error::auth("Pocztex session has no access token"))?;

        let response = self
            .http
            .get(format!("{}/tracking", POCZTEX_API_BASE))
            .query(&[("language", LANGUAGE)])
            .header("Accept", "application/json")
            .header("X-App-Version", APP_VERSION)
            .header("Language", LANGUAGE)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| Error::courier("pocztex", format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::courier("pocztex", format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(Error::from_http_status("pocztex", status.as_u16(), &text));
        }

        let data: Value = serde_json::from_str(&text)
            .map_err(|e| Error::courier("pocztex", format!("failed to parse parcel list: {}", e)))?;
        Ok(parcel_array(&data))
    }

    fn courier(&self) -> Courier {
        Courier::Pocztex
    }
}

/// Extract the form action and hidden inputs from the Keycloak login page
fn parse_login_form(html: &str) -> (Option<String>, Vec<(String, String)>) {
    let action_re = regex::Regex::new(r#"(?i)<form[^>]*action=["']([^"']+)["']"#).unwrap();
    let mut action = action_re
        .captures(html)
        .map(|c| html_unescape(&c[1]));
    if action.is_none() {
        let alt_re =
            regex::Regex::new(r#"(?i)/realms/[^"']+/login-actions/authenticate[^"']*"#).unwrap();
        action = alt_re.find(html).map(|m| html_unescape(m.as_str()));
    }

    let input_re = regex::Regex::new(r#"(?i)<input[^>]*type=["']hidden["'][^>]*>"#).unwrap();
    let name_re = regex::Regex::new(r#"(?i)name=["']([^"']+)["']"#).unwrap();
    let value_re = regex::Regex::new(r#"(?i)value=["']([^"']*)["']"#).unwrap();

    let mut hidden_inputs = Vec::new();
    for tag in input_re.find_iter(html) {
        let tag = tag.as_str();
        if let Some(name) = name_re.captures(tag) {
            let value = value_re
                .captures(tag)
                .map(|c| html_unescape(&c[1]))
                .unwrap_or_default();
            hidden_inputs.push((html_unescape(&name[1]), value));
        }
    }

    (action, hidden_inputs)
}

/// Minimal HTML entity unescape for attribute values
fn html_unescape(text: &str) -> String {
    text.replace("&amp;", "&")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
}

fn redirect_target(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Pull the `code` query parameter out of the app-scheme redirect
fn extract_code(redirect_url: &str) -> Result<String> {
    let url = reqwest::Url::parse(redirect_url)
        .map_err(|e| Error::auth(format!("invalid Pocztex redirect: {}", e)))?;
    url.query_pairs()
        .find(|(name, _)| name == "code")
        .map(|(_, value)| value.into_owned())
        .ok_or_else(|| Error::auth("Pocztex authorization code not found"))
}

/// Opaque per-login state value; Keycloak echoes it back unverified
fn login_state() -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("{:x}", nanos)
}

/// Factory for creating Pocztex clients
pub struct PocztexFactory;

impl CourierClientFactory for PocztexFactory {
    fn create(&self, config: &AccountConfig) -> Result<Box<dyn CourierClient>> {
        match &config.credentials {
            AccountCredentials::Pocztex { email, password } => Ok(Box::new(PocztexClient::new(
                email.clone(),
                password.clone(),
            )?)),
            _ => Err(Error::config("invalid credentials for Pocztex client")),
        }
    }
}

/// Register the Pocztex client with a registry
pub fn register(registry: &shiptrack_core::CourierRegistry) {
    registry.register_client("pocztex", Box::new(PocztexFactory));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_creates_client() {
        let config = AccountConfig::new(
            "pocztex-1",
            AccountCredentials::Pocztex {
                email: "user@example.com".into(),
                password: "secret".into(),
            },
        );
        let client = PocztexFactory.create(&config);
        assert!(client.is_ok());
        assert_eq!(client.unwrap().courier(), Courier::Pocztex);
    }

    #[test]
    fn factory_rejects_empty_credentials() {
        let config = AccountConfig::new(
            "pocztex-1",
            AccountCredentials::Pocztex {
                email: "user@example.com".into(),
                password: "".into(),
            },
        );
        assert!(PocztexFactory.create(&config).is_err());
    }

    #[test]
    fn parses_login_form() {
        let html = r#"
            <html><body>
            <form id="kc-form-login" action="https://idm.pocztex.pl/realms/ppsa/login-actions/authenticate?session_code=abc&amp;tab_id=x" method="post">
                <input type="hidden" name="session_code" value="abc"/>
                <input type="hidden" name="execution" value="e1"/>
                <input type="text" name="username"/>
            </form>
            </body></html>
        "#;
        let (action, hidden) = parse_login_form(html);
        assert_eq!(
            action.as_deref(),
            Some("https://idm.pocztex.pl/realms/ppsa/login-actions/authenticate?session_code=abc&tab_id=x")
        );
        assert_eq!(
            hidden,
            vec![
                ("session_code".to_string(), "abc".to_string()),
                ("execution".to_string(), "e1".to_string()),
            ]
        );
    }

    #[test]
    fn extracts_code_from_redirect() {
        let code = extract_code("pocztex://auth/redirect?state=xyz&code=the-code").unwrap();
        assert_eq!(code, "the-code");

        assert!(extract_code("pocztex://auth/redirect?state=xyz").is_err());
    }

    #[test]
    fn authorize_url_carries_oauth_params() {
        let url = PocztexClient::authorize_url("st4te").unwrap();
        let query: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(query.contains(&("client_id".to_string(), "mobile".to_string())));
        assert!(query.contains(&("response_type".to_string(), "code".to_string())));
        assert!(query.contains(&("redirect_uri".to_string(), REDIRECT_URI.to_string())));
        assert!(query.contains(&("scope".to_string(), SCOPE.to_string())));
        assert!(query.contains(&("state".to_string(), "st4te".to_string())));
    }

    #[test]
    fn debug_does_not_expose_password() {
        let client = PocztexClient::new("user@example.com", "s3cret-password").unwrap();
        let debug = format!("{:?}", client);
        assert!(!debug.contains("s3cret-password"));
    }

    #[test]
    fn token_state_validity() {
        let mut state = TokenState::default();
        assert!(!state.access_valid());
        assert!(!state.refresh_valid());

        state.access_token = Some("a".into());
        state.expires_at = Some(Instant::now() + Duration::from_secs(3600));
        state.refresh_token = Some("r".into());
        state.refresh_expires_at = Some(Instant::now() + Duration::from_secs(3600));
        assert!(state.access_valid());
        assert!(state.refresh_valid());

        state.expires_at = Some(Instant::now());
        assert!(!state.access_valid());
    }
}
