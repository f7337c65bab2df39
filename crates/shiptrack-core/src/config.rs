//! Configuration types for the shipment tracking system
//!
//! This module defines all configuration structures used throughout the crate.

use crate::courier::Courier;
use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Main tracking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// Configured courier accounts
    pub accounts: Vec<AccountConfig>,

    /// Tracked-set store configuration
    #[serde(default)]
    pub tracked_store: TrackedStoreConfig,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl TrackingConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), Error> {
        if self.accounts.is_empty() {
            return Err(Error::config("no accounts configured"));
        }

        let mut seen_ids = std::collections::HashSet::new();
        for account in &self.accounts {
            account.validate()?;
            if !seen_ids.insert(account.id.as_str()) {
                return Err(Error::config(format!("duplicate account id: {}", account.id)));
            }
        }

        self.tracked_store.validate()?;
        self.engine.validate()?;

        Ok(())
    }
}

/// One courier account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    /// Unique account identifier (used as the tracked-store key)
    pub id: String,

    /// Courier credentials; also selects the courier type
    pub credentials: AccountCredentials,

    /// Whether this account is polled
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl AccountConfig {
    /// Create a new enabled account
    pub fn new(id: impl Into<String>, credentials: AccountCredentials) -> Self {
        Self {
            id: id.into(),
            credentials,
            enabled: true,
        }
    }

    /// The courier this account belongs to, if a built-in one
    pub fn courier(&self) -> Option<Courier> {
        self.credentials.courier()
    }

    /// Validate the account configuration
    pub fn validate(&self) -> Result<(), Error> {
        if self.id.trim().is_empty() {
            return Err(Error::config("account id cannot be empty"));
        }
        self.credentials.validate()
    }
}

/// Per-courier account credentials
///
/// Tokens live only in memory for the lifetime of the client; nothing in the
/// core persists them.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AccountCredentials {
    /// InPost mobile account (SMS-paired)
    Inpost {
        /// Phone number the account is registered to
        phone_number: String,
        /// Refresh token obtained from SMS pairing
        refresh_token: String,
        /// Optional device identifier sent with every request
        #[serde(default)]
        device_uid: Option<String>,
    },

    /// DPD mobile account
    Dpd {
        /// Phone number the account is registered to
        phone_number: String,
        /// OAuth refresh token for the DPD SSO realm
        refresh_token: String,
    },

    /// DHL (mojdhl.pl) account
    Dhl {
        /// Phone number the account is registered to
        phone_number: String,
        /// Device identifier registered during SMS validation
        device_id: String,
        /// Optional previously issued access token to seed the session
        #[serde(default)]
        access_token: Option<String>,
    },

    /// Pocztex account (email + password against the IdP)
    Pocztex {
        /// Account email
        email: String,
        /// Account password
        password: String,
    },

    /// Custom courier client
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl AccountCredentials {
    /// The courier these credentials belong to, if a built-in one
    pub fn courier(&self) -> Option<Courier> {
        match self {
            AccountCredentials::Inpost { .. } => Some(Courier::Inpost),
            AccountCredentials::Dpd { .. } => Some(Courier::Dpd),
            AccountCredentials::Dhl { .. } => Some(Courier::Dhl),
            AccountCredentials::Pocztex { .. } => Some(Courier::Pocztex),
            AccountCredentials::Custom { .. } => None,
        }
    }

    /// The registry factory name for this credential type
    pub fn type_name(&self) -> &str {
        match self {
            AccountCredentials::Inpost { .. } => "inpost",
            AccountCredentials::Dpd { .. } => "dpd",
            AccountCredentials::Dhl { .. } => "dhl",
            AccountCredentials::Pocztex { .. } => "pocztex",
            AccountCredentials::Custom { factory, .. } => factory,
        }
    }

    /// Validate the credentials
    pub fn validate(&self) -> Result<(), Error> {
        match self {
            AccountCredentials::Inpost {
                phone_number,
                refresh_token,
                ..
            } => {
                require(phone_number, "InPost phone number")?;
                require(refresh_token, "InPost refresh token")
            }
            AccountCredentials::Dpd {
                phone_number,
                refresh_token,
            } => {
                require(phone_number, "DPD phone number")?;
                require(refresh_token, "DPD refresh token")
            }
            AccountCredentials::Dhl {
                phone_number,
                device_id,
                ..
            } => {
                require(phone_number, "DHL phone number")?;
                require(device_id, "DHL device id")
            }
            AccountCredentials::Pocztex { email, password } => {
                require(email, "Pocztex email")?;
                require(password, "Pocztex password")
            }
            AccountCredentials::Custom { factory, config } => {
                require(factory, "custom client factory")?;
                if config.is_null() {
                    return Err(Error::config("custom client config cannot be null"));
                }
                Ok(())
            }
        }
    }
}

// Secrets never reach log output through Debug.
impl fmt::Debug for AccountCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountCredentials::Inpost {
                phone_number,
                device_uid,
                ..
            } => f
                .debug_struct("Inpost")
                .field("phone_number", phone_number)
                .field("refresh_token", &"<REDACTED>")
                .field("device_uid", device_uid)
                .finish(),
            AccountCredentials::Dpd { phone_number, .. } => f
                .debug_struct("Dpd")
                .field("phone_number", phone_number)
                .field("refresh_token", &"<REDACTED>")
                .finish(),
            AccountCredentials::Dhl {
                phone_number,
                device_id,
                ..
            } => f
                .debug_struct("Dhl")
                .field("phone_number", phone_number)
                .field("device_id", device_id)
                .field("access_token", &"<REDACTED>")
                .finish(),
            AccountCredentials::Pocztex { email, .. } => f
                .debug_struct("Pocztex")
                .field("email", email)
                .field("password", &"<REDACTED>")
                .finish(),
            AccountCredentials::Custom { factory, .. } => f
                .debug_struct("Custom")
                .field("factory", factory)
                .field("config", &"<REDACTED>")
                .finish(),
        }
    }
}

fn require(value: &str, what: &str) -> Result<(), Error> {
    if value.trim().is_empty() {
        Err(Error::config(format!("{} cannot be empty", what)))
    } else {
        Ok(())
    }
}

/// Tracked-set store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TrackedStoreConfig {
    /// File-based store (survives restarts)
    File {
        /// Path to the state file
        path: String,
    },

    /// In-memory store (not persistent)
    #[default]
    Memory,

    /// Custom store
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl TrackedStoreConfig {
    /// Validate the store configuration
    pub fn validate(&self) -> Result<(), Error> {
        match self {
            TrackedStoreConfig::File { path } => {
                if path.trim().is_empty() {
                    return Err(Error::config("tracked-store file path cannot be empty"));
                }
                Ok(())
            }
            TrackedStoreConfig::Memory => Ok(()),
            TrackedStoreConfig::Custom { factory, config } => {
                require(factory, "custom store factory")?;
                if config.is_null() {
                    return Err(Error::config("custom store config cannot be null"));
                }
                Ok(())
            }
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Interval between poll cycles, in seconds
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Initial startup delay before the first poll, in seconds
    #[serde(default = "default_startup_delay_secs")]
    pub startup_delay_secs: u64,

    /// Capacity of the internal event channel
    ///
    /// When full, new events are dropped (with a warning log) so a slow
    /// consumer cannot grow memory without bound.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl EngineConfig {
    /// Validate the engine configuration
    pub fn validate(&self) -> Result<(), Error> {
        if self.poll_interval_secs == 0 {
            return Err(Error::config("poll interval must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(Error::config("event channel capacity must be > 0"));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            startup_delay_secs: default_startup_delay_secs(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_poll_interval_secs() -> u64 {
    600
}

fn default_startup_delay_secs() -> u64 {
    0
}

fn default_event_channel_capacity() -> usize {
    1000
}
