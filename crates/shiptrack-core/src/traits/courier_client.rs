// # Courier Client Trait
//
// Defines the interface for fetching raw parcel records from a courier API.
//
// ## Implementations
//
// - InPost: `shiptrack-courier-inpost` crate
// - DPD: `shiptrack-courier-dpd` crate
// - DHL: `shiptrack-courier-dhl` crate
// - Pocztex: `shiptrack-courier-pocztex` crate

use crate::config::AccountConfig;
use crate::courier::Courier;
use crate::error::Error;
use async_trait::async_trait;
use serde_json::Value;

/// Trait for courier client implementations
///
/// A client owns one account's API session (tokens, cookies) and exposes a
/// single capability: fetching the current raw parcel list. Clients are
/// deliberately narrow:
///
/// - One fetch per poll cycle; the engine decides when to poll.
/// - No retry or backoff; a failed fetch is returned as an error and the
///   engine skips reconciliation for that cycle.
/// - No knowledge of tracked state, other accounts, or entity lifecycle.
/// - Records are returned as opaque JSON; interpretation belongs to the
///   core's extraction and normalization layers.
///
/// Session upkeep (token refresh before expiry, re-authentication after a
/// rejected token) is the client's business, since it is part of producing
/// one successful fetch, not a retry policy.
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks.
#[async_trait]
pub trait CourierClient: Send + Sync {
    /// Fetch the raw parcel records for this account
    ///
    /// Called once per poll cycle. The returned records are read-only inputs
    /// to extraction and reconciliation.
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<Value>)`: The current parcel list (possibly empty)
    /// - `Err(Error)`: Fetch failed; the caller must leave prior tracked
    ///   state untouched for this cycle
    async fn fetch_parcels(&self) -> Result<Vec<Value>, Error>;

    /// Which courier this client talks to
    fn courier(&self) -> Courier;
}

/// Helper trait for constructing courier clients from configuration
pub trait CourierClientFactory: Send + Sync {
    /// Create a CourierClient instance from account configuration
    ///
    /// # Returns
    ///
    /// A boxed CourierClient trait object
    fn create(&self, config: &AccountConfig) -> Result<Box<dyn CourierClient>, Error>;
}
