// # Tracked-Set Store Trait
//
// Defines the interface for persisting per-account tracked-parcel sets.
//
// ## Purpose
//
// The reconciler's output only makes sense relative to what was tracked
// before. Persisting the tracked set across restarts keeps reconciliation
// stable: without it, every restart would re-announce all active parcels as
// new.
//
// ## Implementations
//
// - Memory: `MemoryTrackedStore` (testing, ephemeral deployments)
// - File: `FileTrackedStore` (JSON file with atomic writes and backup)

use crate::error::Error;
use async_trait::async_trait;
use std::collections::BTreeSet;

/// Trait for tracked-set store implementations
///
/// # Thread Safety
///
/// All methods must be safe to call concurrently from multiple tasks.
#[async_trait]
pub trait TrackedStore: Send + Sync {
    /// Load the tracked set for an account
    ///
    /// # Returns
    ///
    /// - `Ok(Some(set))`: The persisted tracked set
    /// - `Ok(None)`: No state for this account
    /// - `Err(Error)`: Storage error
    async fn load(&self, account_id: &str) -> Result<Option<BTreeSet<String>>, Error>;

    /// Replace the tracked set for an account
    async fn save(&self, account_id: &str, tracked: &BTreeSet<String>) -> Result<(), Error>;

    /// Discard all state for an account (account removed)
    async fn remove(&self, account_id: &str) -> Result<(), Error>;

    /// List all account ids with persisted state
    async fn list_accounts(&self) -> Result<Vec<String>, Error>;

    /// Persist any pending changes
    async fn flush(&self) -> Result<(), Error>;
}

/// Helper trait for constructing tracked stores from configuration
pub trait TrackedStoreFactory: Send + Sync {
    /// Create a TrackedStore instance from configuration
    fn create(&self, config: &serde_json::Value) -> Result<Box<dyn TrackedStore>, Error>;
}
