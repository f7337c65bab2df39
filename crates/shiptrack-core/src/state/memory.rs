// # Memory Tracked Store
//
// In-memory implementation of TrackedStore.
//
// ## Crash Behavior
//
// All state is lost on restart: the first poll after a restart re-announces
// every active parcel as newly appeared. Harmless for the aggregate count,
// noisy for entity creation, which is why deployments that care use the file
// store instead.
//
// ## When to Use
//
// - Testing
// - Container deployments where re-announcing on restart is acceptable

use crate::error::Error;
use crate::traits::tracked_store::TrackedStore;
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory tracked-set store
#[derive(Debug, Clone, Default)]
pub struct MemoryTrackedStore {
    inner: Arc<RwLock<HashMap<String, BTreeSet<String>>>>,
}

impl MemoryTrackedStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of accounts with state
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Whether the store holds no state at all
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    /// Drop all state
    pub async fn clear(&self) {
        self.inner.write().await.clear();
    }
}

#[async_trait]
impl TrackedStore for MemoryTrackedStore {
    async fn load(&self, account_id: &str) -> Result<Option<BTreeSet<String>>, Error> {
        let guard = self.inner.read().await;
        Ok(guard.get(account_id).cloned())
    }

    async fn save(&self, account_id: &str, tracked: &BTreeSet<String>) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        guard.insert(account_id.to_string(), tracked.clone());
        Ok(())
    }

    async fn remove(&self, account_id: &str) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        guard.remove(account_id);
        Ok(())
    }

    async fn list_accounts(&self) -> Result<Vec<String>, Error> {
        let guard = self.inner.read().await;
        Ok(guard.keys().cloned().collect())
    }

    async fn flush(&self) -> Result<(), Error> {
        // No-op for the memory store
        Ok(())
    }
}
