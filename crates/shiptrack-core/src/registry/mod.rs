//! Plugin-based courier registry
//!
//! Courier clients and tracked stores are registered dynamically at runtime,
//! so the core never hard-codes an if-else chain over courier types and a
//! build can include any subset of the courier crates.
//!
//! ## Registration
//!
//! Courier crates expose a `register()` function:
//!
//! ```rust,ignore
//! // In shiptrack-courier-inpost
//! pub fn register(registry: &CourierRegistry) {
//!     registry.register_client("inpost", Box::new(InpostFactory));
//! }
//! ```

use crate::config::{AccountConfig, TrackedStoreConfig};
use crate::error::{Error, Result};
use crate::state::{FileTrackedStore, MemoryTrackedStore};
use crate::traits::{CourierClient, CourierClientFactory, TrackedStore, TrackedStoreFactory};
use std::collections::HashMap;
use std::sync::RwLock;

/// Registry for courier client and tracked-store factories
///
/// ## Thread Safety
///
/// Interior `RwLock`s allow concurrent reads and exclusive writes.
#[derive(Default)]
pub struct CourierRegistry {
    /// Registered courier client factories
    clients: RwLock<HashMap<String, Box<dyn CourierClientFactory>>>,

    /// Registered custom tracked-store factories
    stores: RwLock<HashMap<String, Box<dyn TrackedStoreFactory>>>,
}

impl CourierRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a courier client factory
    ///
    /// # Parameters
    ///
    /// - `name`: Courier type name (e.g., "inpost", "dpd")
    /// - `factory`: Factory object for creating client instances
    pub fn register_client(&self, name: impl Into<String>, factory: Box<dyn CourierClientFactory>) {
        let mut clients = self.clients.write().unwrap();
        clients.insert(name.into(), factory);
    }

    /// Register a custom tracked-store factory
    pub fn register_tracked_store(
        &self,
        name: impl Into<String>,
        factory: Box<dyn TrackedStoreFactory>,
    ) {
        let mut stores = self.stores.write().unwrap();
        stores.insert(name.into(), factory);
    }

    /// Create a courier client for an account
    ///
    /// The factory is selected by the credential type name.
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn CourierClient>)`: Created client instance
    /// - `Err(Error)`: If the courier type is not registered or creation fails
    pub fn create_client(&self, config: &AccountConfig) -> Result<Box<dyn CourierClient>> {
        let client_type = config.credentials.type_name();
        let clients = self.clients.read().unwrap();

        let factory = clients.get(client_type).ok_or_else(|| {
            Error::config(format!("unknown courier client type: {}", client_type))
        })?;

        factory.create(config)
    }

    /// Create a tracked store from configuration
    ///
    /// Memory and file stores are built in; everything else goes through a
    /// registered custom factory.
    pub async fn create_tracked_store(
        &self,
        config: &TrackedStoreConfig,
    ) -> Result<Box<dyn TrackedStore>> {
        match config {
            TrackedStoreConfig::Memory => Ok(Box::new(MemoryTrackedStore::new())),
            TrackedStoreConfig::File { path } => {
                Ok(Box::new(FileTrackedStore::new(path).await?))
            }
            TrackedStoreConfig::Custom { factory, config } => {
                let stores = self.stores.read().unwrap();
                let store_factory = stores.get(factory).ok_or_else(|| {
                    Error::config(format!("unknown tracked-store type: {}", factory))
                })?;
                store_factory.create(config)
            }
        }
    }

    /// List all registered courier client types
    pub fn list_clients(&self) -> Vec<String> {
        let clients = self.clients.read().unwrap();
        clients.keys().cloned().collect()
    }

    /// Check if a courier client type is registered
    pub fn has_client(&self, name: &str) -> bool {
        let clients = self.clients.read().unwrap();
        clients.contains_key(name)
    }

    /// Check if a custom tracked-store type is registered
    pub fn has_tracked_store(&self, name: &str) -> bool {
        let stores = self.stores.read().unwrap();
        stores.contains_key(name)
    }
}
