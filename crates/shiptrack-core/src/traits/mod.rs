//! Core traits for the shipment tracking system
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`CourierClient`]: Fetch raw parcel records from a courier API
//! - [`TrackedStore`]: Persist per-account tracked-parcel sets

pub mod courier_client;
pub mod tracked_store;

pub use courier_client::{CourierClient, CourierClientFactory};
pub use tracked_store::{TrackedStore, TrackedStoreFactory};
