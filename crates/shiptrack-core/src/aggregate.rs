//! Aggregate active-shipments counter
//!
//! One counter spans every configured account across all courier types. It
//! is an observer, not an owner: accounts attach and detach explicitly, poll
//! cycles push snapshot parcel lists, and the count is recomputed from those
//! snapshots on every read. Nothing here mutates account state, so reads
//! can interleave freely with poll cycles.

use crate::classify::is_finished;
use crate::courier::Courier;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::RwLock;

/// Count the non-finished parcels in one account's parcel list
pub fn count_active_parcels(parcels: &[Value], courier: Courier) -> usize {
    parcels
        .iter()
        .filter(|parcel| !is_finished(parcel, courier))
        .count()
}

#[derive(Debug, Clone)]
struct AccountSnapshot {
    courier: Courier,
    parcels: Vec<Value>,
}

/// Cross-account active shipment counter
///
/// ## Thread Safety
///
/// Interior `RwLock`; attach/detach/update take the write lock briefly,
/// `count_active` only reads.
#[derive(Debug, Default)]
pub struct ActiveShipments {
    accounts: RwLock<HashMap<String, AccountSnapshot>>,
}

impl ActiveShipments {
    /// Create an empty counter with no attached accounts
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach an account; its parcel list starts empty
    pub fn attach(&self, account_id: impl Into<String>, courier: Courier) {
        let mut accounts = self.accounts.write().unwrap();
        accounts
            .entry(account_id.into())
            .or_insert_with(|| AccountSnapshot {
                courier,
                parcels: Vec::new(),
            });
    }

    /// Detach an account; it no longer contributes to the count
    pub fn detach(&self, account_id: &str) {
        let mut accounts = self.accounts.write().unwrap();
        accounts.remove(account_id);
    }

    /// Replace an attached account's snapshot with the latest poll result
    ///
    /// Updates for accounts that were never attached (or already detached)
    /// are dropped; the poll cycle and account removal may race and the
    /// counter must not resurrect removed accounts.
    pub fn update(&self, account_id: &str, parcels: Vec<Value>) {
        let mut accounts = self.accounts.write().unwrap();
        match accounts.get_mut(account_id) {
            Some(snapshot) => snapshot.parcels = parcels,
            None => tracing::debug!(account_id, "dropping update for unattached account"),
        }
    }

    /// Total active (non-finished) parcels across all attached accounts
    ///
    /// Recomputed from the snapshots on every call; an account with an empty
    /// or never-updated list contributes zero.
    pub fn count_active(&self) -> usize {
        let accounts = self.accounts.read().unwrap();
        accounts
            .values()
            .map(|snapshot| count_active_parcels(&snapshot.parcels, snapshot.courier))
            .sum()
    }

    /// Number of attached accounts
    pub fn account_count(&self) -> usize {
        self.accounts.read().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn counts_across_accounts() {
        let counter = ActiveShipments::new();
        counter.attach("inpost-1", Courier::Inpost);
        counter.attach("dpd-1", Courier::Dpd);

        counter.update(
            "inpost-1",
            vec![
                json!({"shipmentNumber": "A1", "status": "CREATED"}),
                json!({"shipmentNumber": "A2", "status": "OUT_FOR_DELIVERY"}),
                json!({"shipmentNumber": "A3", "status": "DELIVERED"}),
            ],
        );
        counter.update(
            "dpd-1",
            vec![json!({"waybill": "W1", "main_status": {"status": "IN_TRANSPORT"}})],
        );

        assert_eq!(counter.count_active(), 3);
    }

    #[test]
    fn empty_or_stale_accounts_contribute_zero() {
        let counter = ActiveShipments::new();
        counter.attach("inpost-1", Courier::Inpost);
        assert_eq!(counter.count_active(), 0);

        counter.update("inpost-1", vec![]);
        assert_eq!(counter.count_active(), 0);
    }

    #[test]
    fn detach_removes_contribution() {
        let counter = ActiveShipments::new();
        counter.attach("inpost-1", Courier::Inpost);
        counter.update(
            "inpost-1",
            vec![json!({"shipmentNumber": "A1", "status": "CREATED"})],
        );
        assert_eq!(counter.count_active(), 1);

        counter.detach("inpost-1");
        assert_eq!(counter.count_active(), 0);
        assert_eq!(counter.account_count(), 0);
    }

    #[test]
    fn update_for_unattached_account_is_dropped() {
        let counter = ActiveShipments::new();
        counter.update(
            "ghost",
            vec![json!({"shipmentNumber": "A1", "status": "CREATED"})],
        );
        assert_eq!(counter.count_active(), 0);
        assert_eq!(counter.account_count(), 0);
    }

    #[test]
    fn attach_is_idempotent() {
        let counter = ActiveShipments::new();
        counter.attach("inpost-1", Courier::Inpost);
        counter.update(
            "inpost-1",
            vec![json!({"shipmentNumber": "A1", "status": "CREATED"})],
        );
        counter.attach("inpost-1", Courier::Inpost);
        // Re-attaching must not wipe the existing snapshot.
        assert_eq!(counter.count_active(), 1);
    }
}
