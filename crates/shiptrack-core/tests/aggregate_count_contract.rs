//! Contract test: aggregate active count across accounts
//!
//! The aggregate counter sums non-finished parcels across every attached
//! account regardless of courier type, tolerates empty accounts, and drops
//! contributions when an account detaches.

mod common;

use common::*;
use serde_json::json;
use shiptrack_core::{ActiveShipments, Courier, EngineAccount, TrackingEngine};
use std::sync::Arc;

#[tokio::test]
async fn counts_active_parcels_across_couriers() {
    let inpost = ScriptedCourierClient::new(Courier::Inpost);
    inpost.push_ok(vec![
        json!({"shipmentNumber": "A1", "status": "CREATED"}),
        json!({"shipmentNumber": "A2", "status": "READY_TO_PICKUP"}),
        json!({"shipmentNumber": "A3", "status": "DELIVERED"}),
    ]);

    let dpd = ScriptedCourierClient::new(Courier::Dpd);
    dpd.push_ok(vec![
        json!({"waybill": "W1", "main_status": {"status": "IN_TRANSPORT"}}),
    ]);

    let aggregate = Arc::new(ActiveShipments::new());
    let (engine, mut event_rx) = TrackingEngine::new(
        vec![
            EngineAccount::new("inpost-1", Box::new(inpost)),
            EngineAccount::new("dpd-1", Box::new(dpd)),
        ],
        Box::new(CountingTrackedStore::new()),
        aggregate.clone(),
        &engine_config(),
    )
    .unwrap();

    // Both accounts are attached on construction, contributing zero until
    // their first poll.
    assert_eq!(aggregate.account_count(), 2);
    assert_eq!(aggregate.count_active(), 0);

    engine.poll_all().await;

    assert_eq!(aggregate.count_active(), 3, "2 active inpost + 1 active dpd");
    let events = drain_events(&mut event_rx);
    assert_eq!(last_active_count(&events), Some(3));
}

#[tokio::test]
async fn unavailable_account_keeps_last_snapshot() {
    let client = ScriptedCourierClient::new(Courier::Pocztex);
    client.push_ok(vec![json!({"trackingNumber": "P1", "status": "NADANA"})]);
    client.push_err("IdP unavailable");

    let aggregate = Arc::new(ActiveShipments::new());
    let (engine, _event_rx) = TrackingEngine::new(
        vec![EngineAccount::new("pocztex-1", Box::new(client))],
        Box::new(CountingTrackedStore::new()),
        aggregate.clone(),
        &engine_config(),
    )
    .unwrap();

    engine.poll_account("pocztex-1").await.unwrap();
    assert_eq!(aggregate.count_active(), 1);

    // Fetch failure: the aggregate keeps the last good snapshot rather than
    // dropping to zero or failing the whole read.
    let _ = engine.poll_account("pocztex-1").await;
    assert_eq!(aggregate.count_active(), 1);
}

#[tokio::test]
async fn detach_removes_account_contribution() {
    let client = ScriptedCourierClient::new(Courier::Dhl);
    client.push_ok(vec![json!({"shipmentNumber": "D1", "status": "ROUTE"})]);

    let aggregate = Arc::new(ActiveShipments::new());
    let (engine, _event_rx) = TrackingEngine::new(
        vec![EngineAccount::new("dhl-1", Box::new(client))],
        Box::new(CountingTrackedStore::new()),
        aggregate.clone(),
        &engine_config(),
    )
    .unwrap();

    engine.poll_account("dhl-1").await.unwrap();
    assert_eq!(aggregate.count_active(), 1);

    aggregate.detach("dhl-1");
    assert_eq!(aggregate.count_active(), 0);
}
