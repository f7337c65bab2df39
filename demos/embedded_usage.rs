//! Minimal embedding example for shiptrack-core
//!
//! This example demonstrates using shiptrack-core as a library in a custom
//! application: a scripted in-memory courier client, the memory tracked
//! store, and manually driven poll cycles. The engine lifecycle is fully
//! managed by the application.

use async_trait::async_trait;
use serde_json::{Value, json};
use shiptrack_core::config::EngineConfig;
use shiptrack_core::traits::CourierClient;
use shiptrack_core::{
    ActiveShipments, Courier, EngineAccount, MemoryTrackedStore, Result, TrackingEngine,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Courier client that serves pre-scripted poll results
struct EmbeddedCourierClient {
    polls: Mutex<VecDeque<Vec<Value>>>,
}

impl EmbeddedCourierClient {
    fn new(polls: Vec<Vec<Value>>) -> Self {
        Self {
            polls: Mutex::new(polls.into()),
        }
    }
}

#[async_trait]
impl CourierClient for EmbeddedCourierClient {
    async fn fetch_parcels(&self) -> Result<Vec<Value>> {
        Ok(self.polls.lock().unwrap().pop_front().unwrap_or_default())
    }

    fn courier(&self) -> Courier {
        Courier::Inpost
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    println!("=== Embedded shiptrack-core Example ===\n");

    // Two scripted polls: a parcel is created, then delivered.
    let client = EmbeddedCourierClient::new(vec![
        vec![
            json!({"shipmentNumber": "A1", "status": "CREATED"}),
            json!({"shipmentNumber": "A2", "status": "OUT_FOR_DELIVERY"}),
        ],
        vec![
            json!({"shipmentNumber": "A1", "status": "DELIVERED"}),
            json!({"shipmentNumber": "A2", "status": "OUT_FOR_DELIVERY"}),
        ],
    ]);

    let aggregate = Arc::new(ActiveShipments::new());
    let config = EngineConfig {
        poll_interval_secs: 600,
        startup_delay_secs: 0,
        event_channel_capacity: 100,
    };

    println!("1. Creating engine...");
    let (engine, mut event_rx) = TrackingEngine::new(
        vec![EngineAccount::new("inpost-demo", Box::new(client))],
        Box::new(MemoryTrackedStore::new()),
        aggregate.clone(),
        &config,
    )?;

    // Event listener: this is where a host platform would create and retire
    // its entities.
    let event_listener = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            println!("[event] {:?}", event);
        }
    });

    println!("2. First poll (parcel created)...");
    engine.poll_account("inpost-demo").await?;
    println!("   active shipments: {}", aggregate.count_active());

    println!("3. Second poll (parcel delivered)...");
    engine.poll_account("inpost-demo").await?;
    println!("   active shipments: {}", aggregate.count_active());

    // Let the listener drain the channel before exiting.
    tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
    event_listener.abort();

    println!("\n=== Done ===");
    println!("Key points:");
    println!("- Poll cycles are driven by the application, not a daemon");
    println!("- The aggregate counter recomputes from snapshots on read");
    println!("- Delivered parcels retire their entity and leave the count");

    Ok(())
}
