//! Core tracking engine
//!
//! The TrackingEngine is responsible for:
//! - Driving poll cycles per account via CourierClient
//! - Reconciling each poll against the tracked-parcel set
//! - Persisting tracked sets through the TrackedStore
//! - Feeding the aggregate counter and emitting events
//!
//! ## Poll Flow
//!
//! ```text
//! ┌────────────────┐   fetch_parcels()   ┌────────────────┐
//! │ CourierClient  │────────────────────▶│ TrackingEngine │
//! └────────────────┘                     └────────────────┘
//!                                                │
//!            ┌───────────────────────────────────┼──────────────────────┐
//!            ▼                                   ▼                      ▼
//!    ┌──────────────┐                  ┌─────────────────┐     ┌──────────────┐
//!    │ TrackedStore │                  │ ActiveShipments │     │    Events    │
//!    │ (persist)    │                  │ (snapshot)      │     │ (notify)     │
//!    └──────────────┘                  └─────────────────┘     └──────────────┘
//! ```
//!
//! A failed fetch skips reconciliation entirely for that account and cycle:
//! the previous tracked set, persisted state and aggregate snapshot all stay
//! untouched. One account's failure never affects another account's poll.

use crate::aggregate::ActiveShipments;
use crate::config::EngineConfig;
use crate::courier::Courier;
use crate::entity::ParcelSnapshot;
use crate::error::{Error, Result};
use crate::extract::parcel_id;
use crate::reconcile::reconcile;
use crate::traits::{CourierClient, TrackedStore};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, error, info, warn};

/// Events emitted by the TrackingEngine
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Engine started
    Started {
        accounts: usize,
    },

    /// One account's poll completed and reconciled
    PollSucceeded {
        account_id: String,
        courier: Courier,
        parcel_count: usize,
    },

    /// One account's fetch failed; its state is unchanged this cycle
    PollFailed {
        account_id: String,
        courier: Courier,
        error: String,
    },

    /// A parcel started being tracked (create an entity)
    ParcelAppeared {
        account_id: String,
        key: String,
        snapshot: ParcelSnapshot,
    },

    /// A tracked parcel finished or vanished (retire the entity)
    ParcelRetired {
        account_id: String,
        key: String,
    },

    /// The aggregate active count after a successful poll
    ActiveCountChanged {
        count: usize,
    },

    /// Engine stopped
    Stopped {
        reason: String,
    },
}

/// One account under the engine's management
pub struct EngineAccount {
    /// Unique account identifier
    pub id: String,
    /// Client owning this account's API session
    pub client: Box<dyn CourierClient>,
}

impl EngineAccount {
    /// Pair an account id with its courier client
    pub fn new(id: impl Into<String>, client: Box<dyn CourierClient>) -> Self {
        Self {
            id: id.into(),
            client,
        }
    }
}

/// Core tracking engine
///
/// ## Lifecycle
///
/// 1. Create with [`TrackingEngine::new()`]
/// 2. Run continuously with [`TrackingEngine::run()`], or drive individual
///    cycles with [`TrackingEngine::poll_account()`] when the host owns the
///    schedule
/// 3. The run loop exits on SIGINT or, in tests, a provided shutdown signal
///
/// ## Concurrency
///
/// One poll cycle per account runs to completion before that account is
/// polled again; accounts are polled sequentially within a cycle. The
/// aggregate counter only ever reads snapshots, so its consumers may read
/// concurrently with polling.
pub struct TrackingEngine {
    /// Managed accounts
    accounts: Vec<EngineAccount>,

    /// In-memory tracked sets, keyed by account id
    tracked: RwLock<HashMap<String, BTreeSet<String>>>,

    /// Persistence for tracked sets
    store: Box<dyn TrackedStore>,

    /// Cross-account active counter
    aggregate: Arc<ActiveShipments>,

    /// Interval between poll cycles (seconds)
    poll_interval_secs: u64,

    /// Delay before the first poll (seconds)
    startup_delay_secs: u64,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<EngineEvent>,
}

impl TrackingEngine {
    /// Create a new tracking engine
    ///
    /// Every account is attached to the aggregate counter on construction.
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields engine events
    pub fn new(
        accounts: Vec<EngineAccount>,
        store: Box<dyn TrackedStore>,
        aggregate: Arc<ActiveShipments>,
        config: &EngineConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        config.validate()?;
        if accounts.is_empty() {
            return Err(Error::config("no accounts to track"));
        }

        for account in &accounts {
            aggregate.attach(account.id.clone(), account.client.courier());
        }

        let (tx, rx) = mpsc::channel(config.event_channel_capacity);

        let engine = Self {
            accounts,
            tracked: RwLock::new(HashMap::new()),
            store,
            aggregate,
            poll_interval_secs: config.poll_interval_secs,
            startup_delay_secs: config.startup_delay_secs,
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// The aggregate counter this engine feeds
    pub fn aggregate(&self) -> &Arc<ActiveShipments> {
        &self.aggregate
    }

    /// Load persisted tracked sets for all managed accounts
    ///
    /// Called once before the first poll so a restart does not re-announce
    /// every active parcel as new.
    pub async fn hydrate(&self) -> Result<()> {
        let mut tracked = self.tracked.write().await;
        for account in &self.accounts {
            if let Some(persisted) = self.store.load(&account.id).await? {
                debug!(
                    account_id = %account.id,
                    parcels = persisted.len(),
                    "hydrated tracked set"
                );
                tracked.insert(account.id.clone(), persisted);
            }
        }
        Ok(())
    }

    /// Run one poll cycle for a single account
    ///
    /// Fetch, reconcile, persist, update the aggregate, emit events. On a
    /// fetch failure the account's tracked state is left exactly as it was.
    pub async fn poll_account(&self, account_id: &str) -> Result<()> {
        let account = self
            .accounts
            .iter()
            .find(|a| a.id == account_id)
            .ok_or_else(|| Error::not_found(format!("unknown account: {}", account_id)))?;
        let courier = account.client.courier();

        let parcels = match account.client.fetch_parcels().await {
            Ok(parcels) => parcels,
            Err(e) => {
                warn!(account_id = %account.id, %courier, "poll failed: {}", e);
                self.emit_event(EngineEvent::PollFailed {
                    account_id: account.id.clone(),
                    courier,
                    error: e.to_string(),
                });
                return Err(e);
            }
        };

        let outcome = {
            let tracked = self.tracked.read().await;
            let previous = tracked.get(&account.id).cloned().unwrap_or_default();
            reconcile(&previous, &parcels, courier)
        };

        for id in &outcome.appeared {
            let snapshot = parcels
                .iter()
                .filter(|p| parcel_id(p, courier).as_deref() == Some(id.as_str()))
                .find_map(|p| ParcelSnapshot::from_record(p, courier));
            if let Some(snapshot) = snapshot {
                info!(account_id = %account.id, key = %snapshot.key, "tracking new parcel");
                self.emit_event(EngineEvent::ParcelAppeared {
                    account_id: account.id.clone(),
                    key: snapshot.key.clone(),
                    snapshot,
                });
            }
        }
        for key in &outcome.retired_keys {
            info!(account_id = %account.id, %key, "retiring parcel");
            self.emit_event(EngineEvent::ParcelRetired {
                account_id: account.id.clone(),
                key: key.clone(),
            });
        }

        {
            let mut tracked = self.tracked.write().await;
            tracked.insert(account.id.clone(), outcome.current.clone());
        }
        self.store.save(&account.id, &outcome.current).await?;

        self.aggregate.update(&account.id, parcels.clone());

        self.emit_event(EngineEvent::PollSucceeded {
            account_id: account.id.clone(),
            courier,
            parcel_count: parcels.len(),
        });
        self.emit_event(EngineEvent::ActiveCountChanged {
            count: self.aggregate.count_active(),
        });

        Ok(())
    }

    /// Poll every managed account once
    ///
    /// A failing account is logged and skipped; the remaining accounts still
    /// get their cycle.
    pub async fn poll_all(&self) {
        for account in &self.accounts {
            if let Err(e) = self.poll_account(&account.id).await {
                error!(account_id = %account.id, "poll cycle failed: {}", e);
            }
        }
    }

    /// The tracked set currently held for an account (empty if none)
    pub async fn tracked_ids(&self, account_id: &str) -> BTreeSet<String> {
        let tracked = self.tracked.read().await;
        tracked.get(account_id).cloned().unwrap_or_default()
    }

    /// Run the engine until shutdown
    ///
    /// Polls all accounts immediately, then on the configured interval,
    /// until SIGINT is received.
    pub async fn run(&self) -> Result<()> {
        self.run_internal(None).await
    }

    /// Test-only entry point with a controlled shutdown signal
    ///
    /// Production code should use [`TrackingEngine::run()`], which ties
    /// shutdown to OS signals.
    pub async fn run_with_shutdown(
        &self,
        shutdown_rx: Option<tokio::sync::oneshot::Receiver<()>>,
    ) -> Result<()> {
        self.run_internal(shutdown_rx).await
    }

    async fn run_internal(
        &self,
        shutdown_rx: Option<tokio::sync::oneshot::Receiver<()>>,
    ) -> Result<()> {
        self.emit_event(EngineEvent::Started {
            accounts: self.accounts.len(),
        });

        self.hydrate().await?;

        if self.startup_delay_secs > 0 {
            tokio::time::sleep(std::time::Duration::from_secs(self.startup_delay_secs)).await;
        }

        let mut interval =
            tokio::time::interval(std::time::Duration::from_secs(self.poll_interval_secs));

        if let Some(mut rx) = shutdown_rx {
            loop {
                tokio::select! {
                    _ = interval.tick() => self.poll_all().await,
                    _ = &mut rx => {
                        info!("shutdown signal received");
                        self.emit_event(EngineEvent::Stopped {
                            reason: "shutdown signal".to_string(),
                        });
                        break;
                    }
                }
            }
        } else {
            loop {
                tokio::select! {
                    _ = interval.tick() => self.poll_all().await,
                    _ = tokio::signal::ctrl_c() => {
                        info!("shutdown signal received");
                        self.emit_event(EngineEvent::Stopped {
                            reason: "shutdown signal".to_string(),
                        });
                        break;
                    }
                }
            }
        }

        self.store.flush().await?;
        info!("state flushed, engine stopped");

        Ok(())
    }

    fn emit_event(&self, event: EngineEvent) {
        // A full channel means the consumer is slower than event production;
        // dropping (with a warning) bounds memory under load.
        if self.event_tx.try_send(event).is_err() {
            warn!("event channel full, dropping event");
        }
    }
}
