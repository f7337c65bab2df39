// # shiptrackd - Shipment Tracking Daemon
//
// Thin integration layer: all tracking logic lives in shiptrack-core. The
// daemon reads configuration, registers the built-in courier clients and
// runs the engine until SIGTERM/SIGINT.
//
// ## Configuration
//
// Environment variables:
//
// - `SHIPTRACK_CONFIG`: Path to a JSON `TrackingConfig` file (required)
// - `SHIPTRACK_LOG_LEVEL`: trace | debug | info | warn | error (default: info)
//
// ## Example
//
// ```bash
// export SHIPTRACK_CONFIG=/etc/shiptrack/config.json
// export SHIPTRACK_LOG_LEVEL=info
//
// shiptrackd
// ```
//
// Example config file:
//
// ```json
// {
//   "accounts": [
//     {
//       "id": "inpost-personal",
//       "credentials": {
//         "type": "inpost",
//         "phone_number": "500100200",
//         "refresh_token": "..."
//       }
//     }
//   ],
//   "tracked_store": {"type": "file", "path": "/var/lib/shiptrack/state.json"},
//   "engine": {"poll_interval_secs": 600}
// }
// ```

use anyhow::{Context, Result};
use shiptrack_core::{
    ActiveShipments, CourierRegistry, EngineAccount, EngineEvent, TrackingConfig, TrackingEngine,
};
use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum DaemonExitCode {
    CleanShutdown = 0,
    ConfigError = 1,
    RuntimeError = 2,
}

impl From<DaemonExitCode> for ExitCode {
    fn from(code: DaemonExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Environment-level daemon configuration
struct DaemonConfig {
    config_path: String,
    log_level: String,
}

impl DaemonConfig {
    fn from_env() -> Result<Self> {
        Ok(Self {
            config_path: env::var("SHIPTRACK_CONFIG")
                .context("SHIPTRACK_CONFIG is required. Set it to the path of a JSON config file")?,
            log_level: env::var("SHIPTRACK_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    fn validate(&self) -> Result<()> {
        if !std::path::Path::new(&self.config_path).exists() {
            anyhow::bail!("config file does not exist: {}", self.config_path);
        }
        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
            other => anyhow::bail!(
                "SHIPTRACK_LOG_LEVEL '{}' is not valid. Valid levels: trace, debug, info, warn, error",
                other
            ),
        }
    }

    fn level(&self) -> Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }
}

fn main() -> ExitCode {
    let daemon_config = match DaemonConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("configuration error: {:#}", e);
            return DaemonExitCode::ConfigError.into();
        }
    };

    if let Err(e) = daemon_config.validate() {
        eprintln!("configuration validation error: {:#}", e);
        return DaemonExitCode::ConfigError.into();
    }

    let subscriber = FmtSubscriber::builder()
        .with_max_level(daemon_config.level())
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("failed to set tracing subscriber: {}", e);
        return DaemonExitCode::ConfigError.into();
    }

    let tracking_config = match load_tracking_config(&daemon_config.config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("invalid tracking config: {:#}", e);
            return DaemonExitCode::ConfigError.into();
        }
    };

    info!("starting shiptrackd");
    info!(
        "configuration loaded: {} account(s), poll every {}s",
        tracking_config.accounts.len(),
        tracking_config.engine.poll_interval_secs
    );

    let rt = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("failed to create tokio runtime: {}", e);
            return DaemonExitCode::RuntimeError.into();
        }
    };

    rt.block_on(async {
        match run_daemon(tracking_config).await {
            Ok(()) => DaemonExitCode::CleanShutdown,
            Err(e) => {
                error!("daemon error: {:#}", e);
                DaemonExitCode::RuntimeError
            }
        }
    })
    .into()
}

fn load_tracking_config(path: &str) -> Result<TrackingConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path))?;
    let config: TrackingConfig = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse config file {}", path))?;
    config.validate()?;
    Ok(config)
}

/// Build the registry with every compiled-in courier client
fn build_registry() -> CourierRegistry {
    let registry = CourierRegistry::new();

    #[cfg(feature = "inpost")]
    {
        info!("registering InPost client");
        shiptrack_courier_inpost::register(&registry);
    }
    #[cfg(feature = "dpd")]
    {
        info!("registering DPD client");
        shiptrack_courier_dpd::register(&registry);
    }
    #[cfg(feature = "dhl")]
    {
        info!("registering DHL client");
        shiptrack_courier_dhl::register(&registry);
    }
    #[cfg(feature = "pocztex")]
    {
        info!("registering Pocztex client");
        shiptrack_courier_pocztex::register(&registry);
    }

    registry
}

async fn run_daemon(config: TrackingConfig) -> Result<()> {
    let registry = build_registry();

    let mut accounts = Vec::new();
    for account in &config.accounts {
        if !account.enabled {
            info!(account_id = %account.id, "account disabled, skipping");
            continue;
        }
        let client = registry.create_client(account)?;
        info!(
            account_id = %account.id,
            courier = %client.courier(),
            "managing account"
        );
        accounts.push(EngineAccount::new(account.id.clone(), client));
    }

    let store = registry.create_tracked_store(&config.tracked_store).await?;
    let aggregate = Arc::new(ActiveShipments::new());

    let (engine, mut event_rx) =
        TrackingEngine::new(accounts, store, aggregate, &config.engine)?;

    // Surface engine events in the log; the host platform integration would
    // consume this channel instead.
    let event_task = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            match event {
                EngineEvent::ParcelAppeared { key, snapshot, .. } => {
                    info!(%key, status = %snapshot.status, "parcel appeared");
                }
                EngineEvent::ParcelRetired { key, .. } => {
                    info!(%key, "parcel retired");
                }
                EngineEvent::ActiveCountChanged { count } => {
                    info!(count, "active shipments");
                }
                EngineEvent::PollFailed {
                    account_id, error, ..
                } => {
                    error!(%account_id, %error, "poll failed");
                }
                other => {
                    tracing::debug!(?other, "engine event");
                }
            }
        }
    });

    info!("starting tracking engine");
    let result = engine.run().await;

    event_task.abort();
    info!("daemon stopped");

    result.map_err(Into::into)
}
