// # File Tracked Store
//
// File-based implementation of TrackedStore with crash recovery.
//
// ## Crash Recovery
//
// - Atomic writes: new state is written to a temp file, then renamed
// - Backup: the last known good state is kept in a `.backup` file
// - Corruption detection: JSON validation on load
// - Recovery: falls back to the backup if the main file is corrupted
//
// ## File Format
//
// ```json
// {
//   "version": "1.0",
//   "accounts": {
//     "inpost-1": {
//       "tracked": ["692000000000000000000001"],
//       "updated_at": "2026-08-01T12:00:00Z"
//     }
//   }
// }
// ```

use crate::error::Error;
use crate::traits::tracked_store::TrackedStore;
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

/// State file format version, for future migration
const STATE_FILE_VERSION: &str = "1.0";

/// Persisted state for one account
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct AccountState {
    tracked: BTreeSet<String>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl AccountState {
    fn new(tracked: BTreeSet<String>) -> Self {
        Self {
            tracked,
            updated_at: chrono::Utc::now(),
        }
    }
}

/// Serializable state file format
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct StateFileFormat {
    version: String,
    accounts: HashMap<String, AccountState>,
}

#[derive(Debug)]
struct FileState {
    accounts: HashMap<String, AccountState>,
    dirty: bool,
}

/// File-based tracked-set store with crash recovery
#[derive(Debug)]
pub struct FileTrackedStore {
    path: PathBuf,
    state: Arc<RwLock<FileState>>,
}

impl FileTrackedStore {
    /// Create or load a file tracked store
    ///
    /// Loads existing state if present, recovering from the backup when the
    /// main file is corrupted, and starting empty when both fail. Parent
    /// directories are created as needed.
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    Error::config(format!(
                        "failed to create state directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let accounts = Self::load_state_with_recovery(&path).await?;

        Ok(Self {
            path,
            state: Arc::new(RwLock::new(FileState {
                accounts,
                dirty: false,
            })),
        })
    }

    async fn load_state_with_recovery(path: &Path) -> Result<HashMap<String, AccountState>, Error> {
        match Self::load_state(path).await {
            Ok(accounts) => {
                tracing::debug!("loaded tracked state: {} account(s)", accounts.len());
                Ok(accounts)
            }
            Err(e) if e.is_corruption() => {
                tracing::warn!("state file appears corrupted: {}. Trying backup.", e);

                let backup_path = Self::backup_path(path);
                if backup_path.exists() {
                    match Self::load_state(&backup_path).await {
                        Ok(accounts) => {
                            tracing::info!(
                                "recovered tracked state from backup: {} account(s)",
                                accounts.len()
                            );
                            if let Err(restore_err) = fs::copy(&backup_path, path).await {
                                tracing::error!(
                                    "failed to restore state file from backup: {}",
                                    restore_err
                                );
                            }
                            Ok(accounts)
                        }
                        Err(backup_err) => {
                            tracing::error!(
                                "backup also corrupted: {}. Starting with empty state.",
                                backup_err
                            );
                            Ok(HashMap::new())
                        }
                    }
                } else {
                    tracing::warn!("no backup file found, starting with empty state");
                    Ok(HashMap::new())
                }
            }
            Err(e) => Err(e),
        }
    }

    async fn load_state(path: &Path) -> Result<HashMap<String, AccountState>, Error> {
        if !path.exists() {
            tracing::debug!("state file does not exist: {}", path.display());
            return Ok(HashMap::new());
        }

        let content = fs::read_to_string(path).await.map_err(|e| {
            Error::tracked_store(format!("failed to read state file {}: {}", path.display(), e))
        })?;

        let state_file: StateFileFormat = serde_json::from_str(&content).map_err(|e| {
            Error::tracked_store(format!(
                "failed to parse state file {}: {}",
                path.display(),
                e
            ))
        })?;

        if state_file.version != STATE_FILE_VERSION {
            tracing::warn!(
                "state file version mismatch: expected {}, got {}. Loading anyway.",
                STATE_FILE_VERSION,
                state_file.version
            );
        }

        Ok(state_file.accounts)
    }

    async fn write_state(&self) -> Result<(), Error> {
        let json = {
            let guard = self.state.read().await;
            let state_file = StateFileFormat {
                version: STATE_FILE_VERSION.to_string(),
                accounts: guard.accounts.clone(),
            };
            serde_json::to_string_pretty(&state_file)
                .map_err(|e| Error::tracked_store(format!("failed to serialize state: {}", e)))?
        };

        let temp_path = self.temp_path();
        {
            let mut file = fs::File::create(&temp_path).await.map_err(|e| {
                Error::tracked_store(format!(
                    "failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
            file.write_all(json.as_bytes()).await.map_err(|e| {
                Error::tracked_store(format!(
                    "failed to write temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
            file.flush().await.map_err(|e| {
                Error::tracked_store(format!(
                    "failed to flush temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        if self.path.exists() {
            let backup_path = Self::backup_path(&self.path);
            if let Err(e) = fs::copy(&self.path, &backup_path).await {
                tracing::warn!("failed to create backup: {}", e);
            }
        }

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::tracked_store(format!(
                "failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        let mut guard = self.state.write().await;
        guard.dirty = false;

        tracing::trace!("tracked state written to {}", self.path.display());
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }

    fn backup_path(path: &Path) -> PathBuf {
        let mut backup = path.to_path_buf();
        backup.set_extension("backup");
        backup
    }
}

impl Error {
    // Parse failures mean corruption; I/O failures do not.
    fn is_corruption(&self) -> bool {
        matches!(self, Error::TrackedStore(msg) if msg.contains("failed to parse"))
    }
}

#[async_trait]
impl TrackedStore for FileTrackedStore {
    async fn load(&self, account_id: &str) -> Result<Option<BTreeSet<String>>, Error> {
        let guard = self.state.read().await;
        Ok(guard.accounts.get(account_id).map(|a| a.tracked.clone()))
    }

    async fn save(&self, account_id: &str, tracked: &BTreeSet<String>) -> Result<(), Error> {
        {
            let mut guard = self.state.write().await;
            guard
                .accounts
                .insert(account_id.to_string(), AccountState::new(tracked.clone()));
            guard.dirty = true;
        }
        // Immediate write for durability
        self.write_state().await
    }

    async fn remove(&self, account_id: &str) -> Result<(), Error> {
        {
            let mut guard = self.state.write().await;
            guard.accounts.remove(account_id);
            guard.dirty = true;
        }
        self.write_state().await
    }

    async fn list_accounts(&self) -> Result<Vec<String>, Error> {
        let guard = self.state.read().await;
        Ok(guard.accounts.keys().cloned().collect())
    }

    async fn flush(&self) -> Result<(), Error> {
        let dirty = self.state.read().await.dirty;
        if dirty { self.write_state().await } else { Ok(()) }
    }
}
