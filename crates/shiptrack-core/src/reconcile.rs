//! Parcel set reconciliation
//!
//! Every poll produces a fresh raw parcel list; this module diffs it against
//! the previously tracked identifiers to decide which entities to create and
//! which to retire. The function is pure: it never mutates its inputs, so a
//! caller can apply the outcome atomically (or not at all, on a failed
//! fetch) and re-running it on unchanged input is a no-op.

use crate::classify::is_finished;
use crate::courier::Courier;
use crate::extract::parcel_id;
use serde_json::Value;
use std::collections::BTreeSet;

/// Host-facing stable entity key for a parcel
pub fn entity_key(courier: Courier, parcel_id: &str) -> String {
    format!("{}_{}", courier, parcel_id)
}

/// Result of diffing one poll against the tracked set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciliation {
    /// Non-finished parcel ids present in this poll; the tracked set after
    /// the outcome is applied
    pub current: BTreeSet<String>,
    /// Ids seen for the first time (entities to create)
    pub appeared: BTreeSet<String>,
    /// Entity keys of previously tracked parcels that vanished from the
    /// response or became finished (entities to retire)
    pub retired_keys: BTreeSet<String>,
}

impl Reconciliation {
    /// Whether this poll changed nothing
    pub fn is_noop(&self) -> bool {
        self.appeared.is_empty() && self.retired_keys.is_empty()
    }
}

/// Diff a fresh raw parcel list against the tracked identifier set
///
/// Records without an extractable id are skipped, as are records in a
/// terminal state: a finished parcel is never (re)tracked even when the API
/// keeps returning it.
pub fn reconcile(
    tracked: &BTreeSet<String>,
    parcels: &[Value],
    courier: Courier,
) -> Reconciliation {
    let mut current = BTreeSet::new();
    for parcel in parcels {
        let Some(id) = parcel_id(parcel, courier) else {
            continue;
        };
        if is_finished(parcel, courier) {
            continue;
        }
        current.insert(id);
    }

    let appeared = current.difference(tracked).cloned().collect();
    let retired_keys = tracked
        .difference(&current)
        .map(|id| entity_key(courier, id))
        .collect();

    Reconciliation {
        current,
        appeared,
        retired_keys,
    }
}
