//! Status normalization
//!
//! Couriers report shipment progress in their own vocabularies: InPost and
//! DPD use SCREAMING_SNAKE codes, DHL mixes legacy `TT_*` codes with plain
//! English tokens, Pocztex uses Polish phrases. This module maps all of them
//! onto a small closed set of lifecycle states.
//!
//! Resolution order: per-courier exact-match table first, then a fixed chain
//! of courier-agnostic substring heuristics over the lowercased text and a
//! Polish-diacritic-folded variant. Anything unrecognized becomes
//! [`CanonicalStatus::Unknown`]; no input ever produces an error.

mod tables;

pub(crate) use tables::exact_match;

use crate::courier::Courier;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Normalized shipment lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalStatus {
    /// Label created, parcel not yet moving
    Created,
    /// Somewhere between sender and destination
    InTransport,
    /// With a courier on the final leg
    HandedOutForDelivery,
    /// Waiting in a locker, point or branch for the receiver
    WaitingForPickup,
    /// Received by the customer
    Delivered,
    /// Sent back to the sender
    Returned,
    /// Shipment cancelled
    Cancelled,
    /// Delivery problem (delay, failed attempt, lost, refused)
    Exception,
    /// Raw status missing or not recognized
    Unknown,
}

impl CanonicalStatus {
    /// Wire name of this status, matching the serde representation
    pub fn as_str(self) -> &'static str {
        match self {
            CanonicalStatus::Created => "created",
            CanonicalStatus::InTransport => "in_transport",
            CanonicalStatus::HandedOutForDelivery => "handed_out_for_delivery",
            CanonicalStatus::WaitingForPickup => "waiting_for_pickup",
            CanonicalStatus::Delivered => "delivered",
            CanonicalStatus::Returned => "returned",
            CanonicalStatus::Cancelled => "cancelled",
            CanonicalStatus::Exception => "exception",
            CanonicalStatus::Unknown => "unknown",
        }
    }

    /// Whether this status ends tracking: delivered, returned or cancelled
    ///
    /// `Unknown` is deliberately non-terminal so that parcels with
    /// unrecognized statuses stay visible instead of silently disappearing.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            CanonicalStatus::Delivered | CanonicalStatus::Returned | CanonicalStatus::Cancelled
        )
    }
}

impl fmt::Display for CanonicalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalize a raw courier status to a [`CanonicalStatus`]
///
/// Exact-table hits win over heuristics, so courier-native codes always map
/// to their documented meaning even when a substring rule would classify
/// them differently (InPost `MISSING` is an exception, not "missing" parcel
/// text matched later in the chain).
pub fn normalize(raw_status: Option<&str>, courier: Courier) -> CanonicalStatus {
    let text = raw_status.unwrap_or("").trim();
    if text.is_empty() {
        return CanonicalStatus::Unknown;
    }

    let upper = text.to_uppercase();
    if let Some(mapped) = tables::exact_match(courier, &upper) {
        return mapped;
    }

    let lower = text.to_lowercase();
    let ascii = fold_polish(&lower);
    heuristic(&lower, &ascii)
}

/// Fold Polish diacritics to their ASCII bases (ą→a, ł→l, ż/ź→z, ...)
fn fold_polish(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            'ą' => 'a',
            'ć' => 'c',
            'ę' => 'e',
            'ł' => 'l',
            'ń' => 'n',
            'ó' => 'o',
            'ś' => 's',
            'ż' | 'ź' => 'z',
            other => other,
        })
        .collect()
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

/// Courier-agnostic fallback classification, first match wins
///
/// The order matters: pickup-point "delivered to locker" phrasing must be
/// recognized before the bare "delivered" substring, and Polish roots before
/// the generic English return/cancel/failure buckets.
fn heuristic(lower: &str, ascii: &str) -> CanonicalStatus {
    if lower == "ready" {
        return CanonicalStatus::WaitingForPickup;
    }
    if contains_any(
        lower,
        &[
            "delivered to locker",
            "delivered to point",
            "delivered to parcel locker",
            "delivered to pickup point",
        ],
    ) {
        return CanonicalStatus::WaitingForPickup;
    }
    if contains_any(lower, &["picked up", "collected by", "collected"]) {
        return CanonicalStatus::Delivered;
    }
    if contains_any(lower, &["ready for collection", "ready to pick", "ready for pick"]) {
        return CanonicalStatus::WaitingForPickup;
    }
    if contains_any(lower, &["pickup", "collection", "locker"]) {
        return CanonicalStatus::WaitingForPickup;
    }
    if lower.contains("delivered") {
        return CanonicalStatus::Delivered;
    }
    if ascii.contains("awizo") {
        return CanonicalStatus::WaitingForPickup;
    }
    if contains_any(ascii, &["odebr", "wydan", "odebrane"]) {
        return CanonicalStatus::Delivered;
    }
    if contains_any(ascii, &["dorecz", "dostarcz"]) {
        return CanonicalStatus::Delivered;
    }
    if contains_any(ascii, &["zwrot", "odesl"]) {
        return CanonicalStatus::Returned;
    }
    if contains_any(ascii, &["anul", "rezygn"]) {
        return CanonicalStatus::Cancelled;
    }
    if contains_any(ascii, &["problem", "niedorecz", "odmow"]) {
        return CanonicalStatus::Exception;
    }
    if contains_any(lower, &["out for delivery", "handed over for delivery"]) {
        return CanonicalStatus::HandedOutForDelivery;
    }
    if contains_any(lower, &["return", "returned"]) {
        return CanonicalStatus::Returned;
    }
    if contains_any(lower, &["cancel", "canceled", "cancelled"]) {
        return CanonicalStatus::Cancelled;
    }
    if contains_any(
        lower,
        &["fail", "failed", "delay", "exception", "undeliver", "missing", "rejected"],
    ) {
        return CanonicalStatus::Exception;
    }
    if contains_any(
        lower,
        &["transit", "in transport", "departed", "arrived", "processed", "received", "adopted"],
    ) {
        return CanonicalStatus::InTransport;
    }
    if contains_any(
        lower,
        &["created", "pre-transit", "label", "confirmed", "info received", "ready to send"],
    ) {
        return CanonicalStatus::Created;
    }

    CanonicalStatus::Unknown
}
