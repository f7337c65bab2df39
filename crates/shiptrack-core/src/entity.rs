//! Host-facing parcel entity snapshots
//!
//! When a new parcel starts being tracked, the host platform needs a stable
//! key, the canonical status as the primary value, and a structured
//! attribute bag for display. The bag always carries the courier, tracking
//! number, unmodified raw status and the full raw record serialized for
//! diagnostics; courier-specific extras (sender, pickup point, open code,
//! history) are appended where the record provides them.

use crate::courier::Courier;
use crate::extract::{parcel_id, raw_status};
use crate::reconcile::entity_key;
use crate::status::{CanonicalStatus, normalize};
use serde::Serialize;
use serde_json::{Map, Value, json};

/// One tracked parcel, as exposed to the host entity layer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParcelSnapshot {
    /// Stable unique key, `"{courier}_{parcel_id}"`
    pub key: String,
    /// Which courier this parcel belongs to
    pub courier: Courier,
    /// The parcel identifier within the courier account
    pub tracking_number: String,
    /// Normalized lifecycle state (the entity's primary value)
    pub status: CanonicalStatus,
    /// The unmodified raw status string, if any
    pub status_raw: Option<String>,
    /// Structured attribute bag for presentation
    pub attributes: Map<String, Value>,
}

impl ParcelSnapshot {
    /// Build a snapshot from a raw record; `None` if no id can be extracted
    pub fn from_record(record: &Value, courier: Courier) -> Option<Self> {
        let tracking_number = parcel_id(record, courier)?;
        let status_raw = raw_status(record, courier);
        let status = normalize(status_raw.as_deref(), courier);

        let mut attributes = Map::new();
        attributes.insert("courier".into(), json!(courier.as_str()));
        attributes.insert("tracking_number".into(), json!(tracking_number));
        attributes.insert("status_raw".into(), json!(status_raw));

        // Some clients pre-wrap the upstream payload; prefer it when present
        // so diagnostics show what the API actually sent.
        let raw_payload = record.get("_raw_response").unwrap_or(record);
        attributes.insert(
            "raw_response".into(),
            Value::String(serde_json::to_string(raw_payload).unwrap_or_default()),
        );

        match courier {
            Courier::Inpost => inpost_attributes(record, &mut attributes),
            Courier::Dpd => dpd_attributes(record, &mut attributes),
            Courier::Pocztex => pocztex_attributes(record, &mut attributes),
            Courier::Dhl => {}
        }

        Some(Self {
            key: entity_key(courier, &tracking_number),
            courier,
            tracking_number,
            status,
            status_raw,
            attributes,
        })
    }
}

fn inpost_attributes(record: &Value, attrs: &mut Map<String, Value>) {
    if let Some(sender) = record.get("sender").and_then(Value::as_object) {
        if let Some(name) = sender.get("name") {
            attrs.insert("sender".into(), name.clone());
        }
    }

    if let Some(point) = record.get("pickUpPoint").and_then(Value::as_object) {
        let address = point.get("addressDetails").and_then(Value::as_object);
        let parts: Vec<&str> = ["street", "buildingNumber", "city"]
            .iter()
            .filter_map(|key| {
                address
                    .and_then(|a| a.get(*key))
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty())
            })
            .collect();
        attrs.insert("location".into(), json!(parts.join(", ")));
    }

    if let Some(open_code) = record.get("openCode") {
        attrs.insert("open_code".into(), open_code.clone());
    }

    if let Some(phone) = record
        .get("receiver")
        .and_then(|r| r.get("phoneNumber"))
        .and_then(Value::as_object)
    {
        if let Some(value) = phone.get("value") {
            attrs.insert("phone_number".into(), value.clone());
        }
    }
}

fn dpd_attributes(record: &Value, attrs: &mut Map<String, Value>) {
    if let Some(sender) = record.get("sender").and_then(Value::as_object) {
        if let Some(name) = sender.get("name") {
            attrs.insert("sender".into(), name.clone());
        }
    }
}

fn pocztex_attributes(record: &Value, attrs: &mut Map<String, Value>) {
    let fields = [
        ("senderName", "sender_name"),
        ("recipientName", "recipient_name"),
        ("stateDate", "state_date"),
        ("direction", "direction"),
        ("pickupDate", "pickup_date"),
    ];
    for (source, target) in fields {
        if let Some(value) = record.get(source) {
            attrs.insert(target.into(), value.clone());
        }
    }
    if let Some(history) = record.get("history").filter(|h| h.is_array()) {
        attrs.insert("history".into(), history.clone());
    }
}
