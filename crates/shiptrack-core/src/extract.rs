//! Per-courier field extraction from raw parcel records
//!
//! Raw records are opaque JSON with no shared schema; every courier lays out
//! the parcel identifier and status differently, and the Pocztex mobile API
//! is unstable enough that both fields need multi-key fallback chains. All
//! lookups are null-propagating: a missing or oddly-typed field yields
//! `None`, never an error.

use crate::courier::Courier;
use crate::status;
use serde_json::Value;

/// Pocztex id keys, in priority order
const POCZTEX_ID_KEYS: [&str; 8] = [
    "trackingId",
    "trackingNumber",
    "trackingNo",
    "parcelNumber",
    "consignmentNumber",
    "shipmentNumber",
    "number",
    "id",
];

/// Pocztex sub-fields tried when `status` is itself an object
const POCZTEX_STATUS_OBJECT_KEYS: [&str; 4] = ["name", "label", "description", "code"];

/// Pocztex sibling keys tried after the primary status fields
const POCZTEX_STATUS_FALLBACK_KEYS: [&str; 7] = [
    "statusName",
    "statusText",
    "statusLabel",
    "statusDescription",
    "statusCode",
    "state",
    "stateCode",
];

/// Extract the stable parcel identifier for a record
pub fn parcel_id(record: &Value, courier: Courier) -> Option<String> {
    match courier {
        Courier::Inpost | Courier::Dhl => scalar_string(record.get("shipmentNumber")?),
        Courier::Dpd => scalar_string(record.get("waybill")?),
        Courier::Pocztex => pocztex_id(record),
    }
}

/// Extract the raw (unnormalized) status string for a record
pub fn raw_status(record: &Value, courier: Courier) -> Option<String> {
    match courier {
        Courier::Inpost => record.get("status").and_then(scalar_string),
        Courier::Dpd => record
            .get("main_status")
            .and_then(|main| main.get("status"))
            .and_then(scalar_string),
        Courier::Dhl => dhl_status(record),
        Courier::Pocztex => pocztex_status(record),
    }
}

/// Normalize a courier API response body into a list of parcel records
///
/// The courier APIs disagree on envelope shape: InPost returns a bare JSON
/// array, the others wrap the list in an object under varying keys. Anything
/// unrecognized yields an empty list rather than an error, since an empty
/// poll is always safe for the reconciler.
pub fn parcel_array(response: &Value) -> Vec<Value> {
    if let Some(items) = response.as_array() {
        return items.clone();
    }
    if let Some(map) = response.as_object() {
        for key in ["parcels", "shipments", "items", "content", "data"] {
            if let Some(items) = map.get(key).and_then(Value::as_array) {
                return items.clone();
            }
        }
    }
    tracing::warn!("unrecognized parcel list shape, treating as empty");
    Vec::new()
}

/// Stringify a scalar JSON value; objects, arrays and null do not count
fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn pocztex_id(record: &Value) -> Option<String> {
    let map = record.as_object()?;
    POCZTEX_ID_KEYS
        .iter()
        .find_map(|key| map.get(*key).and_then(scalar_string))
}

// The detailed `status` field stays the primary source. If a new TT_* code
// appears that the table does not know yet, the coarse timeline status
// (Route/Delivery/...) is more useful than an opaque code, so fall back to
// it in exactly that case.
fn dhl_status(record: &Value) -> Option<String> {
    let status_text = record
        .get("status")
        .and_then(scalar_string)
        .map(|s| s.trim().to_string())
        .unwrap_or_default();

    if !status_text.is_empty() {
        let upper = status_text.to_uppercase();
        if !upper.starts_with("TT_") || status::exact_match(Courier::Dhl, &upper).is_some() {
            return Some(status_text);
        }
    }

    if let Some(timeline) = record.get("menuTimelineLabel").and_then(Value::as_object) {
        if let Some(timeline_status) = timeline.get("status").and_then(scalar_string) {
            let timeline_status = timeline_status.trim();
            if !timeline_status.is_empty() {
                return Some(timeline_status.to_string());
            }
        }
    }

    if status_text.is_empty() { None } else { Some(status_text) }
}

fn pocztex_status(record: &Value) -> Option<String> {
    let map = record.as_object()?;

    let status = map.get("status");
    if let Some(Value::String(s)) = status {
        return Some(s.clone());
    }
    if let Some(Value::String(s)) = map.get("state") {
        return Some(s.clone());
    }
    if let Some(code) = map.get("stateCode").and_then(scalar_string) {
        return Some(code);
    }
    if let Some(Value::Object(status_obj)) = status {
        for key in POCZTEX_STATUS_OBJECT_KEYS {
            if let Some(value) = status_obj.get(key).and_then(scalar_string) {
                return Some(value);
            }
        }
    }
    for key in POCZTEX_STATUS_FALLBACK_KEYS {
        if let Some(value) = map.get(key).and_then(scalar_string) {
            return Some(value);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn inpost_fields() {
        let record = json!({"shipmentNumber": "692000000000000000000001", "status": "CREATED"});
        assert_eq!(
            parcel_id(&record, Courier::Inpost).as_deref(),
            Some("692000000000000000000001")
        );
        assert_eq!(raw_status(&record, Courier::Inpost).as_deref(), Some("CREATED"));
    }

    #[test]
    fn dpd_nested_status_is_null_safe() {
        let record = json!({"waybill": "W123", "main_status": {"status": "IN_TRANSPORT"}});
        assert_eq!(parcel_id(&record, Courier::Dpd).as_deref(), Some("W123"));
        assert_eq!(raw_status(&record, Courier::Dpd).as_deref(), Some("IN_TRANSPORT"));

        let no_main = json!({"waybill": "W123"});
        assert_eq!(raw_status(&no_main, Courier::Dpd), None);

        let null_main = json!({"waybill": "W123", "main_status": null});
        assert_eq!(raw_status(&null_main, Courier::Dpd), None);
    }

    #[test]
    fn dhl_known_tt_code_is_kept() {
        let record = json!({
            "shipmentNumber": "123",
            "status": "TT_OP",
            "menuTimelineLabel": {"status": "Delivery"}
        });
        assert_eq!(raw_status(&record, Courier::Dhl).as_deref(), Some("TT_OP"));
    }

    #[test]
    fn dhl_unknown_tt_code_falls_back_to_timeline() {
        let record = json!({
            "status": "TT_UNKNOWN_CODE",
            "menuTimelineLabel": {"status": "Route"}
        });
        assert_eq!(raw_status(&record, Courier::Dhl).as_deref(), Some("Route"));
    }

    #[test]
    fn dhl_non_tt_status_is_kept_verbatim() {
        let record = json!({
            "status": "SomeNewPlainStatus",
            "menuTimelineLabel": {"status": "Route"}
        });
        assert_eq!(
            raw_status(&record, Courier::Dhl).as_deref(),
            Some("SomeNewPlainStatus")
        );
    }

    #[test]
    fn dhl_unknown_tt_code_without_timeline_is_kept() {
        let record = json!({"status": "TT_UNKNOWN_CODE"});
        assert_eq!(
            raw_status(&record, Courier::Dhl).as_deref(),
            Some("TT_UNKNOWN_CODE")
        );
    }

    #[test]
    fn dhl_both_empty_is_none() {
        let record = json!({"status": "", "menuTimelineLabel": {"status": "  "}});
        assert_eq!(raw_status(&record, Courier::Dhl), None);
        assert_eq!(raw_status(&json!({}), Courier::Dhl), None);
    }

    #[test]
    fn pocztex_id_priority_order() {
        let record = json!({"parcelNumber": "X1", "id": "ignored"});
        assert_eq!(parcel_id(&record, Courier::Pocztex).as_deref(), Some("X1"));

        let record = json!({"id": 42});
        assert_eq!(parcel_id(&record, Courier::Pocztex).as_deref(), Some("42"));

        let record = json!({"trackingId": "T1", "parcelNumber": "X1"});
        assert_eq!(parcel_id(&record, Courier::Pocztex).as_deref(), Some("T1"));
    }

    #[test]
    fn pocztex_id_skips_null_entries() {
        let record = json!({"trackingId": null, "number": "N9"});
        assert_eq!(parcel_id(&record, Courier::Pocztex).as_deref(), Some("N9"));
    }

    #[test]
    fn pocztex_status_chain() {
        assert_eq!(
            raw_status(&json!({"status": "NADANA"}), Courier::Pocztex).as_deref(),
            Some("NADANA")
        );
        assert_eq!(
            raw_status(&json!({"state": "W TRANSPORCIE"}), Courier::Pocztex).as_deref(),
            Some("W TRANSPORCIE")
        );
        assert_eq!(
            raw_status(&json!({"stateCode": 7}), Courier::Pocztex).as_deref(),
            Some("7")
        );
        assert_eq!(
            raw_status(
                &json!({"status": {"name": "Awizowana", "code": "AW"}}),
                Courier::Pocztex
            )
            .as_deref(),
            Some("Awizowana")
        );
        assert_eq!(
            raw_status(&json!({"statusLabel": "Doręczona"}), Courier::Pocztex).as_deref(),
            Some("Doręczona")
        );
        assert_eq!(raw_status(&json!({}), Courier::Pocztex), None);
    }

    #[test]
    fn numeric_ids_are_coerced() {
        let record = json!({"shipmentNumber": 12345, "status": "CREATED"});
        assert_eq!(parcel_id(&record, Courier::Inpost).as_deref(), Some("12345"));
    }

    #[test]
    fn parcel_array_shapes() {
        assert_eq!(parcel_array(&json!([{"a": 1}, {"b": 2}])).len(), 2);
        assert_eq!(parcel_array(&json!({"parcels": [{"a": 1}]})).len(), 1);
        assert_eq!(parcel_array(&json!({"shipments": [{}, {}, {}]})).len(), 3);
        assert_eq!(parcel_array(&json!({"content": []})).len(), 0);
        assert_eq!(parcel_array(&json!({"unrelated": 1})).len(), 0);
        assert_eq!(parcel_array(&json!("not json at all")).len(), 0);
    }
}
