//! Terminal-state classification
//!
//! A parcel is finished once it reaches any terminal state: delivered, but
//! also returned or cancelled, since none of those need further tracking.

use crate::courier::Courier;
use crate::extract::raw_status;
use crate::status::normalize;
use serde_json::Value;

/// Whether this record's normalized status is terminal
///
/// Unknown and exception statuses count as NOT finished, so parcels with
/// unrecognized or problematic statuses stay tracked and visible.
pub fn is_finished(record: &Value, courier: Courier) -> bool {
    normalize(raw_status(record, courier).as_deref(), courier).is_terminal()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn delivered_returned_cancelled_are_finished() {
        let delivered = json!({"shipmentNumber": "A", "status": "DELIVERED"});
        let returned = json!({"shipmentNumber": "B", "status": "RETURNED_TO_SENDER"});
        let cancelled = json!({"shipmentNumber": "C", "status": "CANCELED"});
        assert!(is_finished(&delivered, Courier::Inpost));
        assert!(is_finished(&returned, Courier::Inpost));
        assert!(is_finished(&cancelled, Courier::Inpost));
    }

    #[test]
    fn active_and_unknown_are_not_finished() {
        let in_transport = json!({"waybill": "W", "main_status": {"status": "IN_TRANSPORT"}});
        assert!(!is_finished(&in_transport, Courier::Dpd));

        let unknown = json!({"shipmentNumber": "A", "status": "SOME_FUTURE_CODE"});
        assert!(!is_finished(&unknown, Courier::Inpost));

        let missing_status = json!({"shipmentNumber": "A"});
        assert!(!is_finished(&missing_status, Courier::Inpost));
    }

    #[test]
    fn exception_keeps_parcel_tracked() {
        let failed = json!({"shipmentNumber": "A", "status": "DELIVERY_ATTEMPT_FAILED"});
        assert!(!is_finished(&failed, Courier::Inpost));
    }

    #[test]
    fn dhl_locker_drop_is_not_finished() {
        // DELIVEREDTOLOCKER means waiting for pickup, not delivered.
        let record = json!({"shipmentNumber": "D", "status": "DELIVEREDTOLOCKER"});
        assert!(!is_finished(&record, Courier::Dhl));

        let retrieved = json!({"shipmentNumber": "D", "status": "RETRIEVEDFROMLOCKER"});
        assert!(is_finished(&retrieved, Courier::Dhl));
    }
}
