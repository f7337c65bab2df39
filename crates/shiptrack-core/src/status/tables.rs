//! Per-courier exact-match status tables
//!
//! These vocabularies are externally defined by the courier APIs and are
//! reproduced verbatim; they cannot be derived from rules. New codes that
//! appear upstream simply miss here and fall through to the heuristics in
//! the parent module, so an out-of-date table degrades instead of breaking.

use super::CanonicalStatus;
use crate::courier::Courier;

/// Look up an uppercased raw status in the courier's exact table
pub(crate) fn exact_match(courier: Courier, code: &str) -> Option<CanonicalStatus> {
    match courier {
        Courier::Inpost => inpost(code),
        Courier::Dpd => dpd(code),
        Courier::Dhl => dhl(code),
        Courier::Pocztex => pocztex(code),
    }
}

fn inpost(code: &str) -> Option<CanonicalStatus> {
    use CanonicalStatus::*;
    Some(match code {
        "CREATED" => Created,
        "CONFIRMED" => Created,
        "OFFER_SELECTED" => Created,
        "OFFERS_PREPARED" => Created,
        "DISPATCHED_BY_SENDER" => InTransport,
        "DISPATCHED_BY_SENDER_TO_POK" => InTransport,
        "TAKEN_BY_COURIER" => InTransport,
        "TAKEN_BY_COURIER_FROM_POK" => InTransport,
        "COLLECTED_FROM_SENDER" => InTransport,
        "ADOPTED_AT_SOURCE_BRANCH" => InTransport,
        "ADOPTED_AT_SORTING_CENTER" => InTransport,
        "SENT_FROM_SOURCE_BRANCH" => InTransport,
        "SENT_FROM_SORTING_CENTER" => InTransport,
        "ADOPTED_AT_TARGET_BRANCH" => InTransport,
        "READDRESSED" => InTransport,
        "REDIRECT_TO_BOX" => InTransport,
        "PERMANENTLY_REDIRECTED_TO_BOX_MACHINE" => InTransport,
        "PERMANENTLY_REDIRECTED_TO_CUSTOMER_SERVICE_POINT" => InTransport,
        "UNSTACK_FROM_BOX_MACHINE" => InTransport,
        "AVIZO" => InTransport,
        "OUT_FOR_DELIVERY" => HandedOutForDelivery,
        "OUT_FOR_DELIVERY_TO_ADDRESS" => HandedOutForDelivery,
        "UNSTACK_FROM_CUSTOMER_SERVICE_POINT" => HandedOutForDelivery,
        "PICKUP_REMINDER_SENT_ADDRESS" => HandedOutForDelivery,
        "READY_TO_PICKUP" => WaitingForPickup,
        "READY_FOR_COLLECTION" => WaitingForPickup,
        "READY_TO_PICKUP_FROM_BRANCH" => WaitingForPickup,
        "READY_TO_PICKUP_FROM_POK" => WaitingForPickup,
        "READY_TO_PICKUP_FROM_POK_REGISTERED" => WaitingForPickup,
        "PICKUP_REMINDER_SENT" => WaitingForPickup,
        "STACK_IN_BOX_MACHINE" => WaitingForPickup,
        "STACK_IN_CUSTOMER_SERVICE_POINT" => WaitingForPickup,
        "AVIZO_COMPLETED" => WaitingForPickup,
        "DELIVERED" => Delivered,
        "COLLECTED_BY_CUSTOMER" => Delivered,
        "RETURNED_TO_SENDER" => Returned,
        "RETURN_PICKUP_CONFIRMATION_TO_SENDER" => Returned,
        "NOT_COLLECTED" => Returned,
        "PICKUP_TIME_EXPIRED" => Returned,
        "STACK_PARCEL_PICKUP_TIME_EXPIRED" => Returned,
        "STACK_PARCEL_IN_BOX_MACHINE_PICKUP_TIME_EXPIRED" => Returned,
        "CANCELED" => Cancelled,
        "CANCELLED" => Cancelled,
        "CANCELED_REDIRECT_TO_BOX" => Cancelled,
        "DELAY_IN_DELIVERY" => Exception,
        "DELIVERY_ATTEMPT_FAILED" => Exception,
        "UNDELIVERED" => Exception,
        "UNDELIVERED_COD_CASH_RECEIVER" => Exception,
        "UNDELIVERED_INCOMPLETE_ADDRESS" => Exception,
        "UNDELIVERED_LACK_OF_ACCESS_LETTERBOX" => Exception,
        "UNDELIVERED_NO_MAILBOX" => Exception,
        "UNDELIVERED_NOT_LIVE_ADDRESS" => Exception,
        "UNDELIVERED_UNKNOWN_RECEIVER" => Exception,
        "UNDELIVERED_WRONG_ADDRESS" => Exception,
        "REJECTED_BY_RECEIVER" => Exception,
        "MISSING" => Exception,
        "OVERSIZED" => Exception,
        "CLAIMED" => Exception,
        "COD_REJECTED" => Exception,
        "C2X_REJECTED" => Exception,
        "AVIZO_REJECTED" => Exception,
        "COD_COMPLETED" => InTransport,
        "C2X_COMPLETED" => InTransport,
        "OTHER" => Unknown,
        _ => return None,
    })
}

fn dpd(code: &str) -> Option<CanonicalStatus> {
    use CanonicalStatus::*;
    Some(match code {
        "READY_TO_SEND" => Created,
        "RECEIVED_FROM_SENDER" => InTransport,
        "SENT" => InTransport,
        "IN_TRANSPORT" => InTransport,
        "RECEIVED_IN_DEPOT" => InTransport,
        "REDIRECTED" => InTransport,
        "RESCHEDULED" => InTransport,
        "HANDED_OVER_FOR_DELIVERY" => HandedOutForDelivery,
        "READY_TO_PICK_UP" => WaitingForPickup,
        "SELF_PICKUP" => WaitingForPickup,
        "HARD_RESERVED" => WaitingForPickup,
        "DELIVERED" => Delivered,
        "PICKED_UP" => Delivered,
        "RETURNED_TO_SENDER" => Returned,
        "EXPIRED_PICKUP" => Returned,
        "UNSUCCESSFUL_DELIVERY" => Exception,
        _ => return None,
    })
}

// Legacy TT_* codes first, then the newer plain-English tokens the mobile
// API started returning alongside them.
fn dhl(code: &str) -> Option<CanonicalStatus> {
    use CanonicalStatus::*;
    Some(match code {
        "TT_MAG" => InTransport,
        "TT_EDWP" => InTransport,
        "TT_DWP_PUNKT" => HandedOutForDelivery,
        "TT_DWP_INT" => HandedOutForDelivery,
        "TT_DWP" => HandedOutForDelivery,
        "TT_MAG_INT" => InTransport,
        "TT_LK" => WaitingForPickup,
        "TT_AWI" => WaitingForPickup,
        "TT_OP" => Delivered,
        "TT_DELAY_KUR" => Exception,
        "TT_DELAY_MAG" => Exception,
        "TT_OWL" => Exception,
        "TT_DOR" => Delivered,
        "TT_CS" => InTransport,
        "TT_ZWN" => Returned,
        "TT_ZGN" => Exception,
        "TT_LIK" => Exception,
        "TT_DOR_ZWN" => Returned,
        "SP_DSP" => InTransport,
        "TT_PRZEKIERUJ" => InTransport,
        "SP_CN" => Cancelled,
        "ERR" => Exception,
        "NONE" => Created,
        "SHIPMENTINPREPARATION" => Created,
        "INPREPARATION" => Created,
        "WAITINGFORCOURIERPICKUP" => Created,
        "ALLSTATUSES" => InTransport,
        "INDELIVERY" => HandedOutForDelivery,
        "ONTHEROAD" => InTransport,
        "POSTED" => InTransport,
        "SENT" => InTransport,
        "POSTEDATPOINT" => InTransport,
        "PICKEDUPBYCOURIER" => InTransport,
        "ROUTE" => InTransport,
        "REDIRECTED" => InTransport,
        "REDIRECTEDTOPOINT" => InTransport,
        "DELIVERY" => HandedOutForDelivery,
        "FOR_DELIVERY" => HandedOutForDelivery,
        "DELIVERYTOPOINT" => HandedOutForDelivery,
        "DELIVERYTOLOCKER" => HandedOutForDelivery,
        "READY" => WaitingForPickup,
        "DELIVEREDTOPOINT" => WaitingForPickup,
        "DELIVEREDTOLOCKER" => WaitingForPickup,
        "DELIVEREDTOPARCELLOCKER" => WaitingForPickup,
        "DELIVEREDTOPICKUPPOINT" => WaitingForPickup,
        "RETRIEVEDFROMPOINT" => Delivered,
        "RETRIEVEDFROMLOCKER" => Delivered,
        "DELIVERED" => Delivered,
        "DELIVEREDTOSENDER" => Returned,
        "RETURNTOSENDER" => Returned,
        "ROUTETOSENDER" => Returned,
        "PARCELRETURNSTOSENDER" => Returned,
        "PARCELRETURNEDTOSENDER" => Returned,
        "RETURN" => Returned,
        "RESIGNED" => Cancelled,
        "RESIGNATED" => Cancelled,
        "ERROR" => Exception,
        "DELIVERYDELAY" => Exception,
        "DELIVERYPROBLEM" => Exception,
        "UNSUCCESSFULATTEMPTATDELIVERY" => Exception,
        "SECONDUNSUCCESSFULATTEMPTATDELIVERY" => Exception,
        "REFUSAL" => Exception,
        "LOST" => Exception,
        "DISPOSED" => Exception,
        _ => return None,
    })
}

fn pocztex(code: &str) -> Option<CanonicalStatus> {
    use CanonicalStatus::*;
    Some(match code {
        "PRZYGOTOWANA" => Created,
        "NADANA" => InTransport,
        "W TRANSPORCIE" => InTransport,
        "W DORĘCZENIU" => HandedOutForDelivery,
        "W DORECZENIU" => HandedOutForDelivery,
        "AWIZOWANA" => WaitingForPickup,
        "P_KWD" => WaitingForPickup,
        "ODEBRANA W PUNKCIE" => Delivered,
        "P_OWU" => Delivered,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use CanonicalStatus::*;

    fn assert_table(courier: Courier, expected: &[(&str, CanonicalStatus)]) {
        for (code, status) in expected {
            assert_eq!(
                exact_match(courier, code),
                Some(*status),
                "{} code {} should map to {:?}",
                courier,
                code,
                status
            );
        }
    }

    #[test]
    fn inpost_table_spot_checks() {
        assert_table(
            Courier::Inpost,
            &[
                ("CREATED", Created),
                ("AVIZO", InTransport),
                ("OUT_FOR_DELIVERY", HandedOutForDelivery),
                ("STACK_IN_BOX_MACHINE", WaitingForPickup),
                ("COLLECTED_BY_CUSTOMER", Delivered),
                ("STACK_PARCEL_IN_BOX_MACHINE_PICKUP_TIME_EXPIRED", Returned),
                ("CANCELED_REDIRECT_TO_BOX", Cancelled),
                ("UNDELIVERED_LACK_OF_ACCESS_LETTERBOX", Exception),
                ("MISSING", Exception),
                ("COD_COMPLETED", InTransport),
                ("OTHER", Unknown),
            ],
        );
    }

    #[test]
    fn dpd_table_is_complete() {
        assert_table(
            Courier::Dpd,
            &[
                ("READY_TO_SEND", Created),
                ("RECEIVED_FROM_SENDER", InTransport),
                ("SENT", InTransport),
                ("IN_TRANSPORT", InTransport),
                ("RECEIVED_IN_DEPOT", InTransport),
                ("REDIRECTED", InTransport),
                ("RESCHEDULED", InTransport),
                ("HANDED_OVER_FOR_DELIVERY", HandedOutForDelivery),
                ("READY_TO_PICK_UP", WaitingForPickup),
                ("SELF_PICKUP", WaitingForPickup),
                ("HARD_RESERVED", WaitingForPickup),
                ("DELIVERED", Delivered),
                ("PICKED_UP", Delivered),
                ("RETURNED_TO_SENDER", Returned),
                ("EXPIRED_PICKUP", Returned),
                ("UNSUCCESSFUL_DELIVERY", Exception),
            ],
        );
    }

    #[test]
    fn dhl_table_spot_checks() {
        assert_table(
            Courier::Dhl,
            &[
                ("TT_MAG", InTransport),
                ("TT_DWP", HandedOutForDelivery),
                ("TT_LK", WaitingForPickup),
                ("TT_OP", Delivered),
                ("TT_DOR_ZWN", Returned),
                ("SP_CN", Cancelled),
                ("TT_OWL", Exception),
                ("SHIPMENTINPREPARATION", Created),
                ("ONTHEROAD", InTransport),
                ("DELIVERYTOLOCKER", HandedOutForDelivery),
                ("DELIVEREDTOPARCELLOCKER", WaitingForPickup),
                ("RETRIEVEDFROMLOCKER", Delivered),
                ("PARCELRETURNEDTOSENDER", Returned),
                ("RESIGNED", Cancelled),
                ("SECONDUNSUCCESSFULATTEMPTATDELIVERY", Exception),
            ],
        );
    }

    #[test]
    fn dhl_delivered_to_point_is_pickup_not_delivered() {
        // The tabled meaning contradicts the obvious English reading: the
        // parcel sits in a locker until the customer retrieves it.
        assert_eq!(exact_match(Courier::Dhl, "DELIVEREDTOPOINT"), Some(WaitingForPickup));
        assert_eq!(exact_match(Courier::Dhl, "DELIVERED"), Some(Delivered));
    }

    #[test]
    fn pocztex_table_is_complete() {
        assert_table(
            Courier::Pocztex,
            &[
                ("PRZYGOTOWANA", Created),
                ("NADANA", InTransport),
                ("W TRANSPORCIE", InTransport),
                ("W DORĘCZENIU", HandedOutForDelivery),
                ("W DORECZENIU", HandedOutForDelivery),
                ("AWIZOWANA", WaitingForPickup),
                ("P_KWD", WaitingForPickup),
                ("ODEBRANA W PUNKCIE", Delivered),
                ("P_OWU", Delivered),
            ],
        );
    }

    #[test]
    fn codes_do_not_leak_across_couriers() {
        assert_eq!(exact_match(Courier::Dpd, "TT_OP"), None);
        assert_eq!(exact_match(Courier::Inpost, "P_KWD"), None);
        assert_eq!(exact_match(Courier::Pocztex, "READY_TO_SEND"), None);
    }
}
