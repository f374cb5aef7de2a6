//! In-place merge of newly extracted slot values into a context's slot map.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde_json::Value;

use crate::schema;
use crate::value::{convert_slot_value, is_valid_future, SlotValue};

/// Merge raw extracted values into `current`, key by key.
///
/// - Absent/null incoming values are skipped: an extractor that did not see
///   a slot never downgrades it to unknown.
/// - A value that fails conversion, or fails future-time validation for the
///   slots that require it, is written back as `None` — explicit
///   invalidation, so the missing-slot resolver re-requests it.
/// - Everything else is assigned.
///
/// `now` is the current instant in the deployment timezone; its date
/// anchors bare times of day.
pub fn merge_slots(
    current: &mut BTreeMap<String, Option<SlotValue>>,
    incoming: &serde_json::Map<String, Value>,
    now: NaiveDateTime,
) {
    for (key, raw) in incoming {
        if raw.is_null() {
            continue;
        }
        if schema::slot_type(key).is_none() {
            tracing::debug!(slot = %key, "extractor produced an unknown slot, ignoring");
            continue;
        }

        match convert_slot_value(key, raw, now.date()) {
            Some(converted) => {
                if schema::is_future_validated(key) && !is_valid_future(&converted, now) {
                    tracing::debug!(slot = %key, "value is not in the future, invalidating");
                    current.insert(key.clone(), None);
                    continue;
                }
                current.insert(key.clone(), Some(converted));
            }
            None => {
                tracing::debug!(slot = %key, "value failed conversion, invalidating");
                current.insert(key.clone(), None);
            }
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::slot;
    use chrono::{NaiveDate, NaiveTime};
    use serde_json::json;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 14)
            .unwrap()
            .and_time(NaiveTime::from_hms_opt(12, 0, 0).unwrap())
    }

    fn empty_slots() -> BTreeMap<String, Option<SlotValue>> {
        crate::schema::known_slots()
            .map(|name| (name.to_owned(), None))
            .collect()
    }

    fn incoming(value: Value) -> serde_json::Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn merge_assigns_converted_values() {
        let mut slots = empty_slots();
        merge_slots(
            &mut slots,
            &incoming(json!({ "start_location": " Bedok ", "bus_service_number": 196 })),
            now(),
        );
        assert_eq!(
            slots[slot::START_LOCATION],
            Some(SlotValue::Text("Bedok".into()))
        );
        assert_eq!(
            slots[slot::BUS_SERVICE_NUMBER],
            Some(SlotValue::Text("196".into()))
        );
    }

    #[test]
    fn merge_skips_null_values() {
        let mut slots = empty_slots();
        slots.insert(
            slot::START_LOCATION.into(),
            Some(SlotValue::Text("Bedok".into())),
        );
        merge_slots(
            &mut slots,
            &incoming(json!({ "start_location": null })),
            now(),
        );
        // A null never downgrades an already-known slot.
        assert_eq!(
            slots[slot::START_LOCATION],
            Some(SlotValue::Text("Bedok".into()))
        );
    }

    #[test]
    fn merge_invalidates_on_conversion_failure() {
        let mut slots = empty_slots();
        slots.insert(
            slot::ARRIVAL_TIME.into(),
            Some(SlotValue::Time(now() + chrono::Duration::hours(2))),
        );
        merge_slots(
            &mut slots,
            &incoming(json!({ "arrival_time": "whenever" })),
            now(),
        );
        assert_eq!(slots[slot::ARRIVAL_TIME], None);
    }

    #[test]
    fn merge_invalidates_past_future_slots() {
        let mut slots = empty_slots();
        merge_slots(
            &mut slots,
            &incoming(json!({ "arrival_time": "08:00" })),
            now(), // noon — 08:00 today is in the past
        );
        assert_eq!(slots[slot::ARRIVAL_TIME], None);
    }

    #[test]
    fn merge_accepts_future_times() {
        let mut slots = empty_slots();
        merge_slots(
            &mut slots,
            &incoming(json!({ "arrival_time": "18:00" })),
            now(),
        );
        assert!(matches!(
            slots[slot::ARRIVAL_TIME],
            Some(SlotValue::Time(_))
        ));
    }

    #[test]
    fn past_time_on_non_future_slot_is_fine() {
        // Only the named future-validated slots get the check; a plain
        // string slot holding "08:00" (e.g. inside a location name) is
        // untouched by it.
        let mut slots = empty_slots();
        merge_slots(
            &mut slots,
            &incoming(json!({ "start_location": "08:00 coffee house" })),
            now(),
        );
        assert!(slots[slot::START_LOCATION].is_some());
    }

    #[test]
    fn merge_is_idempotent_for_valid_values() {
        let update = incoming(json!({
            "start_location": "Bedok",
            "end_location": "Changi Airport",
            "arrival_time": "18:00",
            "recurrence_days": "mon,wed"
        }));

        let mut once = empty_slots();
        merge_slots(&mut once, &update, now());

        let mut twice = once.clone();
        merge_slots(&mut twice, &update, now());

        assert_eq!(once, twice);
    }

    #[test]
    fn merge_ignores_unknown_slots() {
        let mut slots = empty_slots();
        merge_slots(
            &mut slots,
            &incoming(json!({ "favorite_color": "red" })),
            now(),
        );
        assert!(!slots.contains_key("favorite_color"));
    }
}
