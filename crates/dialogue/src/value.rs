//! Typed slot values and the conversion from raw extracted JSON.
//!
//! Conversion failure is signalled by `None`, never by an error: a slot is
//! either known-and-valid or unknown, and callers treat a rejected value
//! exactly like one that was never provided.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::schema::{self, SlotType};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// SlotValue
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A converted, typed slot value.  Absence of a value is represented by
/// `None` in the slot map — never by an empty string or empty list here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SlotValue {
    Time(NaiveDateTime),
    List(Vec<String>),
    Text(String),
}

impl SlotValue {
    /// Whether this value is semantically empty.  An empty value does not
    /// satisfy a slot requirement even though the map entry is `Some`.
    pub fn is_empty(&self) -> bool {
        match self {
            SlotValue::Text(t) => t.is_empty(),
            SlotValue::List(l) => l.is_empty(),
            SlotValue::Time(_) => false,
        }
    }

    /// The text content, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            SlotValue::Text(t) => Some(t.as_str()),
            _ => None,
        }
    }

    /// The time content, if this is a time value.
    pub fn as_time(&self) -> Option<NaiveDateTime> {
        match self {
            SlotValue::Time(t) => Some(*t),
            _ => None,
        }
    }

    /// The list content, if this is a list value.
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            SlotValue::List(l) => Some(l.as_slice()),
            _ => None,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Conversion
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Convert a raw extracted value into the slot's declared type.
///
/// `today` anchors bare times of day ("8:30") to a calendar date; it is the
/// current date in the deployment timezone.
///
/// Returns `None` when the slot name is unknown or the value does not fit
/// the declared type.
pub fn convert_slot_value(name: &str, raw: &Value, today: NaiveDate) -> Option<SlotValue> {
    match schema::slot_type(name)? {
        SlotType::String => convert_text(raw),
        SlotType::TimeOfDay => convert_time(raw, today),
        SlotType::ListOfStrings => Some(convert_list(raw)),
    }
}

/// Any non-null scalar stringifies; structured values render as JSON.
fn convert_text(raw: &Value) -> Option<SlotValue> {
    let text = match raw {
        Value::Null => return None,
        Value::String(s) => s.trim().to_owned(),
        other => other.to_string(),
    };
    Some(SlotValue::Text(text))
}

/// Accepted time shapes, tried in order: ISO-8601 date-times (with or
/// without an offset), then bare times of day combined with `today`.
fn convert_time(raw: &Value, today: NaiveDate) -> Option<SlotValue> {
    let text = raw.as_str()?.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(SlotValue::Time(dt.naive_local()));
    }

    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(SlotValue::Time(dt));
        }
    }

    const TIME_FORMATS: &[&str] = &["%H:%M", "%I:%M %p", "%I %p"];
    for fmt in TIME_FORMATS {
        if let Ok(t) = NaiveTime::parse_from_str(text, fmt) {
            return Some(SlotValue::Time(today.and_time(t)));
        }
    }

    None
}

/// Native lists keep their elements; comma-separated strings are split.
/// Elements are trimmed, lowercased, and empties dropped.  Anything else
/// becomes an empty list (which no requirement accepts as filled).
fn convert_list(raw: &Value) -> SlotValue {
    let items: Vec<String> = match raw {
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect(),
        Value::String(s) => s
            .split(',')
            .map(|part| part.trim().to_lowercase())
            .filter(|part| !part.is_empty())
            .collect(),
        _ => Vec::new(),
    };
    SlotValue::List(items)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Future-time validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// `true` iff a time value lies strictly after `now`.  Non-temporal values
/// are vacuously valid.
pub fn is_valid_future(value: &SlotValue, now: NaiveDateTime) -> bool {
    match value {
        SlotValue::Time(t) => *t > now,
        _ => true,
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::slot;
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()
    }

    #[test]
    fn text_trims_and_stringifies() {
        let v = convert_slot_value(slot::START_LOCATION, &json!("  Clementi Mall "), today());
        assert_eq!(v, Some(SlotValue::Text("Clementi Mall".into())));

        let v = convert_slot_value(slot::BUS_SERVICE_NUMBER, &json!(96), today());
        assert_eq!(v, Some(SlotValue::Text("96".into())));
    }

    #[test]
    fn text_rejects_null() {
        assert_eq!(
            convert_slot_value(slot::START_LOCATION, &Value::Null, today()),
            None
        );
    }

    #[test]
    fn bare_time_combines_with_today() {
        let v = convert_slot_value(slot::NOTIFICATION_START_TIME, &json!("08:30"), today());
        let expected = today().and_time(NaiveTime::from_hms_opt(8, 30, 0).unwrap());
        assert_eq!(v, Some(SlotValue::Time(expected)));
    }

    #[test]
    fn twelve_hour_times_parse() {
        let v = convert_slot_value(slot::ARRIVAL_TIME, &json!("9:15 PM"), today());
        let expected = today().and_time(NaiveTime::from_hms_opt(21, 15, 0).unwrap());
        assert_eq!(v, Some(SlotValue::Time(expected)));

        let v = convert_slot_value(slot::ARRIVAL_TIME, &json!("7 am"), today());
        let expected = today().and_time(NaiveTime::from_hms_opt(7, 0, 0).unwrap());
        assert_eq!(v, Some(SlotValue::Time(expected)));
    }

    #[test]
    fn iso_datetime_parses() {
        let v = convert_slot_value(
            slot::ARRIVAL_TIME,
            &json!("2025-03-14T18:45:00"),
            today(),
        );
        let expected = today().and_time(NaiveTime::from_hms_opt(18, 45, 0).unwrap());
        assert_eq!(v, Some(SlotValue::Time(expected)));
    }

    #[test]
    fn rfc3339_with_offset_parses() {
        let v = convert_slot_value(
            slot::ARRIVAL_TIME,
            &json!("2025-03-14T18:45:00+08:00"),
            today(),
        );
        assert!(matches!(v, Some(SlotValue::Time(_))));
    }

    #[test]
    fn garbage_time_is_rejected() {
        assert_eq!(
            convert_slot_value(slot::NOTIFICATION_START_TIME, &json!("not-a-time"), today()),
            None
        );
        assert_eq!(
            convert_slot_value(slot::NOTIFICATION_START_TIME, &json!(830), today()),
            None
        );
    }

    #[test]
    fn list_from_native_array() {
        let v = convert_slot_value(
            slot::RECURRENCE_DAYS,
            &json!(["Monday", " Wednesday ", ""]),
            today(),
        );
        assert_eq!(
            v,
            Some(SlotValue::List(vec!["monday".into(), "wednesday".into()]))
        );
    }

    #[test]
    fn list_from_comma_separated_string() {
        let v = convert_slot_value(slot::RECURRENCE_DAYS, &json!("Mon, Tue,,Fri "), today());
        assert_eq!(
            v,
            Some(SlotValue::List(vec![
                "mon".into(),
                "tue".into(),
                "fri".into()
            ]))
        );
    }

    #[test]
    fn list_from_other_shapes_is_empty() {
        let v = convert_slot_value(slot::RECURRENCE_DAYS, &json!(42), today());
        assert_eq!(v, Some(SlotValue::List(vec![])));
        assert!(v.unwrap().is_empty());
    }

    #[test]
    fn unknown_slot_is_rejected() {
        assert_eq!(convert_slot_value("favorite_color", &json!("red"), today()), None);
    }

    #[test]
    fn future_validation_on_times() {
        let now = today().and_time(NaiveTime::from_hms_opt(12, 0, 0).unwrap());
        let past = SlotValue::Time(today().and_time(NaiveTime::from_hms_opt(8, 0, 0).unwrap()));
        let future = SlotValue::Time(today().and_time(NaiveTime::from_hms_opt(18, 0, 0).unwrap()));
        assert!(!is_valid_future(&past, now));
        assert!(is_valid_future(&future, now));
        // The boundary instant is not "in the future".
        assert!(!is_valid_future(&SlotValue::Time(now), now));
    }

    #[test]
    fn future_validation_vacuous_for_non_times() {
        let now = today().and_time(NaiveTime::from_hms_opt(12, 0, 0).unwrap());
        assert!(is_valid_future(&SlotValue::Text("orchard".into()), now));
        assert!(is_valid_future(&SlotValue::List(vec![]), now));
    }
}
