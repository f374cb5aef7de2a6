//! Defensive extraction of a JSON object from free-form model output.
//!
//! LLM extractors are asked for JSON but routinely wrap it in prose, code
//! fences, or string quoting, and sometimes truncate the closing braces.
//! This module is the single boundary where that brittleness lives: it
//! either recovers one JSON object or returns `None`.  Parse failure is a
//! normal outcome, not an error.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

/// Matches the outermost `{...}` region, across newlines.
fn json_region() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)\{.*\}").expect("static regex"))
}

/// Attempt to pull one JSON object out of `text`.
///
/// Recovery steps, in order:
/// 1. Strip a UTF-8 BOM and surrounding whitespace.
/// 2. If the whole payload is a JSON string literal (the model quoted its
///    own answer), unwrap it once.
/// 3. Take the outermost `{...}` region, ignoring any wrapping prose or
///    code fences.
/// 4. If the region has more `{` than `}`, append the missing closers
///    (truncated output).
/// 5. Parse; anything that still fails, or parses to a non-object, is
///    `None`.
pub fn extract_json(text: &str) -> Option<Value> {
    let trimmed = text.trim_start_matches('\u{feff}').trim();
    if trimmed.is_empty() {
        return None;
    }

    // Unwrap one level of string quoting ("{\"slots\": ...}").
    let unquoted;
    let candidate = if trimmed.starts_with('"') && trimmed.ends_with('"') {
        unquoted = serde_json::from_str::<String>(trimmed).ok()?;
        unquoted.as_str()
    } else {
        trimmed
    };

    let region = json_region().find(candidate)?.as_str();

    let open = region.matches('{').count();
    let close = region.matches('}').count();
    let repaired;
    let to_parse = if open > close {
        repaired = format!("{region}{}", "}".repeat(open - close));
        repaired.as_str()
    } else {
        region
    };

    match serde_json::from_str::<Value>(to_parse) {
        Ok(value) if value.is_object() => Some(value),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!(error = %e, "model output did not contain parseable JSON");
            None
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plain_object_parses() {
        let v = extract_json(r#"{"slots": {"start_location": "Bedok"}}"#).unwrap();
        assert_eq!(v["slots"]["start_location"], json!("Bedok"));
    }

    #[test]
    fn wrapping_prose_is_ignored() {
        let v = extract_json(
            "Sure! Here is the JSON you asked for:\n\
             {\"slots\": {\"bus_service_number\": \"96\"}}\n\
             Let me know if you need anything else.",
        )
        .unwrap();
        assert_eq!(v["slots"]["bus_service_number"], json!("96"));
    }

    #[test]
    fn code_fences_are_ignored() {
        let v = extract_json("```json\n{\"intent\": \"next_bus\", \"slots\": {}}\n```").unwrap();
        assert_eq!(v["intent"], json!("next_bus"));
    }

    #[test]
    fn truncated_braces_are_repaired() {
        let v = extract_json(r#"{"slots": {"end_location": "Changi Airport""#);
        // One missing closer per unbalanced open brace.
        assert_eq!(
            v.unwrap()["slots"]["end_location"],
            json!("Changi Airport")
        );
    }

    #[test]
    fn string_literal_wrapping_is_unwrapped() {
        let v = extract_json(r#""{\"slots\": {\"arrival_time\": \"18:00\"}}""#).unwrap();
        assert_eq!(v["slots"]["arrival_time"], json!("18:00"));
    }

    #[test]
    fn bom_is_stripped() {
        let v = extract_json("\u{feff}{\"slots\": {}}").unwrap();
        assert!(v["slots"].is_object());
    }

    #[test]
    fn nested_objects_survive() {
        let v = extract_json(
            r#"noise {"slots": {"recurrence_days": ["mon", "wed"]}, "intent": "schedule_commute"} noise"#,
        )
        .unwrap();
        assert_eq!(v["slots"]["recurrence_days"], json!(["mon", "wed"]));
    }

    #[test]
    fn no_json_at_all_is_none() {
        assert!(extract_json("I'm sorry, I can't help with that.").is_none());
        assert!(extract_json("").is_none());
        assert!(extract_json("   \n\t ").is_none());
    }

    #[test]
    fn hopeless_garbage_is_none() {
        assert!(extract_json("{{{{ not json at all").is_none());
        assert!(extract_json(r#"{"slots": [unquoted]}"#).is_none());
    }

    #[test]
    fn non_object_json_is_none() {
        assert!(extract_json("[1, 2, 3]").is_none());
        assert!(extract_json("\"just a string\"").is_none());
    }
}
