//! Cross-module flows: extraction output through merge into the resolver,
//! the way the turn controller drives them.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use wf_dialogue::schema::slot;
use wf_dialogue::{
    extract_json, find_missing_slots, merge_slots, ConversationContext, Intent, SlotValue,
};

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 3, 14)
        .unwrap()
        .and_time(NaiveTime::from_hms_opt(12, 0, 0).unwrap())
}

/// Feed one raw extractor response into a context's slots.
fn apply_extraction(ctx: &mut ConversationContext, raw: &str) {
    let extracted = extract_json(raw).expect("fixture should parse");
    let new_slots = extracted
        .get("slots")
        .and_then(|v| v.as_object())
        .cloned()
        .unwrap_or_default();
    merge_slots(&mut ctx.slots, &new_slots, now());
}

#[test]
fn next_bus_fills_across_two_extractions() {
    let mut ctx = ConversationContext::new();
    ctx.active_intent = Some(Intent::NextBus);

    // First extraction: only the service number, wrapped in model prose.
    apply_extraction(
        &mut ctx,
        "Here you go:\n```json\n{\"slots\": {\"bus_service_number\": \"D1\"}}\n```",
    );

    let missing = find_missing_slots(Intent::NextBus, &ctx.slots);
    assert_eq!(
        missing,
        vec![slot::BOARDING_BUS_STOP_NAME, slot::BOARDING_BUS_STOP_CODE],
        "the whole alternation group is requested at once"
    );

    // Second extraction supplies the stop code (and a truncated brace).
    apply_extraction(&mut ctx, r#"{"slots": {"boarding_bus_stop_code": "17091""#);

    assert!(find_missing_slots(Intent::NextBus, &ctx.slots).is_empty());
    assert_eq!(
        ctx.slots[slot::BOARDING_BUS_STOP_CODE],
        Some(SlotValue::Text("17091".into()))
    );
}

#[test]
fn redundant_group_member_is_kept_not_reconciled() {
    let mut ctx = ConversationContext::new();
    ctx.active_intent = Some(Intent::NextBus);

    apply_extraction(
        &mut ctx,
        r#"{"slots": {"bus_service_number": "96", "boarding_bus_stop_name": "Opp Clementi Mall"}}"#,
    );
    assert!(find_missing_slots(Intent::NextBus, &ctx.slots).is_empty());

    // A later turn supplies the other member of the satisfied group.
    apply_extraction(&mut ctx, r#"{"slots": {"boarding_bus_stop_code": "17091"}}"#);

    // Both members coexist; the resolver still reports the group satisfied.
    assert!(find_missing_slots(Intent::NextBus, &ctx.slots).is_empty());
    assert_eq!(
        ctx.slots[slot::BOARDING_BUS_STOP_NAME],
        Some(SlotValue::Text("Opp Clementi Mall".into()))
    );
    assert_eq!(
        ctx.slots[slot::BOARDING_BUS_STOP_CODE],
        Some(SlotValue::Text("17091".into()))
    );
}

#[test]
fn invalid_time_forces_a_reprompt_cycle() {
    let mut ctx = ConversationContext::new();
    ctx.active_intent = Some(Intent::ScheduleCommute);

    apply_extraction(
        &mut ctx,
        r#"{"slots": {
            "start_location": "home",
            "end_location": "work",
            "notification_start_time": "07:00",
            "arrival_time": "08:30"
        }}"#,
    );

    // Both times are earlier than the fixed "now" (noon), so both were
    // invalidated and are asked for again.
    assert_eq!(
        find_missing_slots(Intent::ScheduleCommute, &ctx.slots),
        vec![slot::NOTIFICATION_START_TIME, slot::ARRIVAL_TIME]
    );

    // The re-prompt answer arrives as explicit future datetimes.
    apply_extraction(
        &mut ctx,
        r#"{"slots": {
            "notification_start_time": "2025-03-14T19:00:00",
            "arrival_time": "2025-03-14T20:30:00"
        }}"#,
    );
    assert!(find_missing_slots(Intent::ScheduleCommute, &ctx.slots).is_empty());
}

#[test]
fn garbage_extraction_never_panics_and_changes_nothing() {
    let mut ctx = ConversationContext::new();
    ctx.active_intent = Some(Intent::RouteInfo);

    for garbage in [
        "I'm sorry, I can't do that.",
        "{{{{",
        "[1, 2, 3]",
        "",
    ] {
        if let Some(extracted) = extract_json(garbage) {
            let new_slots = extracted
                .get("slots")
                .and_then(|v| v.as_object())
                .cloned()
                .unwrap_or_default();
            merge_slots(&mut ctx.slots, &new_slots, now());
        }
    }

    assert!(ctx.slots.values().all(|v| v.is_none()));
    assert_eq!(
        find_missing_slots(Intent::RouteInfo, &ctx.slots),
        vec![slot::START_LOCATION, slot::END_LOCATION]
    );
}
