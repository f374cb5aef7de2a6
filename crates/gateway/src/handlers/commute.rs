//! Schedule-commute handler: resolve saved locations and create a plan.

use std::collections::BTreeMap;

use wf_dialogue::schema::slot;
use wf_dialogue::SlotValue;

use super::{text_slot, CommutePlanRequest, HandlerReply, TransitBackend};

const DEFAULT_PLAN_NAME: &str = "My Commute Plan";

/// Create a commute plan from the collected slots.
///
/// Start and end must match the caller's saved locations by name; the
/// backend works with location ids, not free-form text.
pub async fn handle_schedule_commute(
    backend: &dyn TransitBackend,
    slots: &BTreeMap<String, Option<SlotValue>>,
    auth_token: Option<&str>,
) -> HandlerReply {
    let notify_at = slots
        .get(slot::NOTIFICATION_START_TIME)
        .and_then(|v| v.as_ref())
        .and_then(|v| v.as_time())
        .map(|t| t.format("%H:%M").to_string());

    let location_map = match backend.saved_locations(auth_token).await {
        Ok(map) => map,
        Err(e) => {
            tracing::warn!(error = %e, "saved locations lookup failed");
            return HandlerReply::message(
                "I couldn't load your saved locations right now. Please try again in a moment.",
            );
        }
    };

    let start_name = text_slot(slots, slot::START_LOCATION);
    let end_name = text_slot(slots, slot::END_LOCATION);

    let start_location_id = start_name.and_then(|n| location_map.get(n).copied());
    let end_location_id = end_name.and_then(|n| location_map.get(n).copied());

    let (Some(start_location_id), Some(end_location_id)) = (start_location_id, end_location_id)
    else {
        return HandlerReply::message(
            "Invalid start or end location. Please choose from your saved locations.",
        );
    };

    let plan_name = text_slot(slots, slot::COMMUTE_PLAN_NAME)
        .unwrap_or(DEFAULT_PLAN_NAME)
        .to_owned();
    let recurrence_days: Vec<String> = slots
        .get(slot::RECURRENCE_DAYS)
        .and_then(|v| v.as_ref())
        .and_then(|v| v.as_list())
        .map(|days| days.to_vec())
        .unwrap_or_default();

    let request = CommutePlanRequest {
        commute_plan_name: plan_name,
        notify_at,
        start_location_id,
        end_location_id,
        recurrence: !recurrence_days.is_empty(),
        commute_recurrence_day_ids: recurrence_days,
    };

    match backend.create_commute_plan(&request, auth_token).await {
        Ok(plan) => {
            let name = plan
                .commute_plan_name
                .as_deref()
                .unwrap_or(&request.commute_plan_name);
            let message = match &plan.notify_at {
                Some(time) => format!(
                    "Commute plan '{name}' is set. I'll start notifying you at {time}."
                ),
                None => format!("Commute plan '{name}' is set."),
            };
            HandlerReply {
                messages: vec![message],
                payload: Some(serde_json::json!({
                    "creationSuccess": true,
                    "commutePlan": plan,
                })),
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "commute plan creation failed");
            HandlerReply::message(
                "I couldn't create the commute plan right now. Please try again in a moment.",
            )
        }
    }
}
