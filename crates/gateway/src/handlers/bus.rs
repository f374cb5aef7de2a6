//! Next-bus handler: live arrivals reduced to minutes-from-now sentences.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime};
use wf_dialogue::schema::slot;
use wf_dialogue::SlotValue;

use super::{text_slot, HandlerReply, TransitBackend};

/// Look up arrivals for the collected stop and service.
///
/// The stop code wins when both alternation-group members are filled; the
/// resolver never reconciles them and this handler must not assume only
/// one is set.
pub async fn handle_next_bus(
    backend: &dyn TransitBackend,
    slots: &BTreeMap<String, Option<SlotValue>>,
    auth_token: Option<&str>,
    now: NaiveDateTime,
) -> HandlerReply {
    let stop_query = text_slot(slots, slot::BOARDING_BUS_STOP_CODE)
        .or_else(|| text_slot(slots, slot::BOARDING_BUS_STOP_NAME));
    let Some(stop_query) = stop_query else {
        return HandlerReply::message(
            "Please provide a bus stop code or name to check the next bus.",
        );
    };

    let service_no = text_slot(slots, slot::BUS_SERVICE_NUMBER);

    let arrivals_data = match backend.bus_arrivals(stop_query, service_no, auth_token).await {
        Ok(data) => data,
        Err(e) => {
            tracing::warn!(error = %e, stop = %stop_query, "bus arrivals lookup failed");
            return HandlerReply::message(
                "I couldn't fetch arrival data right now. Please try again in a moment.",
            );
        }
    };

    if arrivals_data.is_empty() {
        return HandlerReply::message("No upcoming buses found for the given stop and service.");
    }

    let service_filter = service_no.map(str::to_lowercase);
    let mut arrivals_by_bus = serde_json::Map::new();
    let mut messages = Vec::new();

    for service_info in &arrivals_data {
        let service_name = service_info
            .service_name
            .as_deref()
            .unwrap_or("Unknown service");
        if let Some(ref filter) = service_filter {
            if *filter != service_name.to_lowercase() {
                continue;
            }
        }

        if service_info.arrivals.is_empty() {
            messages.push(format!("No arrival times available for bus {service_name}."));
            continue;
        }

        let minutes_list: Vec<i64> = service_info
            .arrivals
            .iter()
            .take(2)
            .filter_map(|eta_str| parse_eta(eta_str))
            .map(|eta| (eta - now).num_seconds() / 60)
            .filter(|m| *m >= 0)
            .collect();

        if minutes_list.is_empty() {
            continue;
        }

        messages.push(arrival_message(service_name, stop_query, &minutes_list));
        arrivals_by_bus.insert(
            service_name.to_owned(),
            serde_json::json!(minutes_list),
        );
    }

    if messages.is_empty() {
        return HandlerReply::message("No matching bus service arrivals found.");
    }

    HandlerReply {
        messages,
        payload: Some(serde_json::json!({ "arrivals": arrivals_by_bus })),
    }
}

/// Parse an ETA instant; offsets are dropped in favor of wall-clock time.
fn parse_eta(text: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_local());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(dt);
        }
    }
    None
}

fn arrival_message(service_name: &str, stop_name: &str, minutes: &[i64]) -> String {
    let first = minutes[0];
    if first == 0 {
        match minutes.get(1) {
            None => format!("Bus {service_name} is arriving now at {stop_name}."),
            Some(next) => format!(
                "Bus {service_name} is arriving now at {stop_name}. \
                 The next one will arrive in {next} minute{}.",
                plural(*next)
            ),
        }
    } else {
        match minutes.get(1) {
            None => format!(
                "Bus {service_name} will arrive at {stop_name} in {first} minute{}.",
                plural(first)
            ),
            Some(next) => format!(
                "Bus {service_name} will arrive at {stop_name} in {first} minute{} \
                 and again in {next} minute{}.",
                plural(first),
                plural(*next)
            ),
        }
    }
}

fn plural(n: i64) -> &'static str {
    if n > 1 {
        "s"
    } else {
        ""
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arriving_now_single() {
        let msg = arrival_message("96", "17091", &[0]);
        assert_eq!(msg, "Bus 96 is arriving now at 17091.");
    }

    #[test]
    fn arriving_now_with_followup() {
        let msg = arrival_message("96", "17091", &[0, 7]);
        assert!(msg.starts_with("Bus 96 is arriving now at 17091."));
        assert!(msg.contains("in 7 minutes."));
    }

    #[test]
    fn future_single_and_pair() {
        assert_eq!(
            arrival_message("D1", "Opp Clementi Mall", &[1]),
            "Bus D1 will arrive at Opp Clementi Mall in 1 minute."
        );
        let msg = arrival_message("D1", "Opp Clementi Mall", &[4, 12]);
        assert!(msg.contains("in 4 minutes"));
        assert!(msg.contains("again in 12 minutes"));
    }

    #[test]
    fn eta_parses_with_and_without_offset() {
        assert!(parse_eta("2025-03-14T12:34:00+08:00").is_some());
        assert!(parse_eta("2025-03-14T12:34:00").is_some());
        assert!(parse_eta("soonish").is_none());
    }
}
