//! Route-info handler: geocode both endpoints, fetch suggested routes,
//! and summarize them leg by leg.

use std::collections::BTreeMap;

use wf_dialogue::schema::slot;
use wf_dialogue::{Coordinates, SlotValue};
use wf_domain::error::Error;

use super::{text_slot, HandlerReply, SuggestedRoute, TransitBackend};

/// A location name equal to this resolves to the request's reported
/// position instead of the geocoder.
const CURRENT_LOCATION: &str = "current location";

pub async fn handle_route_info(
    backend: &dyn TransitBackend,
    slots: &BTreeMap<String, Option<SlotValue>>,
    current_location: Option<Coordinates>,
    auth_token: Option<&str>,
) -> HandlerReply {
    let start_name = text_slot(slots, slot::START_LOCATION);
    let end_name = text_slot(slots, slot::END_LOCATION);
    let (Some(start_name), Some(end_name)) = (start_name, end_name) else {
        return HandlerReply::message("Please provide both start and end location names.");
    };

    // Both endpoints resolve independently; fan out.
    let (start, end) = futures_util::join!(
        resolve_location(backend, start_name, current_location, auth_token),
        resolve_location(backend, end_name, current_location, auth_token),
    );

    let (start, end) = match (start, end) {
        (Ok(s), Ok(e)) => (s, e),
        (start, end) => {
            let messages: Vec<String> =
                [start.err(), end.err()].into_iter().flatten().collect();
            return HandlerReply {
                messages,
                payload: None,
            };
        }
    };

    let routes = match backend.routes(start.coords, end.coords, auth_token).await {
        Ok(routes) => routes,
        Err(e) => {
            tracing::warn!(error = %e, "routing lookup failed");
            return HandlerReply::message(
                "I couldn't fetch routes right now. Please try again in a moment.",
            );
        }
    };

    if routes.is_empty() {
        return HandlerReply::message("No routes found between the specified locations.");
    }

    let messages: Vec<String> = routes
        .iter()
        .enumerate()
        .map(|(idx, route)| describe_route(idx + 1, route))
        .collect();

    let payload = serde_json::json!({
        "startLocation": start.display_name,
        "endLocation": end.display_name,
        "suggestedRoutes": routes,
    });

    HandlerReply {
        messages,
        payload: Some(payload),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Location resolution
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

struct ResolvedLocation {
    coords: Coordinates,
    display_name: String,
}

/// Resolve a location name to coordinates.  The error branch carries the
/// user-facing explanation, not a technical one.
async fn resolve_location(
    backend: &dyn TransitBackend,
    name: &str,
    current_location: Option<Coordinates>,
    auth_token: Option<&str>,
) -> Result<ResolvedLocation, String> {
    if name.eq_ignore_ascii_case(CURRENT_LOCATION) {
        return match current_location {
            Some(coords) => Ok(ResolvedLocation {
                coords,
                display_name: "Current Location".into(),
            }),
            None => Err("Current location not available.".into()),
        };
    }

    let hits = match backend.geocode(name, auth_token).await {
        Ok(hits) => hits,
        Err(Error::Timeout(_)) => {
            return Err(format!(
                "Unable to reach the location service in time for '{name}'. Please try again."
            ));
        }
        Err(e) => {
            tracing::warn!(error = %e, location = %name, "geocode failed");
            return Err(format!("Unable to contact the location service for '{name}'."));
        }
    };

    match hits.into_iter().next() {
        Some(hit) => Ok(ResolvedLocation {
            coords: Coordinates {
                latitude: hit.latitude,
                longitude: hit.longitude,
            },
            display_name: hit.display_name.unwrap_or_else(|| name.to_owned()),
        }),
        None => Err(format!("No matching location found for '{name}'.")),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Formatting
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn describe_route(idx: usize, route: &SuggestedRoute) -> String {
    let leg_descriptions: Vec<String> = route
        .legs
        .iter()
        .map(|leg| {
            let dur = leg.duration_in_minutes;
            match (leg.leg_type.as_str(), &leg.bus_service_number) {
                ("BUS", Some(bus_no)) => format!("Take bus {bus_no} for {dur} minutes"),
                ("WALK", _) => format!("Walk for {dur} minutes"),
                (leg_type, _) => leg
                    .instruction
                    .clone()
                    .filter(|i| !i.is_empty())
                    .unwrap_or_else(|| format!("{leg_type} for {dur} minutes")),
            }
        })
        .collect();

    format!(
        "Route {idx}: {}. Total duration {} minutes. Details: {}.",
        route.summary,
        route.duration_in_minutes,
        leg_descriptions.join("; then ")
    )
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::RouteLeg;

    fn leg(leg_type: &str, dur: i64, bus: Option<&str>, instr: Option<&str>) -> RouteLeg {
        RouteLeg {
            leg_type: leg_type.into(),
            duration_in_minutes: dur,
            bus_service_number: bus.map(Into::into),
            instruction: instr.map(Into::into),
        }
    }

    #[test]
    fn bus_and_walk_legs_format() {
        let route = SuggestedRoute {
            duration_in_minutes: 25,
            summary: "Bus 96 via Commonwealth Ave".into(),
            legs: vec![
                leg("WALK", 5, None, None),
                leg("BUS", 18, Some("96"), None),
                leg("WALK", 2, None, None),
            ],
        };
        let msg = describe_route(1, &route);
        assert_eq!(
            msg,
            "Route 1: Bus 96 via Commonwealth Ave. Total duration 25 minutes. \
             Details: Walk for 5 minutes; then Take bus 96 for 18 minutes; then \
             Walk for 2 minutes."
        );
    }

    #[test]
    fn unknown_leg_prefers_instruction() {
        let route = SuggestedRoute {
            duration_in_minutes: 40,
            summary: "Train".into(),
            legs: vec![leg("SUBWAY", 30, None, Some("Take the East-West line"))],
        };
        let msg = describe_route(2, &route);
        assert!(msg.contains("Take the East-West line"));
    }

    #[test]
    fn unknown_leg_without_instruction_falls_back() {
        let route = SuggestedRoute {
            duration_in_minutes: 12,
            summary: "Ferry".into(),
            legs: vec![leg("FERRY", 12, None, None)],
        };
        let msg = describe_route(1, &route);
        assert!(msg.contains("FERRY for 12 minutes"));
    }
}
