//! Transit backend handlers.
//!
//! Each completed intent maps to one handler that calls the transit
//! backend and reduces the response to user-facing sentences plus an
//! optional structured payload.  Handler failures of any kind (timeout,
//! non-2xx, malformed payload, missing data) become short human-readable
//! messages — never errors that escape the turn.

pub mod bus;
pub mod commute;
pub mod http;
pub mod routing;

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use wf_dialogue::{Coordinates, Intent, SlotValue};
use wf_domain::error::Result;

pub use http::HttpTransitBackend;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Wire types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One geocoding match.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeocodeHit {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Live arrivals for one bus service at a stop.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceArrivals {
    #[serde(default)]
    pub service_name: Option<String>,
    /// Estimated arrival instants, ISO-8601.
    #[serde(default)]
    pub arrivals: Vec<String>,
}

/// One leg of a suggested route.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteLeg {
    #[serde(rename = "type", default)]
    pub leg_type: String,
    #[serde(default)]
    pub duration_in_minutes: i64,
    #[serde(default)]
    pub bus_service_number: Option<String>,
    #[serde(default)]
    pub instruction: Option<String>,
}

/// One suggested route between two coordinates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedRoute {
    #[serde(default)]
    pub duration_in_minutes: i64,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub legs: Vec<RouteLeg>,
}

/// Commute plan creation request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommutePlanRequest {
    pub commute_plan_name: String,
    pub notify_at: Option<String>,
    pub start_location_id: i64,
    pub end_location_id: i64,
    pub recurrence: bool,
    pub commute_recurrence_day_ids: Vec<String>,
}

/// A created commute plan, echoed by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommutePlan {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub commute_plan_name: Option<String>,
    #[serde(default)]
    pub notify_at: Option<String>,
    #[serde(default)]
    pub start_location_id: Option<i64>,
    #[serde(default)]
    pub end_location_id: Option<i64>,
    #[serde(default)]
    pub recurrence: bool,
    #[serde(default)]
    pub commute_recurrence_day_ids: Vec<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Backend trait
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The transit backend as the handlers see it.
///
/// `auth_token` is the caller's credential, passed through verbatim.
#[async_trait::async_trait]
pub trait TransitBackend: Send + Sync {
    /// Search for a location by free-form name.
    async fn geocode(&self, location_name: &str, auth_token: Option<&str>)
        -> Result<Vec<GeocodeHit>>;

    /// Compute routes between two coordinate pairs.
    async fn routes(
        &self,
        start: Coordinates,
        end: Coordinates,
        auth_token: Option<&str>,
    ) -> Result<Vec<SuggestedRoute>>;

    /// Live arrivals at a stop, optionally filtered to one service.
    async fn bus_arrivals(
        &self,
        stop_query: &str,
        service_no: Option<&str>,
        auth_token: Option<&str>,
    ) -> Result<Vec<ServiceArrivals>>;

    /// The caller's saved locations, name → id.
    async fn saved_locations(&self, auth_token: Option<&str>) -> Result<HashMap<String, i64>>;

    /// Create a commute plan.
    async fn create_commute_plan(
        &self,
        plan: &CommutePlanRequest,
        auth_token: Option<&str>,
    ) -> Result<CommutePlan>;
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Handler reply
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// What a handler hands back to the turn controller.
#[derive(Debug, Clone)]
pub struct HandlerReply {
    /// Human-readable sentences describing the outcome (including failure
    /// explanations).
    pub messages: Vec<String>,
    /// Structured result for the API response, when there is one.
    pub payload: Option<Value>,
}

impl HandlerReply {
    pub fn message(text: impl Into<String>) -> Self {
        Self {
            messages: vec![text.into()],
            payload: None,
        }
    }

    /// The messages joined into one block, fed to the response generator.
    pub fn summary_text(&self) -> String {
        self.messages.join("\n")
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Dispatch
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Run the handler for a ready-to-execute intent.
///
/// `help` and `reset` never reach this point; they are answered by the
/// turn controller directly.
pub async fn execute_intent(
    backend: &dyn TransitBackend,
    intent: Intent,
    slots: &BTreeMap<String, Option<SlotValue>>,
    current_location: Option<Coordinates>,
    auth_token: Option<&str>,
    now: NaiveDateTime,
) -> HandlerReply {
    match intent {
        Intent::RouteInfo => {
            routing::handle_route_info(backend, slots, current_location, auth_token).await
        }
        Intent::ScheduleCommute => {
            commute::handle_schedule_commute(backend, slots, auth_token).await
        }
        Intent::NextBus => bus::handle_next_bus(backend, slots, auth_token, now).await,
        Intent::Help | Intent::Reset => {
            HandlerReply::message("Nothing to execute for this request.")
        }
    }
}

/// Pull a non-empty text slot out of the map.
pub(crate) fn text_slot<'a>(
    slots: &'a BTreeMap<String, Option<SlotValue>>,
    name: &str,
) -> Option<&'a str> {
    slots
        .get(name)
        .and_then(|v| v.as_ref())
        .and_then(|v| v.as_text())
        .filter(|t| !t.is_empty())
}
