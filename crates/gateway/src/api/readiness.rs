//! Readiness probe — public, used by health checks and operators.

use axum::extract::State;
use axum::response::{IntoResponse, Json};

use crate::state::AppState;

/// `GET /v1/readiness`
///
/// Reports which providers initialized (and why the rest did not), whether
/// the intent classifier is loaded, and how many contexts are live.
pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let init_errors: Vec<serde_json::Value> = state
        .llm
        .init_errors()
        .iter()
        .map(|e| {
            serde_json::json!({
                "provider_id": e.provider_id,
                "error": e.error,
            })
        })
        .collect();

    Json(serde_json::json!({
        "providers": state.llm.provider_ids(),
        "init_errors": init_errors,
        "classifier_ready": state.classifier.is_some(),
        "active_contexts": state.contexts.len(),
    }))
}
