//! Conversation-context introspection endpoints.
//!
//! - `GET  /v1/sessions`              — all active contexts, summarized
//! - `GET  /v1/sessions/:user_id`     — one context in detail
//! - `POST /v1/sessions/:user_id/reset` — wipe a context

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;

use wf_dialogue::ConversationContext;

use crate::state::AppState;

#[derive(Serialize)]
struct SessionSummary {
    user_id: String,
    session_id: String,
    active_intent: Option<String>,
    filled_slots: Vec<String>,
    history_len: usize,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

fn summarize(user_id: &str, ctx: &ConversationContext) -> SessionSummary {
    SessionSummary {
        user_id: user_id.to_owned(),
        session_id: ctx.session_id.clone(),
        active_intent: ctx.active_intent.map(|i| i.to_string()),
        filled_slots: ctx.filled_slots().keys().cloned().collect(),
        history_len: ctx.history.len(),
        created_at: ctx.created_at,
        updated_at: ctx.updated_at,
    }
}

fn not_found(user_id: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({
            "type": "error",
            "message": format!("no conversation context for '{user_id}'"),
        })),
    )
        .into_response()
}

// ── GET /v1/sessions ───────────────────────────────────────────────

pub async fn list_sessions(State(state): State<AppState>) -> impl IntoResponse {
    let mut sessions: Vec<SessionSummary> = state
        .contexts
        .user_ids()
        .into_iter()
        .filter_map(|user_id| {
            state
                .contexts
                .get(&user_id)
                .map(|ctx| summarize(&user_id, &ctx))
        })
        .collect();
    sessions.sort_by(|a, b| a.user_id.cmp(&b.user_id));

    Json(serde_json::json!({
        "sessions": sessions,
        "count": sessions.len(),
    }))
}

// ── GET /v1/sessions/:user_id ──────────────────────────────────────

pub async fn get_session(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Response {
    match state.contexts.get(&user_id) {
        Some(ctx) => Json(serde_json::json!({
            "summary": summarize(&user_id, &ctx),
            "slots": ctx.slots,
            "history": ctx.history,
        }))
        .into_response(),
        None => not_found(&user_id),
    }
}

// ── POST /v1/sessions/:user_id/reset ───────────────────────────────

pub async fn reset_session(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Response {
    if state.contexts.reset(&user_id) {
        Json(serde_json::json!({ "reset": true, "user_id": user_id })).into_response()
    } else {
        not_found(&user_id)
    }
}
