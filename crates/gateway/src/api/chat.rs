//! Chat API endpoint — the single entry point for running dialogue turns.
//!
//! `POST /v1/chat` — one utterance in, one assistant message out.

use std::collections::BTreeMap;

use axum::extract::State;
use axum::response::{IntoResponse, Json};
use axum::Extension;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use wf_dialogue::{Coordinates, Intent, SlotValue};

use crate::runtime::session_lock::SessionBusy;
use crate::runtime::{run_turn, TurnInput};
use crate::state::AppState;

use super::auth::{AuthToken, UserIdentity};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request / response shapes
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatApiRequest {
    /// The user's utterance.
    pub user_input: String,
    /// The client's current position, if it has one.
    #[serde(default)]
    pub current_location: Option<Coordinates>,
}

#[derive(Debug, Serialize)]
pub struct BotResponse {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<Intent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slots: Option<BTreeMap<String, Option<SlotValue>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// POST /v1/chat
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn chat(
    State(state): State<AppState>,
    Extension(UserIdentity(user_id)): Extension<UserIdentity>,
    Extension(AuthToken(auth_token)): Extension<AuthToken>,
    Json(body): Json<ChatApiRequest>,
) -> impl IntoResponse {
    let utterance = body.user_input.trim().to_owned();
    if utterance.is_empty() {
        return (
            axum::http::StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "type": "error",
                "message": "userInput must not be empty",
            })),
        )
            .into_response();
    }

    // Serialize this turn against any other in flight for the same user.
    // The permit is held until the response is built and auto-releases on
    // every exit path.
    let _permit = match state.session_locks.acquire(&user_id).await {
        Ok(p) => p,
        Err(SessionBusy) => {
            return (
                axum::http::StatusCode::TOO_MANY_REQUESTS,
                Json(serde_json::json!({
                    "type": "error",
                    "message": "a turn is already in progress for this user",
                })),
            )
                .into_response();
        }
    };

    let input = TurnInput {
        user_id,
        utterance,
        auth_token,
        current_location: body.current_location,
    };

    let outcome = run_turn(&state, input).await;

    Json(BotResponse {
        kind: "message",
        message: outcome.message,
        intent: outcome.intent,
        slots: outcome.slots,
        data: outcome.data,
    })
    .into_response()
}
