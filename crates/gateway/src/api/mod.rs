pub mod auth;
pub mod chat;
pub mod readiness;
pub mod sessions;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

/// Build the full API router.
///
/// Routes are split into **public** (no auth required) and **protected**
/// (gated behind the `WF_API_TOKEN` bearer-token middleware).
///
/// `state` is needed to wire up the auth middleware at build time.
pub fn router(state: AppState) -> Router<AppState> {
    let public = Router::new()
        // Readiness (used by health probes)
        .route("/v1/readiness", get(readiness::readiness));

    let protected = Router::new()
        // Chat (the dialogue engine's single entry point)
        .route("/v1/chat", post(chat::chat))
        // Context introspection
        .route("/v1/sessions", get(sessions::list_sessions))
        .route("/v1/sessions/:user_id", get(sessions::get_session))
        .route("/v1/sessions/:user_id/reset", post(sessions::reset_session))
        // Apply API auth middleware to all protected routes.
        .route_layer(middleware::from_fn_with_state(
            state,
            auth::require_api_token,
        ));

    public.merge(protected)
}
