//! API authentication middleware and user-identity binding.
//!
//! Reads the env var named by `config.server.api_token_env` (default
//! `WF_API_TOKEN`) **once at startup** and caches the SHA-256 digest in
//! `AppState`.
//! - If the env var is set and non-empty, every protected request must carry
//!   `Authorization: Bearer <token>`.
//! - If the env var is unset, the server logs a warning once and allows
//!   unauthenticated access (dev mode).
//!
//! The conversation identity is bound before any context lookup: the
//! `X-User-Id` header when present, otherwise a digest-derived identity
//! from the presented token.  Requests with neither are rejected.

use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::state::AppState;

/// The authenticated identity a request acts as.  Inserted into request
/// extensions by [`require_api_token`].
#[derive(Debug, Clone)]
pub struct UserIdentity(pub String);

/// The raw `Authorization` header value, passed through to backend
/// handlers verbatim.
#[derive(Debug, Clone)]
pub struct AuthToken(pub Option<String>);

fn unauthorized(message: &str) -> Response {
    (
        axum::http::StatusCode::UNAUTHORIZED,
        axum::Json(serde_json::json!({ "type": "error", "message": message })),
    )
        .into_response()
}

/// Axum middleware that enforces bearer-token authentication on protected
/// routes and binds the user identity. Attach via
/// `axum::middleware::from_fn_with_state`.
pub async fn require_api_token(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let raw_auth = req
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let bearer = raw_auth
        .as_deref()
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or("");

    let header_identity = req
        .headers()
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned);

    let identity = match &state.api_token_hash {
        Some(expected_hash) => {
            // Hash the provided token to a fixed-length digest, then compare
            // in constant time. This avoids leaking the token length.
            let provided_hash = Sha256::digest(bearer.as_bytes());
            if !bool::from(provided_hash.ct_eq(expected_hash.as_slice())) {
                return unauthorized("invalid or missing API token");
            }
            // Header wins when the caller names a user; otherwise the
            // credential itself is the identity.
            header_identity.unwrap_or_else(|| {
                let digest = Sha256::digest(bearer.as_bytes());
                format!("token:{:016x}", u64::from_be_bytes(digest[..8].try_into().unwrap_or_default()))
            })
        }
        // Dev mode: no token is enforced, but the caller must still say
        // who they are — the context store is keyed by identity.
        None => match header_identity {
            Some(id) => id,
            None => return unauthorized("missing X-User-Id header"),
        },
    };

    req.extensions_mut().insert(UserIdentity(identity));
    req.extensions_mut().insert(AuthToken(raw_auth));

    next.run(req).await
}
