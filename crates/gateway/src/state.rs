use std::sync::Arc;

use wf_dialogue::ContextStore;
use wf_domain::config::Config;
use wf_providers::{IntentClassifier, ProviderRegistry};

use crate::handlers::TransitBackend;
use crate::runtime::session_lock::SessionLockMap;

/// Shared application state passed to all API handlers.
///
/// Fields are grouped by concern:
/// - **Core services** — config, LLM providers, intent classifier
/// - **Dialogue** — the per-user context store and turn serialization locks
/// - **Backend** — the transit backend client
/// - **Security** — the startup-computed API token hash
#[derive(Clone)]
pub struct AppState {
    // ── Core services ─────────────────────────────────────────────────
    pub config: Arc<Config>,
    pub llm: Arc<ProviderRegistry>,
    /// `None` when no provider could serve embeddings at startup; intent
    /// switching then never triggers and every turn falls back to help.
    pub classifier: Option<Arc<IntentClassifier>>,

    // ── Dialogue ──────────────────────────────────────────────────────
    pub contexts: Arc<ContextStore>,
    pub session_locks: Arc<SessionLockMap>,
    /// Deployment timezone, parsed once from `config.dialogue.timezone`.
    pub timezone: chrono_tz::Tz,

    // ── Backend ───────────────────────────────────────────────────────
    pub backend: Arc<dyn TransitBackend>,

    // ── Security (startup-computed) ───────────────────────────────────
    /// SHA-256 hash of the API bearer token (read once at startup).
    /// `None` = dev mode (no auth enforced).
    pub api_token_hash: Option<Vec<u8>>,
}

impl AppState {
    /// The current instant in the deployment timezone, without offset.
    /// Anchors bare times of day and future-time validation.
    pub fn local_now(&self) -> chrono::NaiveDateTime {
        chrono::Utc::now().with_timezone(&self.timezone).naive_local()
    }
}
