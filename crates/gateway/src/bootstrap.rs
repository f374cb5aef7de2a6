//! Builds the shared [`AppState`] and spawns background maintenance.

use std::sync::Arc;

use sha2::{Digest, Sha256};

use wf_dialogue::ContextStore;
use wf_domain::config::Config;
use wf_providers::{IntentClassifier, ProviderRegistry};

use crate::handlers::{HttpTransitBackend, TransitBackend};
use crate::runtime::session_lock::SessionLockMap;
use crate::state::AppState;

/// Interval between idle-lock sweeps.
const LOCK_PRUNE_INTERVAL_SECS: u64 = 600;

/// Assemble all services from config.
pub async fn build_app_state(config: Arc<Config>) -> anyhow::Result<AppState> {
    // Config was validated by the caller; the timezone parse is repeated
    // here because AppState needs the parsed value.
    let timezone: chrono_tz::Tz = config
        .dialogue
        .timezone
        .parse()
        .map_err(|_| anyhow::anyhow!("unknown timezone '{}'", config.dialogue.timezone))?;

    let llm = Arc::new(ProviderRegistry::from_config(&config.llm));

    // The classifier needs an embeddings-capable provider at startup.  A
    // failure here is not fatal: the gateway still answers, it just never
    // switches intents and falls back to the capability summary.
    let classifier = match llm.get(&config.classifier.provider) {
        Ok(provider) => {
            match IntentClassifier::initialize(config.classifier.clone(), provider).await {
                Ok(c) => Some(Arc::new(c)),
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        "intent classifier failed to initialize — running without intent detection"
                    );
                    None
                }
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "no provider available for the intent classifier");
            None
        }
    };

    let backend: Arc<dyn TransitBackend> = Arc::new(HttpTransitBackend::new(&config.backend)?);

    let api_token_hash = read_api_token_hash(&config.server.api_token_env);

    Ok(AppState {
        config,
        llm,
        classifier,
        contexts: Arc::new(ContextStore::new()),
        session_locks: Arc::new(SessionLockMap::new()),
        timezone,
        backend,
        api_token_hash,
    })
}

/// Read the API token env var once and hash it.  `None` = dev mode.
fn read_api_token_hash(env_name: &str) -> Option<Vec<u8>> {
    match std::env::var(env_name) {
        Ok(token) if !token.trim().is_empty() => {
            Some(Sha256::digest(token.trim().as_bytes()).to_vec())
        }
        _ => {
            tracing::warn!(
                env = %env_name,
                "no API token configured — running with open access (dev mode)"
            );
            None
        }
    }
}

/// Spawn periodic maintenance loops.
pub fn spawn_background_tasks(state: &AppState) {
    let locks = state.session_locks.clone();
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(std::time::Duration::from_secs(LOCK_PRUNE_INTERVAL_SECS));
        interval.tick().await; // first tick fires immediately, skip it
        loop {
            interval.tick().await;
            locks.prune_idle();
            tracing::debug!(tracked = locks.session_count(), "pruned idle session locks");
        }
    });
}
