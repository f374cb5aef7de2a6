//! Provider registry: initializes every configured adapter at startup and
//! records the failures so readiness probes can report them.

use std::collections::HashMap;
use std::sync::Arc;

use wf_domain::config::{LlmConfig, ProviderKind};
use wf_domain::error::{Error, Result};

use crate::openai_compat::OpenAiCompatProvider;
use crate::traits::LlmProvider;

/// A provider that failed to initialize at startup.
#[derive(Debug, Clone)]
pub struct ProviderInitError {
    pub provider_id: String,
    pub error: String,
}

/// Holds every successfully initialized provider, keyed by id.
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn LlmProvider>>,
    /// First configured provider that initialized; used when no id is named.
    default_id: Option<String>,
    init_errors: Vec<ProviderInitError>,
}

impl ProviderRegistry {
    /// Build a registry from already-constructed providers.  The first one
    /// becomes the default.
    pub fn from_providers(list: Vec<Arc<dyn LlmProvider>>) -> Self {
        let default_id = list.first().map(|p| p.provider_id().to_owned());
        let providers = list
            .into_iter()
            .map(|p| (p.provider_id().to_owned(), p))
            .collect();
        Self {
            providers,
            default_id,
            init_errors: Vec::new(),
        }
    }

    /// Initialize all configured providers.  Individual failures are
    /// recorded, not fatal — the gateway decides whether an empty registry
    /// is acceptable.
    pub fn from_config(cfg: &LlmConfig) -> Self {
        let mut providers: HashMap<String, Arc<dyn LlmProvider>> = HashMap::new();
        let mut default_id = None;
        let mut init_errors = Vec::new();

        for provider_cfg in &cfg.providers {
            let built = match provider_cfg.kind {
                ProviderKind::OpenaiCompat => {
                    OpenAiCompatProvider::from_config(provider_cfg, cfg.default_timeout_ms)
                        .map(|p| Arc::new(p) as Arc<dyn LlmProvider>)
                }
            };

            match built {
                Ok(provider) => {
                    if default_id.is_none() {
                        default_id = Some(provider_cfg.id.clone());
                    }
                    providers.insert(provider_cfg.id.clone(), provider);
                }
                Err(e) => {
                    tracing::warn!(
                        provider = %provider_cfg.id,
                        error = %e,
                        "provider failed to initialize"
                    );
                    init_errors.push(ProviderInitError {
                        provider_id: provider_cfg.id.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            initialized = providers.len(),
            failed = init_errors.len(),
            "provider registry built"
        );

        Self {
            providers,
            default_id,
            init_errors,
        }
    }

    /// Look up a provider by id; an empty id resolves to the default.
    pub fn get(&self, id: &str) -> Result<Arc<dyn LlmProvider>> {
        let id = if id.is_empty() {
            self.default_id
                .as_deref()
                .ok_or_else(|| Error::Other("no LLM providers available".into()))?
        } else {
            id
        };
        self.providers
            .get(id)
            .cloned()
            .ok_or_else(|| Error::Other(format!("unknown provider '{id}'")))
    }

    /// The default provider (first configured that initialized).
    pub fn default_provider(&self) -> Result<Arc<dyn LlmProvider>> {
        self.get("")
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn provider_ids(&self) -> Vec<String> {
        self.providers.keys().cloned().collect()
    }

    pub fn init_errors(&self) -> &[ProviderInitError] {
        &self.init_errors
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
