use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// LLM provider system
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Registered LLM providers (data-driven: adding a provider = adding config).
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
    /// Default timeout for chat/embedding requests.
    #[serde(default = "d_timeout_ms")]
    pub default_timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            providers: Vec::new(),
            default_timeout_ms: d_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Unique provider id (referenced by `[classifier].provider`).
    pub id: String,
    #[serde(default)]
    pub kind: ProviderKind,
    /// Base URL of the endpoint, e.g. `http://127.0.0.1:11434/v1`.
    pub base_url: String,
    #[serde(default)]
    pub auth: AuthConfig,
    /// Chat model used when a request does not name one.
    #[serde(default)]
    pub default_model: Option<String>,
    /// Embedding model used by the intent classifier.
    #[serde(default)]
    pub embedding_model: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Any endpoint following the OpenAI chat-completions contract
    /// (OpenAI, Ollama, vLLM, LM Studio, Together, ...).
    #[default]
    OpenaiCompat,
}

/// How the provider's API key is resolved.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthConfig {
    /// Environment variable holding the key.
    #[serde(default)]
    pub env: Option<String>,
    /// Plaintext key in config (discouraged; a warning is logged).
    #[serde(default)]
    pub key: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Intent classifier
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Provider id whose embeddings endpoint is used.  Empty = first
    /// configured provider.
    #[serde(default)]
    pub provider: String,
    /// Embedding model override; falls back to the provider's
    /// `embedding_model`.
    #[serde(default)]
    pub model: Option<String>,
    /// TTL for cached utterance embeddings.
    #[serde(default = "d_cache_ttl")]
    pub cache_ttl_secs: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            provider: String::new(),
            model: None,
            cache_ttl_secs: d_cache_ttl(),
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_timeout_ms() -> u64 {
    20_000
}
fn d_cache_ttl() -> u64 {
    300
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn llm_config_parses_provider_list() {
        let toml_str = r#"
            default_timeout_ms = 5000

            [[providers]]
            id = "local"
            base_url = "http://127.0.0.1:11434/v1"
            default_model = "llama3.1"
            embedding_model = "nomic-embed-text"

            [[providers]]
            id = "openai"
            base_url = "https://api.openai.com/v1"
            default_model = "gpt-4o-mini"

            [providers.auth]
            env = "OPENAI_API_KEY"
        "#;
        let cfg: LlmConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.default_timeout_ms, 5000);
        assert_eq!(cfg.providers.len(), 2);
        assert_eq!(cfg.providers[0].kind, ProviderKind::OpenaiCompat);
        assert_eq!(
            cfg.providers[0].embedding_model.as_deref(),
            Some("nomic-embed-text")
        );
        assert_eq!(
            cfg.providers[1].auth.env.as_deref(),
            Some("OPENAI_API_KEY")
        );
    }

    #[test]
    fn classifier_defaults_to_first_provider() {
        let cfg = ClassifierConfig::default();
        assert!(cfg.provider.is_empty());
        assert_eq!(cfg.cache_ttl_secs, 300);
    }
}
