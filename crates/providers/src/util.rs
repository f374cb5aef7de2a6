//! Shared utility functions for provider adapters.

use wf_domain::config::AuthConfig;
use wf_domain::error::{Error, Result};

/// Convert a [`reqwest::Error`] into the domain [`Error`] type.
///
/// Timeout errors map to [`Error::Timeout`]; everything else maps to
/// [`Error::Http`].
pub(crate) fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Http(e.to_string())
    }
}

/// Resolve the API key from an [`AuthConfig`].
///
/// Precedence:
/// 1. `key` field (plaintext — warn)
/// 2. `env` field (reads environment variable; unset is an error)
/// 3. `Ok(None)` — keyless endpoint (local Ollama, vLLM, ...)
pub fn resolve_api_key(auth: &AuthConfig) -> Result<Option<String>> {
    if let Some(ref key) = auth.key {
        tracing::warn!(
            "API key loaded from plaintext config field 'key' — prefer 'env' instead"
        );
        return Ok(Some(key.clone()));
    }

    if let Some(ref env_var) = auth.env {
        return std::env::var(env_var).map(Some).map_err(|_| {
            Error::Auth(format!(
                "environment variable '{env_var}' not set or not valid UTF-8"
            ))
        });
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_api_key_plaintext() {
        let auth = AuthConfig {
            key: Some("sk-test-123".into()),
            ..Default::default()
        };
        assert_eq!(resolve_api_key(&auth).unwrap().as_deref(), Some("sk-test-123"));
    }

    #[test]
    fn resolve_api_key_env_var() {
        let var_name = "WF_TEST_RESOLVE_ENV_KEY_1234";
        std::env::set_var(var_name, "env-secret-value");
        let auth = AuthConfig {
            env: Some(var_name.into()),
            ..Default::default()
        };
        assert_eq!(
            resolve_api_key(&auth).unwrap().as_deref(),
            Some("env-secret-value")
        );
        std::env::remove_var(var_name);
    }

    #[test]
    fn resolve_api_key_env_var_missing() {
        let auth = AuthConfig {
            env: Some("WF_TEST_NONEXISTENT_VAR_8888".into()),
            ..Default::default()
        };
        let err = resolve_api_key(&auth).unwrap_err();
        assert!(err.to_string().contains("WF_TEST_NONEXISTENT_VAR_8888"));
    }

    #[test]
    fn resolve_api_key_keyless() {
        let auth = AuthConfig::default();
        assert!(resolve_api_key(&auth).unwrap().is_none());
    }

    #[test]
    fn resolve_api_key_plaintext_takes_precedence() {
        let auth = AuthConfig {
            key: Some("plaintext-wins".into()),
            env: Some("WF_TEST_SHOULD_NOT_BE_READ".into()),
        };
        assert_eq!(
            resolve_api_key(&auth).unwrap().as_deref(),
            Some("plaintext-wins")
        );
    }
}
