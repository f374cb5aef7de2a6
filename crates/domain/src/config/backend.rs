use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Transit backend
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Connection settings for the transit backend that serves geocoding,
/// routing, bus-arrival, and commute-plan APIs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL, e.g. `http://127.0.0.1:8080`.
    #[serde(default = "d_base_url")]
    pub base_url: String,
    /// Timeout for lookups (geocode, bus arrivals, saved locations,
    /// commute-plan creation).
    #[serde(default = "d_lookup_timeout")]
    pub lookup_timeout_ms: u64,
    /// Timeout for route computation, which can take noticeably longer.
    #[serde(default = "d_routing_timeout")]
    pub routing_timeout_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: d_base_url(),
            lookup_timeout_ms: d_lookup_timeout(),
            routing_timeout_ms: d_routing_timeout(),
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_base_url() -> String {
    "http://127.0.0.1:8080".into()
}
fn d_lookup_timeout() -> u64 {
    5_000
}
fn d_routing_timeout() -> u64 {
    10_000
}
