use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Dialogue engine
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogueConfig {
    /// Number of conversation turns kept per user.  Older turns are dropped
    /// before any prompt is built (context-window economy, not correctness).
    #[serde(default = "d_max_history")]
    pub max_history_turns: usize,
    /// Minimum classifier confidence required before a predicted intent may
    /// replace the active one.
    #[serde(default = "d_confidence")]
    pub confidence_threshold: f64,
    /// Utterances shorter than this many words never switch the active
    /// intent ("yes", "8 am" mid-collection must not derail it).
    #[serde(default = "d_min_words")]
    pub min_utterance_words: usize,
    /// IANA timezone in which bare times of day ("8:30") are interpreted.
    #[serde(default = "d_timezone")]
    pub timezone: String,
}

impl Default for DialogueConfig {
    fn default() -> Self {
        Self {
            max_history_turns: d_max_history(),
            confidence_threshold: d_confidence(),
            min_utterance_words: d_min_words(),
            timezone: d_timezone(),
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_max_history() -> usize {
    7
}
fn d_confidence() -> f64 {
    0.6
}
fn d_min_words() -> usize {
    3
}
fn d_timezone() -> String {
    "Asia/Singapore".into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dialogue_defaults() {
        let cfg = DialogueConfig::default();
        assert_eq!(cfg.max_history_turns, 7);
        assert!((cfg.confidence_threshold - 0.6).abs() < f64::EPSILON);
        assert_eq!(cfg.min_utterance_words, 3);
    }

    #[test]
    fn dialogue_parses_overrides() {
        let toml_str = r#"
            max_history_turns = 4
            confidence_threshold = 0.75
            timezone = "Europe/Paris"
        "#;
        let cfg: DialogueConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.max_history_turns, 4);
        assert!((cfg.confidence_threshold - 0.75).abs() < f64::EPSILON);
        assert_eq!(cfg.timezone, "Europe/Paris");
        // min_utterance_words falls back to the default
        assert_eq!(cfg.min_utterance_words, 3);
    }
}
