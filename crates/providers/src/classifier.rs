//! Embedding-based intent classifier.
//!
//! Uses cosine similarity between utterance embeddings and pre-computed
//! per-intent centroids to label incoming messages.  Embeddings are fetched
//! through the configured [`LlmProvider`] and cached in-memory with
//! TTL-based eviction.
//!
//! The classifier only *predicts*: it returns a label plus a confidence
//! score in [0, 1], and the dialogue engine applies its own threshold and
//! minimum-length gate before trusting the label.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

use wf_dialogue::Intent;
use wf_domain::config::ClassifierConfig;
use wf_domain::error::Result;

use crate::traits::{EmbeddingsRequest, LlmProvider};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Constants
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Maximum number of cached embeddings before eviction runs.
const CACHE_MAX_ENTRIES: usize = 10_000;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Reference utterances
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Reference utterances used to build intent centroids at startup.
///
/// Each intent gets a set of representative phrasings whose embeddings are
/// averaged to form that intent's centroid vector.
pub fn default_reference_utterances() -> HashMap<Intent, Vec<&'static str>> {
    let mut utterances = HashMap::new();

    utterances.insert(
        Intent::RouteInfo,
        vec![
            "How do I get from Clementi to Changi Airport?",
            "What's the best way to reach Orchard Road from here?",
            "Give me directions from my home to the office",
            "Show me a route from Bedok to Raffles Place",
            "How can I travel from the library to the stadium?",
            "I need directions to Marina Bay from Jurong East",
            "Which buses take me from Tampines to the zoo?",
            "Route from current location to the nearest MRT station",
        ],
    );

    utterances.insert(
        Intent::ScheduleCommute,
        vec![
            "I want to reach work by 9 AM, notify me when to leave",
            "Set up my morning commute so I arrive at 8:30",
            "Plan a daily commute from home to school arriving before 7:45",
            "Remind me when to leave to get to the airport by 6 PM",
            "Schedule my commute to the office for weekday mornings",
            "Create a commute plan that gets me to class by ten",
            "I need to be at the clinic at 14:00, when should I start?",
            "Set a leave-home alert for my trip to work tomorrow",
        ],
    );

    utterances.insert(
        Intent::NextBus,
        vec![
            "When is the next 96 bus?",
            "Next bus at stop 17091 please",
            "How long until bus 196 arrives at Opp Clementi Mall?",
            "Is the D1 coming soon?",
            "When does the next feeder bus reach my stop?",
            "Bus arrival timing for service 52 at Ang Mo Kio interchange",
            "What time is the next A2?",
            "Check arrivals for bus 174 at the stop outside the mall",
        ],
    );

    utterances.insert(
        Intent::Help,
        vec![
            "What can you do?",
            "Help me understand how this works",
            "What kind of questions can I ask you?",
            "How do I use this assistant?",
            "Show me what you can help with",
            "I'm not sure what to ask",
        ],
    );

    utterances.insert(
        Intent::Reset,
        vec![
            "Start over",
            "Reset the conversation",
            "Forget everything and begin again",
            "Clear what I said before",
            "Let's start from scratch",
            "Never mind, restart",
        ],
    );

    utterances
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Vector math
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Cosine similarity between two vectors.
///
/// Returns a value in `[-1.0, 1.0]`. Returns `0.0` if either vector has
/// zero magnitude (avoiding division by zero).
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        tracing::warn!(
            len_a = a.len(),
            len_b = b.len(),
            "cosine_similarity: mismatched vector lengths, returning 0.0"
        );
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }

    dot / (mag_a * mag_b)
}

/// Compute the centroid (element-wise average) of a set of vectors.
///
/// Returns an empty vector if the input is empty.
pub fn compute_centroid(vectors: &[Vec<f32>]) -> Vec<f32> {
    if vectors.is_empty() {
        return Vec::new();
    }

    let dim = vectors[0].len();
    let count = vectors.len() as f32;

    let mut centroid = vec![0.0f32; dim];
    for v in vectors {
        for (acc, val) in centroid.iter_mut().zip(v.iter()) {
            *acc += val;
        }
    }
    for val in &mut centroid {
        *val /= count;
    }

    centroid
}

/// Classify an utterance embedding against intent centroids.
///
/// Returns the best-matching intent (None when there are no centroids)
/// and a map of all intent scores.
pub fn classify_against_centroids(
    embedding: &[f32],
    centroids: &HashMap<Intent, Vec<f32>>,
) -> (Option<Intent>, HashMap<Intent, f32>) {
    let mut scores = HashMap::new();
    let mut best: Option<(Intent, f32)> = None;

    for (intent, centroid) in centroids {
        let score = cosine_similarity(embedding, centroid);
        scores.insert(*intent, score);
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((*intent, score));
        }
    }

    (best.map(|(intent, _)| intent), scores)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Cache entry
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A cached embedding vector with expiration time.
struct CachedEmbedding {
    embedding: Vec<f32>,
    expires_at: Instant,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Prediction
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Result of classifying one utterance.
#[derive(Debug, Clone)]
pub struct IntentPrediction {
    /// The best-matching intent, or `None` if no centroids are loaded.
    pub intent: Option<Intent>,
    /// Confidence in [0, 1] — the winning cosine score clamped to that
    /// range.  The dialogue engine applies its own threshold.
    pub confidence: f64,
    /// Cosine similarity scores for each intent.
    pub scores: HashMap<Intent, f32>,
    /// Classification latency in milliseconds.
    pub latency_ms: u64,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Intent classifier
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Embedding-based intent classifier.
///
/// Maintains pre-computed centroids for each intent and classifies
/// incoming utterances by comparing their embeddings against them.
pub struct IntentClassifier {
    config: ClassifierConfig,
    provider: Arc<dyn LlmProvider>,
    centroids: HashMap<Intent, Vec<f32>>,
    cache: RwLock<HashMap<u64, CachedEmbedding>>,
}

impl IntentClassifier {
    /// Create a classifier with pre-computed centroids (useful for testing
    /// or when centroids are loaded from a snapshot).
    pub fn with_centroids(
        config: ClassifierConfig,
        provider: Arc<dyn LlmProvider>,
        centroids: HashMap<Intent, Vec<f32>>,
    ) -> Self {
        Self {
            config,
            provider,
            centroids,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Initialize the classifier by fetching embeddings for all reference
    /// utterances and building centroids.
    ///
    /// Makes one embeddings call per intent to the configured provider.
    pub async fn initialize(
        config: ClassifierConfig,
        provider: Arc<dyn LlmProvider>,
    ) -> Result<Self> {
        let reference = default_reference_utterances();
        let mut centroids = HashMap::new();

        for (intent, utterances) in &reference {
            let req = EmbeddingsRequest {
                input: utterances.iter().map(|s| s.to_string()).collect(),
                model: config.model.clone(),
            };
            let resp = provider.embeddings(&req).await?;
            centroids.insert(*intent, compute_centroid(&resp.embeddings));
        }

        tracing::info!(
            intents = centroids.len(),
            provider = provider.provider_id(),
            "intent classifier initialized with centroids"
        );

        Ok(Self {
            config,
            provider,
            centroids,
            cache: RwLock::new(HashMap::new()),
        })
    }

    /// Classify an utterance.
    ///
    /// 1. Checks the embedding cache.
    /// 2. Fetches the embedding from the provider if not cached.
    /// 3. Compares against centroids and reports the best label + score.
    pub async fn classify(&self, utterance: &str) -> Result<IntentPrediction> {
        let start = Instant::now();

        let cache_key = hash_utterance(utterance);
        let embedding = match self.get_cached(cache_key) {
            Some(cached) => cached,
            None => {
                let req = EmbeddingsRequest {
                    input: vec![utterance.to_owned()],
                    model: self.config.model.clone(),
                };
                let resp = self.provider.embeddings(&req).await?;
                let embedding = resp.embeddings.into_iter().next().unwrap_or_default();
                self.put_cached(cache_key, &embedding);
                embedding
            }
        };

        let (intent, scores) = classify_against_centroids(&embedding, &self.centroids);
        let confidence = intent
            .and_then(|i| scores.get(&i))
            .map(|s| (*s as f64).clamp(0.0, 1.0))
            .unwrap_or(0.0);

        Ok(IntentPrediction {
            intent,
            confidence,
            scores,
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Check whether the embeddings endpoint is reachable.
    pub async fn health_check(&self) -> bool {
        let req = EmbeddingsRequest {
            input: vec!["health check".into()],
            model: self.config.model.clone(),
        };
        self.provider.embeddings(&req).await.is_ok()
    }

    /// Get a reference to the classifier config.
    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Get a reference to the centroids.
    pub fn centroids(&self) -> &HashMap<Intent, Vec<f32>> {
        &self.centroids
    }

    // ── Cache helpers ──────────────────────────────────────────────

    /// Look up a cached embedding by utterance hash. Returns `None` if
    /// absent or expired.
    fn get_cached(&self, key: u64) -> Option<Vec<f32>> {
        let cache = self.cache.read();
        cache.get(&key).and_then(|entry| {
            if Instant::now() < entry.expires_at {
                Some(entry.embedding.clone())
            } else {
                None
            }
        })
    }

    /// Store an embedding in the cache. Evicts expired entries if over capacity.
    fn put_cached(&self, key: u64, embedding: &[f32]) {
        let ttl = Duration::from_secs(self.config.cache_ttl_secs);
        let entry = CachedEmbedding {
            embedding: embedding.to_vec(),
            expires_at: Instant::now() + ttl,
        };

        let mut cache = self.cache.write();

        if cache.len() >= CACHE_MAX_ENTRIES {
            let now = Instant::now();
            cache.retain(|_, v| v.expires_at > now);
        }

        cache.insert(key, entry);
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Hash an utterance string to a u64 for cache lookup.
fn hash_utterance(utterance: &str) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    utterance.hash(&mut hasher);
    hasher.finish()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{ChatRequest, ChatResponse, EmbeddingsResponse};
    use wf_domain::error::Result;

    /// A provider whose embeddings map known phrases to fixed vectors.
    struct StubProvider;

    #[async_trait::async_trait]
    impl LlmProvider for StubProvider {
        async fn chat(&self, _req: &ChatRequest) -> Result<ChatResponse> {
            Ok(ChatResponse {
                content: String::new(),
                model: "stub".into(),
                usage: None,
            })
        }

        async fn embeddings(
            &self,
            req: &crate::traits::EmbeddingsRequest,
        ) -> Result<EmbeddingsResponse> {
            let embeddings = req
                .input
                .iter()
                .map(|text| {
                    if text.contains("bus") {
                        vec![1.0, 0.0, 0.0]
                    } else if text.contains("route") {
                        vec![0.0, 1.0, 0.0]
                    } else {
                        vec![0.0, 0.0, 1.0]
                    }
                })
                .collect();
            Ok(EmbeddingsResponse { embeddings })
        }

        fn provider_id(&self) -> &str {
            "stub"
        }
    }

    fn separated_centroids() -> HashMap<Intent, Vec<f32>> {
        let mut centroids = HashMap::new();
        centroids.insert(Intent::NextBus, vec![1.0, 0.0, 0.0]);
        centroids.insert(Intent::RouteInfo, vec![0.0, 1.0, 0.0]);
        centroids.insert(Intent::Help, vec![0.0, 0.0, 1.0]);
        centroids
    }

    #[test]
    fn cosine_similarity_identical_vectors() {
        let a = vec![1.0, 2.0, 3.0];
        let b = vec![1.0, 2.0, 3.0];
        let sim = cosine_similarity(&a, &b);
        assert!(
            (sim - 1.0).abs() < 1e-6,
            "identical vectors should have similarity ~1.0, got {sim}"
        );
    }

    #[test]
    fn cosine_similarity_orthogonal_vectors() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        let sim = cosine_similarity(&a, &b);
        assert!(
            sim.abs() < 1e-6,
            "orthogonal vectors should have similarity ~0.0, got {sim}"
        );
    }

    #[test]
    fn cosine_similarity_zero_vector_returns_zero() {
        let a = vec![0.0, 0.0, 0.0];
        let b = vec![1.0, 2.0, 3.0];
        let sim = cosine_similarity(&a, &b);
        assert!(sim.abs() < 1e-6);
    }

    #[test]
    fn compute_centroid_average() {
        let vectors = vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0], vec![0.0, 0.0, 1.0]];
        let centroid = compute_centroid(&vectors);
        let expected = vec![1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0];
        for (a, b) in centroid.iter().zip(expected.iter()) {
            assert!((a - b).abs() < 1e-6, "centroid mismatch: got {a}, expected {b}");
        }
    }

    #[test]
    fn compute_centroid_empty_returns_empty() {
        let vectors: Vec<Vec<f32>> = vec![];
        assert!(compute_centroid(&vectors).is_empty());
    }

    #[test]
    fn classify_with_centroids_picks_nearest() {
        let centroids = separated_centroids();
        let embedding = vec![0.9, 0.1, 0.0];
        let (intent, scores) = classify_against_centroids(&embedding, &centroids);
        assert_eq!(intent, Some(Intent::NextBus));
        assert!(scores[&Intent::NextBus] > scores[&Intent::RouteInfo]);
    }

    #[test]
    fn classify_with_no_centroids_is_none() {
        let centroids: HashMap<Intent, Vec<f32>> = HashMap::new();
        let (intent, scores) = classify_against_centroids(&[1.0, 2.0], &centroids);
        assert!(intent.is_none());
        assert!(scores.is_empty());
    }

    #[test]
    fn default_reference_utterances_cover_all_intents() {
        let utterances = default_reference_utterances();
        for intent in Intent::ALL {
            let set = utterances
                .get(&intent)
                .unwrap_or_else(|| panic!("missing reference utterances for {intent}"));
            assert!(set.len() >= 3, "{intent} should have at least 3 phrasings");
        }
    }

    #[tokio::test]
    async fn classify_reports_best_intent_and_confidence() {
        let classifier = IntentClassifier::with_centroids(
            ClassifierConfig::default(),
            Arc::new(StubProvider),
            separated_centroids(),
        );

        let prediction = classifier.classify("when is the next bus").await.unwrap();
        assert_eq!(prediction.intent, Some(Intent::NextBus));
        assert!(prediction.confidence > 0.9);
    }

    #[tokio::test]
    async fn initialize_builds_one_centroid_per_intent() {
        let classifier =
            IntentClassifier::initialize(ClassifierConfig::default(), Arc::new(StubProvider))
                .await
                .unwrap();
        assert_eq!(classifier.centroids().len(), Intent::ALL.len());
    }

    #[test]
    fn cache_stores_and_retrieves() {
        let classifier = IntentClassifier::with_centroids(
            ClassifierConfig {
                cache_ttl_secs: 300,
                ..ClassifierConfig::default()
            },
            Arc::new(StubProvider),
            HashMap::new(),
        );

        let key = hash_utterance("test utterance");
        let embedding = vec![1.0, 2.0, 3.0];

        classifier.put_cached(key, &embedding);
        assert_eq!(classifier.get_cached(key), Some(embedding));
    }

    #[test]
    fn cache_returns_none_for_missing() {
        let classifier = IntentClassifier::with_centroids(
            ClassifierConfig::default(),
            Arc::new(StubProvider),
            HashMap::new(),
        );
        assert!(classifier.get_cached(999).is_none());
    }

    #[test]
    fn hash_utterance_deterministic() {
        let h1 = hash_utterance("hello world");
        let h2 = hash_utterance("hello world");
        let h3 = hash_utterance("different");
        assert_eq!(h1, h2);
        assert_ne!(h1, h3);
    }
}
