//! Cascading category classifier
//!
//! Maps a free-text purchase description to a spending category with a
//! confidence score, escalating through three tiers of increasing
//! cost/accuracy:
//!
//! 1. Lexical: merchant patterns + weighted keywords, always runs
//! 2. Semantic: vector-search collaborator, below 0.7 confidence
//! 3. Generative: text-generation collaborator, below 0.6 confidence
//!
//! At every stage the highest-confidence result seen so far wins; tiers
//! are never blended. Collaborator calls are time-bounded, and any tier
//! failure falls through rather than surfacing to the caller —
//! `categorize` never fails.

mod lexical;

pub mod generative;
pub mod semantic;

pub use generative::{MockTextGen, OllamaTextGen, RateLimiter, TextGen};
pub use semantic::{CategoryMatch, HttpVectorSearch, MockVectorSearch, VectorSearch};

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::models::{ClassificationResult, ClassificationSource, ClassifyMethod};
use crate::taxonomy::Taxonomy;

/// Classifier thresholds and limits
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Tier-1 results at or above this confidence are accepted outright
    pub accept_confidence: f64,
    /// Attempt the semantic tier below this confidence (hysteresis gap
    /// against the accept threshold prevents oscillation)
    pub semantic_below: f64,
    /// Attempt the generative tier below this confidence
    pub generative_below: f64,
    /// Exemplars requested from the vector search
    pub semantic_limit: usize,
    pub semantic_timeout: Duration,
    pub generative_timeout: Duration,
    /// Cached classifications before insertion-order eviction kicks in
    pub cache_capacity: usize,
    /// Minimum interval between generative calls
    pub min_call_interval: Duration,
    /// Rolling per-minute cap on generative calls
    pub calls_per_minute: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            accept_confidence: 0.8,
            semantic_below: 0.7,
            generative_below: 0.6,
            semantic_limit: 8,
            semantic_timeout: Duration::from_secs(3),
            generative_timeout: Duration::from_secs(10),
            cache_capacity: 512,
            min_call_interval: Duration::from_millis(500),
            calls_per_minute: 20,
        }
    }
}

/// Bounded cache with insertion-order (not recency) eviction
struct BoundedCache {
    capacity: usize,
    map: HashMap<String, ClassificationResult>,
    order: VecDeque<String>,
}

impl BoundedCache {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            map: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    fn get(&self, key: &str) -> Option<ClassificationResult> {
        self.map.get(key).cloned()
    }

    fn insert(&mut self, key: String, value: ClassificationResult) {
        if !self.map.contains_key(&key) {
            self.order.push_back(key.clone());
        }
        self.map.insert(key, value);
        while self.map.len() > self.capacity {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.map.remove(&oldest);
                }
                None => break,
            }
        }
    }
}

/// The classifier instance. Owns its cache and rate limiter; safe to
/// share across requests behind an `Arc`.
pub struct CategoryClassifier {
    taxonomy: Arc<Taxonomy>,
    config: ClassifierConfig,
    vector: Option<Arc<dyn VectorSearch>>,
    textgen: Option<Arc<dyn TextGen>>,
    cache: Mutex<BoundedCache>,
    limiter: RateLimiter,
}

impl CategoryClassifier {
    pub fn new(taxonomy: Arc<Taxonomy>) -> Self {
        Self::with_config(taxonomy, ClassifierConfig::default())
    }

    pub fn with_config(taxonomy: Arc<Taxonomy>, config: ClassifierConfig) -> Self {
        let cache = Mutex::new(BoundedCache::new(config.cache_capacity));
        let limiter = RateLimiter::new(config.min_call_interval, config.calls_per_minute);
        Self {
            taxonomy,
            config,
            vector: None,
            textgen: None,
            cache,
            limiter,
        }
    }

    /// Attach a vector-search collaborator (enables the semantic tier)
    pub fn with_vector_search(mut self, vector: Arc<dyn VectorSearch>) -> Self {
        self.vector = Some(vector);
        self
    }

    /// Attach a text-generation collaborator (enables the generative tier)
    pub fn with_text_gen(mut self, textgen: Arc<dyn TextGen>) -> Self {
        self.textgen = Some(textgen);
        self
    }

    /// Classify a description. Never fails: bad input and collaborator
    /// outages degrade to the best result available.
    ///
    /// A forced method bypasses the cascade and the cache (and its result
    /// is not cached) — intended for diagnostics.
    pub async fn categorize(
        &self,
        description: &str,
        forced: Option<ClassifyMethod>,
    ) -> ClassificationResult {
        let trimmed = description.trim();
        if trimmed.is_empty() {
            return ClassificationResult::fallback("empty or non-text description");
        }

        if let Some(method) = forced {
            return self.run_forced(trimmed, method).await;
        }

        let key = trimmed.to_lowercase();
        {
            let cache = self.cache.lock().unwrap_or_else(|p| p.into_inner());
            if let Some(mut hit) = cache.get(&key) {
                debug!(description = %trimmed, "Classification cache hit");
                hit.source = ClassificationSource::Cache;
                return hit;
            }
        }

        let mut best = lexical::classify(&self.taxonomy, trimmed);
        debug!(
            category = %best.category,
            confidence = best.confidence,
            "Tier-1 lexical result"
        );

        if best.confidence >= self.config.accept_confidence {
            self.cache_result(&key, &best);
            return best;
        }

        if best.confidence < self.config.semantic_below {
            if let Some(result) = self.semantic_tier(trimmed).await {
                debug!(
                    category = %result.category,
                    confidence = result.confidence,
                    "Tier-2 semantic result"
                );
                if result.confidence > best.confidence {
                    best = result;
                }
            }
        }

        if best.confidence < self.config.generative_below {
            if let Some(result) = self.generative_tier(trimmed).await {
                debug!(
                    category = %result.category,
                    confidence = result.confidence,
                    "Tier-3 generative result"
                );
                if result.confidence > best.confidence {
                    best = result;
                }
            }
        }

        self.cache_result(&key, &best);
        best
    }

    fn cache_result(&self, key: &str, result: &ClassificationResult) {
        // Fallback results carry no signal worth replaying
        if result.source == ClassificationSource::Fallback {
            return;
        }
        let mut cache = self.cache.lock().unwrap_or_else(|p| p.into_inner());
        cache.insert(key.to_string(), result.clone());
    }

    async fn run_forced(&self, description: &str, method: ClassifyMethod) -> ClassificationResult {
        match method {
            ClassifyMethod::Keyword => lexical::classify(&self.taxonomy, description),
            ClassifyMethod::Semantic => {
                if self.vector.is_none() {
                    return ClassificationResult::fallback("semantic tier not configured");
                }
                self.semantic_tier(description)
                    .await
                    .unwrap_or_else(|| ClassificationResult::fallback("semantic tier failed"))
            }
            ClassifyMethod::Generative => {
                if self.textgen.is_none() {
                    return ClassificationResult::fallback("generative tier not configured");
                }
                self.generative_tier(description)
                    .await
                    .unwrap_or_else(|| ClassificationResult::fallback("generative tier failed"))
            }
        }
    }

    async fn semantic_tier(&self, description: &str) -> Option<ClassificationResult> {
        let vector = self.vector.as_ref()?;
        match timeout(
            self.config.semantic_timeout,
            vector.search(description, self.config.semantic_limit),
        )
        .await
        {
            Err(_) => {
                warn!("Semantic tier timed out, falling through");
                None
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Semantic tier failed, falling through");
                None
            }
            Ok(Ok(matches)) => semantic::classify(&self.taxonomy, &matches),
        }
    }

    async fn generative_tier(&self, description: &str) -> Option<ClassificationResult> {
        let textgen = self.textgen.as_ref()?;
        if let Err(e) = self.limiter.try_acquire() {
            warn!(error = %e, "Generative tier rate limited, keeping best so far");
            return None;
        }

        let prompt = generative::build_prompt(&self.taxonomy, description);
        match timeout(self.config.generative_timeout, textgen.generate(&prompt)).await {
            Err(_) => {
                warn!("Generative tier timed out, keeping best so far");
                None
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Generative tier failed, keeping best so far");
                None
            }
            Ok(Ok(response)) => match generative::parse_classification(&self.taxonomy, &response) {
                Ok(result) => Some(result),
                Err(e) => {
                    warn!(error = %e, "Unparseable generative response");
                    None
                }
            },
        }
    }
}
