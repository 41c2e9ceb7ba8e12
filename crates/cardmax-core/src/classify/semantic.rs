//! Tier-2 semantic classifier
//!
//! Embeds the description via a vector-search collaborator, aggregates
//! weighted similarity per category over the returned exemplars, and
//! rescales the best similarity to a confidence with a three-band
//! piecewise-linear map. Transport and search failures are caught at
//! the tier boundary by the cascade.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{ClassificationResult, ClassificationSource};
use crate::taxonomy::Taxonomy;

/// A category-labeled exemplar returned by the vector search, ranked by
/// similarity in [0, 1]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryMatch {
    pub category: String,
    pub similarity: f64,
}

/// Vector-search collaborator seam
#[async_trait]
pub trait VectorSearch: Send + Sync {
    /// Return the nearest category exemplars for a description
    async fn search(&self, text: &str, limit: usize) -> Result<Vec<CategoryMatch>>;
}

/// HTTP vector-search backend
pub struct HttpVectorSearch {
    http_client: Client,
    base_url: String,
}

impl HttpVectorSearch {
    pub fn new(base_url: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Create from the `VECTOR_SEARCH_HOST` environment variable
    pub fn from_env() -> Option<Self> {
        let host = std::env::var("VECTOR_SEARCH_HOST").ok()?;
        Some(Self::new(&host))
    }
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    text: &'a str,
    limit: usize,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    matches: Vec<CategoryMatch>,
}

#[async_trait]
impl VectorSearch for HttpVectorSearch {
    async fn search(&self, text: &str, limit: usize) -> Result<Vec<CategoryMatch>> {
        let response = self
            .http_client
            .post(format!("{}/search", self.base_url))
            .json(&SearchRequest { text, limit })
            .send()
            .await?
            .error_for_status()?;

        let body: SearchResponse = response.json().await?;
        debug!(matches = body.matches.len(), "Vector search response");
        Ok(body.matches)
    }
}

/// Mock vector search for tests and offline development
#[derive(Clone, Default)]
pub struct MockVectorSearch {
    matches: Vec<CategoryMatch>,
    fail: bool,
}

impl MockVectorSearch {
    pub fn with_matches(matches: Vec<CategoryMatch>) -> Self {
        Self {
            matches,
            fail: false,
        }
    }

    /// A mock whose searches always fail
    pub fn failing() -> Self {
        Self {
            matches: vec![],
            fail: true,
        }
    }
}

#[async_trait]
impl VectorSearch for MockVectorSearch {
    async fn search(&self, _text: &str, _limit: usize) -> Result<Vec<CategoryMatch>> {
        if self.fail {
            return Err(Error::InvalidData("mock vector search failure".into()));
        }
        Ok(self.matches.clone())
    }
}

/// Aggregate exemplar matches into a classification.
///
/// Per-category score is similarity-weighted (a category backed by
/// several strong exemplars beats one strong outlier); the winning
/// category's best raw similarity feeds the confidence map.
pub(crate) fn classify(taxonomy: &Taxonomy, matches: &[CategoryMatch]) -> Option<ClassificationResult> {
    let mut weighted: HashMap<&str, f64> = HashMap::new();
    let mut best_similarity: HashMap<&str, f64> = HashMap::new();

    for m in matches {
        let Some(category) = taxonomy.canonicalize(&m.category) else {
            continue;
        };
        let sim = m.similarity.clamp(0.0, 1.0);
        *weighted.entry(category).or_insert(0.0) += sim * sim;
        let best = best_similarity.entry(category).or_insert(0.0);
        if sim > *best {
            *best = sim;
        }
    }

    let (category, _) = weighted
        .into_iter()
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))?;
    let similarity = best_similarity[category];

    Some(ClassificationResult {
        category: category.to_string(),
        confidence: confidence_from_similarity(similarity),
        source: ClassificationSource::Semantic,
        reasoning: format!(
            "nearest exemplars favor {} (best similarity {:.2})",
            category, similarity
        ),
    })
}

/// Three-band piecewise-linear similarity-to-confidence map, capped at
/// 0.95. Weak matches stay below the generative-tier threshold, strong
/// matches clear the accept threshold.
pub(crate) fn confidence_from_similarity(similarity: f64) -> f64 {
    let s = similarity.clamp(0.0, 1.0);
    let confidence = if s < 0.5 {
        0.2 + 0.4 * s
    } else if s < 0.8 {
        0.4 + 1.0 * (s - 0.5)
    } else {
        0.7 + 1.25 * (s - 0.8)
    };
    confidence.min(0.95)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn taxonomy() -> Taxonomy {
        Taxonomy::new().unwrap()
    }

    #[test]
    fn test_confidence_map_bands() {
        assert!((confidence_from_similarity(0.0) - 0.2).abs() < 1e-9);
        assert!((confidence_from_similarity(0.5) - 0.4).abs() < 1e-9);
        assert!((confidence_from_similarity(0.8) - 0.7).abs() < 1e-9);
        assert_eq!(confidence_from_similarity(1.0), 0.95);
    }

    #[test]
    fn test_confidence_map_is_monotone() {
        let mut prev = 0.0;
        for i in 0..=100 {
            let c = confidence_from_similarity(i as f64 / 100.0);
            assert!(c >= prev);
            prev = c;
        }
    }

    #[test]
    fn test_classify_aggregates_by_category() {
        let t = taxonomy();
        let matches = vec![
            CategoryMatch {
                category: "Dining".into(),
                similarity: 0.7,
            },
            CategoryMatch {
                category: "restaurants".into(),
                similarity: 0.65,
            },
            CategoryMatch {
                category: "Grocery".into(),
                similarity: 0.75,
            },
        ];
        // Two decent Dining exemplars outweigh one stronger Grocery one
        let result = classify(&t, &matches).unwrap();
        assert_eq!(result.category, "Dining");
        assert_eq!(result.source, ClassificationSource::Semantic);
    }

    #[test]
    fn test_classify_skips_unknown_categories() {
        let t = taxonomy();
        let matches = vec![CategoryMatch {
            category: "cryptozoology".into(),
            similarity: 0.99,
        }];
        assert!(classify(&t, &matches).is_none());
    }

    #[tokio::test]
    async fn test_failing_mock() {
        let mock = MockVectorSearch::failing();
        assert!(mock.search("anything", 5).await.is_err());
    }
}
