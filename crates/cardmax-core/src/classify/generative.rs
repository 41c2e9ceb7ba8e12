//! Tier-3 generative classifier
//!
//! Sends the description plus the fixed category taxonomy to a
//! text-generation collaborator under a strict JSON-only contract.
//! Returned categories are validated against the taxonomy allow-list
//! (unknown maps to Other) and confidence is clipped to [0, 1]. Calls
//! are gated by a rate limiter: a minimum inter-call interval plus a
//! rolling per-minute cap. Exceeding the limiter fails fast so the
//! cascade keeps its best result so far.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{ClassificationResult, ClassificationSource};
use crate::taxonomy::{Taxonomy, OTHER};

/// Text-generation collaborator seam
#[async_trait]
pub trait TextGen: Send + Sync {
    /// Generate a completion for a prompt
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Model name (for logging)
    fn model(&self) -> &str;
}

/// Ollama-style text-generation backend
pub struct OllamaTextGen {
    http_client: Client,
    base_url: String,
    model: String,
}

impl OllamaTextGen {
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }

    /// Create from `OLLAMA_HOST` / `OLLAMA_MODEL` environment variables
    pub fn from_env() -> Option<Self> {
        let host = std::env::var("OLLAMA_HOST").ok()?;
        let model = std::env::var("OLLAMA_MODEL").unwrap_or_else(|_| "llama3.2".to_string());
        Some(Self::new(&host, &model))
    }
}

/// Request to the generate API
#[derive(Debug, Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
}

/// Response from the generate API
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[async_trait]
impl TextGen for OllamaTextGen {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            model: self.model.clone(),
            prompt: prompt.to_string(),
            stream: false,
        };

        let response = self
            .http_client
            .post(format!("{}/api/generate", self.base_url))
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        let body: GenerateResponse = response.json().await?;
        debug!(model = %self.model, "Generate response: {}", body.response);
        Ok(body.response)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Mock text generation for tests and offline development
#[derive(Clone, Default)]
pub struct MockTextGen {
    response: Option<String>,
}

impl MockTextGen {
    pub fn with_response(response: impl Into<String>) -> Self {
        Self {
            response: Some(response.into()),
        }
    }

    /// A mock whose generations always fail
    pub fn failing() -> Self {
        Self { response: None }
    }
}

#[async_trait]
impl TextGen for MockTextGen {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        self.response
            .clone()
            .ok_or_else(|| Error::InvalidData("mock text generation failure".into()))
    }

    fn model(&self) -> &str {
        "mock"
    }
}

/// Build the classification prompt: enumerated taxonomy plus a JSON-only
/// contract.
pub(crate) fn build_prompt(taxonomy: &Taxonomy, description: &str) -> String {
    let categories: Vec<&str> = taxonomy.category_names().collect();
    format!(
        "Classify this purchase description into exactly one category.\n\
         Categories: {}, Other\n\
         Description: \"{}\"\n\
         Respond with JSON only, no other text:\n\
         {{\"category\": \"<one of the listed categories>\", \"confidence\": <0.0-1.0>, \"reasoning\": \"<one sentence>\"}}",
        categories.join(", "),
        description
    )
}

#[derive(Debug, Deserialize)]
struct LlmClassification {
    category: String,
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    reasoning: String,
}

/// Parse the model's JSON response. Models often wrap the payload in
/// extra text, so the JSON object is extracted by brace matching first.
pub(crate) fn parse_classification(taxonomy: &Taxonomy, response: &str) -> Result<ClassificationResult> {
    let response = response.trim();
    let start = response.find('{');
    let end = response.rfind('}');

    let raw: LlmClassification = match (start, end) {
        (Some(s), Some(e)) if s < e => {
            let json_str = &response[s..=e];
            serde_json::from_str(json_str).map_err(|err| {
                let truncated = if json_str.len() > 200 {
                    format!("{}...", &json_str[..200])
                } else {
                    json_str.to_string()
                };
                Error::InvalidData(format!("Invalid JSON from model: {} | Raw: {}", err, truncated))
            })?
        }
        _ => {
            return Err(Error::InvalidData(
                "No JSON found in model response".into(),
            ))
        }
    };

    // Unknown categories map to Other rather than erroring
    let category = taxonomy
        .canonicalize(&raw.category)
        .unwrap_or(OTHER)
        .to_string();

    Ok(ClassificationResult {
        category,
        confidence: raw.confidence.clamp(0.0, 1.0),
        source: ClassificationSource::Llm,
        reasoning: raw.reasoning,
    })
}

/// Rate limiter for generative-tier calls: minimum interval between
/// calls plus a rolling per-minute cap. Counters are mutex-guarded so
/// concurrent requests cannot corrupt them.
pub struct RateLimiter {
    min_interval: Duration,
    per_minute: usize,
    state: Mutex<LimiterState>,
}

#[derive(Default)]
struct LimiterState {
    last_call: Option<Instant>,
    window: VecDeque<Instant>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration, per_minute: usize) -> Self {
        Self {
            min_interval,
            per_minute,
            state: Mutex::new(LimiterState::default()),
        }
    }

    /// Record a call, or fail fast if either limit would be exceeded
    pub fn try_acquire(&self) -> Result<()> {
        let now = Instant::now();
        let mut state = self
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(last) = state.last_call {
            if now.duration_since(last) < self.min_interval {
                return Err(Error::RateLimited(format!(
                    "minimum interval of {:?} between generative calls",
                    self.min_interval
                )));
            }
        }

        while let Some(&front) = state.window.front() {
            if now.duration_since(front) > Duration::from_secs(60) {
                state.window.pop_front();
            } else {
                break;
            }
        }
        if state.window.len() >= self.per_minute {
            return Err(Error::RateLimited(format!(
                "{} generative calls per minute",
                self.per_minute
            )));
        }

        state.last_call = Some(now);
        state.window.push_back(now);
        Ok(())
    }
}
