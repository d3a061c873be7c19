//! Inference capabilities used by the enricher.
//!
//! Summarization and sentiment classification are black boxes behind two
//! small traits. The production implementations talk to a hosted model
//! endpoint (Hugging Face Inference API request/response shapes); tests
//! substitute in-process fakes.
//!
//! # Architecture
//!
//! - [`Summarizer`] / [`SentimentClassifier`]: the capability contracts
//! - [`HttpSummarizer`] / [`HttpSentimentClassifier`]: hosted-model clients
//! - [`Retry`]: decorator adding exponential backoff to either capability
//!
//! # Retry Strategy
//!
//! - Exponential backoff starting at the configured base delay
//! - Maximum delay capped at 30 seconds
//! - Random jitter (0-250ms) added to each delay

use crate::config::InferenceConfig;
use crate::error::PipelineError;
use crate::models::Sentiment;
use crate::utils::truncate_for_log;
use rand::{Rng, rng};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::error::Error;
use std::fmt;
use std::future::Future;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};
use url::Url;

pub type InferenceResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

/// Produces a short abstractive summary of a text.
pub trait Summarizer {
    /// Summarize one article body.
    ///
    /// # Arguments
    ///
    /// * `text` - The body text, already cut to the input limit
    ///
    /// # Returns
    ///
    /// The model's summary, or an error if the request failed. An empty
    /// string is a valid return; callers decide what to do with it.
    async fn summarize(&self, text: &str) -> InferenceResult<String>;
}

/// Labels the sentiment of a text with a confidence score.
pub trait SentimentClassifier {
    /// Classify one text.
    ///
    /// # Arguments
    ///
    /// * `text` - The text to label, usually a summary
    ///
    /// # Returns
    ///
    /// The highest-scoring label with its score in `[0.0, 1.0]`, or an
    /// error if the request failed.
    async fn classify(&self, text: &str) -> InferenceResult<Sentiment>;
}

/// Wrapper that adds exponential backoff retry logic to an inference
/// capability.
///
/// The delay between retries follows:
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct Retry<T> {
    inner: T,
    max_retries: usize,
    base_delay: StdDuration,
    max_delay: StdDuration,
}

impl<T> Retry<T> {
    /// Wrap an inference capability with retry logic.
    ///
    /// # Arguments
    ///
    /// * `inner` - The capability to wrap
    /// * `max_retries` - Retries after the first attempt (`0` disables retrying)
    /// * `base_delay` - Delay before the first retry; doubled on each further one
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }

    async fn run<R, F, Fut>(&self, op_name: &'static str, mut op: F) -> InferenceResult<R>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = InferenceResult<R>>,
    {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match op().await {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries {
                        error!(
                            op = op_name,
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_attempt = attempt_dt.as_millis(),
                            elapsed_ms_total = total_dt.as_millis(),
                            error = %e,
                            "inference exhausted retries"
                        );
                        return Err(e);
                    }

                    let delay = self
                        .base_delay
                        .saturating_mul(1 << (attempt - 1).min(16))
                        .min(self.max_delay);
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = delay + StdDuration::from_millis(jitter_ms);

                    warn!(
                        op = op_name,
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_dt.as_millis(),
                        ?delay,
                        error = %e,
                        "inference attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

impl<T> fmt::Debug for Retry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Retry")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T: Summarizer> Summarizer for Retry<T> {
    async fn summarize(&self, text: &str) -> InferenceResult<String> {
        self.run("summarize", || self.inner.summarize(text)).await
    }
}

impl<T: SentimentClassifier> SentimentClassifier for Retry<T> {
    async fn classify(&self, text: &str) -> InferenceResult<Sentiment> {
        self.run("classify", || self.inner.classify(text)).await
    }
}

#[derive(Debug, Deserialize)]
struct SummaryOutput {
    summary_text: String,
}

#[derive(Debug, Clone, Deserialize)]
struct LabelScore {
    label: String,
    score: f64,
}

/// Classification endpoints answer either one list per input or a flat
/// list for a single input.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ClassificationOutput {
    Batched(Vec<Vec<LabelScore>>),
    Single(Vec<LabelScore>),
}

impl ClassificationOutput {
    fn best(self) -> Option<LabelScore> {
        let candidates = match self {
            ClassificationOutput::Batched(batches) => batches.into_iter().next()?,
            ClassificationOutput::Single(labels) => labels,
        };
        candidates
            .into_iter()
            .max_by(|a, b| a.score.total_cmp(&b.score))
    }
}

/// Shared HTTP plumbing for one hosted model.
#[derive(Debug, Clone)]
struct ModelEndpoint {
    client: Client,
    url: Url,
    token: Option<String>,
}

impl ModelEndpoint {
    fn new(client: Client, config: &InferenceConfig, model: &str) -> Result<Self, PipelineError> {
        let url = config.endpoint.join(model).map_err(|e| {
            PipelineError::Config(format!("invalid model name '{model}': {e}"))
        })?;
        Ok(Self {
            client,
            url,
            token: config.token.clone(),
        })
    }

    async fn post<T: for<'de> Deserialize<'de>>(
        &self,
        body: &serde_json::Value,
    ) -> InferenceResult<T> {
        let t0 = Instant::now();
        let mut req = self.client.post(self.url.clone()).json(body);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(
                url = %self.url,
                status = status.as_u16(),
                elapsed_ms = t0.elapsed().as_millis(),
                "model call failed"
            );
            return Err(Box::new(PipelineError::Inference(format!(
                "{} returned {}: {}",
                self.url,
                status,
                truncate_for_log(&text, 200)
            ))));
        }
        Ok(resp.json::<T>().await?)
    }
}

fn build_client(config: &InferenceConfig) -> Result<Client, PipelineError> {
    Ok(Client::builder()
        .timeout(config.timeout())
        .user_agent(concat!("mindscape_news/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

/// Hosted summarization model.
#[derive(Debug, Clone)]
pub struct HttpSummarizer {
    endpoint: ModelEndpoint,
    min_length: u32,
    max_length: u32,
}

impl HttpSummarizer {
    /// Build a client for `config.settings.summarization_model`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if the HTTP client cannot be built or the
    /// model name does not form a valid URL under the endpoint.
    pub fn new(config: &InferenceConfig) -> Result<Self, PipelineError> {
        let client = build_client(config)?;
        Ok(Self {
            endpoint: ModelEndpoint::new(client, config, &config.settings.summarization_model)?,
            min_length: config.settings.min_summary_length,
            max_length: config.settings.max_summary_length,
        })
    }
}

impl Summarizer for HttpSummarizer {
    #[instrument(level = "debug", skip_all, fields(chars = text.chars().count()))]
    async fn summarize(&self, text: &str) -> InferenceResult<String> {
        let body = json!({
            "inputs": text,
            "parameters": {
                "min_length": self.min_length,
                "max_length": self.max_length,
                "do_sample": false
            }
        });
        let outputs: Vec<SummaryOutput> = self.endpoint.post(&body).await?;
        outputs
            .into_iter()
            .next()
            .map(|o| o.summary_text)
            .ok_or_else(|| "summarization returned no output".into())
    }
}

/// Hosted sentiment classification model.
#[derive(Debug, Clone)]
pub struct HttpSentimentClassifier {
    endpoint: ModelEndpoint,
}

impl HttpSentimentClassifier {
    /// Build a client for `config.settings.sentiment_model`.
    pub fn new(config: &InferenceConfig) -> Result<Self, PipelineError> {
        let client = build_client(config)?;
        Ok(Self {
            endpoint: ModelEndpoint::new(client, config, &config.settings.sentiment_model)?,
        })
    }
}

impl SentimentClassifier for HttpSentimentClassifier {
    #[instrument(level = "debug", skip_all, fields(chars = text.chars().count()))]
    async fn classify(&self, text: &str) -> InferenceResult<Sentiment> {
        let body = json!({ "inputs": text });
        let output: ClassificationOutput = self.endpoint.post(&body).await?;
        let best = output
            .best()
            .ok_or("sentiment classification returned no labels")?;
        Ok(Sentiment {
            label: best.label,
            score: best.score.clamp(0.0, 1.0),
        })
    }
}

/// Both models, built once and reused for every article in a batch.
#[derive(Debug)]
pub struct InferenceModels {
    pub summarizer: Retry<HttpSummarizer>,
    pub classifier: Retry<HttpSentimentClassifier>,
}

impl InferenceModels {
    /// Build both model clients, each wrapped in [`Retry`].
    ///
    /// # Arguments
    ///
    /// * `config` - Validated endpoint, token and model settings
    ///
    /// # Returns
    ///
    /// Ready-to-use models. No request is made here; an unreachable
    /// endpoint only shows up as per-article fallbacks later.
    #[instrument(level = "info", skip_all, fields(endpoint = %config.endpoint))]
    pub fn load(config: &InferenceConfig) -> Result<Self, PipelineError> {
        let retries = config.settings.max_retries;
        let base = StdDuration::from_secs(1);
        let models = Self {
            summarizer: Retry::new(HttpSummarizer::new(config)?, retries, base),
            classifier: Retry::new(HttpSentimentClassifier::new(config)?, retries, base),
        };
        info!(
            summarization_model = %config.settings.summarization_model,
            sentiment_model = %config.settings.sentiment_model,
            "Loaded summarization and sentiment models"
        );
        Ok(models)
    }
}
