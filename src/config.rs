//! Runtime configuration.
//!
//! Tunables live in an optional YAML settings file; secrets and endpoints
//! come from the CLI (which falls back to environment variables). Both are
//! folded into explicit config structs that are validated once at startup
//! and then handed to the components that need them.

use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{info, instrument};
use url::Url;

pub const DEFAULT_FEED_URL: &str = "https://newsapi.org/v2/top-headlines";
pub const DEFAULT_INFERENCE_URL: &str = "https://api-inference.huggingface.co/models";

/// Largest page the feed endpoint accepts.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Longest schedule interval accepted (one year).
pub const MAX_INTERVAL_HOURS: u64 = 24 * 365;

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub feed: FeedSettings,
    pub inference: InferenceSettings,
    pub schedule: ScheduleSettings,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FeedSettings {
    pub page_size: u32,
    pub max_pages: u32,
    /// Two-letter code sent to the feed and used as the target language.
    pub language: String,
    pub country: Option<String>,
    pub timeout_secs: u64,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            page_size: 50,
            max_pages: 2,
            language: "en".to_string(),
            country: None,
            timeout_secs: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct InferenceSettings {
    pub summarization_model: String,
    pub sentiment_model: String,
    /// Summarizer input is cut to this many characters.
    pub max_input_chars: usize,
    pub min_summary_length: u32,
    pub max_summary_length: u32,
    /// Characters of cleaned body kept by the fallback summary.
    pub fallback_chars: usize,
    pub max_retries: usize,
    /// Per-request timeout.
    pub timeout_secs: u64,
    /// Wall-clock budget for enriching one batch; `0` disables it.
    pub batch_budget_secs: u64,
}

impl Default for InferenceSettings {
    fn default() -> Self {
        Self {
            summarization_model: "sshleifer/distilbart-cnn-12-6".to_string(),
            sentiment_model: "distilbert/distilbert-base-uncased-finetuned-sst-2-english"
                .to_string(),
            max_input_chars: 2000,
            min_summary_length: 30,
            max_summary_length: 130,
            fallback_chars: 300,
            max_retries: 2,
            timeout_secs: 30,
            batch_budget_secs: 60 * 60,
        }
    }
}

impl InferenceSettings {
    pub fn batch_budget(&self) -> Option<Duration> {
        (self.batch_budget_secs > 0).then(|| Duration::from_secs(self.batch_budget_secs))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ScheduleSettings {
    pub interval_hours: u64,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self { interval_hours: 3 }
    }
}

impl ScheduleSettings {
    /// The pass interval, clamped to `1..=MAX_INTERVAL_HOURS` hours.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_hours.clamp(1, MAX_INTERVAL_HOURS) * 60 * 60)
    }
}

impl Settings {
    /// Load settings from a YAML file, or defaults when no path is given.
    #[instrument(level = "info", skip_all)]
    pub fn load(path: Option<&Path>) -> Result<Self, PipelineError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
        let settings = Self::from_yaml(&text)
            .map_err(|e| PipelineError::Config(format!("{}: {e}", path.display())))?;
        info!(path = %path.display(), "Loaded settings file");
        Ok(settings)
    }

    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }
}

/// Everything the feed client needs, validated.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    pub api_key: String,
    pub endpoint: Url,
    pub language: String,
    pub country: Option<String>,
    pub page_size: u32,
    pub max_pages: u32,
    pub timeout: Duration,
}

impl FeedConfig {
    /// Build and validate the feed configuration.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] when the API key is missing or blank,
    /// the endpoint is not a URL, or the page size is outside `1..=100`.
    pub fn new(
        api_key: Option<&str>,
        endpoint: &str,
        settings: &FeedSettings,
    ) -> Result<Self, PipelineError> {
        let api_key = api_key
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                PipelineError::Config(
                    "NEWSAPI_KEY is not set; export it, put it in .env, or pass --newsapi-key"
                        .to_string(),
                )
            })?;
        let endpoint = Url::parse(endpoint)
            .map_err(|e| PipelineError::Config(format!("invalid feed URL '{endpoint}': {e}")))?;
        if settings.page_size == 0 || settings.page_size > MAX_PAGE_SIZE {
            return Err(PipelineError::Config(format!(
                "page_size must be between 1 and {MAX_PAGE_SIZE}, got {}",
                settings.page_size
            )));
        }
        if settings.language.trim().is_empty() {
            return Err(PipelineError::Config("feed language must not be empty".to_string()));
        }

        Ok(Self {
            api_key: api_key.to_string(),
            endpoint,
            language: settings.language.trim().to_lowercase(),
            country: settings.country.clone().filter(|c| !c.trim().is_empty()),
            page_size: settings.page_size,
            max_pages: settings.max_pages,
            timeout: Duration::from_secs(settings.timeout_secs),
        })
    }
}

/// Endpoint and model parameters for the inference capabilities.
#[derive(Debug, Clone)]
pub struct InferenceConfig {
    pub endpoint: Url,
    pub token: Option<String>,
    pub settings: InferenceSettings,
}

impl InferenceConfig {
    pub fn new(
        endpoint: &str,
        token: Option<&str>,
        settings: &InferenceSettings,
    ) -> Result<Self, PipelineError> {
        let normalised = format!("{}/", endpoint.trim_end_matches('/'));
        let endpoint = Url::parse(&normalised).map_err(|e| {
            PipelineError::Config(format!("invalid inference URL '{endpoint}': {e}"))
        })?;
        if settings.min_summary_length > settings.max_summary_length {
            return Err(PipelineError::Config(format!(
                "min_summary_length ({}) exceeds max_summary_length ({})",
                settings.min_summary_length, settings.max_summary_length
            )));
        }
        Ok(Self {
            endpoint,
            token: token.map(str::to_string).filter(|t| !t.trim().is_empty()),
            settings: settings.clone(),
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.settings.timeout_secs)
    }
}
