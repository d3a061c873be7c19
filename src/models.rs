//! Data models for the three pipeline checkpoints.
//!
//! - [`RawArticle`]: an article exactly as the news feed returned it
//! - [`CleanedArticle`]: deduplicated, cleaned, language-filtered and classified
//! - [`EnrichedArticle`]: a cleaned article with a summary and a [`Sentiment`]
//!
//! Field names follow the checkpoint JSON layout, so the raw model keeps the
//! feed's camelCase keys while the derived models use plain lower-case keys.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// A news article as returned by the feed endpoint.
///
/// The feed object is kept as-is, so the raw checkpoint is written back
/// exactly as received: no keys added, none dropped. The accessors give a
/// typed view of the fields this crate interprets; a missing key, a
/// `null` or a non-string value all read as `None`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct RawArticle {
    fields: Map<String, Value>,
}

impl RawArticle {
    fn text(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    pub fn title(&self) -> Option<&str> {
        self.text("title")
    }

    pub fn url(&self) -> Option<&str> {
        self.text("url")
    }

    pub fn content(&self) -> Option<&str> {
        self.text("content")
    }

    pub fn description(&self) -> Option<&str> {
        self.text("description")
    }

    /// Body text candidate: `content`, then `description`, then empty.
    ///
    /// Empty strings count as missing, matching how the feed pads articles
    /// it could not extract.
    pub fn body(&self) -> &str {
        [self.content(), self.description()]
            .into_iter()
            .flatten()
            .find(|s| !s.is_empty())
            .unwrap_or("")
    }

    /// Publisher name from the nested `source` block.
    pub fn source_name(&self) -> Option<String> {
        self.fields
            .get("source")
            .and_then(|s| s.get("name"))
            .and_then(Value::as_str)
            .map(str::to_string)
    }
}

/// Envelope returned by the feed search endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct FeedResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, rename = "totalResults")]
    pub total_results: Option<u64>,
    #[serde(default)]
    pub articles: Vec<RawArticle>,
}

/// Coarse topic category assigned by keyword rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
pub enum Topic {
    Sports,
    Crime,
    Politics,
    Technology,
    Entertainment,
    General,
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Topic::Sports => "Sports",
            Topic::Crime => "Crime",
            Topic::Politics => "Politics",
            Topic::Technology => "Technology",
            Topic::Entertainment => "Entertainment",
            Topic::General => "General",
        };
        f.write_str(name)
    }
}

/// An article that survived normalization.
///
/// Invariants: `title` is non-empty and trimmed, `url` is unique within a
/// cleaned checkpoint, and `content` was detected as the target language.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CleanedArticle {
    pub title: String,
    pub url: String,
    pub source: Option<String>,
    pub content: String,
    pub topic: Topic,
}

/// Label used when the sentiment model could not score a text.
pub const NEUTRAL_LABEL: &str = "neutral";

/// Sentiment label with the model's confidence in `[0.0, 1.0]`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Sentiment {
    pub label: String,
    pub score: f64,
}

impl Sentiment {
    /// The fallback sentiment: neutral with zero confidence.
    pub fn neutral() -> Self {
        Self {
            label: NEUTRAL_LABEL.to_string(),
            score: 0.0,
        }
    }
}

/// Final output record consumed by the dashboard.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EnrichedArticle {
    pub title: String,
    pub source: Option<String>,
    pub summary: String,
    pub sentiment: Sentiment,
    pub url: String,
}
