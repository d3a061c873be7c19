//! Read-only view over the enriched checkpoint for dashboards.
//!
//! This is the presentation boundary: it never writes to the data
//! directory. Older enriched files stored sentiment as a bare label string;
//! [`SentimentField`] accepts both shapes so nothing downstream has to care.
//!
//! Enriched records carry no topic. The topic breakdown is recovered by
//! joining on url against the cleaned checkpoint, when one is present;
//! a `topic` key written into the enriched file itself takes precedence.

use crate::checkpoint::{Checkpoint, CheckpointStore};
use crate::error::PipelineError;
use crate::models::{CleanedArticle, Sentiment};
use itertools::Itertools;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt::Write;
use tracing::{info, instrument, warn};

/// Sentiment as found in an enriched file, structured or legacy.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SentimentField {
    Structured(Sentiment),
    Legacy(String),
}

impl SentimentField {
    pub fn label(&self) -> &str {
        match self {
            SentimentField::Structured(s) => &s.label,
            SentimentField::Legacy(label) => label,
        }
    }

    /// Legacy labels carry no confidence.
    pub fn score(&self) -> Option<f64> {
        match self {
            SentimentField::Structured(s) => Some(s.score),
            SentimentField::Legacy(_) => None,
        }
    }
}

/// One enriched record as the dashboard reads it. Every field is optional
/// so hand-edited or older files still render.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DashboardArticle {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub sentiment: Option<SentimentField>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
}

impl DashboardArticle {
    fn sentiment_label(&self) -> Option<&str> {
        self.sentiment
            .as_ref()
            .map(SentimentField::label)
            .filter(|l| !l.is_empty() && !l.eq_ignore_ascii_case("nan"))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overview {
    pub total: usize,
    pub unique_sources: usize,
    pub average_score: Option<f64>,
    /// Label counts, most frequent first.
    pub sentiment_counts: Vec<(String, usize)>,
    pub topic_counts: Vec<(String, usize)>,
}

/// Load the enriched checkpoint, or `None` when no pass has produced one.
#[instrument(level = "info", skip_all, fields(dir = %store.dir().display()))]
pub async fn load_dashboard(
    store: &CheckpointStore,
) -> Result<Option<Vec<DashboardArticle>>, PipelineError> {
    let Some(mut articles) = store
        .load_optional::<DashboardArticle>(Checkpoint::Enriched)
        .await?
    else {
        return Ok(None);
    };
    info!(count = articles.len(), "Loaded processed articles");

    match store.load_optional::<CleanedArticle>(Checkpoint::Cleaned).await {
        Ok(Some(cleaned)) => attach_topics(&mut articles, &cleaned),
        Ok(None) => {}
        Err(e) => warn!(error = %e, "Cleaned checkpoint unreadable; topic breakdown unavailable"),
    }
    Ok(Some(articles))
}

/// Fill in missing topics from cleaned records with the same url.
fn attach_topics(articles: &mut [DashboardArticle], cleaned: &[CleanedArticle]) {
    let topics: HashMap<&str, String> = cleaned
        .iter()
        .map(|c| (c.url.as_str(), c.topic.to_string()))
        .collect();
    for article in articles.iter_mut().filter(|a| a.topic.is_none()) {
        if let Some(topic) = article.url.as_deref().and_then(|u| topics.get(u)) {
            article.topic = Some(topic.clone());
        }
    }
}

fn ranked<'a>(items: impl Iterator<Item = &'a str>) -> Vec<(String, usize)> {
    items
        .counts()
        .into_iter()
        .map(|(k, n)| (k.to_string(), n))
        .sorted_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)))
        .collect()
}

pub fn overview(articles: &[DashboardArticle]) -> Overview {
    let scores: Vec<f64> = articles
        .iter()
        .filter_map(|a| a.sentiment.as_ref().and_then(SentimentField::score))
        .collect();
    let average_score = if scores.is_empty() {
        None
    } else {
        Some(scores.iter().sum::<f64>() / scores.len() as f64)
    };

    Overview {
        total: articles.len(),
        unique_sources: articles
            .iter()
            .filter_map(|a| a.source.as_deref())
            .unique()
            .count(),
        average_score,
        sentiment_counts: ranked(articles.iter().filter_map(DashboardArticle::sentiment_label)),
        topic_counts: ranked(articles.iter().filter_map(|a| a.topic.as_deref())),
    }
}

pub fn render_overview(overview: &Overview) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Total articles:    {}", overview.total);
    let _ = writeln!(out, "Unique sources:    {}", overview.unique_sources);
    match overview.average_score {
        Some(avg) => {
            let _ = writeln!(out, "Average sentiment: {avg:.2}");
        }
        None => {
            let _ = writeln!(out, "Average sentiment: N/A");
        }
    }

    if overview.sentiment_counts.is_empty() {
        let _ = writeln!(out, "\nNo sentiment data found.");
    } else {
        let _ = writeln!(out, "\nSentiment breakdown:");
        for (label, count) in &overview.sentiment_counts {
            let _ = writeln!(out, "  {label:<12} {count}");
        }
    }

    if !overview.topic_counts.is_empty() {
        let _ = writeln!(out, "\nTopic categories:");
        for (topic, count) in &overview.topic_counts {
            let _ = writeln!(out, "  {topic:<14} {count}");
        }
    }
    out
}

/// Markdown digest of the latest summarized articles.
pub fn render_markdown(articles: &[DashboardArticle]) -> String {
    let mut md = String::new();
    let _ = writeln!(md, "# Latest Summarized Articles\n");

    for article in articles {
        let title = article.title.as_deref().unwrap_or("No Title");
        match article.url.as_deref() {
            Some(url) => {
                let _ = writeln!(md, "## [{title}]({url})\n");
            }
            None => {
                let _ = writeln!(md, "## {title}\n");
            }
        }
        let _ = writeln!(
            md,
            "{}\n",
            article.summary.as_deref().unwrap_or("No summary available.")
        );

        let sentiment = match &article.sentiment {
            Some(SentimentField::Structured(s)) => format!("{} ({:.2})", s.label, s.score),
            Some(SentimentField::Legacy(label)) => label.clone(),
            None => "N/A".to_string(),
        };
        let _ = writeln!(
            md,
            "**Sentiment:** {} | **Source:** {}\n",
            sentiment,
            article.source.as_deref().unwrap_or("N/A")
        );
    }
    md
}
