//! Enricher: cleaned articles to summarized, sentiment-labelled records.
//!
//! The two models are borrowed for the whole batch. A failed inference
//! call never drops an article: the summary falls back to a truncated
//! prefix of the body and the sentiment to [`Sentiment::neutral`]. Only
//! articles with no body text are skipped.
//!
//! A batch has a wall-clock budget. Once it is spent, the remaining
//! articles get both fallbacks without calling the models, so a hanging
//! endpoint cannot stretch one pass past the next scheduled one. The check
//! runs between articles; the article in flight is allowed to finish.

use crate::config::InferenceSettings;
use crate::inference::{SentimentClassifier, Summarizer};
use crate::models::{CleanedArticle, EnrichedArticle, Sentiment};
use crate::utils::truncate_chars;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// Appended to a fallback summary to mark it as a truncated body.
pub const TRUNCATION_MARKER: &str = "...";

/// Fallback summary: the first `max_chars` characters plus the marker.
pub fn fallback_summary(content: &str, max_chars: usize) -> String {
    format!("{}{}", truncate_chars(content, max_chars), TRUNCATION_MARKER)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichReport {
    pub input: usize,
    pub emitted: usize,
    pub skipped_empty: usize,
    pub summary_fallbacks: usize,
    pub sentiment_fallbacks: usize,
    /// Articles that got fallbacks because the batch budget was spent.
    pub over_budget: usize,
}

pub struct Enricher<'a, S, C> {
    summarizer: &'a S,
    classifier: &'a C,
    max_input_chars: usize,
    fallback_chars: usize,
    budget: Option<Duration>,
}

impl<'a, S, C> Enricher<'a, S, C>
where
    S: Summarizer,
    C: SentimentClassifier,
{
    pub fn new(summarizer: &'a S, classifier: &'a C, settings: &InferenceSettings) -> Self {
        Self {
            summarizer,
            classifier,
            max_input_chars: settings.max_input_chars,
            fallback_chars: settings.fallback_chars,
            budget: settings.batch_budget(),
        }
    }

    /// Enrich every article with a non-empty body, in input order.
    #[instrument(level = "info", skip_all, fields(input = cleaned.len()))]
    pub async fn enrich(&self, cleaned: &[CleanedArticle]) -> (Vec<EnrichedArticle>, EnrichReport) {
        let mut report = EnrichReport {
            input: cleaned.len(),
            ..Default::default()
        };
        let mut processed = Vec::with_capacity(cleaned.len());
        let started = Instant::now();

        for (index, article) in cleaned.iter().enumerate() {
            if article.content.trim().is_empty() {
                debug!(index, url = %article.url, "Skipping article with empty body");
                report.skipped_empty += 1;
                continue;
            }

            if self.budget.is_some_and(|b| started.elapsed() >= b) {
                if report.over_budget == 0 {
                    warn!(
                        index,
                        remaining = cleaned.len() - index,
                        "Enrichment budget spent; using fallbacks for the rest of the batch"
                    );
                }
                report.over_budget += 1;
                report.summary_fallbacks += 1;
                report.sentiment_fallbacks += 1;
                processed.push(EnrichedArticle {
                    title: article.title.clone(),
                    source: article.source.clone(),
                    summary: fallback_summary(&article.content, self.fallback_chars),
                    sentiment: Sentiment::neutral(),
                    url: article.url.clone(),
                });
                continue;
            }

            let input = truncate_chars(&article.content, self.max_input_chars);
            let summary = match self.summarizer.summarize(input).await {
                Ok(summary) if !summary.trim().is_empty() => summary.trim().to_string(),
                Ok(_) => {
                    warn!(index, url = %article.url, "Model returned an empty summary; using fallback");
                    report.summary_fallbacks += 1;
                    fallback_summary(&article.content, self.fallback_chars)
                }
                Err(e) => {
                    warn!(index, url = %article.url, error = %e, "Summarization failed; using fallback");
                    report.summary_fallbacks += 1;
                    fallback_summary(&article.content, self.fallback_chars)
                }
            };

            let sentiment = match self.classifier.classify(&summary).await {
                Ok(sentiment) => sentiment,
                Err(e) => {
                    warn!(index, url = %article.url, error = %e, "Sentiment failed; using neutral");
                    report.sentiment_fallbacks += 1;
                    Sentiment::neutral()
                }
            };

            debug!(index, url = %article.url, label = %sentiment.label, "Enriched article");
            processed.push(EnrichedArticle {
                title: article.title.clone(),
                source: article.source.clone(),
                summary,
                sentiment,
                url: article.url.clone(),
            });
        }

        report.emitted = processed.len();
        info!(
            emitted = report.emitted,
            skipped_empty = report.skipped_empty,
            summary_fallbacks = report.summary_fallbacks,
            sentiment_fallbacks = report.sentiment_fallbacks,
            over_budget = report.over_budget,
            "Enriched articles"
        );
        (processed, report)
    }
}
