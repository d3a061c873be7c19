//! News feed client.
//!
//! Pages through the headline search endpoint and accumulates raw articles.
//! The client is deliberately forgiving: an empty page ends the walk
//! normally, and a non-success response or a transport error ends it early
//! with whatever was gathered so far. It never retries a page; deciding
//! whether a short result is a problem is the caller's job.

use crate::config::{FeedConfig, MAX_PAGE_SIZE};
use crate::error::PipelineError;
use crate::models::{FeedResponse, RawArticle};
use crate::utils::truncate_for_log;
use reqwest::Client;
use tracing::{debug, error, info, instrument, warn};

/// Topic value that means "no query filter".
pub const GENERAL_TOPIC: &str = "general";

/// Map the user-facing topic argument onto the feed's `q` parameter.
///
/// `None` and the `general` sentinel (any case) both mean an unrestricted
/// fetch.
pub fn topic_query(topic: Option<&str>) -> Option<&str> {
    topic
        .map(str::trim)
        .filter(|t| !t.is_empty() && !t.eq_ignore_ascii_case(GENERAL_TOPIC))
}

#[derive(Debug, Clone)]
pub struct FeedClient {
    client: Client,
    config: FeedConfig,
}

impl FeedClient {
    /// # Errors
    ///
    /// Returns [`PipelineError::Http`] if the HTTP client cannot be built.
    pub fn new(config: FeedConfig) -> Result<Self, PipelineError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("mindscape_news/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, config })
    }

    /// Fetch with the page size and page count from the configuration.
    pub async fn fetch_default(&self, topic: Option<&str>) -> Vec<RawArticle> {
        self.fetch(topic, self.config.page_size, self.config.max_pages)
            .await
    }

    /// Fetch up to `max_pages` pages of `page_size` articles each.
    ///
    /// Pages are requested in order starting at 1. Accumulation stops at the
    /// first empty page, the first non-success status, or the first
    /// transport/decoding failure.
    #[instrument(level = "info", skip(self), fields(query = ?topic_query(topic)))]
    pub async fn fetch(
        &self,
        topic: Option<&str>,
        page_size: u32,
        max_pages: u32,
    ) -> Vec<RawArticle> {
        let query = topic_query(topic);
        let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        let mut all_articles = Vec::new();

        for page in 1..=max_pages {
            let mut params: Vec<(&str, String)> = vec![
                ("apiKey", self.config.api_key.clone()),
                ("language", self.config.language.clone()),
                ("pageSize", page_size.to_string()),
                ("page", page.to_string()),
            ];
            if let Some(country) = &self.config.country {
                params.push(("country", country.clone()));
            }
            if let Some(q) = query {
                params.push(("q", q.to_string()));
            }

            info!(page, max_pages, country = ?self.config.country, "Fetching feed page");

            let resp = match self
                .client
                .get(self.config.endpoint.clone())
                .query(&params)
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(e) => {
                    error!(page, error = %e, "Feed request failed; stopping");
                    break;
                }
            };

            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                warn!(
                    page,
                    status = status.as_u16(),
                    body = %truncate_for_log(&body, 300),
                    "Feed returned non-success status; stopping"
                );
                break;
            }

            let data = match resp.json::<FeedResponse>().await {
                Ok(data) => data,
                Err(e) => {
                    error!(page, error = %e, "Feed response was not valid JSON; stopping");
                    break;
                }
            };

            if data.articles.is_empty() {
                debug!(page, "Empty page; end of results");
                break;
            }

            info!(
                page,
                count = data.articles.len(),
                status = ?data.status,
                total_results = ?data.total_results,
                "Retrieved feed page"
            );
            all_articles.extend(data.articles);
        }

        info!(count = all_articles.len(), "Feed fetch complete");
        all_articles
    }
}
