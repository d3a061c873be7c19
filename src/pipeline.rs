//! Pipeline runner.
//!
//! ```text
//! [no raw] --fetch--> [raw] --normalize--> [cleaned] --enrich--> [enriched]
//! ```
//!
//! Every stage reads its upstream checkpoint from disk and fully persists
//! its own output before returning, so a failure is confined to the stage
//! in progress and a later stage can be re-run on its own against whatever
//! checkpoint is currently on disk.

use crate::checkpoint::{Checkpoint, CheckpointStore};
use crate::config::InferenceSettings;
use crate::enrich::{EnrichReport, Enricher};
use crate::error::{PipelineError, Stage};
use crate::feed::FeedClient;
use crate::inference::{SentimentClassifier, Summarizer};
use crate::models::{CleanedArticle, RawArticle};
use crate::normalize::{LanguageDetector, NormalizeReport, Normalizer};
use std::time::{Duration, Instant};
use tracing::{info, instrument, warn};

/// Fetch from the feed and replace the raw checkpoint.
///
/// An empty result is written like any other; it is not an error.
#[instrument(level = "info", skip_all, fields(topic = ?topic))]
pub async fn fetch_stage(
    feed: &FeedClient,
    store: &CheckpointStore,
    topic: Option<&str>,
) -> Result<usize, PipelineError> {
    let articles = feed.fetch_default(topic).await;
    if articles.is_empty() {
        warn!("Feed returned no articles; writing an empty raw checkpoint");
    }
    store.save(Checkpoint::Raw, &articles).await?;
    Ok(articles.len())
}

/// Normalize the raw checkpoint into the cleaned checkpoint.
#[instrument(level = "info", skip_all)]
pub async fn normalize_stage<D: LanguageDetector>(
    store: &CheckpointStore,
    normalizer: &Normalizer<D>,
) -> Result<NormalizeReport, PipelineError> {
    let raw: Vec<RawArticle> = store.load(Checkpoint::Raw, Stage::Normalize).await?;
    let (cleaned, report) = normalizer.normalize(&raw);
    store.save(Checkpoint::Cleaned, &cleaned).await?;
    Ok(report)
}

/// Enrich the cleaned checkpoint into the enriched checkpoint.
#[instrument(level = "info", skip_all)]
pub async fn enrich_stage<S, C>(
    store: &CheckpointStore,
    summarizer: &S,
    classifier: &C,
    settings: &InferenceSettings,
) -> Result<EnrichReport, PipelineError>
where
    S: Summarizer,
    C: SentimentClassifier,
{
    let cleaned: Vec<CleanedArticle> = store.load(Checkpoint::Cleaned, Stage::Enrich).await?;
    let enricher = Enricher::new(summarizer, classifier, settings);
    let (processed, report) = enricher.enrich(&cleaned).await;
    store.save(Checkpoint::Enriched, &processed).await?;
    Ok(report)
}

/// Counts for one full pass.
#[derive(Debug, Clone, Default)]
pub struct PassReport {
    pub fetched: usize,
    pub normalize: NormalizeReport,
    pub enrich: EnrichReport,
    pub elapsed: Duration,
}

/// Everything one full pass needs, built once and reused across passes.
pub struct Pipeline<D, S, C> {
    feed: FeedClient,
    store: CheckpointStore,
    normalizer: Normalizer<D>,
    summarizer: S,
    classifier: C,
    inference: InferenceSettings,
}

impl<D, S, C> Pipeline<D, S, C>
where
    D: LanguageDetector,
    S: Summarizer,
    C: SentimentClassifier,
{
    pub fn new(
        feed: FeedClient,
        store: CheckpointStore,
        normalizer: Normalizer<D>,
        summarizer: S,
        classifier: C,
        inference: InferenceSettings,
    ) -> Self {
        Self {
            feed,
            store,
            normalizer,
            summarizer,
            classifier,
            inference,
        }
    }

    /// Run fetch, normalize and enrich in order.
    ///
    /// The first failing stage aborts the pass; checkpoints written by
    /// earlier stages stay on disk.
    #[instrument(level = "info", skip(self))]
    pub async fn run_pass(&self, topic: Option<&str>) -> Result<PassReport, PipelineError> {
        let t0 = Instant::now();
        info!("Running update pipeline");

        let fetched = fetch_stage(&self.feed, &self.store, topic).await?;
        let normalize = normalize_stage(&self.store, &self.normalizer).await?;
        let enrich = enrich_stage(
            &self.store,
            &self.summarizer,
            &self.classifier,
            &self.inference,
        )
        .await?;

        let report = PassReport {
            fetched,
            normalize,
            enrich,
            elapsed: t0.elapsed(),
        };
        info!(
            fetched = report.fetched,
            cleaned = report.normalize.kept,
            enriched = report.enrich.emitted,
            elapsed_ms = report.elapsed.as_millis(),
            "Pipeline pass completed"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FeedConfig, FeedSettings};
    use crate::inference::InferenceResult;
    use crate::models::{EnrichedArticle, Sentiment, Topic};
    use serde_json::json;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct AllEnglish;

    impl LanguageDetector for AllEnglish {
        fn detect(&self, _text: &str) -> String {
            "en".to_string()
        }
    }

    struct EchoSummarizer;

    impl Summarizer for EchoSummarizer {
        async fn summarize(&self, text: &str) -> InferenceResult<String> {
            Ok(format!("In short: {}", text.split_whitespace().take(3).collect::<Vec<_>>().join(" ")))
        }
    }

    struct Positive;

    impl SentimentClassifier for Positive {
        async fn classify(&self, _text: &str) -> InferenceResult<Sentiment> {
            Ok(Sentiment {
                label: "POSITIVE".to_string(),
                score: 0.75,
            })
        }
    }

    fn feed_client(base_url: &str) -> FeedClient {
        let settings = FeedSettings {
            max_pages: 1,
            ..Default::default()
        };
        let config = FeedConfig::new(Some("key"), base_url, &settings).unwrap();
        FeedClient::new(config).unwrap()
    }

    fn pipeline(base_url: &str, store: CheckpointStore) -> Pipeline<AllEnglish, EchoSummarizer, Positive> {
        Pipeline::new(
            feed_client(base_url),
            store,
            Normalizer::with_detector("en", AllEnglish),
            EchoSummarizer,
            Positive,
            InferenceSettings::default(),
        )
    }

    #[tokio::test]
    async fn normalize_without_raw_checkpoint_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(tmp.path());
        let normalizer = Normalizer::with_detector("en", AllEnglish);
        let err = normalize_stage(&store, &normalizer).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::MissingCheckpoint {
                stage: Stage::Normalize,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn enrich_without_cleaned_checkpoint_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(tmp.path());
        let err = enrich_stage(&store, &EchoSummarizer, &Positive, &InferenceSettings::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::MissingCheckpoint {
                stage: Stage::Enrich,
                ..
            }
        ));
        assert!(!store.path(Checkpoint::Enriched).exists());
    }

    #[tokio::test]
    async fn empty_raw_checkpoint_flows_through_as_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(tmp.path());
        store.save::<RawArticle>(Checkpoint::Raw, &[]).await.unwrap();

        let normalizer = Normalizer::with_detector("en", AllEnglish);
        let n = normalize_stage(&store, &normalizer).await.unwrap();
        let e = enrich_stage(&store, &EchoSummarizer, &Positive, &InferenceSettings::default())
            .await
            .unwrap();
        assert_eq!(n.kept, 0);
        assert_eq!(e.emitted, 0);

        let cleaned: Vec<CleanedArticle> =
            store.load(Checkpoint::Cleaned, Stage::Enrich).await.unwrap();
        let processed = store
            .load_optional::<EnrichedArticle>(Checkpoint::Enriched)
            .await
            .unwrap();
        assert!(cleaned.is_empty());
        assert_eq!(processed, Some(vec![]));
    }

    #[tokio::test]
    async fn full_pass_is_repeatable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "ok",
                "articles": [
                    {"source": {"name": "Wire"}, "title": "A", "url": "u1",
                     "content": "election news about policy", "description": null},
                    {"source": {"name": "Wire"}, "title": "A2", "url": "u1",
                     "content": "duplicate", "description": null},
                    {"source": {"name": "Wire"}, "title": "", "url": "u2",
                     "content": "...", "description": null}
                ]
            })))
            .mount(&server)
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let pipeline = pipeline(&server.uri(), CheckpointStore::new(tmp.path()));

        let first = pipeline.run_pass(None).await.unwrap();
        assert_eq!(first.fetched, 3);
        assert_eq!(first.normalize.kept, 1);
        assert_eq!(first.enrich.emitted, 1);

        let cleaned: Vec<CleanedArticle> = pipeline
            .store
            .load(Checkpoint::Cleaned, Stage::Enrich)
            .await
            .unwrap();
        assert_eq!(cleaned.len(), 1);
        assert_eq!(cleaned[0].url, "u1");
        assert_eq!(cleaned[0].topic, Topic::Politics);

        let before = std::fs::read(pipeline.store.path(Checkpoint::Enriched)).unwrap();
        pipeline.run_pass(None).await.unwrap();
        let after = std::fs::read(pipeline.store.path(Checkpoint::Enriched)).unwrap();
        assert_eq!(before, after);

        let processed: Vec<EnrichedArticle> =
            serde_json::from_slice(&after).unwrap();
        assert_eq!(processed[0].summary, "In short: election news about");
    }

    #[tokio::test]
    async fn failing_feed_produces_empty_checkpoints() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let pipeline = pipeline(&server.uri(), CheckpointStore::new(tmp.path()));
        let report = pipeline.run_pass(Some("health")).await.unwrap();
        assert_eq!(report.fetched, 0);
        assert_eq!(report.enrich.emitted, 0);
        assert!(pipeline.store.path(Checkpoint::Enriched).exists());
    }
}
