//! # MindScape News
//!
//! Pulls headlines from a news search API, cleans and classifies them, and
//! adds model-generated summaries and sentiment labels for a dashboard.
//!
//! ## Usage
//!
//! ```sh
//! mindscape_news fetch technology   # raw_articles.json
//! mindscape_news normalize          # cleaned_articles.json
//! mindscape_news enrich             # processed.json
//! mindscape_news run                # all three
//! mindscape_news schedule           # all three now, then every 3 hours
//! mindscape_news report             # overview of processed.json
//! ```
//!
//! ## Architecture
//!
//! Three stages connected by checkpoint files in the data directory:
//! 1. **Fetch**: page through the feed endpoint into the raw checkpoint
//! 2. **Normalize**: dedupe, clean, language-filter and classify
//! 3. **Enrich**: summarize and label sentiment, with per-article fallbacks
//!
//! Each stage fully writes its checkpoint before the next one starts.

use clap::Parser;
use std::error::Error;
use std::time::Instant;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod checkpoint;
mod cli;
mod config;
mod enrich;
mod error;
mod feed;
mod inference;
mod models;
mod normalize;
mod pipeline;
mod report;
mod scheduler;
mod utils;

use checkpoint::CheckpointStore;
use cli::{Cli, Command};
use config::{FeedConfig, InferenceConfig, Settings};
use feed::FeedClient;
use inference::{HttpSentimentClassifier, HttpSummarizer, InferenceModels, Retry};
use normalize::{Normalizer, WhatlangDetector};
use pipeline::{Pipeline, enrich_stage, fetch_stage, normalize_stage};
use utils::ensure_writable_dir;

type ScheduledPipeline =
    Pipeline<WhatlangDetector, Retry<HttpSummarizer>, Retry<HttpSentimentClassifier>>;

fn feed_client(args: &Cli, settings: &Settings) -> Result<FeedClient, error::PipelineError> {
    let config = FeedConfig::new(args.newsapi_key.as_deref(), &args.feed_url, &settings.feed)?;
    FeedClient::new(config)
}

fn inference_config(
    args: &Cli,
    settings: &Settings,
) -> Result<InferenceConfig, error::PipelineError> {
    InferenceConfig::new(
        &args.inference_url,
        args.inference_token.as_deref(),
        &settings.inference,
    )
}

fn build_pipeline(
    args: &Cli,
    settings: &Settings,
    store: CheckpointStore,
) -> Result<ScheduledPipeline, error::PipelineError> {
    let feed = feed_client(args, settings)?;
    let models = InferenceModels::load(&inference_config(args, settings)?)?;
    Ok(Pipeline::new(
        feed,
        store,
        Normalizer::new(&settings.feed.language),
        models.summarizer,
        models.classifier,
        settings.inference.clone(),
    ))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenvy::dotenv().ok();

    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = Instant::now();
    let args = Cli::parse();
    debug!(data_dir = %args.data_dir.display(), command = ?args.command, "Parsed CLI arguments");

    let mut settings = Settings::load(args.config.as_deref())?;
    let store = CheckpointStore::new(&args.data_dir);

    match &args.command {
        Command::Fetch { topic } => {
            let feed = feed_client(&args, &settings)?;
            ensure_writable_dir(store.dir()).await?;
            let count = fetch_stage(&feed, &store, topic.as_deref()).await?;
            info!(count, "Saved raw articles");
        }
        Command::Normalize => {
            let normalizer = Normalizer::new(&settings.feed.language);
            let report = normalize_stage(&store, &normalizer).await?;
            info!(kept = report.kept, input = report.input, "Saved cleaned & classified articles");
        }
        Command::Enrich => {
            let models = InferenceModels::load(&inference_config(&args, &settings)?)?;
            let report = enrich_stage(
                &store,
                &models.summarizer,
                &models.classifier,
                &settings.inference,
            )
            .await?;
            info!(
                emitted = report.emitted,
                input = report.input,
                "Saved summarized + sentiment-labeled articles"
            );
        }
        Command::Run { topic } => {
            ensure_writable_dir(store.dir()).await?;
            let pipeline = build_pipeline(&args, &settings, store)?;
            pipeline.run_pass(topic.as_deref()).await?;
        }
        Command::Schedule { interval_hours } => {
            if let Some(hours) = interval_hours {
                settings.schedule.interval_hours = *hours;
            }
            ensure_writable_dir(store.dir()).await?;
            let pipeline = build_pipeline(&args, &settings, store)?;
            let passes = scheduler::run_every(
                settings.schedule.interval(),
                scheduler::shutdown_signal(),
                || pipeline.run_pass(None),
            )
            .await;
            info!(passes, "Scheduler stopped");
        }
        Command::Report { markdown } => match report::load_dashboard(&store).await? {
            None => {
                println!("No processed data found. Run the summarization pipeline first.");
            }
            Some(articles) => {
                let overview = report::overview(&articles);
                print!("{}", report::render_overview(&overview));
                if let Some(path) = markdown {
                    tokio::fs::write(path, report::render_markdown(&articles)).await?;
                    info!(path = %path.display(), "Wrote Markdown digest");
                }
            }
        },
    }

    let elapsed = start_time.elapsed();
    info!(?elapsed, secs = elapsed.as_secs(), "Execution complete");
    Ok(())
}
