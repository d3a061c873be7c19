//! Command-line interface definitions.
//!
//! Global options can be given as flags or environment variables (a `.env`
//! file in the working directory is loaded first). Each subcommand maps to
//! one pipeline entry point.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{DEFAULT_FEED_URL, DEFAULT_INFERENCE_URL};

/// Command-line arguments.
///
/// # Examples
///
/// ```sh
/// # One stage at a time
/// mindscape_news fetch technology
/// mindscape_news normalize
/// mindscape_news enrich
///
/// # Full pass, then every three hours
/// mindscape_news schedule
///
/// # Dashboard overview of the last pass
/// mindscape_news report --markdown digest.md
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Directory holding the checkpoint files
    #[arg(short, long, env = "MINDSCAPE_DATA_DIR", default_value = ".", global = true)]
    pub data_dir: PathBuf,

    /// Optional path to a YAML settings file
    #[arg(short, long, env = "MINDSCAPE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// News API key
    #[arg(long, env = "NEWSAPI_KEY", hide_env_values = true, global = true)]
    pub newsapi_key: Option<String>,

    /// Headline search endpoint
    #[arg(long, env = "NEWSAPI_URL", default_value = DEFAULT_FEED_URL, global = true)]
    pub feed_url: String,

    /// Base URL of the hosted inference models
    #[arg(long, env = "INFERENCE_URL", default_value = DEFAULT_INFERENCE_URL, global = true)]
    pub inference_url: String,

    /// Bearer token for the inference endpoint
    #[arg(long, env = "HF_API_TOKEN", hide_env_values = true, global = true)]
    pub inference_token: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Fetch headlines into the raw checkpoint
    Fetch {
        /// Topic to search for; "general" or nothing fetches unfiltered headlines
        topic: Option<String>,
    },
    /// Clean, deduplicate and classify the raw checkpoint
    Normalize,
    /// Summarize and sentiment-label the cleaned checkpoint
    Enrich,
    /// Run fetch, normalize and enrich once
    Run {
        /// Topic for the fetch stage
        topic: Option<String>,
    },
    /// Run a pass now and then on a fixed interval until interrupted
    Schedule {
        /// Hours between passes (overrides the settings file)
        #[arg(long)]
        interval_hours: Option<u64>,
    },
    /// Print an overview of the enriched checkpoint
    Report {
        /// Also write a Markdown digest to this path
        #[arg(long)]
        markdown: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_with_topic() {
        let cli = Cli::parse_from(["mindscape_news", "fetch", "health"]);
        assert_eq!(
            cli.command,
            Command::Fetch {
                topic: Some("health".to_string())
            }
        );
        assert_eq!(cli.data_dir, PathBuf::from("."));
    }

    #[test]
    fn test_fetch_without_topic() {
        let cli = Cli::parse_from(["mindscape_news", "fetch"]);
        assert_eq!(cli.command, Command::Fetch { topic: None });
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from([
            "mindscape_news",
            "normalize",
            "--data-dir",
            "/tmp/news",
            "-c",
            "settings.yaml",
        ]);
        assert_eq!(cli.command, Command::Normalize);
        assert_eq!(cli.data_dir, PathBuf::from("/tmp/news"));
        assert_eq!(cli.config, Some(PathBuf::from("settings.yaml")));
    }

    #[test]
    fn test_schedule_interval_override() {
        let cli = Cli::parse_from(["mindscape_news", "schedule", "--interval-hours", "6"]);
        assert_eq!(
            cli.command,
            Command::Schedule {
                interval_hours: Some(6)
            }
        );
    }

    #[test]
    fn test_report_markdown_path() {
        let cli = Cli::parse_from(["mindscape_news", "-d", "data", "report", "--markdown", "out.md"]);
        assert_eq!(
            cli.command,
            Command::Report {
                markdown: Some(PathBuf::from("out.md"))
            }
        );
    }
}
