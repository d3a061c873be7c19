//! Error taxonomy for stage-level failures.
//!
//! Per-record noise (duplicates, untitled or foreign-language articles) and
//! inference failures never surface here: those are handled inside the
//! normalizer and enricher. What remains are the failures that abort a
//! stage invocation or a whole pass.

use std::path::PathBuf;
use thiserror::Error;

/// Stages that depend on an upstream checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Normalize,
    Enrich,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Normalize => "normalize",
            Stage::Enrich => "enrich",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{stage} stage requires {}; run the previous stage first", path.display())]
    MissingCheckpoint { stage: Stage, path: PathBuf },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed checkpoint {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("inference error: {0}")]
    Inference(String),
}

impl PipelineError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_checkpoint_names_stage_and_file() {
        let err = PipelineError::MissingCheckpoint {
            stage: Stage::Normalize,
            path: PathBuf::from("data/raw_articles.json"),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("normalize stage requires data/raw_articles.json"));
    }

    #[test]
    fn stage_display() {
        assert_eq!(Stage::Normalize.to_string(), "normalize");
        assert_eq!(Stage::Enrich.to_string(), "enrich");
    }
}
