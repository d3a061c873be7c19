//! Checkpoint files between pipeline stages.
//!
//! # Layout
//!
//! ```text
//! data_dir/
//! ├── raw_articles.json      # feed-native articles, unmodified
//! ├── cleaned_articles.json  # {title, url, source, content, topic}
//! └── processed.json         # {title, source, summary, sentiment, url}
//! ```
//!
//! Each file is a pretty-printed UTF-8 JSON array that is wholly replaced on
//! every write. Writes go to a sibling temp file that is then renamed over
//! the target, so a reader sees either the previous or the new checkpoint.

use crate::error::{PipelineError, Stage};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Checkpoint {
    Raw,
    Cleaned,
    Enriched,
}

impl Checkpoint {
    pub fn file_name(self) -> &'static str {
        match self {
            Checkpoint::Raw => "raw_articles.json",
            Checkpoint::Cleaned => "cleaned_articles.json",
            Checkpoint::Enriched => "processed.json",
        }
    }
}

/// The directory holding the three checkpoint files.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    dir: PathBuf,
}

impl CheckpointStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, checkpoint: Checkpoint) -> PathBuf {
        self.dir.join(checkpoint.file_name())
    }

    /// Load a checkpoint that `stage` depends on.
    ///
    /// # Errors
    ///
    /// [`PipelineError::MissingCheckpoint`] if the file does not exist;
    /// I/O or JSON errors otherwise.
    #[instrument(level = "info", skip(self), fields(dir = %self.dir.display()))]
    pub async fn load<T: DeserializeOwned>(
        &self,
        checkpoint: Checkpoint,
        stage: Stage,
    ) -> Result<Vec<T>, PipelineError> {
        match self.load_optional(checkpoint).await? {
            Some(records) => Ok(records),
            None => Err(PipelineError::MissingCheckpoint {
                stage,
                path: self.path(checkpoint),
            }),
        }
    }

    /// Load a checkpoint, or `None` if it has never been written.
    pub async fn load_optional<T: DeserializeOwned>(
        &self,
        checkpoint: Checkpoint,
    ) -> Result<Option<Vec<T>>, PipelineError> {
        let path = self.path(checkpoint);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(PipelineError::io(path, e)),
        };
        let records: Vec<T> =
            serde_json::from_slice(&bytes).map_err(|source| PipelineError::Json {
                path: path.clone(),
                source,
            })?;
        debug!(path = %path.display(), count = records.len(), "Loaded checkpoint");
        Ok(Some(records))
    }

    /// Replace a checkpoint with `records`.
    #[instrument(level = "info", skip_all, fields(file = checkpoint.file_name(), count = records.len()))]
    pub async fn save<T: Serialize>(
        &self,
        checkpoint: Checkpoint,
        records: &[T],
    ) -> Result<(), PipelineError> {
        let path = self.path(checkpoint);
        let json = serde_json::to_vec_pretty(records).map_err(|source| PipelineError::Json {
            path: path.clone(),
            source,
        })?;

        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| PipelineError::io(&self.dir, e))?;

        let tmp_path = self.dir.join(format!(".{}.tmp", checkpoint.file_name()));
        fs::write(&tmp_path, json)
            .await
            .map_err(|e| PipelineError::io(&tmp_path, e))?;
        fs::rename(&tmp_path, &path)
            .await
            .map_err(|e| PipelineError::io(&path, e))?;

        info!(path = %path.display(), count = records.len(), "Wrote checkpoint");
        Ok(())
    }
}
