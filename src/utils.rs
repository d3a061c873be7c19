//! Small helpers shared across stages: char-safe truncation and a
//! writability probe for the checkpoint directory.

use crate::error::PipelineError;
use std::fs as stdfs;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Longest prefix of `s` containing at most `max_chars` characters.
///
/// Never splits a multi-byte character.
///
/// # Arguments
///
/// * `s` - The text to cut
/// * `max_chars` - Maximum number of characters (not bytes) to keep
///
/// # Returns
///
/// A borrowed prefix of `s`; `s` itself when it is already short enough.
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to `max` characters with an ellipsis and byte count
/// indicator appended.
///
/// # Arguments
///
/// * `s` - The string to truncate
/// * `max` - Maximum number of characters to keep before the indicator
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    let head = truncate_chars(s, max);
    if head.len() == s.len() {
        s.to_string()
    } else {
        format!("{}…(+{} bytes)", head, s.len() - head.len())
    }
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then creates and removes a probe file.
///
/// # Arguments
///
/// * `path` - The checkpoint directory
///
/// # Errors
///
/// Returns an error if the directory cannot be created or is not writable.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<(), PipelineError> {
    fs::create_dir_all(path)
        .await
        .map_err(|e| PipelineError::io(path, e))?;
    // Sync probe keeps the error surface simple.
    let probe_path = path.join("..__probe_write__");
    stdfs::File::create(&probe_path).map_err(|e| PipelineError::io(&probe_path, e))?;
    let _ = stdfs::remove_file(&probe_path);
    info!("Data directory is writable");
    Ok(())
}
