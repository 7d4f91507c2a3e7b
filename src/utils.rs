//! Small helpers: timestamps, log truncation, and output directory checks.

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use std::fs as stdfs;
use std::path::Path;
use tokio::fs;
use tracing::info;

/// Current UTC time as an RFC 3339 string with microsecond precision.
///
/// Microseconds keep consecutive writes in the same process distinguishable,
/// which `updated_at` ordering relies on.
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Truncate a string for logging, noting how many bytes were dropped.
/// Cuts on a character boundary at or below `max` bytes.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Ensure a directory exists and is writable by probing a throwaway file.
pub async fn ensure_writable_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)
        .await
        .with_context(|| format!("creating directory {}", path.display()))?;

    let probe_path = path.join("..__probe_write__");
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!(path = %path.display(), "output directory is writable");
            Ok(())
        }
        Err(e) => Err(e).with_context(|| format!("directory {} is not writable", path.display())),
    }
}
