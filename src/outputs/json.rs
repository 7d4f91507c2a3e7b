//! JSON digest output.
//!
//! Serializes the weekly digest for consumption by external clients; the
//! field layout is a published schema shared with the browser front-end.

use anyhow::Result;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

use crate::models::WeekDigest;

/// Write a digest as pretty-printed JSON to `{digest_dir}/{week_id}.json`.
#[instrument(level = "info", skip_all, fields(week_id = %digest.week_id))]
pub async fn write_digest(digest: &WeekDigest, digest_dir: &Path) -> Result<PathBuf> {
    let path = digest_dir.join(format!("{}.json", digest.week_id));
    let json = serde_json::to_string_pretty(digest)?;
    fs::write(&path, json).await?;
    info!(path = %path.display(), "wrote JSON digest");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DigestPaper, DigestStats, Status};

    fn sample_digest() -> WeekDigest {
        WeekDigest {
            week_id: "2026-03".to_string(),
            year: 2026,
            week: 3,
            generated_at: "2026-01-18T10:00:00.000000Z".to_string(),
            total_papers: 1,
            papers: vec![DigestPaper {
                paper_id: "2601.03252".to_string(),
                title: Some("A Paper".to_string()),
                hf_url: Some("https://huggingface.co/papers/2601.03252".to_string()),
                pdf_url: Some("https://arxiv.org/pdf/2601.03252.pdf".to_string()),
                pdf_path: Some("data/pdfs/2601.03252.pdf".to_string()),
                video_path: Some("data/videos/2601.03252.mp4".to_string()),
                status: Status::VideoOk,
            }],
            stats: DigestStats {
                total: 3,
                video_ok: 1,
                pdf_ok: 1,
                new: 1,
                error: 0,
            },
        }
    }

    #[tokio::test]
    async fn test_write_digest_schema_fields() {
        let tmp = tempfile::tempdir().unwrap();
        let path = write_digest(&sample_digest(), tmp.path()).await.unwrap();
        assert_eq!(path.file_name().unwrap(), "2026-03.json");

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["week_id"], "2026-03");
        assert_eq!(value["stats"]["video_ok"], 1);
        assert_eq!(value["papers"][0]["status"], "VIDEO_OK");
        assert_eq!(value["total_papers"], 1);
    }
}
