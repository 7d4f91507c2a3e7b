//! PDF download stage: `NEW → PDF_OK`.
//!
//! Downloads each pending paper's PDF into the PDF directory, records the
//! local path and a SHA-256 content hash, and advances the status. A file
//! already on disk from an earlier run is reused without re-downloading.

use anyhow::{anyhow, Result};
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use std::path::Path;
use tracing::{debug, info, instrument, warn};

use crate::db::{self, PaperPatch};
use crate::models::{Paper, Status};
use crate::pipeline::StageReport;
use crate::utils::ensure_writable_dir;

/// Run the PDF stage for one week.
#[instrument(level = "info", skip(pool, client, pdf_dir), fields(pdf_dir = %pdf_dir.display()))]
pub async fn run(
    pool: &SqlitePool,
    client: &reqwest::Client,
    week_id: &str,
    max_retries: i64,
    limit: Option<i64>,
    pdf_dir: &Path,
) -> Result<StageReport> {
    ensure_writable_dir(pdf_dir).await?;

    let candidates =
        db::get_papers_for_processing(pool, week_id, Status::PdfOk, max_retries, limit).await?;
    info!(count = candidates.len(), week_id, "papers pending PDF download");

    let mut report = StageReport::default();
    for paper in candidates {
        if paper.pdf_path.is_some() {
            // A later stage failed this paper; its PDF work is already done.
            debug!(paper_id = %paper.paper_id, "PDF already present, skipping");
            report.skipped += 1;
            continue;
        }

        match download_pdf(client, &paper, pdf_dir).await {
            Ok((path, sha256)) => {
                db::upsert_paper(
                    pool,
                    &paper.paper_id,
                    &paper.week_id,
                    PaperPatch {
                        pdf_path: Some(path.clone()),
                        pdf_sha256: Some(sha256),
                        ..Default::default()
                    },
                )
                .await?;
                // Advancing through update_status clears last_error from a
                // prior failed attempt; the merge upsert cannot.
                db::update_status(pool, &paper.paper_id, Status::PdfOk, None, false).await?;
                info!(paper_id = %paper.paper_id, path = %path, "PDF stored");
                report.advanced += 1;
            }
            Err(e) => {
                warn!(paper_id = %paper.paper_id, error = %e, "PDF download failed");
                db::update_status(
                    pool,
                    &paper.paper_id,
                    Status::Error,
                    Some(&e.to_string()),
                    true,
                )
                .await?;
                report.failed += 1;
            }
        }
    }

    info!(?report, week_id, "PDF stage complete");
    Ok(report)
}

/// Fetch one paper's PDF, reusing an existing non-empty file, and return the
/// stored path and SHA-256 hex digest.
async fn download_pdf(
    client: &reqwest::Client,
    paper: &Paper,
    pdf_dir: &Path,
) -> Result<(String, String)> {
    let dest = pdf_dir.join(format!("{}.pdf", paper.paper_id));

    let bytes = match tokio::fs::read(&dest).await {
        Ok(bytes) if !bytes.is_empty() => {
            debug!(paper_id = %paper.paper_id, "reusing PDF already on disk");
            bytes
        }
        _ => {
            let url = paper
                .pdf_url
                .as_deref()
                .ok_or_else(|| anyhow!("paper has no PDF URL"))?;
            let response = client.get(url).send().await?.error_for_status()?;
            let bytes = response.bytes().await?.to_vec();
            if bytes.is_empty() {
                return Err(anyhow!("empty response body from {url}"));
            }
            tokio::fs::write(&dest, &bytes).await?;
            bytes
        }
    };

    let sha256 = format!("{:x}", Sha256::digest(&bytes));
    Ok((dest.to_string_lossy().into_owned(), sha256))
}
