//! Note-generation stage: `PDF_OK → NBLM_OK`.
//!
//! Thin client for a hosted notebook-audio note service. The service is an
//! external collaborator; this stage posts the paper's details to a
//! configured endpoint and stores the opaque reference it returns. Without a
//! configured endpoint the stage is skipped entirely.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{debug, info, instrument, warn};

use crate::db::{self, PaperPatch};
use crate::models::{Paper, Status};
use crate::pipeline::StageReport;

#[derive(Debug, Serialize)]
struct NoteRequest<'a> {
    paper_id: &'a str,
    title: Option<&'a str>,
    pdf_url: Option<&'a str>,
    pdf_path: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct NoteResponse {
    note_ref: String,
    summary: Option<String>,
}

/// Run the note stage for one week.
#[instrument(level = "info", skip(pool, client, endpoint))]
pub async fn run(
    pool: &SqlitePool,
    client: &reqwest::Client,
    week_id: &str,
    endpoint: Option<&str>,
    max_retries: i64,
    limit: Option<i64>,
) -> Result<StageReport> {
    let Some(endpoint) = endpoint else {
        warn!(week_id, "no note service endpoint configured, skipping note stage");
        return Ok(StageReport::default());
    };

    let candidates =
        db::get_papers_for_processing(pool, week_id, Status::NblmOk, max_retries, limit).await?;
    info!(count = candidates.len(), week_id, "papers pending note generation");

    let mut report = StageReport::default();
    for paper in candidates {
        if paper.note_ref.is_some() {
            debug!(paper_id = %paper.paper_id, "note already generated, skipping");
            report.skipped += 1;
            continue;
        }
        if paper.pdf_path.is_none() {
            // PDF stage has not reached this paper yet; not an error here.
            debug!(paper_id = %paper.paper_id, "no PDF yet, skipping");
            report.skipped += 1;
            continue;
        }

        match request_note(client, endpoint, &paper).await {
            Ok(response) => {
                db::upsert_paper(
                    pool,
                    &paper.paper_id,
                    &paper.week_id,
                    PaperPatch {
                        note_ref: Some(response.note_ref.clone()),
                        summary: response.summary,
                        ..Default::default()
                    },
                )
                .await?;
                db::update_status(pool, &paper.paper_id, Status::NblmOk, None, false).await?;
                info!(paper_id = %paper.paper_id, note_ref = %response.note_ref, "note generated");
                report.advanced += 1;
            }
            Err(e) => {
                warn!(paper_id = %paper.paper_id, error = %e, "note generation failed");
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

    info!(?report, week_id, "note stage complete");
    Ok(report)
}

async fn request_note(
    client: &reqwest::Client,
    endpoint: &str,
    paper: &Paper,
) -> Result<NoteResponse> {
    let request = NoteRequest {
        paper_id: &paper.paper_id,
        title: paper.title.as_deref(),
        pdf_url: paper.pdf_url.as_deref(),
        pdf_path: paper.pdf_path.as_deref(),
    };
    let response = client
        .post(endpoint)
        .json(&request)
        .send()
        .await?
        .error_for_status()?;
    Ok(response.json::<NoteResponse>().await?)
}
