//! Video-production stage: `NBLM_OK → VIDEO_OK`.
//!
//! Thin client for the hosted video renderer. Posts the paper's note
//! reference to a configured endpoint; the service renders the video (and
//! optionally slides) to local paths it reports back, which are recorded on
//! the paper.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tracing::{debug, info, instrument, warn};

use crate::db::{self, PaperPatch};
use crate::models::{Paper, Status};
use crate::pipeline::StageReport;

#[derive(Debug, Serialize)]
struct VideoRequest<'a> {
    paper_id: &'a str,
    title: Option<&'a str>,
    note_ref: &'a str,
}

#[derive(Debug, Deserialize)]
struct VideoResponse {
    video_path: String,
    slides_path: Option<String>,
}

/// Run the video stage for one week.
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
        warn!(week_id, "no video service endpoint configured, skipping video stage");
        return Ok(StageReport::default());
    };

    let candidates =
        db::get_papers_for_processing(pool, week_id, Status::VideoOk, max_retries, limit).await?;
    info!(count = candidates.len(), week_id, "papers pending video production");

    let mut report = StageReport::default();
    for paper in candidates {
        if paper.video_path.is_some() {
            debug!(paper_id = %paper.paper_id, "video already produced, skipping");
            report.skipped += 1;
            continue;
        }
        let Some(note_ref) = paper.note_ref.clone() else {
            debug!(paper_id = %paper.paper_id, "no note yet, skipping");
            report.skipped += 1;
            continue;
        };

        match request_video(client, endpoint, &paper, &note_ref).await {
            Ok(response) => {
                db::upsert_paper(
                    pool,
                    &paper.paper_id,
                    &paper.week_id,
                    PaperPatch {
                        video_path: Some(response.video_path.clone()),
                        slides_path: response.slides_path,
                        ..Default::default()
                    },
                )
                .await?;
                db::update_status(pool, &paper.paper_id, Status::VideoOk, None, false).await?;
                info!(paper_id = %paper.paper_id, video_path = %response.video_path, "video produced");
                report.advanced += 1;
            }
            Err(e) => {
                warn!(paper_id = %paper.paper_id, error = %e, "video production failed");
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

    info!(?report, week_id, "video stage complete");
    Ok(report)
}

async fn request_video(
    client: &reqwest::Client,
    endpoint: &str,
    paper: &Paper,
    note_ref: &str,
) -> Result<VideoResponse> {
    let request = VideoRequest {
        paper_id: &paper.paper_id,
        title: paper.title.as_deref(),
        note_ref,
    };
    let response = client
        .post(endpoint)
        .json(&request)
        .send()
        .await?
        .error_for_status()?;
    Ok(response.json::<VideoResponse>().await?)
}
