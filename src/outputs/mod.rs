//! Digest generation: queries the store for a period and writes the weekly
//! digest as both JSON and Markdown.
//!
//! # Output Structure
//!
//! ```text
//! digest_dir/
//! ├── 2026-03.json
//! └── 2026-03.md
//! ```

pub mod json;
pub mod markdown;

use anyhow::Result;
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

use crate::db;
use crate::models::{DigestPaper, DigestStats, Status, WeekDigest};
use crate::utils::{ensure_writable_dir, now_iso};
use crate::week::year_and_week;

/// Assemble the digest document for a period.
///
/// `include_all` lists every paper for the period; otherwise only papers
/// with finished videos are listed. The stats block always counts all
/// papers for the period, independent of that filter.
pub async fn build_digest(
    pool: &SqlitePool,
    week_id: &str,
    include_all: bool,
) -> Result<WeekDigest> {
    let status_filter = if include_all {
        None
    } else {
        Some(Status::VideoOk)
    };
    let papers = db::list_papers(pool, Some(week_id), status_filter, None).await?;
    if papers.is_empty() {
        warn!(week_id, "no papers found for digest");
    }

    let stats = build_stats(pool, week_id).await?;
    let (year, week) = year_and_week(week_id)?;

    let papers: Vec<DigestPaper> = papers
        .into_iter()
        .map(|p| DigestPaper {
            paper_id: p.paper_id,
            title: p.title,
            hf_url: p.hf_url,
            pdf_url: p.pdf_url,
            pdf_path: p.pdf_path,
            video_path: p.video_path,
            status: p.status,
        })
        .collect();

    Ok(WeekDigest {
        week_id: week_id.to_string(),
        year,
        week,
        generated_at: now_iso(),
        total_papers: papers.len(),
        papers,
        stats,
    })
}

/// Per-status counts for a period.
pub async fn build_stats(pool: &SqlitePool, week_id: &str) -> Result<DigestStats> {
    Ok(DigestStats {
        total: db::count_papers(pool, Some(week_id), None).await?,
        video_ok: db::count_papers(pool, Some(week_id), Some(Status::VideoOk)).await?,
        pdf_ok: db::count_papers(pool, Some(week_id), Some(Status::PdfOk)).await?,
        new: db::count_papers(pool, Some(week_id), Some(Status::New)).await?,
        error: db::count_papers(pool, Some(week_id), Some(Status::Error)).await?,
    })
}

/// Generate both digest files for a period and return their paths
/// `(markdown, json)`.
#[instrument(level = "info", skip(pool, digest_dir), fields(digest_dir = %digest_dir.display()))]
pub async fn generate_digest(
    pool: &SqlitePool,
    week_id: &str,
    include_all: bool,
    digest_dir: &Path,
) -> Result<(PathBuf, PathBuf)> {
    info!(week_id, include_all, "generating digest");
    ensure_writable_dir(digest_dir).await?;

    let digest = build_digest(pool, week_id, include_all).await?;

    let json_path = json::write_digest(&digest, digest_dir).await?;
    let md_path = digest_dir.join(format!("{week_id}.md"));
    tokio::fs::write(&md_path, markdown::digest_to_markdown(&digest)).await?;
    info!(path = %md_path.display(), "wrote Markdown digest");

    Ok((md_path, json_path))
}

/// Print a console summary of a period's progress.
pub async fn print_summary(pool: &SqlitePool, week_id: &str) -> Result<()> {
    let stats = build_stats(pool, week_id).await?;
    println!("\nWeek {week_id} summary:");
    println!("  Total papers:   {}", stats.total);
    println!("  Videos ready:   {}", stats.video_ok);
    println!("  PDFs ready:     {}", stats.pdf_ok);
    println!("  Pending:        {}", stats.new);
    println!("  Errors:         {}", stats.error);
    Ok(())
}
