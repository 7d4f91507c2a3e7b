//! # Paper Digest
//!
//! A weekly AI paper tracking pipeline that discovers papers from the
//! HuggingFace daily-papers listing, downloads their PDFs, drives external
//! note and video services, and renders Markdown/JSON digests. Every
//! paper's progress is persisted in a local SQLite store.
//!
//! ## Pipeline
//!
//! Each paper climbs a monotonic status ladder:
//!
//! ```text
//! NEW ──► PDF_OK ──► NBLM_OK ──► VIDEO_OK
//!  └──────── ERROR (retried up to the bound, then quarantined) ───┘
//! ```
//!
//! 1. **fetch**: scrape the weekly listing (daily fallback) into the store
//! 2. **pdf / notes / videos**: advance pending papers one stage at a time
//! 3. **digest**: write the weekly JSON and Markdown digest
//! 4. **publish**: upload finished videos to a HuggingFace dataset and
//!    maintain the `metadata.json` sidecar index the front-end reads
//!
//! ## Usage
//!
//! ```sh
//! paper_digest run --week 2026-03
//! paper_digest digest --week 2026-03 --all
//! ```

use anyhow::Result;
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

mod cli;
mod config;
mod db;
mod models;
mod outputs;
mod pipeline;
mod publish;
mod scrapers;
mod utils;
mod week;

use cli::{Cli, Command};
use config::DataDirs;
use week::current_week_id;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();

    // .env holds Hub credentials and service endpoints.
    if dotenvy::dotenv().is_ok() {
        debug!("loaded .env");
    }

    let args = Cli::parse();
    debug!(?args.db_path, ?args.data_dir, "parsed CLI arguments");

    let dirs = DataDirs::new(&args.data_dir);
    let pool = db::open_pool(&args.db_path).await?;
    let client = config::http_client()?;
    info!(db = %args.db_path.display(), "paper_digest starting up");

    match args.command {
        Command::Fetch { week, max_papers } => {
            let week_id = week.unwrap_or_else(current_week_id);
            let papers = scrapers::hf::scrape_week(&pool, &client, &week_id, max_papers).await?;
            info!(week_id = %week_id, count = papers.len(), "fetch complete");
            outputs::print_summary(&pool, &week_id).await?;
        }

        Command::Pdf { week, limit } => {
            let week_id = week.unwrap_or_else(current_week_id);
            let report = pipeline::pdf::run(
                &pool,
                &client,
                &week_id,
                args.max_retries,
                limit,
                &dirs.pdf_dir(),
            )
            .await?;
            info!(week_id = %week_id, ?report, "PDF stage finished");
        }

        Command::Notes {
            week,
            limit,
            endpoint,
        } => {
            let week_id = week.unwrap_or_else(current_week_id);
            let report = pipeline::notes::run(
                &pool,
                &client,
                &week_id,
                endpoint.as_deref(),
                args.max_retries,
                limit,
            )
            .await?;
            info!(week_id = %week_id, ?report, "note stage finished");
        }

        Command::Videos {
            week,
            limit,
            endpoint,
        } => {
            let week_id = week.unwrap_or_else(current_week_id);
            let report = pipeline::videos::run(
                &pool,
                &client,
                &week_id,
                endpoint.as_deref(),
                args.max_retries,
                limit,
            )
            .await?;
            info!(week_id = %week_id, ?report, "video stage finished");
        }

        Command::Run {
            week,
            max_papers,
            note_endpoint,
            video_endpoint,
        } => {
            let week_id = week.unwrap_or_else(current_week_id);
            let papers = scrapers::hf::scrape_week(&pool, &client, &week_id, max_papers).await?;
            info!(week_id = %week_id, count = papers.len(), "fetch complete");

            let pdf = pipeline::pdf::run(
                &pool,
                &client,
                &week_id,
                args.max_retries,
                None,
                &dirs.pdf_dir(),
            )
            .await?;
            let notes = pipeline::notes::run(
                &pool,
                &client,
                &week_id,
                note_endpoint.as_deref(),
                args.max_retries,
                None,
            )
            .await?;
            let videos = pipeline::videos::run(
                &pool,
                &client,
                &week_id,
                video_endpoint.as_deref(),
                args.max_retries,
                None,
            )
            .await?;

            info!(week_id = %week_id, ?pdf, ?notes, ?videos, "pipeline run finished");
            outputs::print_summary(&pool, &week_id).await?;
        }

        Command::Digest { week, all } => {
            let week_id = week.unwrap_or_else(current_week_id);
            let (md_path, json_path) =
                outputs::generate_digest(&pool, &week_id, all, &dirs.digest_dir()).await?;
            info!(
                markdown = %md_path.display(),
                json = %json_path.display(),
                "digest written"
            );
            outputs::print_summary(&pool, &week_id).await?;
        }

        Command::Publish {
            week,
            force,
            skip_markdown,
        } => {
            let week_id = week.unwrap_or_else(current_week_id);
            let hub = publish::HubConfig::from_env()?;
            let (success, failure) =
                publish::publish_week(&pool, &client, &hub, &week_id, force).await?;
            info!(week_id = %week_id, success, failure, "publish finished");

            if success > 0 && !skip_markdown {
                let path =
                    publish::published_markdown(&client, &hub, &week_id, &dirs.published_dir())
                        .await?;
                info!(path = %path.display(), "published digest regenerated");
            }
        }

        Command::Status { week } => match week {
            Some(week_id) => outputs::print_summary(&pool, &week_id).await?,
            None => {
                let weeks = db::list_weeks(&pool).await?;
                if weeks.is_empty() {
                    println!("No papers tracked yet.");
                } else {
                    println!("Tracked weeks:");
                    for week_id in weeks {
                        let total = db::count_papers(&pool, Some(&week_id), None).await?;
                        println!("  {week_id}  ({total} papers)");
                    }
                }
            }
        },
    }

    let elapsed = start_time.elapsed();
    info!(?elapsed, "execution complete");
    Ok(())
}
