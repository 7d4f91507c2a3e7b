//! Publishing finished assets to a HuggingFace dataset repo.
//!
//! Uploads each finished week's videos (and slides when present) under
//! `<week_id>/<filename>` in the dataset, maintains a `metadata.json`
//! sidecar index mapping periods to published papers, and regenerates a
//! public Markdown digest from that index.
//!
//! Files are committed through the Hub's NDJSON commit endpoint; the sidecar
//! is fetched back through the resolve URL, so the dataset itself is the
//! source of truth for what has been published.

use anyhow::{anyhow, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::json;
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument, warn};

use crate::config::HF_HUB_URL;
use crate::db;
use crate::models::{PublishIndex, PublishedPaper, Status};
use crate::utils::{ensure_writable_dir, now_iso};

/// Name of the sidecar index file in the dataset repo.
const INDEX_FILE: &str = "metadata.json";

/// Credentials and repo coordinates for the dataset, read from the
/// environment (`.env` supported).
#[derive(Debug, Clone)]
pub struct HubConfig {
    pub token: String,
    pub username: String,
    pub dataset: String,
}

impl HubConfig {
    pub fn from_env() -> Result<Self> {
        let token = std::env::var("HF_TOKEN").context("HF_TOKEN not set")?;
        let username = std::env::var("HF_USERNAME").context("HF_USERNAME not set")?;
        let dataset =
            std::env::var("HF_DATASET_NAME").unwrap_or_else(|_| "paper-digest-videos".to_string());
        Ok(Self {
            token,
            username,
            dataset,
        })
    }

    /// Full dataset id, `username/dataset`.
    pub fn dataset_id(&self) -> String {
        format!("{}/{}", self.username, self.dataset)
    }
}

/// Direct streaming/download URL for a file in the dataset.
pub fn resolve_url(dataset_id: &str, remote_path: &str) -> String {
    format!("{HF_HUB_URL}/datasets/{dataset_id}/resolve/main/{remote_path}")
}

/// Create the dataset repo if it does not exist. Failures are logged and
/// ignored; the subsequent upload surfaces any real problem.
async fn ensure_repo(client: &reqwest::Client, cfg: &HubConfig) {
    let body = json!({
        "type": "dataset",
        "name": cfg.dataset,
        "organization": null,
        "private": false,
    });
    let result = client
        .post(format!("{HF_HUB_URL}/api/repos/create"))
        .bearer_auth(&cfg.token)
        .json(&body)
        .send()
        .await;
    match result {
        Ok(response) => debug!(status = %response.status(), "dataset repo create check"),
        Err(e) => debug!(error = %e, "dataset repo create check failed"),
    }
}

/// Commit a single file to the dataset via the Hub's NDJSON commit API and
/// return its resolve URL.
async fn upload_bytes(
    client: &reqwest::Client,
    cfg: &HubConfig,
    bytes: &[u8],
    remote_path: &str,
    summary: &str,
) -> Result<String> {
    let dataset_id = cfg.dataset_id();
    let header = json!({"key": "header", "value": {"summary": summary, "description": ""}});
    let file = json!({
        "key": "file",
        "value": {
            "path": remote_path,
            "content": BASE64.encode(bytes),
            "encoding": "base64",
        }
    });
    let body = format!("{header}\n{file}");

    client
        .post(format!(
            "{HF_HUB_URL}/api/datasets/{dataset_id}/commit/main"
        ))
        .bearer_auth(&cfg.token)
        .header("content-type", "application/x-ndjson")
        .body(body)
        .send()
        .await?
        .error_for_status()
        .with_context(|| format!("committing {remote_path} to {dataset_id}"))?;

    Ok(resolve_url(&dataset_id, remote_path))
}

/// Upload a local file to the dataset and return its resolve URL.
#[instrument(level = "info", skip(client, cfg), fields(dataset = %cfg.dataset_id()))]
pub async fn upload_file(
    client: &reqwest::Client,
    cfg: &HubConfig,
    local_path: &Path,
    remote_path: &str,
) -> Result<String> {
    info!(local = %local_path.display(), remote = remote_path, "uploading file");
    let bytes = tokio::fs::read(local_path)
        .await
        .with_context(|| format!("reading {}", local_path.display()))?;
    let url = upload_bytes(
        client,
        cfg,
        &bytes,
        remote_path,
        &format!("Upload {remote_path}"),
    )
    .await?;
    info!(%url, "uploaded");
    Ok(url)
}

/// Fetch the sidecar index from the dataset. A missing or unreadable index
/// yields an empty one.
pub async fn load_index(client: &reqwest::Client, cfg: &HubConfig) -> PublishIndex {
    let url = resolve_url(&cfg.dataset_id(), INDEX_FILE);
    let response = match client.get(&url).bearer_auth(&cfg.token).send().await {
        Ok(r) => r,
        Err(e) => {
            debug!(error = %e, "no existing index fetched");
            return PublishIndex::default();
        }
    };
    if !response.status().is_success() {
        debug!(status = %response.status(), "no existing index found");
        return PublishIndex::default();
    }
    match response.json::<PublishIndex>().await {
        Ok(index) => index,
        Err(e) => {
            warn!(error = %e, "existing index unreadable, starting fresh");
            PublishIndex::default()
        }
    }
}

/// Upload the sidecar index with a refreshed `last_updated` stamp.
pub async fn save_index(
    client: &reqwest::Client,
    cfg: &HubConfig,
    index: &mut PublishIndex,
) -> Result<()> {
    index.last_updated = Some(now_iso());
    let bytes = serde_json::to_vec_pretty(index)?;
    upload_bytes(client, cfg, &bytes, INDEX_FILE, "Update metadata index").await?;
    info!(dataset = %cfg.dataset_id(), "index updated");
    Ok(())
}

/// Publish a week's finished videos to the dataset.
///
/// Papers already present in the index for this week are skipped unless
/// `force`; papers without an existing video file count as failures. The
/// index is only saved when at least one paper succeeded. Returns
/// `(success, failure)` counts.
#[instrument(level = "info", skip(pool, client, cfg))]
pub async fn publish_week(
    pool: &SqlitePool,
    client: &reqwest::Client,
    cfg: &HubConfig,
    week_id: &str,
    force: bool,
) -> Result<(usize, usize)> {
    info!(week_id, "publishing videos");

    let papers = db::list_papers(pool, Some(week_id), Some(Status::VideoOk), None).await?;
    if papers.is_empty() {
        warn!(week_id, "no papers with videos found");
        return Ok((0, 0));
    }

    ensure_repo(client, cfg).await;
    let mut index = load_index(client, cfg).await;
    let entries = index.weeks.entry(week_id.to_string()).or_default();
    let existing_ids: Vec<String> = entries.iter().map(|p| p.paper_id.clone()).collect();

    let mut success = 0;
    let mut failure = 0;

    for paper in papers {
        if existing_ids.contains(&paper.paper_id) && !force {
            info!(paper_id = %paper.paper_id, "already published, skipping");
            success += 1;
            continue;
        }

        let Some(video_path) = paper.video_path.as_deref().map(PathBuf::from) else {
            warn!(paper_id = %paper.paper_id, "no video path recorded");
            failure += 1;
            continue;
        };
        if !video_path.is_file() {
            warn!(paper_id = %paper.paper_id, path = %video_path.display(), "video file not found");
            failure += 1;
            continue;
        }
        let video_filename = video_path
            .file_name()
            .ok_or_else(|| anyhow!("video path has no file name"))?
            .to_string_lossy()
            .into_owned();

        let video_url = match upload_file(
            client,
            cfg,
            &video_path,
            &format!("{week_id}/{video_filename}"),
        )
        .await
        {
            Ok(url) => url,
            Err(e) => {
                warn!(paper_id = %paper.paper_id, error = %e, "video upload failed");
                failure += 1;
                continue;
            }
        };

        let mut slides_url = None;
        if let Some(slides) = paper.slides_path.as_deref().map(PathBuf::from) {
            if slides.is_file() {
                let slides_name = slides
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                match upload_file(client, cfg, &slides, &format!("{week_id}/{slides_name}")).await {
                    Ok(url) => slides_url = Some(url),
                    Err(e) => {
                        warn!(paper_id = %paper.paper_id, error = %e, "slides upload failed")
                    }
                }
            } else {
                debug!(paper_id = %paper.paper_id, path = %slides.display(), "slides file not found");
            }
        }

        let entry = PublishedPaper {
            paper_id: paper.paper_id.clone(),
            title: paper
                .title
                .clone()
                .unwrap_or_else(|| format!("Paper {}", paper.paper_id)),
            pdf_url: paper
                .pdf_url
                .clone()
                .unwrap_or_else(|| format!("https://arxiv.org/pdf/{}.pdf", paper.paper_id)),
            hf_url: paper
                .hf_url
                .clone()
                .unwrap_or_else(|| format!("https://huggingface.co/papers/{}", paper.paper_id)),
            video_url,
            video_filename,
            slides_url,
            published_at: now_iso(),
        };
        upsert_entry(index.weeks.entry(week_id.to_string()).or_default(), entry);

        info!(paper_id = %paper.paper_id, "published");
        success += 1;
    }

    if success > 0 {
        save_index(client, cfg, &mut index).await?;
    }

    info!(week_id, success, failure, "publish complete");
    Ok((success, failure))
}

/// Insert or replace a published entry, keyed by paper id.
fn upsert_entry(entries: &mut Vec<PublishedPaper>, entry: PublishedPaper) {
    match entries.iter_mut().find(|p| p.paper_id == entry.paper_id) {
        Some(existing) => *existing = entry,
        None => entries.push(entry),
    }
}

/// Regenerate the public Markdown digest for a week from the sidecar index.
#[instrument(level = "info", skip(client, cfg, out_dir))]
pub async fn published_markdown(
    client: &reqwest::Client,
    cfg: &HubConfig,
    week_id: &str,
    out_dir: &Path,
) -> Result<PathBuf> {
    let index = load_index(client, cfg).await;
    let papers = index
        .weeks
        .get(week_id)
        .ok_or_else(|| anyhow!("no published data for week {week_id}"))?;

    let md = index_to_markdown(week_id, &cfg.dataset_id(), papers);

    ensure_writable_dir(out_dir).await?;
    let path = out_dir.join(format!("{week_id}.md"));
    tokio::fs::write(&path, md).await?;
    info!(path = %path.display(), "wrote published digest");
    Ok(path)
}

/// Render the published digest for a week from its index entries.
fn index_to_markdown(week_id: &str, dataset_id: &str, papers: &[PublishedPaper]) -> String {
    let mut lines: Vec<String> = vec![
        format!("# Paper Digest - Week {week_id}"),
        String::new(),
        format!("> Generated on {}", now_iso()),
        format!("> Videos hosted on [HuggingFace]({HF_HUB_URL}/datasets/{dataset_id})"),
        String::new(),
        "---".to_string(),
        String::new(),
    ];

    for (i, paper) in papers.iter().enumerate() {
        lines.extend([
            format!("## {}. {}", i + 1, paper.title),
            String::new(),
            format!("**Paper ID:** `{}`", paper.paper_id),
            String::new(),
            format!(
                "[arXiv PDF]({}) | [HuggingFace Paper]({})",
                paper.pdf_url, paper.hf_url
            ),
            String::new(),
            "### Video Overview".to_string(),
            String::new(),
            format!("[Watch Video]({})", paper.video_url),
            String::new(),
        ]);
        if let Some(slides_url) = &paper.slides_url {
            lines.push(format!("[Slides]({slides_url})"));
            lines.push(String::new());
        }
        lines.push("---".to_string());
        lines.push(String::new());
    }

    lines.join("\n")
}
