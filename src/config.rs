//! Endpoint constants, HTTP client construction, and data-directory layout.
//!
//! Everything that points at the outside world lives here: the HuggingFace
//! paper listing URLs, the arXiv PDF URL template, request timeout and user
//! agent, and the on-disk layout under the data directory.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Base URL for HuggingFace paper pages.
pub const HF_PAPERS_URL: &str = "https://huggingface.co/papers";

/// Weekly listing page. `{week}` is an ISO week label like `2026-W03`.
pub const HF_PAPERS_WEEK_URL: &str = "https://huggingface.co/papers/week/{week}";

/// Daily listing page. `{date}` is a `YYYY-MM-DD` date.
pub const HF_PAPERS_DATE_URL: &str = "https://huggingface.co/papers/date/{date}";

/// arXiv PDF download template. `{paper_id}` is the arXiv id.
pub const ARXIV_PDF_URL: &str = "https://arxiv.org/pdf/{paper_id}.pdf";

/// HuggingFace Hub root, used by the publisher for dataset repos.
pub const HF_HUB_URL: &str = "https://huggingface.co";

/// Timeout applied to every outbound request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// User agent sent with every outbound request.
pub const USER_AGENT: &str = concat!(
    "paper_digest/",
    env!("CARGO_PKG_VERSION"),
    " (+https://github.com/paper-digest/paper-digest-rs)"
);

/// Failed advancement attempts allowed before a paper is quarantined.
pub const DEFAULT_MAX_RETRIES: i64 = 3;

/// Build the shared HTTP client with the fixed timeout and user agent.
pub fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()
        .context("failed to build HTTP client")
}

/// On-disk layout under the data directory.
///
/// ```text
/// data/
/// ├── papers.db
/// ├── pdfs/<paper_id>.pdf
/// └── digests/
///     ├── <week_id>.json
///     ├── <week_id>.md
///     └── published/<week_id>.md
/// ```
#[derive(Debug, Clone)]
pub struct DataDirs {
    pub root: PathBuf,
}

impl DataDirs {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    pub fn pdf_dir(&self) -> PathBuf {
        self.root.join("pdfs")
    }

    pub fn digest_dir(&self) -> PathBuf {
        self.root.join("digests")
    }

    pub fn published_dir(&self) -> PathBuf {
        self.digest_dir().join("published")
    }
}
