//! Data models for tracked papers and rendered documents.
//!
//! This module defines the core data structures used throughout the pipeline:
//! - [`Status`]: the ordered progress ladder a paper climbs
//! - [`Paper`]: a tracked paper row from the store
//! - [`PaperStub`]: a freshly scraped paper before it is stored
//! - [`WeekDigest`] and friends: the JSON digest document
//! - [`PublishIndex`] and [`PublishedPaper`]: the published sidecar index
//!
//! Digest and sidecar field names are part of the published JSON schema and
//! must not change.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Progress status of a paper.
///
/// The ladder runs `NEW → PDF_OK → NBLM_OK → VIDEO_OK`; `ERROR` marks a
/// failed advancement attempt and sits outside the ladder. Serialized as the
/// upper snake-case strings stored in the database and emitted in digests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    New,
    PdfOk,
    NblmOk,
    VideoOk,
    Error,
}

/// The monotonic progress ladder, in order. `ERROR` is not a rung.
pub const STATUS_LADDER: [Status; 4] = [Status::New, Status::PdfOk, Status::NblmOk, Status::VideoOk];

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::New => "NEW",
            Status::PdfOk => "PDF_OK",
            Status::NblmOk => "NBLM_OK",
            Status::VideoOk => "VIDEO_OK",
            Status::Error => "ERROR",
        }
    }

    /// Position on the ladder, or `None` for `ERROR`.
    pub fn ladder_position(&self) -> Option<usize> {
        STATUS_LADDER.iter().position(|s| s == self)
    }

    /// Statuses a paper may hold while still needing work to reach `target`:
    /// every rung strictly before `target`, plus `ERROR` so that failed
    /// papers re-enter the queue until their retry budget runs out.
    ///
    /// Returns an empty vector when `target` is not a ladder rung or is the
    /// first rung (nothing can precede `NEW`).
    pub fn eligible_before(target: Status) -> Vec<Status> {
        match target.ladder_position() {
            Some(idx) if idx > 0 => {
                let mut eligible: Vec<Status> = STATUS_LADDER[..idx].to_vec();
                eligible.push(Status::Error);
                eligible
            }
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW" => Ok(Status::New),
            "PDF_OK" => Ok(Status::PdfOk),
            "NBLM_OK" => Ok(Status::NblmOk),
            "VIDEO_OK" => Ok(Status::VideoOk),
            "ERROR" => Ok(Status::Error),
            other => Err(anyhow::anyhow!("unknown paper status: {other}")),
        }
    }
}

/// A tracked paper row.
///
/// `paper_id` is the external (arXiv-style) identifier and primary key;
/// `week_id` is the period the paper was first sighted in, either an ISO week
/// (`2026-03`) or a calendar day (`2026-01-15`). All other fields are filled
/// in field-by-field as pipeline stages advance the paper.
#[derive(Debug, Clone)]
pub struct Paper {
    pub paper_id: String,
    pub week_id: String,
    pub title: Option<String>,
    pub hf_url: Option<String>,
    pub pdf_url: Option<String>,
    pub pdf_path: Option<String>,
    pub pdf_sha256: Option<String>,
    pub note_ref: Option<String>,
    pub video_path: Option<String>,
    pub slides_path: Option<String>,
    pub summary: Option<String>,
    pub status: Status,
    pub retry_count: i64,
    pub last_error: Option<String>,
    pub updated_at: Option<String>,
}

/// A paper as extracted from a listing page, before it is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperStub {
    pub paper_id: String,
    pub title: String,
    pub hf_url: String,
    pub pdf_url: String,
}

/// One paper entry in the weekly digest JSON.
#[derive(Debug, Serialize, Deserialize)]
pub struct DigestPaper {
    pub paper_id: String,
    pub title: Option<String>,
    pub hf_url: Option<String>,
    pub pdf_url: Option<String>,
    pub pdf_path: Option<String>,
    pub video_path: Option<String>,
    pub status: Status,
}

/// Per-status counts over every paper recorded for the period, independent
/// of the digest's paper filter.
#[derive(Debug, Serialize, Deserialize)]
pub struct DigestStats {
    pub total: i64,
    pub video_ok: i64,
    pub pdf_ok: i64,
    pub new: i64,
    pub error: i64,
}

/// The weekly digest document, written as both JSON and Markdown.
#[derive(Debug, Serialize, Deserialize)]
pub struct WeekDigest {
    pub week_id: String,
    pub year: i32,
    pub week: u32,
    pub generated_at: String,
    pub total_papers: usize,
    pub papers: Vec<DigestPaper>,
    pub stats: DigestStats,
}

/// One published paper entry in the sidecar index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishedPaper {
    pub paper_id: String,
    pub title: String,
    pub pdf_url: String,
    pub hf_url: String,
    pub video_url: String,
    pub video_filename: String,
    pub slides_url: Option<String>,
    pub published_at: String,
}

/// The sidecar index stored as `metadata.json` in the dataset repo, mapping
/// each period to its published papers. `BTreeMap` keeps week keys ordered
/// in the serialized document.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct PublishIndex {
    pub weeks: BTreeMap<String, Vec<PublishedPaper>>,
    pub last_updated: Option<String>,
}
