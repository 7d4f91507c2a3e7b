//! Command-line interface definitions.
//!
//! All options can be provided via flags or environment variables; `.env`
//! files are loaded before parsing. The week identifier defaults to the
//! current ISO week when omitted.
//!
//! # Examples
//!
//! ```sh
//! # Scrape this week's listing into the store
//! paper_digest fetch
//!
//! # Run every stage for a specific week, capped at 10 papers
//! paper_digest run --week 2026-03 --max-papers 10
//!
//! # Write the digest including unfinished papers
//! paper_digest digest --week 2026-03 --all
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::DEFAULT_MAX_RETRIES;

/// Command-line arguments for the paper digest pipeline.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the SQLite database file
    #[arg(long, env = "PAPER_DIGEST_DB", default_value = "data/papers.db")]
    pub db_path: PathBuf,

    /// Root directory for PDFs, digests, and published output
    #[arg(short, long, env = "PAPER_DIGEST_DATA", default_value = "data")]
    pub data_dir: PathBuf,

    /// Failed attempts allowed before a paper is excluded from processing
    #[arg(long, default_value_t = DEFAULT_MAX_RETRIES)]
    pub max_retries: i64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Scrape the weekly paper listing into the database
    Fetch {
        /// Week identifier (YYYY-WW); defaults to the current ISO week
        #[arg(short, long)]
        week: Option<String>,
        /// Maximum papers to collect
        #[arg(long)]
        max_papers: Option<usize>,
    },

    /// Download PDFs for pending papers
    Pdf {
        #[arg(short, long)]
        week: Option<String>,
        /// Maximum papers to process
        #[arg(short, long)]
        limit: Option<i64>,
    },

    /// Generate notebook audio notes for papers with PDFs
    Notes {
        #[arg(short, long)]
        week: Option<String>,
        #[arg(short, long)]
        limit: Option<i64>,
        /// Note service endpoint URL
        #[arg(long, env = "NOTE_SERVICE_URL")]
        endpoint: Option<String>,
    },

    /// Produce videos for papers with notes
    Videos {
        #[arg(short, long)]
        week: Option<String>,
        #[arg(short, long)]
        limit: Option<i64>,
        /// Video service endpoint URL
        #[arg(long, env = "VIDEO_SERVICE_URL")]
        endpoint: Option<String>,
    },

    /// Scrape, then run every pipeline stage in ladder order
    Run {
        #[arg(short, long)]
        week: Option<String>,
        #[arg(long)]
        max_papers: Option<usize>,
        #[arg(long, env = "NOTE_SERVICE_URL")]
        note_endpoint: Option<String>,
        #[arg(long, env = "VIDEO_SERVICE_URL")]
        video_endpoint: Option<String>,
    },

    /// Write the Markdown and JSON digest for a week
    Digest {
        #[arg(short, long)]
        week: Option<String>,
        /// Include papers without finished videos
        #[arg(long)]
        all: bool,
    },

    /// Upload finished videos to the dataset and refresh the index
    Publish {
        #[arg(short, long)]
        week: Option<String>,
        /// Re-upload papers already recorded in the index
        #[arg(long)]
        force: bool,
        /// Skip regenerating the published Markdown digest
        #[arg(long)]
        skip_markdown: bool,
    },

    /// Print a progress summary for a week, or list known weeks
    Status {
        #[arg(short, long)]
        week: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["paper_digest", "fetch"]);
        assert_eq!(cli.db_path, PathBuf::from("data/papers.db"));
        assert_eq!(cli.data_dir, PathBuf::from("data"));
        assert_eq!(cli.max_retries, 3);
        assert!(matches!(
            cli.command,
            Command::Fetch {
                week: None,
                max_papers: None
            }
        ));
    }

    #[test]
    fn test_cli_fetch_with_week() {
        let cli = Cli::parse_from([
            "paper_digest",
            "fetch",
            "--week",
            "2026-03",
            "--max-papers",
            "5",
        ]);
        match cli.command {
            Command::Fetch { week, max_papers } => {
                assert_eq!(week.as_deref(), Some("2026-03"));
                assert_eq!(max_papers, Some(5));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_publish_flags() {
        let cli = Cli::parse_from(["paper_digest", "publish", "-w", "2026-03", "--force"]);
        match cli.command {
            Command::Publish {
                week,
                force,
                skip_markdown,
            } => {
                assert_eq!(week.as_deref(), Some("2026-03"));
                assert!(force);
                assert!(!skip_markdown);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_global_overrides() {
        let cli = Cli::parse_from([
            "paper_digest",
            "--db-path",
            "/tmp/p.db",
            "--max-retries",
            "5",
            "status",
        ]);
        assert_eq!(cli.db_path, PathBuf::from("/tmp/p.db"));
        assert_eq!(cli.max_retries, 5);
    }
}
