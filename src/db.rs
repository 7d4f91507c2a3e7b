//! SQLite-backed paper tracking store.
//!
//! A single `papers` table keyed by the external paper id, with a merge-style
//! upsert (absent fields preserve prior values), status updates with optional
//! retry accounting, and retry-bounded "ready for stage X" queries. Every
//! write runs inside its own transaction; a failure rolls the unit of work
//! back and propagates.
//!
//! Period-identifier queries expand week-shaped identifiers to the seven
//! calendar days of that ISO week, so weekly and daily labeling can coexist
//! in the same table.

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, warn};

use crate::models::{Paper, Status};
use crate::utils::now_iso;
use crate::week::{dates_for_week, is_week_id};

const PAPER_COLUMNS: &str = "paper_id, week_id, title, hf_url, pdf_url, pdf_path, \
     pdf_sha256, note_ref, video_path, slides_path, summary, status, \
     retry_count, last_error, updated_at";

/// Open (creating if necessary) the database at `path` and initialize the
/// schema. The pool is capped at one connection; the pipeline is a single
/// sequential process and SQLite serializes writers anyway.
pub async fn open_pool(path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("creating database directory {}", parent.display()))?;
        }
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .with_context(|| format!("opening database {}", path.display()))?;

    init_schema(&pool).await?;
    Ok(pool)
}

/// Create the `papers` table and its secondary indexes if they do not exist.
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS papers (
            paper_id TEXT PRIMARY KEY,
            week_id TEXT NOT NULL,
            title TEXT,
            hf_url TEXT,
            pdf_url TEXT,
            pdf_path TEXT,
            pdf_sha256 TEXT,
            note_ref TEXT,
            video_path TEXT,
            slides_path TEXT,
            summary TEXT,
            status TEXT NOT NULL DEFAULT 'NEW',
            retry_count INTEGER NOT NULL DEFAULT 0,
            last_error TEXT,
            updated_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_papers_week ON papers(week_id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_papers_status ON papers(status)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_papers_week_status ON papers(week_id, status)")
        .execute(pool)
        .await?;

    debug!("database schema initialized");
    Ok(())
}

/// Fields supplied to [`upsert_paper`]. `None` fields leave existing values
/// untouched on update; on insert they start empty.
#[derive(Debug, Default, Clone)]
pub struct PaperPatch {
    pub title: Option<String>,
    pub hf_url: Option<String>,
    pub pdf_url: Option<String>,
    pub pdf_path: Option<String>,
    pub pdf_sha256: Option<String>,
    pub note_ref: Option<String>,
    pub video_path: Option<String>,
    pub slides_path: Option<String>,
    pub summary: Option<String>,
    pub status: Option<Status>,
    pub last_error: Option<String>,
}

fn row_to_paper(row: &SqliteRow) -> Result<Paper> {
    let status: String = row.get("status");
    Ok(Paper {
        paper_id: row.get("paper_id"),
        week_id: row.get("week_id"),
        title: row.get("title"),
        hf_url: row.get("hf_url"),
        pdf_url: row.get("pdf_url"),
        pdf_path: row.get("pdf_path"),
        pdf_sha256: row.get("pdf_sha256"),
        note_ref: row.get("note_ref"),
        video_path: row.get("video_path"),
        slides_path: row.get("slides_path"),
        summary: row.get("summary"),
        status: Status::from_str(&status)?,
        retry_count: row.get("retry_count"),
        last_error: row.get("last_error"),
        updated_at: row.get("updated_at"),
    })
}

/// SQL clause and parameters matching a period identifier. Week-shaped
/// identifiers match themselves plus the seven days of that ISO week.
fn week_id_clause(period_id: &str) -> (String, Vec<String>) {
    if is_week_id(period_id) {
        let mut ids = vec![period_id.to_string()];
        ids.extend(dates_for_week(period_id));
        let placeholders = vec!["?"; ids.len()].join(",");
        (format!("week_id IN ({placeholders})"), ids)
    } else {
        ("week_id = ?".to_string(), vec![period_id.to_string()])
    }
}

/// Fetch a paper by id.
pub async fn get_paper(pool: &SqlitePool, paper_id: &str) -> Result<Option<Paper>> {
    let sql = format!("SELECT {PAPER_COLUMNS} FROM papers WHERE paper_id = ?");
    let row = sqlx::query(&sql)
        .bind(paper_id)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(row_to_paper).transpose()
}

/// Insert or update a paper record.
///
/// New papers start at `NEW` (unless the patch says otherwise) with a zero
/// retry count. For existing papers only the patch's `Some` fields are
/// overwritten and `week_id` is preserved; `updated_at` is bumped either way.
/// The read-merge-write runs in one transaction.
pub async fn upsert_paper(
    pool: &SqlitePool,
    paper_id: &str,
    week_id: &str,
    patch: PaperPatch,
) -> Result<Paper> {
    let now = now_iso();
    let mut tx = pool.begin().await?;

    let sql = format!("SELECT {PAPER_COLUMNS} FROM papers WHERE paper_id = ?");
    let existing = sqlx::query(&sql)
        .bind(paper_id)
        .fetch_optional(&mut *tx)
        .await?;

    let paper = match existing {
        Some(row) => {
            let mut paper = row_to_paper(&row)?;
            if patch.title.is_some() {
                paper.title = patch.title;
            }
            if patch.hf_url.is_some() {
                paper.hf_url = patch.hf_url;
            }
            if patch.pdf_url.is_some() {
                paper.pdf_url = patch.pdf_url;
            }
            if patch.pdf_path.is_some() {
                paper.pdf_path = patch.pdf_path;
            }
            if patch.pdf_sha256.is_some() {
                paper.pdf_sha256 = patch.pdf_sha256;
            }
            if patch.note_ref.is_some() {
                paper.note_ref = patch.note_ref;
            }
            if patch.video_path.is_some() {
                paper.video_path = patch.video_path;
            }
            if patch.slides_path.is_some() {
                paper.slides_path = patch.slides_path;
            }
            if patch.summary.is_some() {
                paper.summary = patch.summary;
            }
            if let Some(status) = patch.status {
                paper.status = status;
            }
            if patch.last_error.is_some() {
                paper.last_error = patch.last_error;
            }
            paper.updated_at = Some(now);

            sqlx::query(
                r#"
                UPDATE papers SET
                    title = ?, hf_url = ?, pdf_url = ?, pdf_path = ?,
                    pdf_sha256 = ?, note_ref = ?, video_path = ?, slides_path = ?,
                    summary = ?, status = ?, last_error = ?, updated_at = ?
                WHERE paper_id = ?
                "#,
            )
            .bind(&paper.title)
            .bind(&paper.hf_url)
            .bind(&paper.pdf_url)
            .bind(&paper.pdf_path)
            .bind(&paper.pdf_sha256)
            .bind(&paper.note_ref)
            .bind(&paper.video_path)
            .bind(&paper.slides_path)
            .bind(&paper.summary)
            .bind(paper.status.as_str())
            .bind(&paper.last_error)
            .bind(&paper.updated_at)
            .bind(paper_id)
            .execute(&mut *tx)
            .await?;

            debug!(paper_id, "updated paper");
            paper
        }
        None => {
            let paper = Paper {
                paper_id: paper_id.to_string(),
                week_id: week_id.to_string(),
                title: patch.title,
                hf_url: patch.hf_url,
                pdf_url: patch.pdf_url,
                pdf_path: patch.pdf_path,
                pdf_sha256: patch.pdf_sha256,
                note_ref: patch.note_ref,
                video_path: patch.video_path,
                slides_path: patch.slides_path,
                summary: patch.summary,
                status: patch.status.unwrap_or(Status::New),
                retry_count: 0,
                last_error: patch.last_error,
                updated_at: Some(now),
            };

            let sql = format!(
                "INSERT INTO papers ({PAPER_COLUMNS}) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
            );
            sqlx::query(&sql)
                .bind(&paper.paper_id)
                .bind(&paper.week_id)
                .bind(&paper.title)
                .bind(&paper.hf_url)
                .bind(&paper.pdf_url)
                .bind(&paper.pdf_path)
                .bind(&paper.pdf_sha256)
                .bind(&paper.note_ref)
                .bind(&paper.video_path)
                .bind(&paper.slides_path)
                .bind(&paper.summary)
                .bind(paper.status.as_str())
                .bind(paper.retry_count)
                .bind(&paper.last_error)
                .bind(&paper.updated_at)
                .execute(&mut *tx)
                .await?;

            debug!(paper_id, "inserted paper");
            paper
        }
    };

    tx.commit().await?;
    Ok(paper)
}

/// Set a paper's status, replacing `last_error` (clearing it when `error` is
/// `None`) and optionally incrementing the retry counter.
///
/// Returns the updated paper, or `None` when no such paper exists.
pub async fn update_status(
    pool: &SqlitePool,
    paper_id: &str,
    status: Status,
    error: Option<&str>,
    increment_retry: bool,
) -> Result<Option<Paper>> {
    let now = now_iso();
    let sql = if increment_retry {
        "UPDATE papers SET status = ?, last_error = ?, retry_count = retry_count + 1, \
         updated_at = ? WHERE paper_id = ?"
    } else {
        "UPDATE papers SET status = ?, last_error = ?, updated_at = ? WHERE paper_id = ?"
    };

    let result = sqlx::query(sql)
        .bind(status.as_str())
        .bind(error)
        .bind(&now)
        .bind(paper_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        warn!(paper_id, "paper not found for status update");
        return Ok(None);
    }

    debug!(paper_id, %status, "updated paper status");
    get_paper(pool, paper_id).await
}

/// List papers, optionally filtered by period and status, newest first.
pub async fn list_papers(
    pool: &SqlitePool,
    week_id: Option<&str>,
    status: Option<Status>,
    limit: Option<i64>,
) -> Result<Vec<Paper>> {
    let mut sql = format!("SELECT {PAPER_COLUMNS} FROM papers WHERE 1=1");
    let mut week_params = Vec::new();

    if let Some(week_id) = week_id {
        let (clause, params) = week_id_clause(week_id);
        sql.push_str(" AND ");
        sql.push_str(&clause);
        week_params = params;
    }
    if status.is_some() {
        sql.push_str(" AND status = ?");
    }
    sql.push_str(" ORDER BY updated_at DESC");
    if limit.is_some() {
        sql.push_str(" LIMIT ?");
    }

    let mut query = sqlx::query(&sql);
    for param in &week_params {
        query = query.bind(param);
    }
    if let Some(status) = status {
        query = query.bind(status.as_str());
    }
    if let Some(limit) = limit {
        query = query.bind(limit);
    }

    let rows = query.fetch_all(pool).await?;
    rows.iter().map(row_to_paper).collect()
}

/// Count papers, optionally filtered by period and status.
pub async fn count_papers(
    pool: &SqlitePool,
    week_id: Option<&str>,
    status: Option<Status>,
) -> Result<i64> {
    let mut sql = String::from("SELECT COUNT(*) FROM papers WHERE 1=1");
    let mut week_params = Vec::new();

    if let Some(week_id) = week_id {
        let (clause, params) = week_id_clause(week_id);
        sql.push_str(" AND ");
        sql.push_str(&clause);
        week_params = params;
    }
    if status.is_some() {
        sql.push_str(" AND status = ?");
    }

    let mut query = sqlx::query(&sql);
    for param in &week_params {
        query = query.bind(param);
    }
    if let Some(status) = status {
        query = query.bind(status.as_str());
    }

    let row = query.fetch_one(pool).await?;
    Ok(row.get::<i64, _>(0))
}

/// Papers that still need work to reach `target_status`: every status
/// strictly preceding the target on the ladder plus `ERROR`, with a retry
/// count below `max_retries`, ordered by paper id for determinism.
pub async fn get_papers_for_processing(
    pool: &SqlitePool,
    week_id: &str,
    target_status: Status,
    max_retries: i64,
    limit: Option<i64>,
) -> Result<Vec<Paper>> {
    let eligible = Status::eligible_before(target_status);
    if eligible.is_empty() {
        return Ok(Vec::new());
    }

    let (week_clause, week_params) = week_id_clause(week_id);
    let status_placeholders = vec!["?"; eligible.len()].join(",");
    let mut sql = format!(
        "SELECT {PAPER_COLUMNS} FROM papers \
         WHERE {week_clause} AND status IN ({status_placeholders}) \
         AND retry_count < ? ORDER BY paper_id"
    );
    if limit.is_some() {
        sql.push_str(" LIMIT ?");
    }

    let mut query = sqlx::query(&sql);
    for param in &week_params {
        query = query.bind(param);
    }
    for status in &eligible {
        query = query.bind(status.as_str());
    }
    query = query.bind(max_retries);
    if let Some(limit) = limit {
        query = query.bind(limit);
    }

    let rows = query.fetch_all(pool).await?;
    rows.iter().map(row_to_paper).collect()
}

/// Distinct period identifiers present in the store, newest first.
pub async fn list_weeks(pool: &SqlitePool) -> Result<Vec<String>> {
    let rows = sqlx::query("SELECT DISTINCT week_id FROM papers ORDER BY week_id DESC")
        .fetch_all(pool)
        .await?;
    Ok(rows.iter().map(|row| row.get("week_id")).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn memory_pool() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:")
            .await
            .expect("in-memory database");
        init_schema(&pool).await.expect("schema");
        pool
    }

    #[tokio::test]
    async fn test_upsert_creates_new_paper() {
        let pool = memory_pool().await;

        let paper = upsert_paper(
            &pool,
            "2601.03252",
            "2026-03",
            PaperPatch {
                title: Some("Attention Is Here Again".to_string()),
                hf_url: Some("https://huggingface.co/papers/2601.03252".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(paper.status, Status::New);
        assert_eq!(paper.retry_count, 0);
        assert!(paper.updated_at.is_some());
        assert!(paper.pdf_path.is_none());
    }

    #[tokio::test]
    async fn test_upsert_merges_partial_fields() {
        let pool = memory_pool().await;

        upsert_paper(
            &pool,
            "2601.03252",
            "2026-03",
            PaperPatch {
                title: Some("Original Title".to_string()),
                hf_url: Some("https://huggingface.co/papers/2601.03252".to_string()),
                pdf_url: Some("https://arxiv.org/pdf/2601.03252.pdf".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let before = get_paper(&pool, "2601.03252").await.unwrap().unwrap();

        tokio::time::sleep(Duration::from_millis(5)).await;
        let after = upsert_paper(
            &pool,
            "2601.03252",
            "2026-03",
            PaperPatch {
                pdf_path: Some("data/pdfs/2601.03252.pdf".to_string()),
                status: Some(Status::PdfOk),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        // Only the supplied fields changed; the timestamp moved forward.
        assert_eq!(after.title.as_deref(), Some("Original Title"));
        assert_eq!(
            after.hf_url.as_deref(),
            Some("https://huggingface.co/papers/2601.03252")
        );
        assert_eq!(after.pdf_path.as_deref(), Some("data/pdfs/2601.03252.pdf"));
        assert_eq!(after.status, Status::PdfOk);
        assert_ne!(after.updated_at, before.updated_at);
    }

    #[tokio::test]
    async fn test_upsert_does_not_duplicate_or_clear() {
        let pool = memory_pool().await;

        upsert_paper(
            &pool,
            "2601.03252",
            "2026-03",
            PaperPatch {
                title: Some("A Paper".to_string()),
                pdf_path: Some("data/pdfs/2601.03252.pdf".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        // Re-sighting on a later scrape supplies only listing fields.
        upsert_paper(
            &pool,
            "2601.03252",
            "2026-03",
            PaperPatch {
                title: Some("A Paper".to_string()),
                hf_url: Some("https://huggingface.co/papers/2601.03252".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(count_papers(&pool, None, None).await.unwrap(), 1);
        let paper = get_paper(&pool, "2601.03252").await.unwrap().unwrap();
        assert_eq!(paper.pdf_path.as_deref(), Some("data/pdfs/2601.03252.pdf"));
    }

    #[tokio::test]
    async fn test_week_id_matches_week_and_days() {
        let pool = memory_pool().await;

        // One row stored under the week label, one under a day of that week,
        // one under a day of the following week.
        for (id, week) in [
            ("2601.00001", "2026-03"),
            ("2601.00002", "2026-01-15"),
            ("2601.00003", "2026-01-19"),
        ] {
            upsert_paper(&pool, id, week, PaperPatch::default())
                .await
                .unwrap();
        }

        let papers = list_papers(&pool, Some("2026-03"), None, None).await.unwrap();
        let mut ids: Vec<&str> = papers.iter().map(|p| p.paper_id.as_str()).collect();
        ids.sort();
        assert_eq!(ids, vec!["2601.00001", "2601.00002"]);

        // A day-shaped identifier matches exactly.
        let papers = list_papers(&pool, Some("2026-01-19"), None, None)
            .await
            .unwrap();
        assert_eq!(papers.len(), 1);
        assert_eq!(papers[0].paper_id, "2601.00003");
    }

    #[tokio::test]
    async fn test_processing_query_selects_preceding_statuses_ordered() {
        let pool = memory_pool().await;

        for (id, status) in [
            ("2601.00003", Some(Status::New)),
            ("2601.00001", Some(Status::New)),
            ("2601.00002", Some(Status::PdfOk)),
            ("2601.00004", Some(Status::VideoOk)),
        ] {
            upsert_paper(
                &pool,
                id,
                "2026-03",
                PaperPatch {
                    status,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        }

        let papers = get_papers_for_processing(&pool, "2026-03", Status::PdfOk, 3, None)
            .await
            .unwrap();
        let ids: Vec<&str> = papers.iter().map(|p| p.paper_id.as_str()).collect();
        assert_eq!(ids, vec!["2601.00001", "2601.00003"]);

        // PDF_OK precedes NBLM_OK, so it joins the queue for that target.
        let papers = get_papers_for_processing(&pool, "2026-03", Status::NblmOk, 3, None)
            .await
            .unwrap();
        assert_eq!(papers.len(), 3);
    }

    #[tokio::test]
    async fn test_retry_bound_excludes_paper_everywhere() {
        let pool = memory_pool().await;
        upsert_paper(&pool, "2601.00001", "2026-03", PaperPatch::default())
            .await
            .unwrap();

        for _ in 0..3 {
            update_status(&pool, "2601.00001", Status::Error, Some("download failed"), true)
                .await
                .unwrap();
        }

        let paper = get_paper(&pool, "2601.00001").await.unwrap().unwrap();
        assert_eq!(paper.retry_count, 3);
        assert_eq!(paper.status, Status::Error);

        for target in [Status::PdfOk, Status::NblmOk, Status::VideoOk] {
            let papers = get_papers_for_processing(&pool, "2026-03", target, 3, None)
                .await
                .unwrap();
            assert!(papers.is_empty(), "quarantined paper selected for {target}");
        }
    }

    #[tokio::test]
    async fn test_errored_paper_retried_below_bound() {
        let pool = memory_pool().await;
        upsert_paper(&pool, "2601.00001", "2026-03", PaperPatch::default())
            .await
            .unwrap();
        update_status(&pool, "2601.00001", Status::Error, Some("timeout"), true)
            .await
            .unwrap();

        let papers = get_papers_for_processing(&pool, "2026-03", Status::PdfOk, 3, None)
            .await
            .unwrap();
        assert_eq!(papers.len(), 1);
        assert_eq!(papers[0].retry_count, 1);
        assert_eq!(papers[0].last_error.as_deref(), Some("timeout"));
    }

    #[tokio::test]
    async fn test_update_status_clears_error_on_success() {
        let pool = memory_pool().await;
        upsert_paper(&pool, "2601.00001", "2026-03", PaperPatch::default())
            .await
            .unwrap();
        update_status(&pool, "2601.00001", Status::Error, Some("boom"), true)
            .await
            .unwrap();

        let paper = update_status(&pool, "2601.00001", Status::PdfOk, None, false)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(paper.status, Status::PdfOk);
        assert!(paper.last_error.is_none());
        // Retry counter only moves on failed attempts.
        assert_eq!(paper.retry_count, 1);
    }

    #[tokio::test]
    async fn test_update_status_missing_paper() {
        let pool = memory_pool().await;
        let result = update_status(&pool, "nope", Status::PdfOk, None, false)
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_count_and_list_weeks() {
        let pool = memory_pool().await;
        for (id, week, status) in [
            ("2601.00001", "2026-03", Some(Status::VideoOk)),
            ("2601.00002", "2026-03", None),
            ("2601.00003", "2026-04", None),
        ] {
            upsert_paper(
                &pool,
                id,
                week,
                PaperPatch {
                    status,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        }

        assert_eq!(count_papers(&pool, Some("2026-03"), None).await.unwrap(), 2);
        assert_eq!(
            count_papers(&pool, Some("2026-03"), Some(Status::VideoOk))
                .await
                .unwrap(),
            1
        );
        assert_eq!(list_weeks(&pool).await.unwrap(), vec!["2026-04", "2026-03"]);
    }
}
