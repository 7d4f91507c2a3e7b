//! HuggingFace daily-papers scraper.
//!
//! Paper pages are linked from the weekly (`/papers/week/2026-W03`) and daily
//! (`/papers/date/2026-01-15`) listings with hrefs like `/papers/2601.03252`.
//! The listing markup beyond that link pattern is not relied on: titles come
//! from the link text when it looks like a title, otherwise from the nearest
//! enclosing card's heading, otherwise a placeholder.

use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use sqlx::SqlitePool;
use tracing::{debug, error, info, instrument};

use crate::config::{ARXIV_PDF_URL, HF_PAPERS_DATE_URL, HF_PAPERS_URL, HF_PAPERS_WEEK_URL};
use crate::db::{self, PaperPatch};
use crate::models::PaperStub;
use crate::week::{dates_for_week, iso_week_label};

static PAPER_LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/papers/(\d{4}\.\d{4,5})$").unwrap());

/// Extract paper stubs from a listing page's HTML.
///
/// Deduplicates by paper id in document order and stops at `max` when given.
/// Pure function over the HTML string so the extraction is unit-testable
/// without a network.
pub fn extract_listing(html: &str, max: Option<usize>) -> Vec<PaperStub> {
    let document = Html::parse_document(html);
    let link_selector = Selector::parse("a[href]").unwrap();
    let heading_selector = Selector::parse("h1, h2, h3").unwrap();

    let mut papers: Vec<PaperStub> = Vec::new();
    for link in document.select(&link_selector) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        let Some(captures) = PAPER_LINK_RE.captures(href) else {
            continue;
        };
        let paper_id = captures[1].to_string();

        if papers.iter().any(|p| p.paper_id == paper_id) {
            continue;
        }

        let mut title = link.text().collect::<String>().trim().to_string();
        if title.len() < 5 {
            if let Some(card_title) = card_heading(&link, &heading_selector) {
                title = card_title;
            }
        }
        if title.is_empty() {
            title = format!("Paper {paper_id}");
        }

        let hf_url = format!("{HF_PAPERS_URL}/{paper_id}");
        let pdf_url = ARXIV_PDF_URL.replace("{paper_id}", &paper_id);
        papers.push(PaperStub {
            paper_id,
            title,
            hf_url,
            pdf_url,
        });

        if let Some(max) = max {
            if papers.len() >= max {
                break;
            }
        }
    }

    papers
}

/// Title from the heading of the nearest enclosing article/div card, if any.
fn card_heading(link: &ElementRef<'_>, heading_selector: &Selector) -> Option<String> {
    for ancestor in link.ancestors().filter_map(ElementRef::wrap) {
        let name = ancestor.value().name();
        if name == "article" || name == "div" {
            let title = ancestor
                .select(heading_selector)
                .next()
                .map(|h| h.text().collect::<String>().trim().to_string())
                .filter(|t| !t.is_empty());
            return title;
        }
    }
    None
}

/// Fetch the weekly listing page and extract its papers.
///
/// A failed fetch logs the error and returns an empty vector.
#[instrument(level = "info", skip(client))]
pub async fn fetch_week_listing(
    client: &reqwest::Client,
    week_id: &str,
    max: Option<usize>,
) -> Vec<PaperStub> {
    let Ok(label) = iso_week_label(week_id) else {
        error!(week_id, "malformed week identifier");
        return Vec::new();
    };
    let url = HF_PAPERS_WEEK_URL.replace("{week}", &label);
    info!(%url, "fetching weekly paper listing");

    let html = match fetch_page(client, &url).await {
        Ok(html) => html,
        Err(e) => {
            error!(error = %e, %url, "failed to fetch weekly listing");
            return Vec::new();
        }
    };

    let papers = extract_listing(&html, max);
    info!(count = papers.len(), week_id, "extracted papers from weekly listing");
    papers
}

/// Fetch a daily listing page and extract its papers.
#[instrument(level = "info", skip(client))]
pub async fn fetch_date_listing(
    client: &reqwest::Client,
    date: &str,
    max: Option<usize>,
) -> Vec<PaperStub> {
    let url = HF_PAPERS_DATE_URL.replace("{date}", date);
    debug!(%url, "fetching daily paper listing");

    let html = match fetch_page(client, &url).await {
        Ok(html) => html,
        Err(e) => {
            error!(error = %e, %url, "failed to fetch daily listing");
            return Vec::new();
        }
    };

    let papers = extract_listing(&html, max);
    info!(count = papers.len(), date, "extracted papers from daily listing");
    papers
}

async fn fetch_page(client: &reqwest::Client, url: &str) -> Result<String> {
    let response = client.get(url).send().await?.error_for_status()?;
    Ok(response.text().await?)
}

/// Scrape a week's papers into the store.
///
/// Tries the weekly listing first; when it comes back empty, falls back to
/// fetching each of the week's seven days. Papers not yet in the store are
/// inserted as `NEW`; papers already present are left untouched. Store
/// failures propagate; fetch failures do not.
#[instrument(level = "info", skip(pool, client))]
pub async fn scrape_week(
    pool: &SqlitePool,
    client: &reqwest::Client,
    week_id: &str,
    max_papers: Option<usize>,
) -> Result<Vec<PaperStub>> {
    info!(week_id, "scraping papers for week");

    let mut collected: Vec<PaperStub> = Vec::new();
    let mut seen_ids: Vec<String> = Vec::new();

    let from_week = fetch_week_listing(client, week_id, max_papers).await;
    if !from_week.is_empty() {
        store_stubs(pool, week_id, from_week, &mut seen_ids, &mut collected, max_papers).await?;
    } else {
        info!(week_id, "weekly listing empty, falling back to per-day fetches");
        for date in dates_for_week(week_id) {
            let remaining = match max_papers {
                Some(max) if collected.len() >= max => break,
                Some(max) => Some(max - collected.len()),
                None => None,
            };
            let from_day = fetch_date_listing(client, &date, remaining).await;
            store_stubs(pool, week_id, from_day, &mut seen_ids, &mut collected, max_papers).await?;
        }
    }

    info!(week_id, total = collected.len(), "scrape complete");
    Ok(collected)
}

async fn store_stubs(
    pool: &SqlitePool,
    week_id: &str,
    stubs: Vec<PaperStub>,
    seen_ids: &mut Vec<String>,
    collected: &mut Vec<PaperStub>,
    max_papers: Option<usize>,
) -> Result<()> {
    for stub in stubs {
        if let Some(max) = max_papers {
            if collected.len() >= max {
                break;
            }
        }
        if seen_ids.contains(&stub.paper_id) {
            continue;
        }
        seen_ids.push(stub.paper_id.clone());

        if db::get_paper(pool, &stub.paper_id).await?.is_some() {
            debug!(paper_id = %stub.paper_id, "paper already in database");
            collected.push(stub);
            continue;
        }

        db::upsert_paper(
            pool,
            &stub.paper_id,
            week_id,
            PaperPatch {
                title: Some(stub.title.clone()),
                hf_url: Some(stub.hf_url.clone()),
                pdf_url: Some(stub.pdf_url.clone()),
                ..Default::default()
            },
        )
        .await?;
        info!(paper_id = %stub.paper_id, title = %crate::utils::truncate_for_log(&stub.title, 50), "added paper");
        collected.push(stub);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_schema;
    use crate::models::Status;

    const LISTING_HTML: &str = r#"
        <html><body>
          <article>
            <h3>Scaling Laws for Paper Digests</h3>
            <a href="/papers/2601.03252">Scaling Laws for Paper Digests</a>
          </article>
          <article>
            <h3>Sparse Attention Revisited</h3>
            <a href="/papers/2601.04001"><img src="thumb.png"/></a>
          </article>
          <a href="/papers/2601.03252">dup</a>
          <a href="/papers/not-an-id">bogus</a>
          <a href="/papers/2601.03252#community">fragment</a>
          <a href="/papers/2601.05555">Short but valid title here</a>
        </body></html>
    "#;

    #[test]
    fn test_extract_listing_pattern_and_dedupe() {
        let papers = extract_listing(LISTING_HTML, None);
        let ids: Vec<&str> = papers.iter().map(|p| p.paper_id.as_str()).collect();
        assert_eq!(ids, vec!["2601.03252", "2601.04001", "2601.05555"]);
    }

    #[test]
    fn test_extract_listing_title_sources() {
        let papers = extract_listing(LISTING_HTML, None);
        // Link text when present, card heading when the link wraps an image.
        assert_eq!(papers[0].title, "Scaling Laws for Paper Digests");
        assert_eq!(papers[1].title, "Sparse Attention Revisited");
    }

    #[test]
    fn test_extract_listing_placeholder_title() {
        let html = r#"<div><a href="/papers/2601.09999"></a></div>"#;
        let papers = extract_listing(html, None);
        assert_eq!(papers[0].title, "Paper 2601.09999");
    }

    #[test]
    fn test_extract_listing_derived_urls() {
        let papers = extract_listing(LISTING_HTML, Some(1));
        assert_eq!(papers.len(), 1);
        assert_eq!(
            papers[0].hf_url,
            "https://huggingface.co/papers/2601.03252"
        );
        assert_eq!(
            papers[0].pdf_url,
            "https://arxiv.org/pdf/2601.03252.pdf"
        );
    }

    #[tokio::test]
    async fn test_store_stubs_preserves_existing_rows() {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        init_schema(&pool).await.unwrap();

        // Paper already advanced by earlier runs.
        db::upsert_paper(
            &pool,
            "2601.03252",
            "2026-03",
            PaperPatch {
                title: Some("Scaling Laws for Paper Digests".to_string()),
                pdf_path: Some("data/pdfs/2601.03252.pdf".to_string()),
                status: Some(Status::PdfOk),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let stubs = extract_listing(LISTING_HTML, None);
        let mut seen = Vec::new();
        let mut collected = Vec::new();
        store_stubs(&pool, "2026-03", stubs, &mut seen, &mut collected, None)
            .await
            .unwrap();

        assert_eq!(collected.len(), 3);
        assert_eq!(db::count_papers(&pool, None, None).await.unwrap(), 3);

        // Re-scraping neither duplicated nor reset the existing paper.
        let paper = db::get_paper(&pool, "2601.03252").await.unwrap().unwrap();
        assert_eq!(paper.status, Status::PdfOk);
        assert_eq!(paper.pdf_path.as_deref(), Some("data/pdfs/2601.03252.pdf"));
    }
}
