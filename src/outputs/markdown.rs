//! Markdown digest rendering.
//!
//! Renders the same data as the JSON digest in a human-readable layout:
//! header, summary counts, one section per paper with links and local file
//! paths, and a footer.

use crate::models::WeekDigest;

/// Render a digest document as Markdown.
pub fn digest_to_markdown(digest: &WeekDigest) -> String {
    let mut lines: Vec<String> = vec![
        format!("# Weekly AI Paper Digest - {}", digest.week_id),
        String::new(),
        format!("**Year:** {} | **Week:** {}", digest.year, digest.week),
        format!("**Generated:** {}", digest.generated_at),
        String::new(),
        "## Summary".to_string(),
        String::new(),
        format!("- Total papers: {}", digest.stats.total),
        format!("- Videos generated: {}", digest.stats.video_ok),
        format!("- PDFs downloaded: {}", digest.stats.pdf_ok),
        format!("- Pending: {}", digest.stats.new),
        format!("- Errors: {}", digest.stats.error),
        String::new(),
        "---".to_string(),
        String::new(),
        "## Papers".to_string(),
        String::new(),
    ];

    if digest.papers.is_empty() {
        lines.push("*No papers with completed videos for this week.*".to_string());
    } else {
        for (i, paper) in digest.papers.iter().enumerate() {
            lines.push(format!(
                "### {}. {}",
                i + 1,
                paper.title.as_deref().unwrap_or("Untitled")
            ));
            lines.push(String::new());
            lines.push(format!("**Paper ID:** `{}`", paper.paper_id));
            lines.push(String::new());

            let mut links = Vec::new();
            if let Some(hf_url) = &paper.hf_url {
                links.push(format!("[HuggingFace]({hf_url})"));
            }
            if let Some(pdf_url) = &paper.pdf_url {
                links.push(format!("[arXiv PDF]({pdf_url})"));
            }
            if !links.is_empty() {
                lines.push(format!("**Links:** {}", links.join(" | ")));
                lines.push(String::new());
            }

            let mut files = Vec::new();
            if let Some(pdf_path) = &paper.pdf_path {
                files.push(format!("PDF: `{pdf_path}`"));
            }
            if let Some(video_path) = &paper.video_path {
                files.push(format!("Video: `{video_path}`"));
            }
            if !files.is_empty() {
                lines.push("**Local files:**".to_string());
                for file in files {
                    lines.push(format!("- {file}"));
                }
                lines.push(String::new());
            }

            lines.push(format!("**Status:** {}", paper.status));
            lines.push(String::new());
            lines.push("---".to_string());
            lines.push(String::new());
        }
    }

    lines.extend([
        String::new(),
        "## About".to_string(),
        String::new(),
        "This digest was automatically generated by paper_digest.".to_string(),
        "Videos are narrated audio overviews of each paper.".to_string(),
    ]);

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DigestPaper, DigestStats, Status};

    fn digest_with(papers: Vec<DigestPaper>) -> WeekDigest {
        WeekDigest {
            week_id: "2026-03".to_string(),
            year: 2026,
            week: 3,
            generated_at: "2026-01-18T10:00:00.000000Z".to_string(),
            total_papers: papers.len(),
            papers,
            stats: DigestStats {
                total: 2,
                video_ok: 1,
                pdf_ok: 1,
                new: 0,
                error: 0,
            },
        }
    }

    #[test]
    fn test_markdown_header_and_summary() {
        let md = digest_to_markdown(&digest_with(vec![]));
        assert!(md.starts_with("# Weekly AI Paper Digest - 2026-03"));
        assert!(md.contains("**Year:** 2026 | **Week:** 3"));
        assert!(md.contains("- Total papers: 2"));
        assert!(md.contains("- Videos generated: 1"));
        assert!(md.contains("*No papers with completed videos for this week.*"));
    }

    #[test]
    fn test_markdown_paper_section() {
        let md = digest_to_markdown(&digest_with(vec![DigestPaper {
            paper_id: "2601.03252".to_string(),
            title: Some("Scaling Laws".to_string()),
            hf_url: Some("https://huggingface.co/papers/2601.03252".to_string()),
            pdf_url: Some("https://arxiv.org/pdf/2601.03252.pdf".to_string()),
            pdf_path: Some("data/pdfs/2601.03252.pdf".to_string()),
            video_path: None,
            status: Status::PdfOk,
        }]));

        assert!(md.contains("### 1. Scaling Laws"));
        assert!(md.contains("**Paper ID:** `2601.03252`"));
        assert!(md.contains(
            "**Links:** [HuggingFace](https://huggingface.co/papers/2601.03252) | [arXiv PDF](https://arxiv.org/pdf/2601.03252.pdf)"
        ));
        assert!(md.contains("- PDF: `data/pdfs/2601.03252.pdf`"));
        assert!(!md.contains("Video: `"));
        assert!(md.contains("**Status:** PDF_OK"));
    }

    #[test]
    fn test_markdown_untitled_fallback() {
        let md = digest_to_markdown(&digest_with(vec![DigestPaper {
            paper_id: "2601.00009".to_string(),
            title: None,
            hf_url: None,
            pdf_url: None,
            pdf_path: None,
            video_path: None,
            status: Status::New,
        }]));
        assert!(md.contains("### 1. Untitled"));
    }
}
