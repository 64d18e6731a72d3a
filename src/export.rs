//! # Export renderer
//! Paginates a finished report into a plain-text document for download.
//!
//! Layout: title and timestamp, subject, key facts, the highlighted post (only
//! when it has text), the body with markup markers stripped, then the source
//! list. Pages are joined with a form feed and carry a "page n/m" footer.

use anyhow::{bail, Result};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::report::AgentReport;

/// Source titles longer than this are cut and suffixed with "...".
pub const SOURCE_TITLE_MAX: usize = 90;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportDocument {
    pub filename: String,
    pub content_type: &'static str,
    pub pages: Vec<String>,
}

impl ExportDocument {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn to_text(&self) -> String {
        self.pages.join("\u{000C}\n")
    }
}

pub trait ExportRenderer: Send + Sync {
    fn render(&self, report: &AgentReport) -> Result<ExportDocument>;
}

#[derive(Debug, Clone)]
pub struct TextRenderer {
    pub title: String,
    pub width: usize,
    pub lines_per_page: usize,
}

impl Default for TextRenderer {
    fn default() -> Self {
        Self {
            title: "Daily Report".to_string(),
            width: 80,
            lines_per_page: 60,
        }
    }
}

impl TextRenderer {
    /// Default layout titled "<subject> Daily Report".
    pub fn for_subject(subject: &str) -> Self {
        let subject = subject.trim();
        if subject.is_empty() {
            return Self::default();
        }
        Self {
            title: format!("{subject} Daily Report"),
            ..Self::default()
        }
    }
}

static HEADING_MARKS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^[ \t]*#+[ \t]*").unwrap());

/// Remove `**` emphasis and `#` heading markers.
pub fn strip_markup(body: &str) -> String {
    HEADING_MARKS
        .replace_all(body, "")
        .replace("**", "")
        .replace('#', "")
}

pub fn truncate_title(title: &str) -> String {
    if title.chars().count() <= SOURCE_TITLE_MAX {
        return title.to_string();
    }
    let cut: String = title.chars().take(SOURCE_TITLE_MAX).collect();
    format!("{cut}...")
}

/// Greedy word wrap; words longer than `width` are split hard.
fn wrap(text: &str, width: usize, indent: &str) -> Vec<String> {
    let width = width.max(indent.chars().count() + 8);
    let avail = width - indent.chars().count();
    let mut out = Vec::new();
    for para in text.lines() {
        if para.trim().is_empty() {
            out.push(String::new());
            continue;
        }
        let mut line = String::new();
        for word in para.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > avail {
                if !line.is_empty() {
                    out.push(format!("{indent}{line}"));
                    line.clear();
                }
                let rest = word.split_off(avail);
                out.push(format!("{indent}{}", word.iter().collect::<String>()));
                word = rest;
            }
            let word: String = word.into_iter().collect();
            let need = if line.is_empty() {
                word.chars().count()
            } else {
                line.chars().count() + 1 + word.chars().count()
            };
            if need > avail && !line.is_empty() {
                out.push(format!("{indent}{line}"));
                line.clear();
            }
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(&word);
        }
        if !line.is_empty() {
            out.push(format!("{indent}{line}"));
        }
    }
    out
}

impl TextRenderer {
    fn layout(&self, report: &AgentReport) -> Vec<String> {
        let rule = "-".repeat(self.width);
        let mut lines = Vec::new();

        lines.extend(wrap(&self.title.to_uppercase(), self.width, ""));
        lines.push(format!(
            "Generated: {}",
            report.generated_at.format("%d.%m.%Y %H:%M UTC")
        ));
        lines.push(rule.clone());
        lines.push(String::new());

        if !report.subject.is_empty() {
            lines.extend(wrap(&report.subject, self.width, ""));
            lines.push(String::new());
        }

        lines.push("KEY FACTS".to_string());
        for fact in report.key_facts.iter().map(|f| f.trim()).filter(|f| !f.is_empty()) {
            let mut wrapped = wrap(fact, self.width, "    ");
            if let Some(first) = wrapped.first_mut() {
                // Continuation lines keep the indent, the first one gets the bullet.
                if let Some(rest) = first.strip_prefix("    ") {
                    *first = format!("  * {rest}");
                }
            }
            lines.extend(wrapped);
        }
        lines.push(String::new());

        if let Some(tweet) = report.tweet.as_ref().filter(|_| report.has_tweet()) {
            lines.push("LATEST POST".to_string());
            lines.extend(wrap(&tweet.text, self.width, "  "));
            lines.push(format!("  {} | {}", tweet.date, tweet.url));
            lines.push(String::new());
        }

        lines.push("SUMMARY".to_string());
        lines.extend(wrap(&strip_markup(&report.body), self.width, ""));
        lines.push(String::new());

        lines.push(rule);
        lines.push("SOURCES".to_string());
        for s in &report.sources {
            lines.extend(wrap(&truncate_title(&s.title), self.width, "  "));
            lines.push(format!("    {}", s.uri));
        }
        lines
    }

    fn paginate(&self, lines: Vec<String>) -> Vec<String> {
        // Two lines per page are reserved for the footer.
        let per_page = self.lines_per_page.max(3) - 2;
        let chunks: Vec<&[String]> = lines.chunks(per_page).collect();
        let total = chunks.len().max(1);
        chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| {
                let mut page = chunk.join("\n");
                let footer = format!("page {}/{}", i + 1, total);
                page.push_str(&format!("\n\n{footer:>width$}", width = self.width));
                page
            })
            .collect()
    }
}

impl ExportRenderer for TextRenderer {
    fn render(&self, report: &AgentReport) -> Result<ExportDocument> {
        if !report.has_body() {
            bail!("report has no body yet; only finished reports can be exported");
        }
        let pages = self.paginate(self.layout(report));
        Ok(ExportDocument {
            filename: format!("briefing_{}.txt", report.generated_at.format("%Y-%m-%d")),
            content_type: "text/plain; charset=utf-8",
            pages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{NewsSource, TweetHighlight};
    use chrono::{TimeZone, Utc};

    fn report(body: &str) -> AgentReport {
        AgentReport {
            generated_at: Utc.with_ymd_and_hms(2025, 9, 6, 9, 0, 0).unwrap(),
            subject: "Betreff".into(),
            body: body.into(),
            key_facts: vec!["Fact one".into(), "Fact two".into()],
            tweet: Some(TweetHighlight {
                text: "Hello".into(),
                url: "https://x.com/elonmusk/status/1".into(),
                date: "2h ago".into(),
            }),
            sources: vec![NewsSource {
                title: "T".repeat(120),
                uri: "https://a.com".into(),
            }],
        }
    }

    #[test]
    fn markup_is_stripped() {
        assert_eq!(
            strip_markup("## Highlights\n**Bold** text #tag"),
            "Highlights\nBold text tag"
        );
    }

    #[test]
    fn long_titles_are_truncated() {
        let t = truncate_title(&"x".repeat(100));
        assert_eq!(t.chars().count(), SOURCE_TITLE_MAX + 3);
        assert!(t.ends_with("..."));
        assert_eq!(truncate_title("short"), "short");
    }

    #[test]
    fn renders_sections_and_filename() {
        let doc = TextRenderer::default().render(&report("## Highlights\n**Big** news")).unwrap();
        assert_eq!(doc.filename, "briefing_2025-09-06.txt");
        assert_eq!(doc.page_count(), 1);
        let text = doc.to_text();
        assert!(text.contains("KEY FACTS"));
        assert!(text.contains(" * Fact one"));
        assert!(text.contains("LATEST POST"));
        assert!(text.contains("Big news"));
        assert!(!text.contains("**"));
        assert!(text.contains("https://a.com"));
        assert!(text.contains("page 1/1"));
    }

    #[test]
    fn blank_tweet_is_omitted() {
        let mut r = report("body");
        r.tweet = Some(TweetHighlight::default());
        let text = TextRenderer::default().render(&r).unwrap().to_text();
        assert!(!text.contains("LATEST POST"));
    }

    #[test]
    fn long_body_spans_pages() {
        let body = (0..200).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n");
        let renderer = TextRenderer {
            lines_per_page: 40,
            ..TextRenderer::default()
        };
        let doc = renderer.render(&report(&body)).unwrap();
        assert!(doc.page_count() > 5);
        let last = doc.pages.last().unwrap();
        assert!(last.contains(&format!("page {0}/{0}", doc.page_count())));
    }

    #[test]
    fn blank_and_multiline_facts_render() {
        let mut r = report("body");
        r.key_facts = vec![
            "\nFact on second line".into(),
            " ".into(),
            String::new(),
            "\nx".into(),
            "first\n\nthird".into(),
        ];
        let text = TextRenderer::default().render(&r).unwrap().to_text();
        assert!(text.contains("  * Fact on second line"));
        assert!(text.contains("  * x"));
        assert!(text.contains("  * first\n\n    third"));
        assert_eq!(text.matches("  * ").count(), 3);
    }

    #[test]
    fn title_follows_subject() {
        let doc = TextRenderer::for_subject("Elon Musk")
            .render(&report("body"))
            .unwrap();
        assert!(doc.pages[0].starts_with("ELON MUSK DAILY REPORT\n"));
        assert_eq!(TextRenderer::for_subject("  ").title, "Daily Report");
    }

    #[test]
    fn partial_report_is_rejected() {
        assert!(TextRenderer::default().render(&report("")).is_err());
    }

    #[test]
    fn wrap_respects_width() {
        let lines = wrap(&"word ".repeat(50), 20, "  ");
        assert!(lines.iter().all(|l| l.chars().count() <= 20));
        let hard = wrap(&"a".repeat(45), 20, "");
        assert_eq!(hard.len(), 3);
    }
}
