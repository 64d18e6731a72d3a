// src/sources.rs
use std::collections::HashSet;

use crate::backend::GroundingChunk;
use crate::report::NewsSource;

/// Upper bound on evidence kept per report.
pub const MAX_SOURCES: usize = 15;

/// Title used when a citation carries none.
pub const PLACEHOLDER_TITLE: &str = "News Source";

/// Turn grounding metadata into sources. Chunks without a web entry or
/// without a uri are skipped.
pub fn extract_sources(chunks: &[GroundingChunk]) -> Vec<NewsSource> {
    chunks
        .iter()
        .filter_map(|c| c.web.as_ref())
        .filter_map(|web| {
            let uri = web.uri.as_deref().map(str::trim).filter(|u| !u.is_empty())?;
            let title = web
                .title
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .unwrap_or(PLACEHOLDER_TITLE);
            Some(NewsSource {
                title: title.to_string(),
                uri: uri.to_string(),
            })
        })
        .collect()
}

/// `first` then `second`, later duplicates by exact uri dropped, truncated to `cap`.
pub fn merge_sources(first: &[NewsSource], second: &[NewsSource], cap: usize) -> Vec<NewsSource> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut out = Vec::with_capacity(cap.min(first.len() + second.len()));
    for s in first.iter().chain(second) {
        if out.len() >= cap {
            break;
        }
        if seen.insert(s.uri.as_str()) {
            out.push(s.clone());
        }
    }
    out
}
