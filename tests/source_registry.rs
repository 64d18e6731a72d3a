// tests/source_registry.rs
//
// Randomized checks of the source merge invariants.

use std::collections::HashSet;

use briefing_agent::sources::{merge_sources, MAX_SOURCES};
use briefing_agent::NewsSource;
use rand::Rng;

fn random_sources(rng: &mut impl Rng, n: usize) -> Vec<NewsSource> {
    (0..n)
        .map(|i| {
            // Small uri space so duplicates are common.
            let id: u8 = rng.random_range(0..25);
            NewsSource {
                title: format!("title {i}"),
                uri: format!("https://news{id}.example/a"),
            }
        })
        .collect()
}

#[test]
fn merge_invariants_hold_for_random_inputs() {
    let mut rng = rand::rng();
    for _ in 0..200 {
        let na = rng.random_range(0..20);
        let nb = rng.random_range(0..20);
        let a = random_sources(&mut rng, na);
        let b = random_sources(&mut rng, nb);

        let merged = merge_sources(&a, &b, MAX_SOURCES);

        assert!(merged.len() <= MAX_SOURCES);
        let uris: HashSet<&str> = merged.iter().map(|s| s.uri.as_str()).collect();
        assert_eq!(uris.len(), merged.len(), "duplicate uri in output");

        // Idempotent under re-application.
        assert_eq!(merge_sources(&merged, &[], MAX_SOURCES), merged);

        // First-seen order: every output entry is the first occurrence of its uri.
        let all: Vec<&NewsSource> = a.iter().chain(b.iter()).collect();
        let mut last_pos = None;
        for s in &merged {
            let pos = all.iter().position(|x| x.uri == s.uri).unwrap();
            assert_eq!(all[pos], s);
            if let Some(prev) = last_pos {
                assert!(pos > prev);
            }
            last_pos = Some(pos);
        }
    }
}

#[test]
fn empty_merge_is_empty() {
    assert!(merge_sources(&[], &[], MAX_SOURCES).is_empty());
}
