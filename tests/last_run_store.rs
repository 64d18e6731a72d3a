// tests/last_run_store.rs

use briefing_agent::schedule::{is_due, LastRunStore};
use chrono::{Duration, TimeZone, Utc};
use std::fs;

#[test]
fn missing_marker_reads_as_never_ran() {
    let tmp = tempfile::tempdir().unwrap();
    let store = LastRunStore::new(tmp.path().join("nope.json"));
    assert!(store.load().is_none());
    assert!(is_due(Utc::now(), store.load()));
}

#[test]
fn save_then_load_round_trips_and_creates_dirs() {
    let tmp = tempfile::tempdir().unwrap();
    let store = LastRunStore::new(tmp.path().join("nested/dir/last_run.json"));
    let ts = Utc.with_ymd_and_hms(2025, 9, 6, 9, 0, 0).unwrap();
    store.save(ts).unwrap();
    assert_eq!(store.load(), Some(ts));
    assert!(!store.path().with_extension("json.tmp").exists());

    assert!(!is_due(ts + Duration::hours(1), store.load()));
    assert!(is_due(ts + Duration::hours(49), store.load()));
}

#[test]
fn corrupt_marker_is_ignored() {
    let tmp = tempfile::tempdir().unwrap();
    let p = tmp.path().join("last_run.json");
    fs::write(&p, "{not json").unwrap();
    assert!(LastRunStore::new(&p).load().is_none());
}
