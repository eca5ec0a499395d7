//! Overview persistence: the store is read once on open and written back
//! exactly once on close, in the documented attribute layout.

use oai_harvester::{HarvesterError, Overview, RunMode};
use pretty_assertions::assert_eq;

#[test]
fn open_missing_store_starts_empty_in_normal_mode() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("overview.xml");

    let overview = Overview::open(&path).unwrap();
    assert_eq!(overview.mode(), RunMode::Normal);
    assert!(overview.endpoints().is_empty());
}

#[test]
fn close_then_open_round_trips_endpoint_state() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("overview.xml");

    let mut overview = Overview::open(&path).unwrap();
    overview
        .endpoint_state("https://a.org/oai")
        .record_attempt(true);
    overview.endpoint_state("https://b.org/oai").retry = true;
    overview.close().unwrap();

    let mut reopened = Overview::open(&path).unwrap();

    let a = reopened.endpoint_state("https://a.org/oai").clone();
    assert!(a.attempted.is_some());
    assert_eq!(a.attempted, a.harvested);
    assert!(a.allows_incremental());

    let b = reopened.endpoint_state("https://b.org/oai").clone();
    assert!(b.needs_retry());
    assert!(b.attempted.is_none());
}

#[test]
fn failed_attempt_round_trips_without_success_date() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("overview.xml");

    let mut overview = Overview::open(&path).unwrap();
    overview
        .endpoint_state("https://a.org/oai")
        .record_attempt(false);
    overview.close().unwrap();

    let mut reopened = Overview::open(&path).unwrap();
    let state = reopened.endpoint_state("https://a.org/oai").clone();
    assert!(state.attempted.is_some());
    assert!(state.last_successful_date().is_none());
    assert!(!state.allows_incremental());
}

#[test]
fn stored_layout_matches_documented_shape() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("overview.xml");

    let mut overview = Overview::open(&path).unwrap();
    overview.endpoint_state("https://a.org/oai");
    overview.close().unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("<harvesting mode=\"normal\">"));
    assert!(text.contains(
        "<endpoint uri=\"https://a.org/oai\" blocked=\"false\" incremental=\"true\" retry=\"false\"/>"
    ));
    assert!(text.trim_end().ends_with("</harvesting>"));
}

#[test]
fn opening_a_corrupt_store_is_a_persistence_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("overview.xml");
    std::fs::write(&path, "not xml at all <").unwrap();

    let err = Overview::open(&path).unwrap_err();
    assert!(matches!(err, HarvesterError::Persistence { .. }));
    assert!(!err.is_recoverable());
}

#[test]
fn existing_store_mode_is_respected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("overview.xml");
    std::fs::write(
        &path,
        "<harvesting mode=\"refresh\">\n  <endpoint uri=\"https://a.org/oai\" blocked=\"true\"/>\n</harvesting>\n",
    )
    .unwrap();

    let mut overview = Overview::open(&path).unwrap();
    assert_eq!(overview.mode(), RunMode::Refresh);
    assert!(overview.endpoint_state("https://a.org/oai").is_blocked());
}
