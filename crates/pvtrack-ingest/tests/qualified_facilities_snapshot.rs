//! Snapshot-shaped fixture exercised end to end through the ingest path.

use pvtrack_ingest::ingest_snapshot;

fn fixture_path() -> std::path::PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures/qualified_facilities_sample.csv")
}

#[test]
fn sample_snapshot_filters_and_derives() {
    let ingest = ingest_snapshot(fixture_path()).expect("ingest fixture");

    assert_eq!(ingest.rows_read, 6);
    // NY row and WND row are discarded.
    assert_eq!(ingest.rows_retained, 4);

    let ids: Vec<&str> = ingest
        .records
        .iter()
        .map(|r| r.certification_id.as_str())
        .collect();
    assert_eq!(ids, vec!["PA-100001", "PA-100002", "PA-100005", "PA-100006"]);

    let by_id = |id: &str| {
        ingest
            .records
            .iter()
            .find(|r| r.certification_id == id)
            .expect("record present")
    };

    assert_eq!(by_id("PA-100002").year, Some(2023));
    assert_eq!(by_id("PA-100002").capacity_mw_dc, Some(2.5));
    assert_eq!(by_id("PA-100002").county, "Lancaster");

    // "pending" is a tolerated defect: date and year are missing, row stays.
    let pending = by_id("PA-100005");
    assert_eq!(pending.certification_start_date, None);
    assert_eq!(pending.year, None);
    assert_eq!(ingest.defects.len(), 1);
    assert_eq!(
        ingest.defects[0].certification_id.as_deref(),
        Some("PA-100005")
    );

    // The facility-name column is dropped, other passthrough columns stay.
    for record in &ingest.records {
        assert!(!record.extra.contains_key("Facility Name"));
        assert!(record.extra.contains_key("Status"));
    }
}
