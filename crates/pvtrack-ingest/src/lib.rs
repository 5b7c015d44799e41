//! Raw snapshot parsing for the qualified-facilities report.
//!
//! The regulatory export is a CSV with a two-line banner above the real
//! header row. Ingest skips the banner, resolves the header, filters rows to
//! the retained state/fuel population, derives the certification year, and
//! drops the facility-name column. Structural problems are fatal; defects in
//! individual rows (unparsable date or capacity) degrade that row only.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use csv::StringRecord;
use pvtrack_core::{columns, FacilityRecord, SNAPSHOT_DATE_FORMAT};
use thiserror::Error;
use tracing::debug;

pub const CRATE_NAME: &str = "pvtrack-ingest";

/// Lines of non-tabular banner metadata above the snapshot header row.
pub const SNAPSHOT_BANNER_LINES: usize = 2;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("reading snapshot {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("snapshot {} ends before the header row", .path.display())]
    TruncatedBanner { path: PathBuf },
    #[error("snapshot is missing required column \"{0}\"")]
    MissingColumn(&'static str),
    #[error("malformed snapshot row: {0}")]
    MalformedRow(#[from] csv::Error),
}

/// A tolerated row-level defect, kept for operator visibility.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowDefect {
    pub line: usize,
    pub certification_id: Option<String>,
    pub message: String,
}

/// Result of parsing one snapshot file.
#[derive(Debug, Clone)]
pub struct SnapshotIngest {
    pub records: Vec<FacilityRecord>,
    pub rows_read: usize,
    pub rows_retained: usize,
    pub defects: Vec<RowDefect>,
}

/// Parse the certification-start-date column. Exact month/day/year with a
/// four-digit year; anything else is a missing date, not an error.
pub fn parse_certification_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), SNAPSHOT_DATE_FORMAT).ok()
}

/// Load and filter a raw snapshot file into facility records.
pub fn ingest_snapshot(path: impl AsRef<Path>) -> Result<SnapshotIngest, IngestError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| IngestError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let body = skip_banner_lines(&text, SNAPSHOT_BANNER_LINES).ok_or_else(|| {
        IngestError::TruncatedBanner {
            path: path.to_path_buf(),
        }
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(body.as_bytes());

    let headers = reader.headers()?.clone();
    let header_map = build_header_map(&headers);

    let id_idx = require_column(&header_map, columns::CERTIFICATION_ID)?;
    let state_idx = require_column(&header_map, columns::STATE)?;
    let fuel_idx = require_column(&header_map, columns::FUEL_TYPES)?;
    let date_idx = require_column(&header_map, columns::CERTIFICATION_START_DATE)?;
    let capacity_idx = require_column(&header_map, columns::CAPACITY_MW_DC)?;
    let county_idx = require_column(&header_map, columns::COUNTY)?;

    let mut records = Vec::new();
    let mut defects = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // Header row is the third physical line, so data starts four lines in.
        let line = idx + SNAPSHOT_BANNER_LINES + 2;
        let record = result?;
        rows_read += 1;

        let state = field(&record, state_idx);
        let fuel_type = field(&record, fuel_idx);
        if state != pvtrack_core::RETAINED_STATE || fuel_type != pvtrack_core::RETAINED_FUEL_TYPE {
            continue;
        }

        let certification_id = field(&record, id_idx).to_string();

        let raw_date = field(&record, date_idx);
        let certification_start_date = parse_certification_date(raw_date);
        if certification_start_date.is_none() && !raw_date.is_empty() {
            defects.push(RowDefect {
                line,
                certification_id: Some(certification_id.clone()),
                message: format!("unparsable certification start date {raw_date:?}"),
            });
        }

        let raw_capacity = field(&record, capacity_idx);
        let capacity_mw_dc = parse_capacity(raw_capacity);
        if capacity_mw_dc.is_none() && !raw_capacity.is_empty() {
            defects.push(RowDefect {
                line,
                certification_id: Some(certification_id.clone()),
                message: format!("unparsable capacity {raw_capacity:?}"),
            });
        }

        let mut extra = BTreeMap::new();
        for (col, name) in headers.iter().enumerate() {
            let name = normalize_header_name(name);
            if columns::FIXED.contains(&name) || name == columns::FACILITY_NAME {
                continue;
            }
            extra.insert(name.to_string(), field(&record, col).to_string());
        }

        records.push(FacilityRecord {
            certification_id,
            state: state.to_string(),
            fuel_type: fuel_type.to_string(),
            certification_start_date,
            year: certification_start_date.map(|d| d.year()),
            capacity_mw_dc,
            county: field(&record, county_idx).to_string(),
            extra,
        });
    }

    let rows_retained = records.len();
    debug!(
        snapshot = %path.display(),
        rows_read,
        rows_retained,
        defects = defects.len(),
        "ingested snapshot"
    );

    Ok(SnapshotIngest {
        records,
        rows_read,
        rows_retained,
        defects,
    })
}

fn skip_banner_lines(text: &str, count: usize) -> Option<&str> {
    let mut rest = text;
    for _ in 0..count {
        let newline = rest.find('\n')?;
        rest = &rest[newline + 1..];
    }
    if rest.trim().is_empty() {
        return None;
    }
    Some(rest)
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name).to_string(), idx))
        .collect()
}

// Excel exports sometimes carry a UTF-8 BOM on the first header cell; without
// stripping it, schema validation reports the first column as missing.
fn normalize_header_name(name: &str) -> &str {
    name.trim().trim_start_matches('\u{feff}')
}

fn require_column(
    header_map: &HashMap<String, usize>,
    name: &'static str,
) -> Result<usize, IngestError> {
    header_map
        .get(name)
        .copied()
        .ok_or(IngestError::MissingColumn(name))
}

fn field<'r>(record: &'r StringRecord, idx: usize) -> &'r str {
    record.get(idx).unwrap_or_default().trim()
}

fn parse_capacity(value: &str) -> Option<f64> {
    // Some exports thousands-separate large nameplate values.
    let cleaned = value.replace(',', "");
    cleaned.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_snapshot(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        for line in lines {
            writeln!(file, "{line}").expect("write snapshot line");
        }
        file
    }

    const HEADER: &str = "PA Certification #,Facility Name,State,Fuel Types at Facility,Certification Start Date,Total NPC MW DC,County,Status";

    #[test]
    fn filters_to_retained_state_and_fuel() {
        let file = write_snapshot(&[
            "Qualified Facilities Report",
            "Generated 02/12/2025",
            HEADER,
            "PA-1,Roof One,PA,SUN,06/15/2023,0.01,York,Active",
            "PA-2,Out Of State,NY,SUN,06/15/2023,5.0,Albany,Active",
            "PA-3,Wind Farm,PA,WND,06/15/2023,2.0,Somerset,Active",
        ]);

        let ingest = ingest_snapshot(file.path()).expect("ingest");
        assert_eq!(ingest.rows_read, 3);
        assert_eq!(ingest.rows_retained, 1);
        assert_eq!(ingest.records[0].certification_id, "PA-1");
        assert!(ingest.records[0].qualifies());
    }

    #[test]
    fn derives_year_and_tolerates_bad_dates() {
        let file = write_snapshot(&[
            "banner",
            "banner",
            HEADER,
            "PA-1,A,PA,SUN,06/15/2023,0.01,York,Active",
            "PA-2,B,PA,SUN,2023-06-15,0.02,York,Active",
            "PA-3,C,PA,SUN,,0.03,York,Active",
        ]);

        let ingest = ingest_snapshot(file.path()).expect("ingest");
        assert_eq!(ingest.rows_retained, 3);
        assert_eq!(ingest.records[0].year, Some(2023));
        assert_eq!(ingest.records[1].certification_start_date, None);
        assert_eq!(ingest.records[1].year, None);
        assert_eq!(ingest.records[2].year, None);
        // ISO-formatted date is a defect, the empty one is not.
        assert_eq!(ingest.defects.len(), 1);
        assert_eq!(ingest.defects[0].certification_id.as_deref(), Some("PA-2"));
    }

    #[test]
    fn drops_facility_name_and_keeps_passthrough_columns() {
        let file = write_snapshot(&[
            "banner",
            "banner",
            HEADER,
            "PA-1,Roof One,PA,SUN,06/15/2023,0.01,York,Active",
        ]);

        let ingest = ingest_snapshot(file.path()).expect("ingest");
        let record = &ingest.records[0];
        assert!(!record.extra.contains_key(columns::FACILITY_NAME));
        assert_eq!(record.extra.get("Status").map(String::as_str), Some("Active"));
    }

    #[test]
    fn missing_required_column_is_fatal() {
        let file = write_snapshot(&[
            "banner",
            "banner",
            "PA Certification #,State,Fuel Types at Facility,Total NPC MW DC,County",
            "PA-1,PA,SUN,0.01,York",
        ]);

        let err = ingest_snapshot(file.path()).expect_err("should fail");
        assert!(matches!(
            err,
            IngestError::MissingColumn(columns::CERTIFICATION_START_DATE)
        ));
    }

    #[test]
    fn truncated_banner_is_fatal() {
        let file = write_snapshot(&["only one line"]);
        let err = ingest_snapshot(file.path()).expect_err("should fail");
        assert!(matches!(err, IngestError::TruncatedBanner { .. }));
    }

    #[test]
    fn missing_snapshot_file_is_fatal() {
        let err = ingest_snapshot("/nonexistent/qualified_facilities.csv").expect_err("should fail");
        assert!(matches!(err, IngestError::Read { .. }));
    }

    #[test]
    fn capacity_parsing_handles_thousands_separators() {
        assert_eq!(parse_capacity("1,234.5"), Some(1234.5));
        assert_eq!(parse_capacity("0.0151"), Some(0.0151));
        assert_eq!(parse_capacity("n/a"), None);
        assert_eq!(parse_capacity(""), None);
    }
}
