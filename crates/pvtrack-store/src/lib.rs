//! Flat-file persistence for the accumulated facility dataset, plus an
//! immutable archive of ingested raw snapshots.
//!
//! The accumulated dataset is one CSV file, read and rewritten in full on
//! every merge. Writes go through a temp file in the same directory followed
//! by a rename, so a crash mid-write leaves the previous dataset intact.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{Datelike, NaiveDate};
use csv::StringRecord;
use pvtrack_core::{columns, FacilityRecord, DATASET_DATE_FORMAT};
use sha2::{Digest, Sha256};
use tracing::debug;
use uuid::Uuid;

pub const CRATE_NAME: &str = "pvtrack-store";

/// Column order for the persisted dataset: fixed schema columns first, then
/// the union of passthrough columns across all records, sorted by name.
pub fn dataset_columns(records: &[FacilityRecord]) -> Vec<String> {
    let mut cols: Vec<String> = columns::FIXED.iter().map(|c| c.to_string()).collect();
    let extra: std::collections::BTreeSet<&String> =
        records.iter().flat_map(|r| r.extra.keys()).collect();
    cols.extend(extra.into_iter().cloned());
    cols
}

/// Load the accumulated dataset. A missing file is an empty starting
/// collection, not an error.
pub fn load_dataset(path: impl AsRef<Path>) -> anyhow::Result<Vec<FacilityRecord>> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(Vec::new());
    }

    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("opening accumulated dataset {}", path.display()))?;
    let headers = reader
        .headers()
        .with_context(|| format!("reading header of {}", path.display()))?
        .clone();
    let header_map: HashMap<String, usize> = headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (name.to_string(), idx))
        .collect();

    let mut records = Vec::new();
    for result in reader.records() {
        let row = result.with_context(|| format!("reading row of {}", path.display()))?;
        records.push(record_from_row(&headers, &header_map, &row));
    }
    Ok(records)
}

/// Persist the accumulated dataset, overwriting the previous file in full.
pub fn save_dataset(path: impl AsRef<Path>, records: &[FacilityRecord]) -> anyhow::Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating dataset directory {}", parent.display()))?;
    }

    let cols = dataset_columns(records);
    let temp_path = temp_sibling(path);
    {
        let mut writer = csv::Writer::from_path(&temp_path)
            .with_context(|| format!("opening temp dataset file {}", temp_path.display()))?;
        writer.write_record(&cols)?;
        for record in records {
            writer.write_record(row_for_record(record, &cols))?;
        }
        writer
            .flush()
            .with_context(|| format!("flushing temp dataset file {}", temp_path.display()))?;
    }

    fs::rename(&temp_path, path).with_context(|| {
        format!(
            "atomically renaming temp dataset {} -> {}",
            temp_path.display(),
            path.display()
        )
    })?;
    debug!(dataset = %path.display(), rows = records.len(), "persisted accumulated dataset");
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let temp_name = format!(".{}.tmp", Uuid::new_v4());
    path.parent()
        .map(|p| p.join(&temp_name))
        .unwrap_or_else(|| PathBuf::from(temp_name))
}

fn record_from_row(
    headers: &StringRecord,
    header_map: &HashMap<String, usize>,
    row: &StringRecord,
) -> FacilityRecord {
    let get = |name: &str| -> &str {
        header_map
            .get(name)
            .and_then(|&idx| row.get(idx))
            .unwrap_or_default()
    };

    let certification_start_date =
        NaiveDate::parse_from_str(get(columns::CERTIFICATION_START_DATE), DATASET_DATE_FORMAT).ok();
    let year = get(columns::YEAR)
        .parse::<i32>()
        .ok()
        .or_else(|| certification_start_date.map(|d| d.year()));

    let mut extra = std::collections::BTreeMap::new();
    for (idx, name) in headers.iter().enumerate() {
        if columns::FIXED.contains(&name) {
            continue;
        }
        extra.insert(
            name.to_string(),
            row.get(idx).unwrap_or_default().to_string(),
        );
    }

    FacilityRecord {
        certification_id: get(columns::CERTIFICATION_ID).to_string(),
        state: get(columns::STATE).to_string(),
        fuel_type: get(columns::FUEL_TYPES).to_string(),
        certification_start_date,
        year,
        capacity_mw_dc: get(columns::CAPACITY_MW_DC).parse::<f64>().ok(),
        county: get(columns::COUNTY).to_string(),
        extra,
    }
}

fn row_for_record(record: &FacilityRecord, cols: &[String]) -> Vec<String> {
    cols.iter()
        .map(|col| match col.as_str() {
            columns::CERTIFICATION_ID => record.certification_id.clone(),
            columns::STATE => record.state.clone(),
            columns::FUEL_TYPES => record.fuel_type.clone(),
            columns::CERTIFICATION_START_DATE => record
                .certification_start_date
                .map(|d| d.format(DATASET_DATE_FORMAT).to_string())
                .unwrap_or_default(),
            columns::YEAR => record.year.map(|y| y.to_string()).unwrap_or_default(),
            columns::CAPACITY_MW_DC => record
                .capacity_mw_dc
                .map(|c| c.to_string())
                .unwrap_or_default(),
            columns::COUNTY => record.county.clone(),
            other => record.extra.get(other).cloned().unwrap_or_default(),
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct ArchivedSnapshot {
    pub content_hash: String,
    pub path: PathBuf,
    pub byte_size: usize,
    pub deduplicated: bool,
}

/// Content-addressed archive of raw snapshot files as received.
#[derive(Debug, Clone)]
pub struct SnapshotArchive {
    root: PathBuf,
}

impl SnapshotArchive {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn sha256_hex(bytes: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        hex::encode(hasher.finalize())
    }

    /// Store snapshot bytes immutably under a hash-addressed path, using a
    /// temp-file rename. Re-archiving identical bytes deduplicates.
    pub fn archive_bytes(&self, bytes: &[u8]) -> anyhow::Result<ArchivedSnapshot> {
        let content_hash = Self::sha256_hex(bytes);
        let path = self.root.join(format!("{content_hash}.csv"));

        fs::create_dir_all(&self.root)
            .with_context(|| format!("creating archive directory {}", self.root.display()))?;

        if path.exists() {
            return Ok(ArchivedSnapshot {
                content_hash,
                path,
                byte_size: bytes.len(),
                deduplicated: true,
            });
        }

        let temp_path = self.root.join(format!(".{}.tmp", Uuid::new_v4()));
        let mut file = fs::OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&temp_path)
            .with_context(|| format!("opening temp archive file {}", temp_path.display()))?;
        file.write_all(bytes)
            .with_context(|| format!("writing temp archive file {}", temp_path.display()))?;
        file.flush()
            .with_context(|| format!("flushing temp archive file {}", temp_path.display()))?;
        drop(file);

        match fs::rename(&temp_path, &path) {
            Ok(()) => Ok(ArchivedSnapshot {
                content_hash,
                path,
                byte_size: bytes.len(),
                deduplicated: false,
            }),
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                let _ = fs::remove_file(&temp_path);
                Ok(ArchivedSnapshot {
                    content_hash,
                    path,
                    byte_size: bytes.len(),
                    deduplicated: true,
                })
            }
            Err(err) => {
                let _ = fs::remove_file(&temp_path);
                Err(err).with_context(|| {
                    format!(
                        "atomically renaming temp archive {} -> {}",
                        temp_path.display(),
                        path.display()
                    )
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    fn record(id: &str, county: &str) -> FacilityRecord {
        let mut extra = BTreeMap::new();
        extra.insert("Status".to_string(), "Active".to_string());
        FacilityRecord {
            certification_id: id.to_string(),
            state: "PA".into(),
            fuel_type: "SUN".into(),
            certification_start_date: NaiveDate::from_ymd_opt(2023, 6, 15),
            year: Some(2023),
            capacity_mw_dc: Some(0.01),
            county: county.to_string(),
            extra,
        }
    }

    #[test]
    fn snapshot_hashing_is_stable() {
        let hash = SnapshotArchive::sha256_hex(b"hello world");
        assert_eq!(
            hash,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn archive_deduplicates_by_content_hash() {
        let dir = tempdir().expect("tempdir");
        let archive = SnapshotArchive::new(dir.path());

        let first = archive.archive_bytes(b"a,b,c\n1,2,3\n").expect("first archive");
        let second = archive.archive_bytes(b"a,b,c\n1,2,3\n").expect("second archive");

        assert!(!first.deduplicated);
        assert!(second.deduplicated);
        assert_eq!(first.content_hash, second.content_hash);
        assert_eq!(first.path, second.path);
        assert!(first.path.exists());
    }

    #[test]
    fn missing_dataset_loads_as_empty() {
        let dir = tempdir().expect("tempdir");
        let records = load_dataset(dir.path().join("processed.csv")).expect("load");
        assert!(records.is_empty());
    }

    #[test]
    fn dataset_round_trips_through_csv() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("processed.csv");
        let records = vec![record("PA-1", "York"), record("PA-2", "Lancaster")];

        save_dataset(&path, &records).expect("save");
        let loaded = load_dataset(&path).expect("load");

        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].certification_id, "PA-1");
        assert_eq!(loaded[0].year, Some(2023));
        assert_eq!(
            loaded[0].certification_start_date,
            NaiveDate::from_ymd_opt(2023, 6, 15)
        );
        assert_eq!(loaded[0].capacity_mw_dc, Some(0.01));
        assert_eq!(loaded[1].extra.get("Status").map(String::as_str), Some("Active"));
        // No temp files left behind.
        let stray = std::fs::read_dir(dir.path())
            .expect("read_dir")
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .count();
        assert_eq!(stray, 0);
    }

    #[test]
    fn record_with_missing_date_persists_empty_fields() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("processed.csv");
        let mut r = record("PA-3", "Adams");
        r.certification_start_date = None;
        r.year = None;
        r.capacity_mw_dc = None;

        save_dataset(&path, &[r]).expect("save");
        let loaded = load_dataset(&path).expect("load");
        assert_eq!(loaded[0].certification_start_date, None);
        assert_eq!(loaded[0].year, None);
        assert_eq!(loaded[0].capacity_mw_dc, None);
    }
}
