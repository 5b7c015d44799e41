//! Incremental facility dataset builder and read-only aggregation.
//!
//! One merge run: load the accumulated dataset (missing file = empty), ingest
//! a fresh snapshot, concatenate existing-then-new, deduplicate by
//! certification id with first-seen precedence, persist the result back in
//! full, and write a per-run report for the operator. Aggregation functions
//! below are pure and recomputed per call; every presentation surface goes
//! through them.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use pvtrack_core::{CapacityBin, FacilityRecord};
use pvtrack_ingest::{ingest_snapshot, RowDefect};
use pvtrack_store::{dataset_columns, load_dataset, save_dataset, SnapshotArchive};
use serde::{Deserialize, Serialize};
use tracing::{info, info_span, warn};
use uuid::Uuid;

pub const CRATE_NAME: &str = "pvtrack-merge";

#[derive(Debug, Clone)]
pub struct MergeConfig {
    pub dataset_path: PathBuf,
    pub snapshot_path: PathBuf,
    pub archive_dir: PathBuf,
    pub geojson_path: PathBuf,
    pub workspace_root: PathBuf,
}

impl MergeConfig {
    pub fn from_env() -> Self {
        Self {
            dataset_path: std::env::var("PVTRACK_DATASET")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data/processed_data.csv")),
            snapshot_path: std::env::var("PVTRACK_SNAPSHOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data/Qualified_Facilities_Report.csv")),
            archive_dir: std::env::var("PVTRACK_ARCHIVE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./artifacts")),
            geojson_path: std::env::var("PVTRACK_GEOJSON")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data/pa_counties.geojson")),
            workspace_root: PathBuf::from("."),
        }
    }
}

/// Site/report metadata, loaded from `pvtrack.yaml` at the workspace root.
/// Every field has a default so the file is optional.
#[derive(Debug, Clone, Deserialize)]
pub struct SiteRegistry {
    #[serde(default)]
    pub site: SiteInfo,
    #[serde(default)]
    pub map: MapInfo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SiteInfo {
    #[serde(default = "default_site_title")]
    pub title: String,
    #[serde(default = "default_attribution")]
    pub attribution: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MapInfo {
    #[serde(default = "default_feature_id_key")]
    pub feature_id_key: String,
}

fn default_site_title() -> String {
    "PA Solar PV Data Dashboard".to_string()
}

fn default_attribution() -> String {
    "source: PA AEPS / PUC".to_string()
}

fn default_feature_id_key() -> String {
    "properties.COUNTY_NAM".to_string()
}

impl Default for SiteInfo {
    fn default() -> Self {
        Self {
            title: default_site_title(),
            attribution: default_attribution(),
        }
    }
}

impl Default for MapInfo {
    fn default() -> Self {
        Self {
            feature_id_key: default_feature_id_key(),
        }
    }
}

impl Default for SiteRegistry {
    fn default() -> Self {
        Self {
            site: SiteInfo::default(),
            map: MapInfo::default(),
        }
    }
}

pub fn load_site_registry(workspace_root: &std::path::Path) -> Result<SiteRegistry> {
    let path = workspace_root.join("pvtrack.yaml");
    if !path.exists() {
        return Ok(SiteRegistry::default());
    }
    let text =
        fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
    serde_yaml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

#[derive(Debug, Clone, Serialize)]
pub struct MergeRunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub existing_rows: usize,
    pub snapshot_rows_read: usize,
    pub snapshot_rows_retained: usize,
    pub new_rows_added: usize,
    pub duplicate_ids_skipped: usize,
    pub total_rows: usize,
    pub row_defects: usize,
    pub columns: Vec<String>,
    pub snapshot_hash: String,
    pub reports_dir: String,
}

/// Concatenate existing-then-new and deduplicate by certification id,
/// keeping the first occurrence per id. Rows already in the accumulated
/// dataset therefore take precedence over same-id rows from the snapshot.
pub fn merge_records(
    existing: Vec<FacilityRecord>,
    new: Vec<FacilityRecord>,
) -> (Vec<FacilityRecord>, usize) {
    let mut seen: HashSet<String> = HashSet::new();
    let mut merged = Vec::with_capacity(existing.len() + new.len());
    let mut skipped = 0usize;

    for record in existing.into_iter().chain(new) {
        if seen.insert(record.certification_id.clone()) {
            merged.push(record);
        } else {
            skipped += 1;
        }
    }
    (merged, skipped)
}

pub struct MergePipeline {
    config: MergeConfig,
}

impl MergePipeline {
    pub fn new(config: MergeConfig) -> Self {
        Self { config }
    }

    pub fn run_once(&self) -> Result<MergeRunSummary> {
        let started_at = Utc::now();
        let run_id = Uuid::new_v4();
        let span = info_span!("merge_run", %run_id);
        let _guard = span.enter();

        let existing = load_dataset(&self.config.dataset_path)?;
        let existing_rows = existing.len();

        let raw_bytes = fs::read(&self.config.snapshot_path).with_context(|| {
            format!("reading snapshot {}", self.config.snapshot_path.display())
        })?;
        let ingest = ingest_snapshot(&self.config.snapshot_path)?;
        let archived = SnapshotArchive::new(&self.config.archive_dir).archive_bytes(&raw_bytes)?;
        for defect in &ingest.defects {
            warn!(
                line = defect.line,
                certification_id = defect.certification_id.as_deref().unwrap_or("?"),
                "{}",
                defect.message
            );
        }

        let retained = ingest.rows_retained;
        let (merged, duplicate_ids_skipped) = merge_records(existing, ingest.records);
        let total_rows = merged.len();
        let new_rows_added = total_rows.saturating_sub(existing_rows);

        save_dataset(&self.config.dataset_path, &merged)?;
        let columns = dataset_columns(&merged);

        let finished_at = Utc::now();
        let mut summary = MergeRunSummary {
            run_id,
            started_at,
            finished_at,
            existing_rows,
            snapshot_rows_read: ingest.rows_read,
            snapshot_rows_retained: retained,
            new_rows_added,
            duplicate_ids_skipped,
            total_rows,
            row_defects: ingest.defects.len(),
            columns,
            snapshot_hash: archived.content_hash,
            reports_dir: String::new(),
        };
        let reports_dir = self.write_reports(&summary, &ingest.defects)?;
        summary.reports_dir = reports_dir.display().to_string();

        info!(
            total_rows,
            new_rows_added, duplicate_ids_skipped, "merge run complete"
        );
        Ok(summary)
    }

    fn write_reports(&self, summary: &MergeRunSummary, defects: &[RowDefect]) -> Result<PathBuf> {
        let reports_dir = self
            .config
            .workspace_root
            .join("reports")
            .join(summary.run_id.to_string());
        fs::create_dir_all(&reports_dir)
            .with_context(|| format!("creating {}", reports_dir.display()))?;

        let summary_json =
            serde_json::to_vec_pretty(summary).context("serializing merge summary")?;
        fs::write(reports_dir.join("merge_summary.json"), summary_json)
            .context("writing merge_summary.json")?;

        let defect_lines = if defects.is_empty() {
            "- none".to_string()
        } else {
            defects
                .iter()
                .map(|d| {
                    format!(
                        "- line {}: {} ({})",
                        d.line,
                        d.message,
                        d.certification_id.as_deref().unwrap_or("?")
                    )
                })
                .collect::<Vec<_>>()
                .join("\n")
        };
        let brief = format!(
            "# Merge Brief\n\n- Run ID: `{}`\n- Started: {}\n- Finished: {}\n- Snapshot rows read: {}\n- Snapshot rows retained: {}\n- New rows added: {}\n- Duplicate ids skipped: {}\n- Total rows: {}\n- Snapshot sha256: `{}`\n\n## Row Defects\n{}\n",
            summary.run_id,
            summary.started_at,
            summary.finished_at,
            summary.snapshot_rows_read,
            summary.snapshot_rows_retained,
            summary.new_rows_added,
            summary.duplicate_ids_skipped,
            summary.total_rows,
            summary.snapshot_hash,
            defect_lines
        );
        fs::write(reports_dir.join("brief.md"), brief).context("writing brief.md")?;

        Ok(reports_dir)
    }
}

pub fn run_merge_once_from_env() -> Result<MergeRunSummary> {
    MergePipeline::new(MergeConfig::from_env()).run_once()
}

// ---------------------------------------------------------------------------
// Read-only aggregation over the accumulated dataset.
//
// Rows with a missing year are excluded from year-keyed series; rows with a
// missing capacity contribute to counts but not to sums or bins.
// ---------------------------------------------------------------------------

/// Capacity installed per certification year, ascending by year.
pub fn annual_capacity_mw(records: &[FacilityRecord]) -> Vec<(i32, f64)> {
    let mut by_year: BTreeMap<i32, f64> = BTreeMap::new();
    for record in records {
        let Some(year) = record.year else { continue };
        *by_year.entry(year).or_default() += record.capacity_mw_dc.unwrap_or(0.0);
    }
    by_year.into_iter().collect()
}

/// Number of systems certified per year, ascending by year.
pub fn annual_system_counts(records: &[FacilityRecord]) -> Vec<(i32, u64)> {
    let mut by_year: BTreeMap<i32, u64> = BTreeMap::new();
    for record in records {
        let Some(year) = record.year else { continue };
        *by_year.entry(year).or_default() += 1;
    }
    by_year.into_iter().collect()
}

/// Running total over a year-sorted series.
pub fn cumulative_over_years(series: &[(i32, f64)]) -> Vec<(i32, f64)> {
    let mut total = 0.0;
    series
        .iter()
        .map(|&(year, value)| {
            total += value;
            (year, total)
        })
        .collect()
}

/// Total capacity per county, county names uppercased, ascending by name.
pub fn county_capacity_mw(records: &[FacilityRecord]) -> Vec<(String, f64)> {
    let mut by_county: BTreeMap<String, f64> = BTreeMap::new();
    for record in records {
        *by_county.entry(record.normalized_county()).or_default() +=
            record.capacity_mw_dc.unwrap_or(0.0);
    }
    by_county.into_iter().collect()
}

/// Number of systems per county, county names uppercased, ascending by name.
pub fn county_system_counts(records: &[FacilityRecord]) -> Vec<(String, u64)> {
    let mut by_county: BTreeMap<String, u64> = BTreeMap::new();
    for record in records {
        *by_county.entry(record.normalized_county()).or_default() += 1;
    }
    by_county.into_iter().collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapacityBinRow {
    pub label: &'static str,
    pub systems: u64,
    pub total_mw: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapacitySummaryTable {
    pub rows: Vec<CapacityBinRow>,
    pub total_systems: u64,
    pub total_mw: i64,
}

/// Installed-capacity summary over the seven fixed bins. Every bin appears
/// even when empty; per-bin MW is rounded to whole megawatts and the Total
/// row sums the rounded values.
pub fn capacity_summary_table(records: &[FacilityRecord]) -> CapacitySummaryTable {
    let mut systems: BTreeMap<CapacityBin, u64> = BTreeMap::new();
    let mut capacity: BTreeMap<CapacityBin, f64> = BTreeMap::new();
    for record in records {
        let Some(mw) = record.capacity_mw_dc else { continue };
        let Some(bin) = CapacityBin::for_capacity_mw(mw) else { continue };
        *systems.entry(bin).or_default() += 1;
        *capacity.entry(bin).or_default() += mw;
    }

    let rows: Vec<CapacityBinRow> = CapacityBin::ALL
        .iter()
        .map(|bin| CapacityBinRow {
            label: bin.label(),
            systems: systems.get(bin).copied().unwrap_or(0),
            total_mw: capacity.get(bin).copied().unwrap_or(0.0).round() as i64,
        })
        .collect();

    let total_systems = rows.iter().map(|r| r.systems).sum();
    let total_mw = rows.iter().map(|r| r.total_mw).sum();
    CapacitySummaryTable {
        rows,
        total_systems,
        total_mw,
    }
}

/// Latest certification start date present in the dataset, for captions.
pub fn latest_certification_date(records: &[FacilityRecord]) -> Option<NaiveDate> {
    records
        .iter()
        .filter_map(|r| r.certification_start_date)
        .max()
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetStats {
    pub rows: usize,
    pub counties: usize,
    pub first_year: Option<i32>,
    pub last_year: Option<i32>,
    pub latest_date: Option<NaiveDate>,
    pub total_capacity_mw: f64,
}

pub fn dataset_stats(records: &[FacilityRecord]) -> DatasetStats {
    let counties: HashSet<String> = records
        .iter()
        .map(|r| r.normalized_county())
        .filter(|c| !c.is_empty())
        .collect();
    let years: Vec<i32> = records.iter().filter_map(|r| r.year).collect();
    DatasetStats {
        rows: records.len(),
        counties: counties.len(),
        first_year: years.iter().min().copied(),
        last_year: years.iter().max().copied(),
        latest_date: latest_certification_date(records),
        total_capacity_mw: records.iter().filter_map(|r| r.capacity_mw_dc).sum(),
    }
}
