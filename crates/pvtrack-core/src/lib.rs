//! Core domain model for the PA solar PV facility tracker.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const CRATE_NAME: &str = "pvtrack-core";

/// Filter values a snapshot row must match exactly to be retained.
pub const RETAINED_STATE: &str = "PA";
pub const RETAINED_FUEL_TYPE: &str = "SUN";

/// Date format used by the regulatory export, e.g. "06/15/2023".
pub const SNAPSHOT_DATE_FORMAT: &str = "%m/%d/%Y";
/// Date format used when persisting the accumulated dataset.
pub const DATASET_DATE_FORMAT: &str = "%Y-%m-%d";

/// Column names shared between the snapshot export and the accumulated dataset.
pub mod columns {
    pub const CERTIFICATION_ID: &str = "PA Certification #";
    pub const STATE: &str = "State";
    pub const FUEL_TYPES: &str = "Fuel Types at Facility";
    pub const CERTIFICATION_START_DATE: &str = "Certification Start Date";
    pub const YEAR: &str = "Year";
    pub const CAPACITY_MW_DC: &str = "Total NPC MW DC";
    pub const COUNTY: &str = "County";
    /// Dropped from the accumulated dataset during ingest.
    pub const FACILITY_NAME: &str = "Facility Name";

    /// Fixed schema columns, in persisted order. Passthrough columns follow.
    pub const FIXED: [&str; 7] = [
        CERTIFICATION_ID,
        STATE,
        FUEL_TYPES,
        CERTIFICATION_START_DATE,
        YEAR,
        CAPACITY_MW_DC,
        COUNTY,
    ];
}

/// One row of the accumulated dataset.
///
/// Typed fields cover the columns the builder filters, derives, or aggregates
/// on; everything else from the source snapshot rides along in `extra`
/// verbatim, keyed by its original header name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacilityRecord {
    pub certification_id: String,
    pub state: String,
    pub fuel_type: String,
    pub certification_start_date: Option<NaiveDate>,
    pub year: Option<i32>,
    pub capacity_mw_dc: Option<f64>,
    pub county: String,
    pub extra: BTreeMap<String, String>,
}

impl FacilityRecord {
    /// Whether the record matches the fixed retention filters.
    pub fn qualifies(&self) -> bool {
        self.state == RETAINED_STATE && self.fuel_type == RETAINED_FUEL_TYPE
    }

    /// County name normalized for aggregation keys. Source casing varies.
    pub fn normalized_county(&self) -> String {
        self.county.trim().to_uppercase()
    }
}

/// The seven fixed, right-inclusive capacity ranges used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CapacityBin {
    UpTo15Kw,
    To250Kw,
    To1Mw,
    To3Mw,
    To5Mw,
    To10Mw,
    Over10Mw,
}

impl CapacityBin {
    pub const ALL: [CapacityBin; 7] = [
        CapacityBin::UpTo15Kw,
        CapacityBin::To250Kw,
        CapacityBin::To1Mw,
        CapacityBin::To3Mw,
        CapacityBin::To5Mw,
        CapacityBin::To10Mw,
        CapacityBin::Over10Mw,
    ];

    pub fn label(self) -> &'static str {
        match self {
            CapacityBin::UpTo15Kw => "≤ 15 kW",
            CapacityBin::To250Kw => "> 15 kW to ≤ 250 kW",
            CapacityBin::To1Mw => "> 250 kW to ≤ 1 MW",
            CapacityBin::To3Mw => "> 1 MW to ≤ 3 MW",
            CapacityBin::To5Mw => "> 3 MW to ≤ 5 MW",
            CapacityBin::To10Mw => "> 5 MW to ≤ 10 MW",
            CapacityBin::Over10Mw => "> 10 MW",
        }
    }

    fn upper_bound_mw(self) -> f64 {
        match self {
            CapacityBin::UpTo15Kw => 0.015,
            CapacityBin::To250Kw => 0.25,
            CapacityBin::To1Mw => 1.0,
            CapacityBin::To3Mw => 3.0,
            CapacityBin::To5Mw => 5.0,
            CapacityBin::To10Mw => 10.0,
            CapacityBin::Over10Mw => f64::INFINITY,
        }
    }

    /// Right-inclusive lookup: a capacity of exactly 0.015 MW lands in
    /// `UpTo15Kw`. Zero, negative, and non-finite capacities have no bin.
    pub fn for_capacity_mw(value: f64) -> Option<Self> {
        if !value.is_finite() || value <= 0.0 {
            return None;
        }
        Self::ALL
            .iter()
            .copied()
            .find(|bin| value <= bin.upper_bound_mw())
    }
}
