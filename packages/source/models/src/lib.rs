#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Branch, data domain, sheet record and service report types.
//!
//! Spreadsheet rows have no fixed schema, so they are carried as
//! [`SourceRecord`]s: ordered header-to-value maps tagged with the branch
//! that produced them. Service productivity reports do have a fixed shape
//! and are carried as [`ServiceReportRow`]s.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::ser::SerializeMap as _;
use serde::{Deserialize, Serialize, Serializer};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString, IntoStaticStr};

/// Key under which the originating branch is stored on every record.
pub const BRANCH_FIELD: &str = "branch";

/// Sheet locator used when a branch has no mapping for a domain (the first
/// sheet of the spreadsheet).
pub const DEFAULT_SHEET_LOCATOR: &str = "0";

/// A category of business data kept in its own sheet of a branch
/// spreadsheet.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum DataDomain {
    /// Sold vehicles
    Sales,
    /// Vehicle and spares inventory
    Stock,
    /// Service job cards
    Service,
    /// Walk-in and phone enquiries
    Enquiry,
    /// Vehicle bookings
    Bookings,
}

impl DataDomain {
    /// All domains in their canonical order.
    pub const ALL: [Self; 5] = [
        Self::Sales,
        Self::Stock,
        Self::Service,
        Self::Enquiry,
        Self::Bookings,
    ];
}

/// Where a branch keeps its data: one spreadsheet, one sheet per domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchLocator {
    /// Branch identifier (e.g. `"Bhavani"`).
    pub branch_id: String,
    /// Identifier of the branch's spreadsheet.
    pub spreadsheet_id: String,
    /// Sheet locator (gid) per data domain.
    pub sheets: BTreeMap<DataDomain, String>,
}

impl BranchLocator {
    /// Returns the sheet locator for `domain`, falling back to
    /// [`DEFAULT_SHEET_LOCATOR`] when the branch has no explicit mapping.
    #[must_use]
    pub fn sheet_for(&self, domain: DataDomain) -> &str {
        self.sheets
            .get(&domain)
            .map_or(DEFAULT_SHEET_LOCATOR, String::as_str)
    }
}

/// One spreadsheet row keyed by column header, in source column order.
///
/// Columns are whatever the sheet currently has. Lookups for a header the
/// sheet does not carry return `None` rather than an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceRecord {
    fields: Vec<(String, String)>,
}

impl SourceRecord {
    /// Creates an empty record.
    #[must_use]
    pub const fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Sets `field` to `value`, replacing any previous value while keeping
    /// the field's original position.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
        let field = field.into();
        let value = value.into();
        if let Some(slot) = self.fields.iter_mut().find(|(name, _)| *name == field) {
            slot.1 = value;
        } else {
            self.fields.push((field, value));
        }
    }

    /// Returns the value of `field`, or `None` if the record has no such
    /// column.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value.as_str())
    }

    /// Returns the branch this record was fetched for, if it has been
    /// tagged.
    #[must_use]
    pub fn branch(&self) -> Option<&str> {
        self.get(BRANCH_FIELD)
    }

    /// Tags the record with its originating branch.
    pub fn tag_branch(&mut self, branch: &str) {
        self.insert(BRANCH_FIELD, branch);
    }

    /// Iterates over `(field, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Number of fields, including the branch tag once applied.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the record has no fields at all.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SourceRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Self::new();
        for (field, value) in iter {
            record.insert(field, value);
        }
        record
    }
}

impl Serialize for SourceRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (field, value) in &self.fields {
            map.serialize_entry(field, value)?;
        }
        map.end()
    }
}

/// The 13 productivity counters of a service report row, in the column
/// order they appear on the report.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
    IntoStaticStr,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "snake_case")]
pub enum ProductivityCounter {
    /// Free service jobs
    Free,
    /// Paid service jobs
    Paid,
    /// Post-service feedback calls
    Psf,
    /// Major repairs
    Major,
    /// Minor repairs
    Minor,
    /// Accident repairs
    Accident,
    /// Pre-delivery inspections
    Pdi,
    /// Total vehicles handled
    VehicleTotal,
    /// Value of parts billed
    PartsValue,
    /// Bench work jobs
    BenchWork,
    /// Outside work jobs
    OutWork,
    /// Water wash jobs
    WaterWork,
    /// Dealer category work
    DealerCatWork,
}

impl ProductivityCounter {
    /// Number of counters on a report row.
    pub const COUNT: usize = 13;

    /// All counters in report column order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Free,
        Self::Paid,
        Self::Psf,
        Self::Major,
        Self::Minor,
        Self::Accident,
        Self::Pdi,
        Self::VehicleTotal,
        Self::PartsValue,
        Self::BenchWork,
        Self::OutWork,
        Self::WaterWork,
        Self::DealerCatWork,
    ];

    /// Zero-based column position of this counter.
    #[must_use]
    pub const fn position(self) -> usize {
        self as usize
    }
}

/// Raw counter tokens of one technician, as printed on the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductivityCounters {
    /// Free service jobs.
    pub free: String,
    /// Paid service jobs.
    pub paid: String,
    /// Post-service feedback calls.
    pub psf: String,
    /// Major repairs.
    pub major: String,
    /// Minor repairs.
    pub minor: String,
    /// Accident repairs.
    pub accident: String,
    /// Pre-delivery inspections.
    pub pdi: String,
    /// Total vehicles handled.
    pub vehicle_total: String,
    /// Value of parts billed.
    pub parts_value: String,
    /// Bench work jobs.
    pub bench_work: String,
    /// Outside work jobs.
    pub out_work: String,
    /// Water wash jobs.
    pub water_work: String,
    /// Dealer category work.
    pub dealer_cat_work: String,
}

impl Default for ProductivityCounters {
    fn default() -> Self {
        Self::from_tokens(std::array::from_fn(|_| "0".to_owned()))
    }
}

impl ProductivityCounters {
    /// Builds counters from tokens in report column order.
    #[must_use]
    pub fn from_tokens(tokens: [String; ProductivityCounter::COUNT]) -> Self {
        let [
            free,
            paid,
            psf,
            major,
            minor,
            accident,
            pdi,
            vehicle_total,
            parts_value,
            bench_work,
            out_work,
            water_work,
            dealer_cat_work,
        ] = tokens;
        Self {
            free,
            paid,
            psf,
            major,
            minor,
            accident,
            pdi,
            vehicle_total,
            parts_value,
            bench_work,
            out_work,
            water_work,
            dealer_cat_work,
        }
    }

    /// Returns the counters as tokens in report column order.
    #[must_use]
    pub fn to_tokens(&self) -> [&str; ProductivityCounter::COUNT] {
        ProductivityCounter::ALL.map(|counter| self.get(counter))
    }

    /// Returns the raw token for `counter`.
    #[must_use]
    pub fn get(&self, counter: ProductivityCounter) -> &str {
        match counter {
            ProductivityCounter::Free => &self.free,
            ProductivityCounter::Paid => &self.paid,
            ProductivityCounter::Psf => &self.psf,
            ProductivityCounter::Major => &self.major,
            ProductivityCounter::Minor => &self.minor,
            ProductivityCounter::Accident => &self.accident,
            ProductivityCounter::Pdi => &self.pdi,
            ProductivityCounter::VehicleTotal => &self.vehicle_total,
            ProductivityCounter::PartsValue => &self.parts_value,
            ProductivityCounter::BenchWork => &self.bench_work,
            ProductivityCounter::OutWork => &self.out_work,
            ProductivityCounter::WaterWork => &self.water_work,
            ProductivityCounter::DealerCatWork => &self.dealer_cat_work,
        }
    }

    /// Parses the token for `counter` as a number.
    ///
    /// Thousands separators are ignored. Returns `None` for tokens that are
    /// not numeric.
    #[must_use]
    pub fn value_of(&self, counter: ProductivityCounter) -> Option<f64> {
        self.get(counter).replace(',', "").parse().ok()
    }
}

/// Productivity figures of one technician for one branch and day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceReportRow {
    /// Serial number printed on the report.
    pub technician_id: String,
    /// Technician name as printed (may span several words).
    pub technician_name: String,
    /// The 13 productivity counters.
    #[serde(flatten)]
    pub counters: ProductivityCounters,
    /// Branch the report was uploaded for.
    pub branch: String,
    /// Day the report covers.
    pub date: NaiveDate,
}
