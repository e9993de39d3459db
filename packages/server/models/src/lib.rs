#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the dealer feed server.
//!
//! These types are serialized to JSON for the REST API. They are separate
//! from the storage and source types to allow independent evolution of the
//! API contract.

use chrono::{DateTime, NaiveDate, Utc};
use dealer_feed_source_models::{ServiceReportRow, SourceRecord};
use serde::{Deserialize, Serialize};

/// Health check response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the service is healthy.
    pub healthy: bool,
    /// Service version.
    pub version: String,
    /// Result of the last spreadsheet connectivity probe.
    pub connected: bool,
    /// When the last probe ran.
    pub last_probe_at: Option<DateTime<Utc>>,
}

/// Registered branch ids.
#[derive(Debug, Clone, Serialize)]
pub struct ApiBranches {
    /// Branch ids in registration order.
    pub branches: Vec<String>,
}

/// Records of one data domain.
#[derive(Debug, Clone, Serialize)]
pub struct ApiDomainData {
    /// Branch-tagged records.
    pub data: Vec<SourceRecord>,
    /// Number of records in `data`.
    pub total: usize,
    /// Branch the records were requested for, `None` for all branches.
    pub branch: Option<String>,
}

/// Query parameters for the domain data endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainDataParams {
    /// Restrict to one branch.
    pub branch: Option<String>,
    /// Case-insensitive text search.
    pub search: Option<String>,
    /// Inclusive start date (`YYYY-MM-DD`).
    pub from: Option<NaiveDate>,
    /// Inclusive end date (`YYYY-MM-DD`).
    pub to: Option<NaiveDate>,
}

/// Query parameters for the distinct field values endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistinctValuesParams {
    /// Column header whose values are listed.
    pub field: String,
    /// Restrict to one branch.
    pub branch: Option<String>,
}

/// Distinct non-empty values of one column.
#[derive(Debug, Clone, Serialize)]
pub struct ApiDistinctValues {
    /// Column header the values were read from.
    pub field: String,
    /// Sorted distinct values.
    pub values: Vec<String>,
}

/// Query parameters for a service report upload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportUploadParams {
    /// Branch the report belongs to.
    pub branch: String,
    /// Original file name; must end in `.pdf`.
    pub file_name: String,
    /// Day the report covers. Defaults to today.
    pub date: Option<NaiveDate>,
}

/// Result of a service report upload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiReportUpload {
    /// Number of technician rows stored.
    pub count: usize,
    /// Whether the technician table header was found.
    pub header_found: bool,
    /// Stored rows in report order.
    pub rows: Vec<ServiceReportRow>,
}

/// Query parameters for stored service reports.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportQueryParams {
    /// Restrict to one branch.
    pub branch: Option<String>,
    /// Restrict to one day.
    pub date: Option<NaiveDate>,
}

/// Stored service report rows.
#[derive(Debug, Clone, Serialize)]
pub struct ApiReports {
    /// Rows ordered by date, branch and report position.
    pub data: Vec<ServiceReportRow>,
    /// Number of rows in `data`.
    pub total: usize,
}

/// Error body returned with 4xx/5xx responses.
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    /// Human-readable error message.
    pub error: String,
}
