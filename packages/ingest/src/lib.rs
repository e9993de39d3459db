#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Dealer feed service facade.
//!
//! [`IngestService`] ties the branch registry, sheet aggregation,
//! connectivity probing and service report storage together behind the
//! operations the HTTP server and CLI expose.

use std::sync::Arc;

use chrono::NaiveDate;
use dealer_feed_database::{DbError, ReportStore, paths};
use dealer_feed_pdf::{PdfError, ServiceReportParse, extract_document, parse_service_report};
use dealer_feed_source::aggregator::BranchAggregator;
use dealer_feed_source::connectivity::{ConnectivityProber, ConnectivityState};
use dealer_feed_source::fetcher::{HttpSheetFetcher, SheetFetcher};
use dealer_feed_source::registry::BranchRegistry;
use dealer_feed_source::{DataDomain, SourceError, SourceRecord};
use dealer_feed_source_models::ServiceReportRow;
use serde::Serialize;

/// Errors surfaced by [`IngestService`] operations.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// Registry or branch lookup failure.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// The uploaded document was rejected or unreadable.
    #[error(transparent)]
    Pdf(#[from] PdfError),

    /// Report storage failure.
    #[error(transparent)]
    Db(#[from] DbError),

    /// A blocking task panicked or was cancelled.
    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Outcome of one service report upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportUpload {
    /// Number of technician rows stored.
    pub count: usize,
    /// Stored rows in report order.
    pub rows: Vec<ServiceReportRow>,
    /// Whether the technician table header was found.
    pub header_found: bool,
}

/// Branch data queries and service report intake.
pub struct IngestService {
    registry: Arc<BranchRegistry>,
    aggregator: BranchAggregator,
    prober: ConnectivityProber,
    store: Arc<ReportStore>,
}

impl IngestService {
    /// Creates a service over the given registry, fetcher and store.
    #[must_use]
    pub fn new(
        registry: Arc<BranchRegistry>,
        fetcher: Arc<dyn SheetFetcher>,
        store: Arc<ReportStore>,
    ) -> Self {
        let state = Arc::new(ConnectivityState::new());
        Self {
            aggregator: BranchAggregator::new(Arc::clone(&registry), Arc::clone(&fetcher)),
            prober: ConnectivityProber::new(Arc::clone(&registry), fetcher, state),
            registry,
            store,
        }
    }

    /// Builds the production service: the registry from
    /// `DEALER_FEED_BRANCHES` (or the embedded table), HTTP sheet fetching,
    /// and the report database at `DEALER_FEED_DB` (or
    /// `data/reports.duckdb`).
    ///
    /// # Errors
    ///
    /// Returns [`IngestError`] if the registry is invalid or the database
    /// cannot be opened.
    pub fn from_env() -> Result<Self, IngestError> {
        let registry = Arc::new(BranchRegistry::load()?);
        let fetcher = Arc::new(HttpSheetFetcher::new(registry.export_base())?);
        let store = Arc::new(ReportStore::open(&paths::reports_db_path())?);

        log::info!(
            "Loaded {} branches: {}",
            registry.branches().len(),
            registry.list_branches().join(", ")
        );

        Ok(Self::new(registry, fetcher, store))
    }

    /// Records of `domain` for `branch`, or for every branch when `None`.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Source`] if `branch` is not registered.
    pub async fn get_domain_data(
        &self,
        domain: DataDomain,
        branch: Option<&str>,
    ) -> Result<Vec<SourceRecord>, IngestError> {
        Ok(self.aggregator.get_domain_data(domain, branch).await?)
    }

    /// Registered branch ids in registration order.
    #[must_use]
    pub fn list_branches(&self) -> Vec<&str> {
        self.registry.list_branches()
    }

    /// Extracts, parses and stores an uploaded service report.
    ///
    /// The report replaces whatever was stored for `(branch, date)`; `date`
    /// defaults to today's local date.
    ///
    /// # Errors
    ///
    /// * [`IngestError::Source`] if `branch` is not registered
    /// * [`IngestError::Pdf`] if the file is not a PDF or is unreadable
    /// * [`IngestError::Db`] if storage fails
    pub async fn ingest_service_report(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        branch: &str,
        date: Option<NaiveDate>,
    ) -> Result<ReportUpload, IngestError> {
        self.require_branch(branch)?;

        let name = file_name.to_owned();
        let text = extract_blocking(file_name, move || extract_document(&name, &bytes)).await?;

        log::info!("[{branch}] Extracted {} characters from {file_name}", text.len());

        self.store_report_text(&text, branch, date).await
    }

    /// Parses already-extracted report text and stores the rows.
    ///
    /// Text without a technician table header leaves storage untouched.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError`] if `branch` is not registered or storage
    /// fails.
    pub async fn store_report_text(
        &self,
        text: &str,
        branch: &str,
        date: Option<NaiveDate>,
    ) -> Result<ReportUpload, IngestError> {
        self.require_branch(branch)?;

        let date = date.unwrap_or_else(|| chrono::Local::now().date_naive());
        let ServiceReportParse { rows, header_found } = parse_service_report(text, branch, date);

        if !header_found {
            log::warn!("[{branch}] Keeping stored rows for {date}: report has no technician table");
            return Ok(ReportUpload {
                count: 0,
                rows: Vec::new(),
                header_found,
            });
        }

        let store = Arc::clone(&self.store);
        let key = branch.to_owned();
        let (count, rows) = tokio::task::spawn_blocking(move || {
            store.replace(&key, date, &rows).map(|count| (count, rows))
        })
        .await??;

        Ok(ReportUpload {
            count,
            rows,
            header_found,
        })
    }

    /// Stored service report rows, optionally for one branch and/or day.
    ///
    /// # Errors
    ///
    /// Returns [`IngestError::Db`] if the query fails.
    pub async fn get_reports(
        &self,
        branch: Option<&str>,
        date: Option<NaiveDate>,
    ) -> Result<Vec<ServiceReportRow>, IngestError> {
        let store = Arc::clone(&self.store);
        let branch = branch.map(str::to_owned);
        Ok(tokio::task::spawn_blocking(move || store.query(branch.as_deref(), date)).await??)
    }

    /// Probes the spreadsheet host and records the result.
    pub async fn probe(&self) -> bool {
        self.prober.probe().await
    }

    /// Result of the last probe. Advisory only; reads never consult it.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.prober.state().is_connected()
    }

    /// Shared connectivity state (for health reporting).
    #[must_use]
    pub fn connectivity(&self) -> &Arc<ConnectivityState> {
        self.prober.state()
    }

    fn require_branch(&self, branch: &str) -> Result<(), IngestError> {
        if self.registry.locator(branch).is_none() {
            return Err(SourceError::UnknownBranch(branch.to_owned()).into());
        }
        Ok(())
    }
}

/// Runs a text extraction on a blocking thread. A panic inside the
/// extractor means the document could not be read.
async fn extract_blocking<F>(file_name: &str, extract: F) -> Result<String, IngestError>
where
    F: FnOnce() -> Result<String, PdfError> + Send + 'static,
{
    match tokio::task::spawn_blocking(extract).await {
        Ok(result) => Ok(result?),
        Err(e) if e.is_panic() => Err(PdfError::Extraction(format!(
            "extractor panicked while reading {file_name}"
        ))
        .into()),
        Err(e) => Err(e.into()),
    }
}
