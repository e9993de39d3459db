//! Sheet fetching seam.
//!
//! [`SheetFetcher`] is the only place the aggregator and prober touch the
//! network. [`HttpSheetFetcher`] is the production implementation; tests
//! substitute canned fetchers.

use std::time::Duration;

use async_trait::async_trait;
use dealer_feed_scraper::csv_download::{CsvDownloadScraper, export_url};
use dealer_feed_scraper::{DEFAULT_TIMEOUT, ScrapeError, build_client};
use dealer_feed_source_models::SourceRecord;

use crate::SourceError;

/// Retrieves the rows of one sheet.
#[async_trait]
pub trait SheetFetcher: Send + Sync {
    /// Downloads and parses the sheet `sheet_locator` of `spreadsheet_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError`] if the sheet is unreachable (transport
    /// failure, timeout, or a status other than `200 OK`).
    async fn fetch(
        &self,
        spreadsheet_id: &str,
        sheet_locator: &str,
    ) -> Result<Vec<SourceRecord>, ScrapeError>;
}

/// Fetches sheets through the spreadsheet host's CSV export endpoint.
#[derive(Debug, Clone)]
pub struct HttpSheetFetcher {
    client: reqwest::Client,
    export_base: String,
}

impl HttpSheetFetcher {
    /// Creates a fetcher for `export_base` using the default 15 second
    /// timeout.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Scrape`] if the HTTP client cannot be built.
    pub fn new(export_base: &str) -> Result<Self, SourceError> {
        Self::with_timeout(export_base, DEFAULT_TIMEOUT)
    }

    /// Creates a fetcher for `export_base` with a custom per-request
    /// timeout.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Scrape`] if the HTTP client cannot be built.
    pub fn with_timeout(export_base: &str, timeout: Duration) -> Result<Self, SourceError> {
        Ok(Self {
            client: build_client(timeout)?,
            export_base: export_base.trim_end_matches('/').to_owned(),
        })
    }
}

#[async_trait]
impl SheetFetcher for HttpSheetFetcher {
    async fn fetch(
        &self,
        spreadsheet_id: &str,
        sheet_locator: &str,
    ) -> Result<Vec<SourceRecord>, ScrapeError> {
        let url = export_url(&self.export_base, spreadsheet_id, sheet_locator);
        CsvDownloadScraper::new(self.client.clone(), &url)
            .fetch()
            .await
    }
}

/// Fetches a sheet, turning every failure into an empty result.
///
/// Upstream spreadsheets are outside operational control, so an
/// unreachable sheet means "no data", logged under `label`.
pub async fn fetch_or_empty(
    fetcher: &dyn SheetFetcher,
    label: &str,
    spreadsheet_id: &str,
    sheet_locator: &str,
) -> Vec<SourceRecord> {
    match fetcher.fetch(spreadsheet_id, sheet_locator).await {
        Ok(records) => records,
        Err(e) => {
            log::warn!("[{label}] Sheet {spreadsheet_id} (gid={sheet_locator}) unreachable: {e}");
            Vec::new()
        }
    }
}
