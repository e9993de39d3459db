//! Advisory connectivity probing.
//!
//! [`ConnectivityProber::probe`] is the only writer of
//! [`ConnectivityState`]; health and status surfaces read it. Reads of
//! sheet data never consult it and are always attempted.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use dealer_feed_source_models::DataDomain;

use crate::fetcher::SheetFetcher;
use crate::registry::BranchRegistry;

/// Result of the most recent connectivity probe.
#[derive(Debug, Default)]
pub struct ConnectivityState {
    connected: AtomicBool,
    last_probe_at: Mutex<Option<DateTime<Utc>>>,
}

impl ConnectivityState {
    /// Creates a state that has never been probed (`connected == false`).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the last probe reached the spreadsheet host.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// When the last probe finished, if one has run.
    #[must_use]
    pub fn last_probe_at(&self) -> Option<DateTime<Utc>> {
        self.last_probe_at.lock().map_or(None, |at| *at)
    }

    fn record(&self, connected: bool) {
        self.connected.store(connected, Ordering::Release);
        if let Ok(mut at) = self.last_probe_at.lock() {
            *at = Some(Utc::now());
        }
    }
}

/// Checks whether the first configured sheet can be downloaded.
pub struct ConnectivityProber {
    registry: Arc<BranchRegistry>,
    fetcher: Arc<dyn SheetFetcher>,
    state: Arc<ConnectivityState>,
}

impl ConnectivityProber {
    /// Creates a prober that records its results in `state`.
    #[must_use]
    pub fn new(
        registry: Arc<BranchRegistry>,
        fetcher: Arc<dyn SheetFetcher>,
        state: Arc<ConnectivityState>,
    ) -> Self {
        Self {
            registry,
            fetcher,
            state,
        }
    }

    /// Downloads the first branch's first-domain sheet and records whether
    /// it returned at least one data row.
    ///
    /// Never fails: any error is recorded as `false`.
    pub async fn probe(&self) -> bool {
        let Some(locator) = self.registry.branches().first() else {
            log::warn!("Connectivity probe skipped: no branches registered");
            self.state.record(false);
            return false;
        };

        let domain = DataDomain::ALL[0];
        let sheet = locator.sheet_for(domain);

        let connected = match self.fetcher.fetch(&locator.spreadsheet_id, sheet).await {
            Ok(records) if !records.is_empty() => {
                log::info!(
                    "Connected to spreadsheet host: {} {domain} rows for {}",
                    records.len(),
                    locator.branch_id
                );
                true
            }
            Ok(_) => {
                log::warn!(
                    "Connectivity probe returned no rows for {} ({domain}, gid={sheet})",
                    locator.branch_id
                );
                false
            }
            Err(e) => {
                log::warn!("Connectivity probe failed for {}: {e}", locator.branch_id);
                false
            }
        };

        self.state.record(connected);
        connected
    }

    /// Shared state this prober writes to.
    #[must_use]
    pub fn state(&self) -> &Arc<ConnectivityState> {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use dealer_feed_scraper::ScrapeError;
    use dealer_feed_scraper::stub_server::{StubResponse, StubServer};
    use dealer_feed_source_models::SourceRecord;

    use super::*;
    use crate::fetcher::HttpSheetFetcher;

    const REGISTRY: &str = r#"
        export_base = "http://unused"
        [[branches]]
        id = "Bhavani"
        spreadsheet_id = "bhv"
        [branches.sheets]
        sales = "11"
        [[branches]]
        id = "Anthiyur"
        spreadsheet_id = "ant"
    "#;

    struct FailingFetcher;

    #[async_trait]
    impl SheetFetcher for FailingFetcher {
        async fn fetch(&self, _: &str, _: &str) -> Result<Vec<SourceRecord>, ScrapeError> {
            Err(ScrapeError::Status {
                status: http_status(503),
                url: "http://unused".to_owned(),
            })
        }
    }

    fn http_status(code: u16) -> dealer_feed_scraper::StatusCode {
        dealer_feed_scraper::StatusCode::from_u16(code).unwrap()
    }

    fn prober(fetcher: Arc<dyn SheetFetcher>) -> ConnectivityProber {
        ConnectivityProber::new(
            Arc::new(BranchRegistry::from_toml(REGISTRY).unwrap()),
            fetcher,
            Arc::new(ConnectivityState::new()),
        )
    }

    #[test]
    fn starts_disconnected_and_unprobed() {
        let state = ConnectivityState::new();
        assert!(!state.is_connected());
        assert!(state.last_probe_at().is_none());
    }

    #[tokio::test]
    async fn probes_first_branch_first_domain() {
        let server = StubServer::start(vec![(
            "/bhv/export?format=csv&gid=11".to_owned(),
            StubResponse::Ok("A\n1\n".to_owned()),
        )])
        .await;

        let prober = prober(Arc::new(HttpSheetFetcher::new(&server.base_url()).unwrap()));

        assert!(prober.probe().await);
        assert!(prober.state().is_connected());
        assert!(prober.state().last_probe_at().is_some());
    }

    #[tokio::test]
    async fn header_only_sheet_counts_as_disconnected() {
        let server = StubServer::start(vec![(
            "/bhv/export?format=csv&gid=11".to_owned(),
            StubResponse::Ok("A,B\n".to_owned()),
        )])
        .await;

        let prober = prober(Arc::new(HttpSheetFetcher::new(&server.base_url()).unwrap()));
        assert!(!prober.probe().await);
    }

    #[tokio::test]
    async fn failure_clears_a_previous_success() {
        let state = Arc::new(ConnectivityState::new());
        state.record(true);

        let prober = ConnectivityProber::new(
            Arc::new(BranchRegistry::from_toml(REGISTRY).unwrap()),
            Arc::new(FailingFetcher),
            Arc::clone(&state),
        );

        assert!(!prober.probe().await);
        assert!(!state.is_connected());
    }

    #[tokio::test]
    async fn empty_registry_is_disconnected() {
        let prober = ConnectivityProber::new(
            Arc::new(BranchRegistry::from_toml(r#"export_base = "http://unused""#).unwrap()),
            Arc::new(FailingFetcher),
            Arc::new(ConnectivityState::new()),
        );
        assert!(!prober.probe().await);
    }
}
