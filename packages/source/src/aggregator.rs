//! Branch aggregation: "give me domain X for branch B, or for all
//! branches".
//!
//! Every returned record is tagged with the branch whose sheet produced it.
//! The aggregator performs no filtering and no caching; each call fetches
//! fresh data.

use std::sync::Arc;

use dealer_feed_source_models::{BranchLocator, DataDomain, SourceRecord};
use futures::stream::{self, StreamExt as _};

use crate::SourceError;
use crate::fetcher::{SheetFetcher, fetch_or_empty};
use crate::registry::BranchRegistry;

/// Default number of branch sheets fetched at once for all-branch queries.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Composes the registry and a fetcher into branch-tagged queries.
pub struct BranchAggregator {
    registry: Arc<BranchRegistry>,
    fetcher: Arc<dyn SheetFetcher>,
    concurrency: usize,
}

impl BranchAggregator {
    /// Creates an aggregator fetching up to [`DEFAULT_CONCURRENCY`] branches
    /// at once.
    #[must_use]
    pub fn new(registry: Arc<BranchRegistry>, fetcher: Arc<dyn SheetFetcher>) -> Self {
        Self {
            registry,
            fetcher,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Sets how many branch sheets are fetched at once (minimum 1).
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// The registry this aggregator resolves branches against.
    #[must_use]
    pub fn registry(&self) -> &Arc<BranchRegistry> {
        &self.registry
    }

    /// Returns `domain` records for `branch`, or for every registered branch
    /// when `branch` is `None`.
    ///
    /// All-branch results are concatenated in registration order even
    /// though the sheets are fetched concurrently. An unreachable sheet
    /// contributes zero records and never fails the call.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::UnknownBranch`] if `branch` is given but not
    /// registered.
    pub async fn get_domain_data(
        &self,
        domain: DataDomain,
        branch: Option<&str>,
    ) -> Result<Vec<SourceRecord>, SourceError> {
        if let Some(branch_id) = branch {
            let locator = self
                .registry
                .locator(branch_id)
                .ok_or_else(|| SourceError::UnknownBranch(branch_id.to_owned()))?;
            return Ok(self.fetch_branch(locator, domain).await);
        }

        let per_branch: Vec<Vec<SourceRecord>> = stream::iter(
            self.registry
                .branches()
                .iter()
                .map(|locator| self.fetch_branch(locator, domain)),
        )
        .buffered(self.concurrency)
        .collect()
        .await;

        let records: Vec<SourceRecord> = per_branch.into_iter().flatten().collect();

        log::info!(
            "Fetched {} {domain} records across {} branches",
            records.len(),
            self.registry.branches().len()
        );

        Ok(records)
    }

    async fn fetch_branch(&self, locator: &BranchLocator, domain: DataDomain) -> Vec<SourceRecord> {
        let label = format!("{}/{domain}", locator.branch_id);
        let mut records = fetch_or_empty(
            self.fetcher.as_ref(),
            &label,
            &locator.spreadsheet_id,
            locator.sheet_for(domain),
        )
        .await;

        for record in &mut records {
            record.tag_branch(&locator.branch_id);
        }

        log::debug!("[{label}] {} records", records.len());
        records
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::time::Duration;

    use async_trait::async_trait;
    use dealer_feed_scraper::{ScrapeError, StatusCode};

    use super::*;

    /// Canned sheets keyed by `(spreadsheet_id, gid)`. Missing keys answer
    /// HTTP 500. Each sheet may be delayed to reorder completions.
    #[derive(Default)]
    struct CannedFetcher {
        sheets: BTreeMap<(String, String), (Vec<SourceRecord>, Duration)>,
    }

    impl CannedFetcher {
        fn sheet(mut self, spreadsheet: &str, gid: &str, rows: &[&str], delay_ms: u64) -> Self {
            let records = rows
                .iter()
                .map(|v| [("Customer Name", *v)].into_iter().collect())
                .collect();
            self.sheets.insert(
                (spreadsheet.to_owned(), gid.to_owned()),
                (records, Duration::from_millis(delay_ms)),
            );
            self
        }
    }

    #[async_trait]
    impl SheetFetcher for CannedFetcher {
        async fn fetch(
            &self,
            spreadsheet_id: &str,
            sheet_locator: &str,
        ) -> Result<Vec<SourceRecord>, ScrapeError> {
            match self
                .sheets
                .get(&(spreadsheet_id.to_owned(), sheet_locator.to_owned()))
            {
                Some((records, delay)) => {
                    tokio::time::sleep(*delay).await;
                    Ok(records.clone())
                }
                None => Err(ScrapeError::Status {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    url: format!("canned://{spreadsheet_id}/{sheet_locator}"),
                }),
            }
        }
    }

    fn registry() -> Arc<BranchRegistry> {
        Arc::new(
            BranchRegistry::from_toml(
                r#"
                export_base = "http://unused"
                [[branches]]
                id = "Bhavani"
                spreadsheet_id = "bhv"
                [branches.sheets]
                stock = "1"
                [[branches]]
                id = "Kumarapalayam"
                spreadsheet_id = "kpm"
                [branches.sheets]
                stock = "1"
                [[branches]]
                id = "Anthiyur"
                spreadsheet_id = "ant"
                "#,
            )
            .unwrap(),
        )
    }

    fn fetcher() -> CannedFetcher {
        CannedFetcher::default()
            .sheet("bhv", "1", &["a1", "a2"], 40)
            .sheet("kpm", "1", &["b1"], 0)
            .sheet("ant", "0", &["c1", "c2", "c3"], 10)
    }

    #[tokio::test]
    async fn single_branch_records_carry_that_branch() {
        let aggregator = BranchAggregator::new(registry(), Arc::new(fetcher()));

        for branch in ["Bhavani", "Kumarapalayam", "Anthiyur"] {
            let records = aggregator
                .get_domain_data(DataDomain::Stock, Some(branch))
                .await
                .unwrap();
            assert!(!records.is_empty());
            assert!(records.iter().all(|r| r.branch() == Some(branch)));
        }
    }

    #[tokio::test]
    async fn all_branches_concatenate_in_registration_order() {
        let aggregator = BranchAggregator::new(registry(), Arc::new(fetcher()));

        let all = aggregator
            .get_domain_data(DataDomain::Stock, None)
            .await
            .unwrap();

        let mut expected_len = 0;
        for branch in aggregator.registry().list_branches() {
            expected_len += aggregator
                .get_domain_data(DataDomain::Stock, Some(branch))
                .await
                .unwrap()
                .len();
        }
        assert_eq!(all.len(), expected_len);

        let order: Vec<&str> = all.iter().filter_map(SourceRecord::branch).collect();
        assert_eq!(
            order,
            vec![
                "Bhavani",
                "Bhavani",
                "Kumarapalayam",
                "Anthiyur",
                "Anthiyur",
                "Anthiyur"
            ]
        );
        assert_eq!(all[0].get("Customer Name"), Some("a1"));
    }

    #[tokio::test]
    async fn sequential_fetching_gives_the_same_result() {
        let concurrent = BranchAggregator::new(registry(), Arc::new(fetcher()))
            .get_domain_data(DataDomain::Stock, None)
            .await
            .unwrap();
        let sequential = BranchAggregator::new(registry(), Arc::new(fetcher()))
            .with_concurrency(0)
            .get_domain_data(DataDomain::Stock, None)
            .await
            .unwrap();
        assert_eq!(concurrent, sequential);
    }

    #[tokio::test]
    async fn failing_branch_yields_partial_results() {
        // No sales sheets are canned, except Kumarapalayam's fallback gid.
        let fetcher = CannedFetcher::default().sheet("kpm", "0", &["only"], 0);
        let aggregator = BranchAggregator::new(registry(), Arc::new(fetcher));

        let records = aggregator
            .get_domain_data(DataDomain::Sales, None)
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].branch(), Some("Kumarapalayam"));

        let bhavani = aggregator
            .get_domain_data(DataDomain::Sales, Some("Bhavani"))
            .await
            .unwrap();
        assert!(bhavani.is_empty());
    }

    #[tokio::test]
    async fn unknown_branch_is_rejected() {
        let aggregator = BranchAggregator::new(registry(), Arc::new(fetcher()));
        let err = aggregator
            .get_domain_data(DataDomain::Stock, Some("Erode"))
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::UnknownBranch(_)));
    }

    #[tokio::test]
    async fn csv_round_trip_through_http_is_tagged() {
        use dealer_feed_scraper::stub_server::{StubResponse, StubServer};

        use crate::fetcher::HttpSheetFetcher;

        let server = StubServer::start(vec![(
            "/bhv/export?format=csv&gid=1".to_owned(),
            StubResponse::Ok("A,B\n1,2\n".to_owned()),
        )])
        .await;

        let aggregator = BranchAggregator::new(
            registry(),
            Arc::new(HttpSheetFetcher::new(&server.base_url()).unwrap()),
        );
        let records = aggregator
            .get_domain_data(DataDomain::Stock, Some("Bhavani"))
            .await
            .unwrap();

        let expected: SourceRecord = [("A", "1"), ("B", "2"), ("branch", "Bhavani")]
            .into_iter()
            .collect();
        assert_eq!(records, vec![expected]);
    }

    #[tokio::test]
    async fn timed_out_branch_is_empty_and_others_still_load() {
        use dealer_feed_scraper::stub_server::{StubResponse, StubServer};

        use crate::fetcher::HttpSheetFetcher;

        let server = StubServer::start(vec![
            (
                "/bhv/export?format=csv&gid=1".to_owned(),
                StubResponse::Ok("Customer Name\nRavi\n".to_owned()),
            ),
            (
                "/kpm/export?format=csv&gid=1".to_owned(),
                StubResponse::Delay(Duration::from_secs(5), "Customer Name\nLate\n".to_owned()),
            ),
            (
                "/ant/export?format=csv&gid=0".to_owned(),
                StubResponse::Ok("Customer Name\nMeena\n".to_owned()),
            ),
        ])
        .await;

        let aggregator = BranchAggregator::new(
            registry(),
            Arc::new(
                HttpSheetFetcher::with_timeout(&server.base_url(), Duration::from_millis(200))
                    .unwrap(),
            ),
        );

        let started = std::time::Instant::now();
        let records = aggregator
            .get_domain_data(DataDomain::Stock, None)
            .await
            .unwrap();
        assert!(started.elapsed() < Duration::from_secs(3));

        let tagged: Vec<_> = records
            .iter()
            .map(|r| (r.branch().unwrap(), r.get("Customer Name").unwrap()))
            .collect();
        assert_eq!(tagged, vec![("Bhavani", "Ravi"), ("Anthiyur", "Meena")]);
        assert_eq!(server.hits(), 3);
    }
}
