//! Sheet CSV downloader and parser.
//!
//! Downloads one sheet through its CSV export URL and returns every row as
//! a [`SourceRecord`] keyed by the column headers in the first row.

use dealer_feed_source_models::SourceRecord;

use crate::ScrapeError;

/// Builds the CSV export URL of one sheet.
///
/// `export_base` is the spreadsheet host prefix without a trailing slash
/// (e.g. `https://docs.google.com/spreadsheets/d`).
#[must_use]
pub fn export_url(export_base: &str, spreadsheet_id: &str, sheet_locator: &str) -> String {
    format!(
        "{}/{spreadsheet_id}/export?format=csv&gid={sheet_locator}",
        export_base.trim_end_matches('/')
    )
}

/// Downloader for a single sheet export.
#[derive(Debug, Clone)]
pub struct CsvDownloadScraper {
    /// URL of the CSV export.
    url: String,
    /// Client carrying the timeout and redirect policy.
    client: reqwest::Client,
}

impl CsvDownloadScraper {
    /// Creates a downloader for `url` that sends requests through `client`.
    #[must_use]
    pub fn new(client: reqwest::Client, url: &str) -> Self {
        Self {
            url: url.to_owned(),
            client,
        }
    }

    /// Downloads the sheet and parses it into records.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Http`] on transport failures (including the
    /// client timeout) and [`ScrapeError::Status`] for any status other
    /// than `200 OK`.
    pub async fn fetch(&self) -> Result<Vec<SourceRecord>, ScrapeError> {
        let response = self.client.get(&self.url).send().await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(ScrapeError::Status {
                status,
                url: self.url.clone(),
            });
        }

        let bytes = response.bytes().await?;
        log::debug!("Downloaded {} bytes from {}", bytes.len(), self.url);

        let records = parse_records(&bytes);
        log::info!("Parsed {} records from CSV at {}", records.len(), self.url);

        Ok(records)
    }
}

/// Parses CSV bytes into header-keyed records.
///
/// The first row is the header row. Rows shorter than the header are padded
/// with empty strings; cells beyond the last header are dropped. Invalid
/// UTF-8 is replaced rather than rejected, and a row the reader cannot
/// decode is skipped so one bad line never costs the whole sheet. Empty
/// input or a header-only sheet yields no records.
#[must_use]
pub fn parse_records(bytes: &[u8]) -> Vec<SourceRecord> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = match reader.byte_headers() {
        Ok(headers) => headers
            .iter()
            .map(|h| String::from_utf8_lossy(h).trim().to_owned())
            .collect(),
        Err(e) => {
            log::warn!("Unreadable CSV header row: {e}");
            return Vec::new();
        }
    };

    if headers.iter().all(String::is_empty) {
        return Vec::new();
    }

    let mut records = Vec::new();

    for (line, result) in reader.byte_records().enumerate() {
        let row = match result {
            Ok(row) => row,
            Err(e) => {
                log::warn!("Skipping unreadable CSV row {}: {e}", line + 2);
                continue;
            }
        };

        let record: SourceRecord = headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                let value = row
                    .get(i)
                    .map(|v| String::from_utf8_lossy(v).trim().to_owned())
                    .unwrap_or_default();
                (header.clone(), value)
            })
            .collect();
        records.push(record);
    }

    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stub_server::{StubResponse, StubServer};
    use crate::{DEFAULT_TIMEOUT, build_client};

    #[test]
    fn builds_export_url() {
        assert_eq!(
            export_url("https://docs.google.com/spreadsheets/d/", "abc", "1593"),
            "https://docs.google.com/spreadsheets/d/abc/export?format=csv&gid=1593"
        );
    }

    #[test]
    fn parses_header_and_rows() {
        let records = parse_records(b"A,B\n1,2\n");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("A"), Some("1"));
        assert_eq!(records[0].get("B"), Some("2"));
        assert_eq!(records[0].len(), 2);
    }

    #[test]
    fn pads_short_rows_and_drops_extra_cells() {
        let records = parse_records(b"Name,Model,Colour\nRavi\nAnu,Jupiter,Red,extra\n");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("Model"), Some(""));
        assert_eq!(records[0].get("Colour"), Some(""));
        assert_eq!(records[1].get("Colour"), Some("Red"));
        assert_eq!(records[1].len(), 3);
    }

    #[test]
    fn empty_and_header_only_bodies_yield_nothing() {
        assert!(parse_records(b"").is_empty());
        assert!(parse_records(b"A,B\n").is_empty());
        assert!(parse_records(b"A,B").is_empty());
    }

    #[test]
    fn keeps_quoted_delimiters_and_tolerates_broken_quotes() {
        let records =
            parse_records(b"Customer,Address\n\"Kumar, S\",\"12, Main Rd\"\nBroken \"quote,x\n");
        assert_eq!(records[0].get("Customer"), Some("Kumar, S"));
        assert_eq!(records[0].get("Address"), Some("12, Main Rd"));
        assert!(records.len() <= 2);
    }

    #[test]
    fn replaces_invalid_utf8() {
        let records = parse_records(b"Name\nR\xffvi\n");
        assert_eq!(records.len(), 1);
        assert!(records[0].get("Name").unwrap().starts_with('R'));
    }

    #[tokio::test]
    async fn fetches_sheet_over_http() {
        let server = StubServer::start(vec![(
            "/abc/export?format=csv&gid=7".to_owned(),
            StubResponse::Ok("A,B\n1,2\n3,4\n".to_owned()),
        )])
        .await;

        let client = build_client(DEFAULT_TIMEOUT).unwrap();
        let url = export_url(&server.base_url(), "abc", "7");
        let records = CsvDownloadScraper::new(client, &url).fetch().await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[1].get("B"), Some("4"));
    }

    #[tokio::test]
    async fn follows_redirects() {
        let server = StubServer::start(vec![
            (
                "/abc/export?format=csv&gid=0".to_owned(),
                StubResponse::Redirect("/content/abc.csv".to_owned()),
            ),
            (
                "/content/abc.csv".to_owned(),
                StubResponse::Ok("A\n1\n".to_owned()),
            ),
        ])
        .await;

        let client = build_client(DEFAULT_TIMEOUT).unwrap();
        let url = export_url(&server.base_url(), "abc", "0");
        let records = CsvDownloadScraper::new(client, &url).fetch().await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("A"), Some("1"));
    }

    #[tokio::test]
    async fn reports_non_ok_status() {
        let server = StubServer::start(vec![(
            "/abc/export?format=csv&gid=0".to_owned(),
            StubResponse::Status(500),
        )])
        .await;

        let client = build_client(DEFAULT_TIMEOUT).unwrap();
        let url = export_url(&server.base_url(), "abc", "0");
        let err = CsvDownloadScraper::new(client, &url)
            .fetch()
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ScrapeError::Status { status, .. } if status.as_u16() == 500
        ));
    }
}
