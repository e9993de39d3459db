#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Spreadsheet CSV export downloader and parser.
//!
//! Branch spreadsheets are published through their CSV export endpoint,
//! which is not an API with schema guarantees. This crate downloads one
//! sheet at a time and turns it into [`SourceRecord`]s keyed by whatever
//! headers the sheet's first row currently has.
//!
//! This crate only reports failures; deciding that an unreachable sheet
//! means "no data" is left to the caller.

pub mod csv_download;
#[cfg(any(test, feature = "test-utils"))]
pub mod stub_server;

use std::time::Duration;

pub use dealer_feed_source_models::SourceRecord;
pub use reqwest::StatusCode;

/// Per-request timeout for sheet downloads.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Maximum number of redirects followed by a sheet download. The export
/// endpoint answers with a redirect to a short-lived content host.
pub const MAX_REDIRECTS: usize = 10;

/// Errors that can occur while downloading or parsing a sheet.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    /// The request could not be sent or the body could not be read
    /// (connection failure, timeout, TLS error).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with something other than `200 OK`.
    #[error("HTTP {status} from {url}")]
    Status {
        /// Status code returned by the server.
        status: StatusCode,
        /// URL that was requested.
        url: String,
    },
}

/// Builds the HTTP client shared by all sheet downloads.
///
/// # Errors
///
/// Returns [`ScrapeError::Http`] if the TLS backend cannot be initialised.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client, ScrapeError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .build()
        .map_err(ScrapeError::Http)
}
