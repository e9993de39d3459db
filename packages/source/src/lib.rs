#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Branch registry, sheet fetching and branch aggregation.
//!
//! Each dealership branch keeps its operational data in its own
//! spreadsheet, one sheet per [`DataDomain`]. The [`registry`] knows where
//! each branch's sheets live, the [`fetcher`] downloads one sheet, and the
//! [`aggregator`] answers "domain X for branch B" (or for every branch) with
//! branch-tagged records. Unreachable sheets degrade to empty results; only
//! requests for unregistered branches are errors.

pub mod aggregator;
pub mod connectivity;
pub mod fetcher;
pub mod filter;
pub mod parsing;
pub mod registry;

pub use dealer_feed_source_models::{BranchLocator, DataDomain, SourceRecord};

/// Errors that can occur during data source operations.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The requested branch is not in the registry.
    #[error("Unknown branch: {0}")]
    UnknownBranch(String),

    /// The branch registry configuration is invalid.
    #[error("Invalid branch configuration: {message}")]
    Config {
        /// Description of what went wrong.
        message: String,
    },

    /// The branch registry TOML could not be parsed.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// I/O error (reading a registry override file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The HTTP client could not be built.
    #[error("Scrape error: {0}")]
    Scrape(#[from] dealer_feed_scraper::ScrapeError),
}
