#![allow(clippy::module_name_repetitions)]
//! Canonical file paths for the `DuckDB` data directory.
//!
//! Paths are relative to the working directory unless overridden with
//! [`DB_PATH_ENV_VAR`].

use std::path::{Path, PathBuf};

/// Environment variable overriding the report database path.
pub const DB_PATH_ENV_VAR: &str = "DEALER_FEED_DB";

/// Returns the `data/` directory path.
#[must_use]
pub fn data_dir() -> PathBuf {
    PathBuf::from("data")
}

/// Returns the report database path: [`DB_PATH_ENV_VAR`] when set,
/// otherwise `data/reports.duckdb`.
#[must_use]
pub fn reports_db_path() -> PathBuf {
    match std::env::var(DB_PATH_ENV_VAR) {
        Ok(path) if !path.trim().is_empty() => PathBuf::from(path.trim()),
        _ => data_dir().join("reports.duckdb"),
    }
}

/// Ensures a directory exists, creating it if necessary.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.as_os_str().is_empty() && !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}
