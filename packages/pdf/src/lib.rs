#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Service report intake.
//!
//! Branches upload their daily technician productivity report as a PDF.
//! This crate turns the uploaded bytes into text using pure-Rust extraction
//! ([`pdf_extract`]) and parses the technician table out of that text with
//! [`service_report::parse_service_report`].
//!
//! Both steps are synchronous and CPU-bound; async callers should run
//! [`extract_document`] on a blocking thread.

pub mod service_report;

use std::path::Path;

pub use service_report::{
    COUNTER_COUNT, MIN_ROW_TOKENS, ServiceReportParse, parse_service_report,
};

/// Errors specific to report document intake.
#[derive(Debug, thiserror::Error)]
pub enum PdfError {
    /// The uploaded file is not a PDF.
    #[error("Unsupported document format: {0} (only .pdf files are accepted)")]
    UnsupportedFormat(String),

    /// PDF text extraction failed.
    #[error("PDF extraction error: {0}")]
    Extraction(String),
}

/// Whether `file_name` carries a `.pdf` extension (case-insensitive).
#[must_use]
pub fn is_pdf_name(file_name: &str) -> bool {
    Path::new(file_name.trim())
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

/// Extracts the text of an uploaded report document.
///
/// # Errors
///
/// * [`PdfError::UnsupportedFormat`] if `file_name` does not end in `.pdf`
/// * [`PdfError::Extraction`] if the bytes are not a readable PDF
pub fn extract_document(file_name: &str, bytes: &[u8]) -> Result<String, PdfError> {
    if !is_pdf_name(file_name) {
        return Err(PdfError::UnsupportedFormat(file_name.to_owned()));
    }

    log::debug!("Extracting text from {file_name} ({} bytes)", bytes.len());

    let text = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| PdfError::Extraction(format!("failed to extract text from {file_name}: {e}")))?;

    log::debug!("Extracted {} characters of text from {file_name}", text.len());

    Ok(text)
}
