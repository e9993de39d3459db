//! Technician productivity table parsing.
//!
//! Service reports are laid out as one line per technician:
//!
//! ```text
//! S.No  Technician Name   Free Paid PSF Major Minor Acc PDI Total Parts ...
//! 3     JOHN DOE          5    3    1   0     2     1   0   12    4500  ...
//! ```
//!
//! Text extraction does not preserve columns, so counters are recovered by
//! position from the right-hand end of each line.

use std::sync::LazyLock;

use chrono::NaiveDate;
use dealer_feed_source_models::{ProductivityCounter, ProductivityCounters, ServiceReportRow};
use regex::Regex;

/// Number of trailing counter positions on a technician row.
pub const COUNTER_COUNT: usize = ProductivityCounter::COUNT;

/// Rows with fewer tokens than this are not technician rows.
pub const MIN_ROW_TOKENS: usize = 10;

/// Serial, at least one name token and every counter.
const FULL_ROW_TOKENS: usize = 2 + COUNTER_COUNT;

/// Literal tokens that must all appear on the header line.
const HEADER_MARKERS: [&str; 3] = ["Technician", "Free", "Paid"];

/// Serial number followed by an uppercase-led name.
static ROW_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+[ \t]+[A-Z]").unwrap_or_else(|_| unreachable!()));

/// Rows parsed from one report, plus whether the table header was seen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceReportParse {
    /// Technician rows in document order.
    pub rows: Vec<ServiceReportRow>,
    /// Whether a header line opened the table.
    pub header_found: bool,
}

/// Parses the technician productivity table out of extracted report text.
///
/// Lines before the header are ignored. After it, every line that starts
/// with a serial number and an uppercase name and has at least
/// [`MIN_ROW_TOKENS`] tokens becomes a row for `branch` on `date`.
#[must_use]
pub fn parse_service_report(text: &str, branch: &str, date: NaiveDate) -> ServiceReportParse {
    let mut lines = text.lines();

    if !lines.by_ref().any(is_header_line) {
        log::warn!("[{branch}] No technician table header found in report for {date}");
        return ServiceReportParse::default();
    }

    let mut rows = Vec::new();

    for line in lines {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }

        let collapsed = tokens.join(" ");
        if !ROW_START.is_match(&collapsed) {
            continue;
        }

        if tokens.len() < MIN_ROW_TOKENS {
            log::debug!(
                "[{branch}] Skipping short row ({} tokens): {collapsed}",
                tokens.len()
            );
            continue;
        }

        rows.push(parse_row(&tokens, branch, date));
    }

    log::info!("[{branch}] Parsed {} technician rows for {date}", rows.len());

    ServiceReportParse {
        rows,
        header_found: true,
    }
}

fn is_header_line(line: &str) -> bool {
    HEADER_MARKERS.iter().all(|marker| line.contains(marker))
}

/// Splits a row into serial, name and right-aligned counters.
///
/// Full-width rows take the trailing [`COUNTER_COUNT`] tokens as counters.
/// Shorter rows take the run of non-numeric tokens after the serial as the
/// name and right-align whatever follows.
fn parse_row(tokens: &[&str], branch: &str, date: NaiveDate) -> ServiceReportRow {
    let name_end = if tokens.len() >= FULL_ROW_TOKENS {
        tokens.len() - COUNTER_COUNT
    } else {
        let name_run = tokens[1..]
            .iter()
            .take_while(|token| !is_numeric_token(token))
            .count();
        tokens
            .len()
            .saturating_sub(COUNTER_COUNT)
            .max(1 + name_run)
            .min(tokens.len())
    };

    let counter_tokens = &tokens[name_end..];
    let offset = COUNTER_COUNT - counter_tokens.len();

    let slots: [String; COUNTER_COUNT] = std::array::from_fn(|i| {
        i.checked_sub(offset)
            .and_then(|j| counter_tokens.get(j))
            .map_or_else(|| "0".to_owned(), |token| (*token).to_owned())
    });

    ServiceReportRow {
        technician_id: tokens[0].to_owned(),
        technician_name: tokens[1..name_end].join(" "),
        counters: ProductivityCounters::from_tokens(slots),
        branch: branch.to_owned(),
        date,
    }
}

/// Digits with optional thousands separators, decimal point or sign.
fn is_numeric_token(token: &str) -> bool {
    token.chars().any(|c| c.is_ascii_digit())
        && token
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
}
