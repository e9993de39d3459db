//! Caller-side record filtering.
//!
//! The aggregator always returns the full record set; list views narrow it
//! here with a free-text search, a date range and exact field matches.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use dealer_feed_source_models::{DataDomain, SourceRecord};

use crate::parsing::parse_sheet_date;

/// Customer-facing columns searched in sales and bookings sheets.
const CUSTOMER_FIELDS: [&str; 3] = ["Customer Name", "Mobile No", "Vehicle Model"];

/// Column holding the sale or booking date.
const SALES_DATE_FIELD: &str = "Sales Date";

/// Narrows a record set. An empty filter keeps everything.
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    /// Case-insensitive substring to look for.
    pub search: Option<String>,
    /// Fields searched by [`Self::search`]. Empty means every field.
    pub search_fields: Vec<String>,
    /// Field holding the date compared against [`Self::from`]/[`Self::to`].
    pub date_field: Option<String>,
    /// Inclusive lower bound.
    pub from: Option<NaiveDate>,
    /// Inclusive upper bound.
    pub to: Option<NaiveDate>,
    /// `(field, value)` pairs that must match exactly.
    pub equals: Vec<(String, String)>,
}

impl RecordFilter {
    /// Creates an empty filter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Search fields and date column conventionally used for `domain`.
    ///
    /// Domains without a known date column ignore date bounds.
    #[must_use]
    pub fn for_domain(domain: DataDomain) -> Self {
        let filter = Self::new();
        match domain {
            DataDomain::Sales => filter
                .search_fields(&CUSTOMER_FIELDS)
                .date_field(SALES_DATE_FIELD),
            DataDomain::Bookings => {
                let mut filter = filter
                    .search_fields(&CUSTOMER_FIELDS)
                    .date_field(SALES_DATE_FIELD);
                filter.search_fields.push("Customer ID".to_owned());
                filter
            }
            DataDomain::Stock | DataDomain::Service | DataDomain::Enquiry => filter,
        }
    }

    /// Sets the search text. Blank text is ignored.
    #[must_use]
    pub fn search(mut self, text: &str) -> Self {
        let text = text.trim();
        self.search = (!text.is_empty()).then(|| text.to_lowercase());
        self
    }

    /// Restricts the search to `fields`.
    #[must_use]
    pub fn search_fields(mut self, fields: &[&str]) -> Self {
        self.search_fields = fields.iter().map(|f| (*f).to_owned()).collect();
        self
    }

    /// Sets the field compared against the date bounds.
    #[must_use]
    pub fn date_field(mut self, field: &str) -> Self {
        self.date_field = Some(field.to_owned());
        self
    }

    /// Sets the inclusive date bounds.
    #[must_use]
    pub fn between(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.from = from;
        self.to = to;
        self
    }

    /// Sets the date range over `field`.
    #[must_use]
    pub fn date_range(self, field: &str, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.date_field(field).between(from, to)
    }

    /// Requires `field` to equal `value`.
    #[must_use]
    pub fn equals(mut self, field: &str, value: &str) -> Self {
        self.equals.push((field.to_owned(), value.to_owned()));
        self
    }

    /// Whether `record` passes every configured condition.
    #[must_use]
    pub fn matches(&self, record: &SourceRecord) -> bool {
        self.matches_equals(record) && self.matches_search(record) && self.matches_range(record)
    }

    /// Keeps the records that pass, preserving order.
    #[must_use]
    pub fn apply(&self, records: Vec<SourceRecord>) -> Vec<SourceRecord> {
        records.into_iter().filter(|r| self.matches(r)).collect()
    }

    fn matches_equals(&self, record: &SourceRecord) -> bool {
        self.equals
            .iter()
            .all(|(field, value)| record.get(field) == Some(value.as_str()))
    }

    fn matches_search(&self, record: &SourceRecord) -> bool {
        let Some(needle) = &self.search else {
            return true;
        };

        if self.search_fields.is_empty() {
            record
                .iter()
                .any(|(_, value)| value.to_lowercase().contains(needle))
        } else {
            self.search_fields
                .iter()
                .filter_map(|field| record.get(field))
                .any(|value| value.to_lowercase().contains(needle))
        }
    }

    fn matches_range(&self, record: &SourceRecord) -> bool {
        let Some(field) = self.date_field.as_deref() else {
            return true;
        };
        if self.from.is_none() && self.to.is_none() {
            return true;
        }

        let Some(date) = record.get(field).and_then(parse_sheet_date) else {
            return false;
        };

        self.from.is_none_or(|from| date >= from) && self.to.is_none_or(|to| date <= to)
    }
}

/// Sorted distinct non-empty values of `field`.
#[must_use]
pub fn distinct_values(records: &[SourceRecord], field: &str) -> Vec<String> {
    records
        .iter()
        .filter_map(|r| r.get(field))
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sale(customer: &str, mobile: &str, executive: &str, date: &str) -> SourceRecord {
        [
            ("Customer Name", customer),
            ("Mobile No", mobile),
            ("Executive Name", executive),
            ("Sales Date", date),
        ]
        .into_iter()
        .collect()
    }

    fn sales() -> Vec<SourceRecord> {
        vec![
            sale("Ravi Kumar", "9876500001", "Anand", "2024-03-01"),
            sale("Meena", "9876500002", "Priya", "05/03/2024"),
            sale("Karthik", "9876500003", "Anand", "2024-03-10"),
            sale("Unknown", "9876500004", "", "soon"),
        ]
    }

    fn customers(records: &[SourceRecord]) -> Vec<&str> {
        records
            .iter()
            .filter_map(|r| r.get("Customer Name"))
            .collect()
    }

    #[test]
    fn empty_filter_keeps_everything() {
        assert_eq!(RecordFilter::new().apply(sales()).len(), 4);
    }

    #[test]
    fn search_is_case_insensitive_over_listed_fields() {
        let filter = RecordFilter::new()
            .search("RAVI")
            .search_fields(&["Customer Name", "Mobile No"]);
        assert_eq!(customers(&filter.apply(sales())), vec!["Ravi Kumar"]);

        let filter = RecordFilter::new()
            .search("00003")
            .search_fields(&["Customer Name", "Mobile No"]);
        assert_eq!(customers(&filter.apply(sales())), vec!["Karthik"]);

        // Executive names are not in the searched fields.
        let filter = RecordFilter::new()
            .search("priya")
            .search_fields(&["Customer Name"]);
        assert!(filter.apply(sales()).is_empty());
    }

    #[test]
    fn search_without_fields_covers_every_value() {
        let filter = RecordFilter::new().search("priya");
        assert_eq!(customers(&filter.apply(sales())), vec!["Meena"]);
    }

    #[test]
    fn blank_search_is_ignored() {
        assert_eq!(RecordFilter::new().search("  ").apply(sales()).len(), 4);
    }

    #[test]
    fn date_range_is_inclusive_and_skips_unparseable() {
        let from = NaiveDate::from_ymd_opt(2024, 3, 1);
        let to = NaiveDate::from_ymd_opt(2024, 3, 5);
        let filter = RecordFilter::new().date_range("Sales Date", from, to);
        assert_eq!(
            customers(&filter.apply(sales())),
            vec!["Ravi Kumar", "Meena"]
        );

        let filter = RecordFilter::new().date_range("Sales Date", None, from);
        assert_eq!(customers(&filter.apply(sales())), vec!["Ravi Kumar"]);
    }

    #[test]
    fn equals_combines_with_search() {
        let filter = RecordFilter::new()
            .equals("Executive Name", "Anand")
            .search("k");
        assert_eq!(
            customers(&filter.apply(sales())),
            vec!["Ravi Kumar", "Karthik"]
        );
    }

    #[test]
    fn domain_presets_pick_search_and_date_fields() {
        let from = NaiveDate::from_ymd_opt(2024, 3, 2);
        let filter = RecordFilter::for_domain(DataDomain::Sales)
            .search("9876500003")
            .between(from, None);
        assert_eq!(customers(&filter.apply(sales())), vec!["Karthik"]);

        // Executive names are not a sales search field.
        let filter = RecordFilter::for_domain(DataDomain::Sales).search("priya");
        assert!(filter.apply(sales()).is_empty());

        let bookings = RecordFilter::for_domain(DataDomain::Bookings);
        assert!(bookings.search_fields.contains(&"Customer ID".to_owned()));
    }

    #[test]
    fn bounds_without_date_field_are_ignored() {
        let from = NaiveDate::from_ymd_opt(2030, 1, 1);
        let filter = RecordFilter::for_domain(DataDomain::Stock).between(from, None);
        assert_eq!(filter.apply(sales()).len(), 4);
    }

    #[test]
    fn distinct_values_are_sorted_and_non_empty() {
        assert_eq!(
            distinct_values(&sales(), "Executive Name"),
            vec!["Anand".to_owned(), "Priya".to_owned()]
        );
        assert!(distinct_values(&sales(), "Missing").is_empty());
    }
}
