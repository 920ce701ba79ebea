// FleetSleuth - core/filter.rs
//
// Composable filter engine for device records.
// All active filters are AND-combined.
// Core layer: pure logic, no I/O or UI dependencies.

use crate::core::model::{Connectivity, DeviceRecord, Operability};
use crate::util::error::FilterError;
use regex::Regex;
use std::collections::HashSet;

/// Complete filter state for one view. All fields are AND-combined.
#[derive(Debug, Clone, Default)]
pub struct FilterState {
    /// Organisation to include (None = all).
    pub organization: Option<String>,

    /// Model to include (None = all).
    pub model: Option<String>,

    /// Connectivity statuses to include (empty = all).
    pub connectivity: HashSet<Connectivity>,

    /// Operability statuses to include (empty = all).
    pub operability: HashSet<Operability>,

    /// Substring text search (case-insensitive). Empty = no filter.
    pub text_search: String,

    /// Compiled regex search. None = no regex filter.
    pub regex_search: Option<Regex>,
}

impl FilterState {
    /// Returns true if no filters are active.
    pub fn is_empty(&self) -> bool {
        self.organization.is_none()
            && self.model.is_none()
            && self.connectivity.is_empty()
            && self.operability.is_empty()
            && self.text_search.is_empty()
            && self.regex_search.is_none()
    }

    /// Set the regex search pattern, compiling it.
    /// Returns an error if the pattern is invalid.
    pub fn set_regex(&mut self, pattern: &str) -> Result<(), FilterError> {
        if pattern.is_empty() {
            self.regex_search = None;
            return Ok(());
        }
        let regex = Regex::new(pattern).map_err(|e| FilterError::InvalidRegex {
            pattern: pattern.to_string(),
            source: e,
        })?;
        self.regex_search = Some(regex);
        Ok(())
    }

    /// Create a quick-filter for disconnected devices only.
    pub fn disconnected_only() -> Self {
        let mut connectivity = HashSet::new();
        connectivity.insert(Connectivity::Disconnected);
        Self {
            connectivity,
            ..Default::default()
        }
    }

    /// Create a quick-filter for a single organisation.
    pub fn for_organization(org: impl Into<String>) -> Self {
        Self {
            organization: Some(org.into()),
            ..Default::default()
        }
    }
}

/// Apply filters to a slice of records, returning indices of matching records.
///
/// Returns a Vec of indices into the original records slice. This avoids
/// copying records and enables virtual scrolling on the filtered view.
pub fn apply_filters(records: &[DeviceRecord], filter: &FilterState) -> Vec<usize> {
    if filter.is_empty() {
        return (0..records.len()).collect();
    }

    let text_lower = filter.text_search.to_lowercase();

    records
        .iter()
        .enumerate()
        .filter(|(_, record)| matches_all(record, filter, &text_lower))
        .map(|(idx, _)| idx)
        .collect()
}

/// Check if a single record matches all active filters.
fn matches_all(record: &DeviceRecord, filter: &FilterState, text_lower: &str) -> bool {
    // Organisation filter
    if let Some(ref org) = filter.organization {
        if &record.organization != org {
            return false;
        }
    }

    // Model filter
    if let Some(ref model) = filter.model {
        if &record.model != model {
            return false;
        }
    }

    // Status filters
    if !filter.connectivity.is_empty() && !filter.connectivity.contains(&record.connectivity) {
        return false;
    }
    if !filter.operability.is_empty() && !filter.operability.contains(&record.operability) {
        return false;
    }

    // Text search (case-insensitive substring over the search haystack)
    if !text_lower.is_empty() && !haystack(record).to_lowercase().contains(text_lower) {
        return false;
    }

    // Regex search
    if let Some(ref regex) = filter.regex_search {
        if !regex.is_match(&haystack(record)) {
            return false;
        }
    }

    true
}

/// Searchable text for a record: the derived identity fields plus every
/// raw string column, space-joined. Composite raw values are excluded:
/// searching serialised JSON produces noise matches on key names.
fn haystack(record: &DeviceRecord) -> String {
    let mut parts: Vec<&str> = vec![&record.organization, &record.model];
    for value in record.raw.values() {
        if let serde_json::Value::String(s) = value {
            parts.push(s);
        }
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::{Connectivity, Family, Operability};

    fn make_record(id: u64, org: &str, model: &str, conn: Connectivity) -> DeviceRecord {
        let mut raw = serde_json::Map::new();
        raw.insert(
            "uuid".to_string(),
            serde_json::Value::String(format!("u-{id}")),
        );
        DeviceRecord {
            id,
            family: Family::Boards,
            organization: org.to_string(),
            model: model.to_string(),
            connectivity: conn,
            operability: Operability::Disabled,
            m2m: None,
            firmware: None,
            raw,
        }
    }

    #[test]
    fn test_empty_filter_returns_all() {
        let records = vec![
            make_record(1, "Acme", "RouterX", Connectivity::Connected),
            make_record(2, "Beta", "RouterY", Connectivity::Disconnected),
        ];
        let result = apply_filters(&records, &FilterState::default());
        assert_eq!(result, vec![0, 1]);
    }

    #[test]
    fn test_organization_filter() {
        let records = vec![
            make_record(1, "Acme", "RouterX", Connectivity::Connected),
            make_record(2, "Beta", "RouterY", Connectivity::Connected),
            make_record(3, "Acme", "RouterZ", Connectivity::Connected),
        ];
        let result = apply_filters(&records, &FilterState::for_organization("Acme"));
        assert_eq!(result, vec![0, 2]);
    }

    #[test]
    fn test_connectivity_filter() {
        let records = vec![
            make_record(1, "Acme", "RouterX", Connectivity::Connected),
            make_record(2, "Acme", "RouterY", Connectivity::Disconnected),
        ];
        let result = apply_filters(&records, &FilterState::disconnected_only());
        assert_eq!(result, vec![1]);
    }

    #[test]
    fn test_text_search_case_insensitive() {
        let records = vec![
            make_record(1, "Acme", "RouterX", Connectivity::Connected),
            make_record(2, "Beta Industries", "Sensor", Connectivity::Connected),
        ];
        let filter = FilterState {
            text_search: "beta".to_string(),
            ..Default::default()
        };
        let result = apply_filters(&records, &filter);
        assert_eq!(result, vec![1]);
    }

    #[test]
    fn test_text_search_covers_raw_string_columns() {
        let records = vec![make_record(1, "Acme", "RouterX", Connectivity::Connected)];
        let filter = FilterState {
            text_search: "u-1".to_string(),
            ..Default::default()
        };
        assert_eq!(apply_filters(&records, &filter), vec![0]);
    }

    #[test]
    fn test_regex_filter() {
        let records = vec![
            make_record(1, "Acme", "Router-404", Connectivity::Connected),
            make_record(2, "Acme", "Router-500", Connectivity::Connected),
        ];
        let mut filter = FilterState::default();
        filter.set_regex(r"Router-5\d{2}").unwrap();
        let result = apply_filters(&records, &filter);
        assert_eq!(result, vec![1]);
    }

    #[test]
    fn test_combined_filters() {
        let records = vec![
            make_record(1, "Acme", "RouterX", Connectivity::Connected),
            make_record(2, "Acme", "RouterX", Connectivity::Disconnected),
            make_record(3, "Beta", "RouterX", Connectivity::Disconnected),
        ];
        let mut filter = FilterState::for_organization("Acme");
        filter.connectivity.insert(Connectivity::Disconnected);
        let result = apply_filters(&records, &filter);
        assert_eq!(result, vec![1]); // Acme + Disconnected
    }

    #[test]
    fn test_invalid_regex() {
        let mut filter = FilterState::default();
        let result = filter.set_regex("[invalid");
        assert!(result.is_err());
    }
}
