//! Record filters: search by listing name and restrict to one area.
//!
//! The area of an address is its last comma-separated component, which on
//! French addresses is the postcode and city (`75011 Paris`).

use crate::models::ContactRecord;
use itertools::Itertools;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    /// Case-insensitive substring of the listing name.
    pub name: Option<String>,
    /// Substring of the address, usually a value from [`areas`].
    pub area: Option<String>,
}

impl RecordFilter {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.area.is_none()
    }

    pub fn matches(&self, record: &ContactRecord) -> bool {
        let name_ok = self.name.as_ref().is_none_or(|needle| {
            record
                .listing_name
                .to_lowercase()
                .contains(&needle.to_lowercase())
        });
        let area_ok = self.area.as_ref().is_none_or(|area| {
            record
                .address
                .as_deref()
                .is_some_and(|address| address.contains(area.as_str()))
        });
        name_ok && area_ok
    }

    /// Records that pass the filter, in their original order.
    pub fn apply(&self, records: Vec<ContactRecord>) -> Vec<ContactRecord> {
        records.into_iter().filter(|r| self.matches(r)).collect()
    }
}

/// Last comma-separated component of an address, trimmed.
pub fn area_of(address: &str) -> Option<&str> {
    address
        .rsplit(',')
        .next()
        .map(str::trim)
        .filter(|area| !area.is_empty())
}

/// Distinct areas across all records, sorted.
pub fn areas(records: &[ContactRecord]) -> Vec<String> {
    records
        .iter()
        .filter_map(|r| r.address.as_deref().and_then(area_of))
        .map(str::to_string)
        .sorted()
        .dedup()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, address: Option<&str>) -> ContactRecord {
        let mut r = ContactRecord::new(name, &format!("https://example.com/{name}/"), name);
        r.address = address.map(str::to_string);
        r
    }

    fn sample() -> Vec<ContactRecord> {
        vec![
            record("Morning Bastille", Some("3 Rue de Lyon, 75012 Paris")),
            record("Wojo Opéra", Some("9 Rue Auber, 75009 Paris")),
            record("La Ruche", None),
            record("Morning Gare", Some("1 Quai, 75012 Paris")),
        ]
    }

    #[test]
    fn test_empty_filter_keeps_everything() {
        let filter = RecordFilter::default();
        assert!(filter.is_empty());
        assert_eq!(filter.apply(sample()).len(), 4);
    }

    #[test]
    fn test_name_filter_is_case_insensitive() {
        let filter = RecordFilter {
            name: Some("MORNING".to_string()),
            area: None,
        };
        let names: Vec<_> = filter
            .apply(sample())
            .into_iter()
            .map(|r| r.listing_name)
            .collect();
        assert_eq!(names, vec!["Morning Bastille", "Morning Gare"]);
    }

    #[test]
    fn test_area_filter_skips_records_without_address() {
        let filter = RecordFilter {
            name: None,
            area: Some("75012 Paris".to_string()),
        };
        assert_eq!(filter.apply(sample()).len(), 2);
    }

    #[test]
    fn test_area_of() {
        assert_eq!(area_of("3 Rue de Lyon, 75012 Paris"), Some("75012 Paris"));
        assert_eq!(area_of("Paris"), Some("Paris"));
        assert_eq!(area_of("3 Rue de Lyon, "), None);
    }

    #[test]
    fn test_areas_are_sorted_and_distinct() {
        assert_eq!(areas(&sample()), vec!["75009 Paris", "75012 Paris"]);
    }
}
