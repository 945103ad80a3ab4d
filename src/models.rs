//! Data models for discovered listings and their enriched contact records.
//!
//! - [`CoworkingLink`]: one `(name, url)` pair from the directory page
//! - [`ContactRecord`]: the contact card scraped from a listing page
//! - [`GeoCoordinate`]: a validated latitude/longitude pair
//! - [`RecordRow`]: the flat, serializable view used by every exporter
//! - [`RunSummary`]: counts that let a caller judge how complete a run was
//!
//! Absent values are `None` everywhere and serialize as `null` (JSON) or an
//! empty cell (CSV), never as an empty string inside the pipeline.

use crate::error::ScrapeError;
use serde::{Deserialize, Serialize};

/// A listing discovered on the directory page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct CoworkingLink {
    /// Visible label of the anchor. Not guaranteed unique.
    pub name: String,
    /// Absolute URL of the listing page.
    pub url: String,
}

/// A latitude/longitude pair produced by a successful geocoding lookup.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct GeoCoordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoCoordinate {
    /// Build a coordinate, rejecting values outside [-90,90] x [-180,180].
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, ScrapeError> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(ScrapeError::InvalidCoordinate(format!(
                "({latitude}, {longitude}) is out of range"
            )));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Parse the decimal strings the geocoding service returns.
    pub fn parse(lat: &str, lon: &str) -> Result<Self, ScrapeError> {
        let latitude: f64 = lat
            .trim()
            .parse()
            .map_err(|e| ScrapeError::InvalidCoordinate(format!("latitude {lat:?}: {e}")))?;
        let longitude: f64 = lon
            .trim()
            .parse()
            .map_err(|e| ScrapeError::InvalidCoordinate(format!("longitude {lon:?}: {e}")))?;
        Self::new(latitude, longitude)
    }
}

/// Contact card of one listing.
///
/// Coordinates live in a single `Option` so latitude and longitude can only
/// ever be set together.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactRecord {
    pub listing_name: String,
    pub listing_url: String,
    pub company_name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub coordinates: Option<GeoCoordinate>,
}

impl ContactRecord {
    /// An empty card for a listing whose contact heading has been found.
    pub fn new(listing_name: &str, listing_url: &str, company_name: &str) -> Self {
        Self {
            listing_name: listing_name.to_string(),
            listing_url: listing_url.to_string(),
            company_name: company_name.to_string(),
            address: None,
            phone: None,
            email: None,
            website: None,
            coordinates: None,
        }
    }

    pub fn latitude(&self) -> Option<f64> {
        self.coordinates.map(|c| c.latitude)
    }

    pub fn longitude(&self) -> Option<f64> {
        self.coordinates.map(|c| c.longitude)
    }
}

/// Flat row written by the JSON, CSV and Markdown exporters.
#[derive(Debug, Serialize)]
pub struct RecordRow<'a> {
    pub listing_name: &'a str,
    pub company_name: &'a str,
    pub address: Option<&'a str>,
    pub phone: Option<&'a str>,
    pub email: Option<&'a str>,
    pub website: Option<&'a str>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub listing_url: &'a str,
}

impl RecordRow<'_> {
    /// Field names in serialization order, used as the CSV header.
    pub const COLUMNS: [&'static str; 9] = [
        "listing_name",
        "company_name",
        "address",
        "phone",
        "email",
        "website",
        "latitude",
        "longitude",
        "listing_url",
    ];
}

impl<'a> From<&'a ContactRecord> for RecordRow<'a> {
    fn from(record: &'a ContactRecord) -> Self {
        Self {
            listing_name: &record.listing_name,
            company_name: &record.company_name,
            address: record.address.as_deref(),
            phone: record.phone.as_deref(),
            email: record.email.as_deref(),
            website: record.website.as_deref(),
            latitude: record.latitude(),
            longitude: record.longitude(),
            listing_url: &record.listing_url,
        }
    }
}

/// Where a listing ended up after going through the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum ListingOutcome {
    /// No contact section on the page, or the page could not be fetched.
    Dropped,
    /// Contact card found but it carries no address.
    AddressMissing(ContactRecord),
    /// Address resolved to a coordinate.
    Geocoded(ContactRecord),
    /// Address present but the lookup produced nothing.
    GeocodeFailed(ContactRecord),
    /// Geocoding was switched off for this run.
    GeocodingSkipped(ContactRecord),
}

impl ListingOutcome {
    pub fn into_record(self) -> Option<ContactRecord> {
        match self {
            ListingOutcome::Dropped => None,
            ListingOutcome::AddressMissing(r)
            | ListingOutcome::Geocoded(r)
            | ListingOutcome::GeocodeFailed(r)
            | ListingOutcome::GeocodingSkipped(r) => Some(r),
        }
    }
}

/// Completeness counters for one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct RunSummary {
    /// Links found on the directory page, duplicates included.
    pub discovered: usize,
    /// Links left after dropping repeated URLs.
    pub unique_links: usize,
    /// Listings that yielded a contact record.
    pub extracted: usize,
    /// Listings skipped for lack of a contact section or a failed fetch.
    pub dropped: usize,
    pub geocoded: usize,
    pub address_missing: usize,
    pub geocode_failed: usize,
}

impl RunSummary {
    pub fn record(&mut self, outcome: &ListingOutcome) {
        match outcome {
            ListingOutcome::Dropped => self.dropped += 1,
            ListingOutcome::AddressMissing(_) => {
                self.extracted += 1;
                self.address_missing += 1;
            }
            ListingOutcome::Geocoded(_) => {
                self.extracted += 1;
                self.geocoded += 1;
            }
            ListingOutcome::GeocodeFailed(_) => {
                self.extracted += 1;
                self.geocode_failed += 1;
            }
            ListingOutcome::GeocodingSkipped(_) => self.extracted += 1,
        }
    }
}

/// Records in discovery order plus the run's counters.
#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    pub records: Vec<ContactRecord>,
    pub summary: RunSummary,
}
