//! Address geocoding against a Nominatim-compatible search endpoint.
//!
//! One lookup is a single-result text search:
//!
//! ```text
//! GET {endpoint}?q=<address>&format=json&limit=1
//! -> [{"lat": "48.8606", "lon": "2.3376", "display_name": "..."}]
//! ```
//!
//! # Retry Strategy
//!
//! - An empty candidate list is final: the service was reached and found
//!   nothing, asking again changes nothing
//! - Transport failures and undecodable bodies are retried after a fixed
//!   backoff, up to `max_retries` attempts in total
//! - A candidate with unparseable or out-of-range coordinates is final
//!
//! The geocoder keeps no state between calls. Pacing across calls is the
//! job of [`crate::rate::RateGate`].

use crate::error::ScrapeError;
use crate::fetch::PageFetcher;
use crate::models::GeoCoordinate;
use crate::utils::truncate_for_log;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

/// One search candidate as returned by Nominatim.
#[derive(Debug, Deserialize)]
struct NominatimCandidate {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: Option<String>,
}

/// Nominatim client layered over a [`PageFetcher`].
///
/// Borrowing the fetcher keeps one HTTP client (and its user agent) for the
/// whole run; the geocoder itself is cheap to build per lookup.
#[derive(Debug)]
pub struct Geocoder<'a, F> {
    fetcher: &'a F,
    endpoint: String,
    backoff: Duration,
}

impl<'a, F: PageFetcher> Geocoder<'a, F> {
    pub fn new(fetcher: &'a F, endpoint: &str, backoff: Duration) -> Self {
        Self {
            fetcher,
            endpoint: endpoint.to_string(),
            backoff,
        }
    }

    /// Search URL for `address`.
    pub fn query_url(&self, address: &str) -> String {
        format!(
            "{}?q={}&format=json&limit=1",
            self.endpoint,
            urlencoding::encode(address)
        )
    }

    /// Resolve an address to a coordinate.
    ///
    /// # Arguments
    ///
    /// * `address` - Free-text postal address, sent as-is
    /// * `max_retries` - Total attempts allowed; `0` makes no request at all
    /// * `timeout` - Per-attempt request timeout
    ///
    /// # Returns
    ///
    /// The first candidate's coordinate, or `None` when there is no match,
    /// the coordinate is invalid, or every attempt failed.
    pub async fn resolve(
        &self,
        address: &str,
        max_retries: u32,
        timeout: Duration,
    ) -> Option<GeoCoordinate> {
        self.try_resolve(address, max_retries, timeout).await.ok()
    }

    /// Resolve an address, reporting why it could not be resolved.
    ///
    /// Same arguments as [`Geocoder::resolve`].
    ///
    /// # Errors
    ///
    /// - [`ScrapeError::GeocodeNoMatch`] when the service found nothing
    /// - [`ScrapeError::InvalidCoordinate`] when the top candidate is unusable
    /// - [`ScrapeError::GeocodeUnavailable`] once all attempts are spent
    #[instrument(level = "info", skip(self, timeout))]
    pub async fn try_resolve(
        &self,
        address: &str,
        max_retries: u32,
        timeout: Duration,
    ) -> Result<GeoCoordinate, ScrapeError> {
        let total_t0 = Instant::now();
        let attempts = max_retries;

        for attempt in 1..=attempts {
            match self.lookup_once(address, timeout).await {
                Ok(coordinate) => {
                    info!(
                        attempt,
                        latitude = coordinate.latitude,
                        longitude = coordinate.longitude,
                        "Geocoded address"
                    );
                    return Ok(coordinate);
                }
                Err(e) if e.is_transient() => {
                    if attempt == attempts {
                        error!(
                            attempt,
                            max = attempts,
                            elapsed_ms_total = total_t0.elapsed().as_millis() as u64,
                            error = %e,
                            "Geocoding exhausted retries"
                        );
                        break;
                    }
                    warn!(
                        attempt,
                        max = attempts,
                        delay = ?self.backoff,
                        error = %e,
                        "Geocoding attempt failed; backing off"
                    );
                    sleep(self.backoff).await;
                }
                Err(e) => {
                    warn!(error = %e, "Geocoding gave no usable result");
                    return Err(e);
                }
            }
        }

        Err(ScrapeError::GeocodeUnavailable {
            address: address.to_string(),
            attempts,
        })
    }

    async fn lookup_once(&self, address: &str, timeout: Duration) -> Result<GeoCoordinate, ScrapeError> {
        let url = self.query_url(address);
        let body = self.fetcher.fetch(&url, timeout).await?;

        let candidates: Vec<NominatimCandidate> =
            serde_json::from_str(&body).map_err(|e| ScrapeError::Decode {
                url: url.clone(),
                message: format!("{e}; body: {}", truncate_for_log(&body, 200)),
            })?;

        let first = candidates
            .first()
            .ok_or_else(|| ScrapeError::GeocodeNoMatch(address.to_string()))?;
        debug!(display_name = ?first.display_name, "Top geocoding candidate");
        GeoCoordinate::parse(&first.lat, &first.lon)
    }
}
