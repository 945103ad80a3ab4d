//! Error taxonomy for the scrape pipeline.
//!
//! Only [`ScrapeError::Transport`] on the directory page and the ambient
//! variants (configuration, I/O, export) ever reach `main`. Everything that
//! happens while handling a single listing or a single address is logged
//! and turned into an absent value at that boundary.

use thiserror::Error;

/// Errors raised by the fetch, scrape, geocode and export layers.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// Network failure, timeout or non-2xx status on any fetch.
    #[error("transport error for {url}: {message}")]
    Transport { url: String, message: String },

    /// The heading or list the extractor relies on was not in the page.
    #[error("expected markup not found: {0}")]
    StructuralMismatch(String),

    /// The geocoding service answered with zero candidates.
    #[error("no geocoding candidate for {0:?}")]
    GeocodeNoMatch(String),

    /// Every geocoding attempt failed transiently.
    #[error("geocoding unavailable for {address:?} after {attempts} attempt(s)")]
    GeocodeUnavailable { address: String, attempts: u32 },

    /// A candidate carried coordinates that do not parse or are out of range.
    #[error("invalid coordinate: {0}")]
    InvalidCoordinate(String),

    /// The response body could not be decoded.
    #[error("could not decode response from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("invalid url {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl ScrapeError {
    /// Build a [`ScrapeError::Transport`] from anything displayable.
    pub fn transport(url: &str, err: impl std::fmt::Display) -> Self {
        ScrapeError::Transport {
            url: url.to_string(),
            message: err.to_string(),
        }
    }

    /// Whether a geocoding attempt that failed with this error is worth repeating.
    ///
    /// A reachable service that found nothing will find nothing again, so only
    /// transport and decode failures qualify.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ScrapeError::Transport { .. } | ScrapeError::Decode { .. }
        )
    }
}
