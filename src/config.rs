//! Pipeline configuration.
//!
//! Defaults target the Paris / Île-de-France section of the
//! leportagesalarial.com coworking directory and the public Nominatim
//! instance. Every field can be overridden from a YAML file (`--config`)
//! and then from the command line.
//!
//! ```yaml
//! directory_url: https://www.leportagesalarial.com/coworking/
//! section_heading: "Coworking Lyon :"
//! max_retries: 3
//! labels:
//!   email: Courriel
//!   website: [Site, Web]
//! ```

use crate::error::ScrapeError;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{info, instrument};
use url::Url;

pub const DEFAULT_DIRECTORY_URL: &str = "https://www.leportagesalarial.com/coworking/";
pub const DEFAULT_SECTION_HEADING: &str = "Coworking Paris – Île de France :";
pub const DEFAULT_CONTACT_MARKER: &str = "Contacter";
pub const DEFAULT_GEOCODER_ENDPOINT: &str = "https://nominatim.openstreetmap.org/search";
pub const DEFAULT_USER_AGENT: &str = concat!("coworking_scraper/", env!("CARGO_PKG_VERSION"));

/// Label words looked for in each contact list item.
///
/// Each field accepts several words (`Site` or `Website`). In YAML a single
/// word may be given as a plain string.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ContactLabels {
    #[serde(deserialize_with = "one_or_many")]
    pub address: Vec<String>,
    #[serde(deserialize_with = "one_or_many")]
    pub phone: Vec<String>,
    #[serde(deserialize_with = "one_or_many")]
    pub website: Vec<String>,
    #[serde(deserialize_with = "one_or_many")]
    pub email: Vec<String>,
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| w.to_string()).collect()
}

impl Default for ContactLabels {
    fn default() -> Self {
        Self {
            address: words(&["Adresse"]),
            phone: words(&["Téléphone"]),
            website: words(&["Site", "Website"]),
            email: words(&["Mail", "Email", "E-mail"]),
        }
    }
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(word) => vec![word],
        OneOrMany::Many(words) => words,
    })
}

/// Everything the pipeline needs to know for one run.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub directory_url: String,
    pub section_heading: String,
    /// Substring that marks the contact heading on a listing page.
    pub contact_marker: String,
    pub labels: ContactLabels,
    /// Sent with every request; Nominatim rejects anonymous clients.
    pub user_agent: String,
    pub geocoder_endpoint: String,
    pub page_timeout_secs: u64,
    pub geocode_timeout_secs: u64,
    /// Total geocoding attempts per address.
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    /// Minimum gap between two geocoding calls.
    pub geocode_interval_ms: u64,
    /// Listing pages fetched at once. Geocoding stays serialized regardless.
    pub concurrency: usize,
    pub geocode: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            directory_url: DEFAULT_DIRECTORY_URL.to_string(),
            section_heading: DEFAULT_SECTION_HEADING.to_string(),
            contact_marker: DEFAULT_CONTACT_MARKER.to_string(),
            labels: ContactLabels::default(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            geocoder_endpoint: DEFAULT_GEOCODER_ENDPOINT.to_string(),
            page_timeout_secs: 10,
            geocode_timeout_secs: 10,
            max_retries: 2,
            retry_backoff_ms: 1000,
            geocode_interval_ms: 1000,
            concurrency: 1,
            geocode: true,
        }
    }
}

impl PipelineConfig {
    /// Load a YAML config file. Missing keys keep their defaults.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScrapeError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_yaml_str(&raw)?;
        info!("Loaded configuration file");
        Ok(config)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, ScrapeError> {
        serde_yaml::from_str(raw).map_err(|e| ScrapeError::Config(e.to_string()))
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ScrapeError> {
        for url in [&self.directory_url, &self.geocoder_endpoint] {
            Url::parse(url).map_err(|source| ScrapeError::InvalidUrl {
                url: url.clone(),
                source,
            })?;
        }
        if self.section_heading.trim().is_empty() {
            return Err(ScrapeError::Config("section_heading is empty".to_string()));
        }
        if self.contact_marker.is_empty() {
            return Err(ScrapeError::Config("contact_marker is empty".to_string()));
        }
        if self.max_retries == 0 {
            return Err(ScrapeError::Config(
                "max_retries must allow at least one attempt".to_string(),
            ));
        }
        if self.concurrency == 0 {
            return Err(ScrapeError::Config("concurrency must be at least 1".to_string()));
        }
        if self.user_agent.trim().is_empty() {
            return Err(ScrapeError::Config("user_agent is empty".to_string()));
        }
        Ok(())
    }

    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout_secs)
    }

    pub fn geocode_timeout(&self) -> Duration {
        Duration::from_secs(self.geocode_timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn geocode_interval(&self) -> Duration {
        Duration::from_millis(self.geocode_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.geocode_interval(), Duration::from_secs(1));
        assert_eq!(config.labels.phone, vec!["Téléphone"]);
        assert!(config.labels.email.iter().any(|w| w == "Email"));
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = PipelineConfig::from_yaml_str(
            "section_heading: \"Coworking Lyon :\"\nmax_retries: 4\nlabels:\n  email: Courriel\n  website: [Site, Web]\n",
        )
        .unwrap();
        assert_eq!(config.section_heading, "Coworking Lyon :");
        assert_eq!(config.max_retries, 4);
        assert_eq!(config.labels.email, vec!["Courriel"]);
        assert_eq!(config.labels.website, vec!["Site", "Web"]);
        assert_eq!(config.labels.address, vec!["Adresse"]);
        assert_eq!(config.directory_url, DEFAULT_DIRECTORY_URL);
    }

    #[test]
    fn test_bad_yaml_is_config_error() {
        let err = PipelineConfig::from_yaml_str("max_retries: [1, 2]").unwrap_err();
        assert!(matches!(err, ScrapeError::Config(_)));
    }

    #[test]
    fn test_validate_rejects_zero_retries() {
        let config = PipelineConfig {
            max_retries: 0,
            ..PipelineConfig::default()
        };
        assert!(matches!(config.validate(), Err(ScrapeError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_relative_directory_url() {
        let config = PipelineConfig {
            directory_url: "/coworking/".to_string(),
            ..PipelineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ScrapeError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "concurrency: 4\ngeocode: false").unwrap();
        let config = PipelineConfig::load(file.path()).unwrap();
        assert_eq!(config.concurrency, 4);
        assert!(!config.geocode);
    }
}
