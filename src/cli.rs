//! Command-line interface definitions.
//!
//! Every pipeline setting can come from a flag, an environment variable or
//! the YAML config file, in that order of precedence.

use crate::config::PipelineConfig;
use crate::filter::RecordFilter;
use clap::Parser;

/// Command-line arguments for the coworking scraper.
///
/// # Examples
///
/// ```sh
/// # Default directory and section, outputs in ./output
/// coworking_scraper
///
/// # Another section, four listing pages at a time
/// coworking_scraper --section "Coworking Lyon :" --concurrency 4
///
/// # Only list the discovered links
/// coworking_scraper -o ./links --links-only
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Output directory for the JSON, CSV and Markdown files
    #[arg(short, long, env = "COWORKING_OUTPUT_DIR", default_value = "output")]
    pub output_dir: String,

    /// Optional path to a YAML config file
    #[arg(short, long, env = "COWORKING_CONFIG")]
    pub config: Option<String>,

    /// Directory page listing the coworkings
    #[arg(long, env = "COWORKING_DIRECTORY_URL")]
    pub directory_url: Option<String>,

    /// Exact text of the directory heading introducing the section to scrape
    #[arg(long, env = "COWORKING_SECTION")]
    pub section: Option<String>,

    /// Word marking the contact heading on listing pages
    #[arg(long, env = "COWORKING_CONTACT_MARKER")]
    pub contact_marker: Option<String>,

    /// User-Agent sent with every request
    #[arg(long, env = "COWORKING_USER_AGENT")]
    pub user_agent: Option<String>,

    /// Nominatim-compatible search endpoint
    #[arg(long, env = "GEOCODER_ENDPOINT")]
    pub geocoder_endpoint: Option<String>,

    /// Timeout for directory and listing pages, in seconds
    #[arg(long, env = "COWORKING_PAGE_TIMEOUT_SECS")]
    pub page_timeout_secs: Option<u64>,

    /// Timeout for one geocoding request, in seconds
    #[arg(long, env = "GEOCODER_TIMEOUT_SECS")]
    pub geocode_timeout_secs: Option<u64>,

    /// Geocoding attempts per address
    #[arg(long, env = "GEOCODER_MAX_RETRIES")]
    pub max_retries: Option<u32>,

    /// Wait between two geocoding attempts, in milliseconds
    #[arg(long, env = "GEOCODER_RETRY_BACKOFF_MS")]
    pub retry_backoff_ms: Option<u64>,

    /// Minimum gap between two geocoding calls, in milliseconds
    #[arg(long, env = "GEOCODER_INTERVAL_MS")]
    pub geocode_interval_ms: Option<u64>,

    /// Listing pages fetched at once
    #[arg(short = 'n', long, env = "COWORKING_CONCURRENCY")]
    pub concurrency: Option<usize>,

    /// Skip geocoding entirely
    #[arg(long, env = "COWORKING_NO_GEOCODE")]
    pub no_geocode: bool,

    /// Stop after discovery and write the links only
    #[arg(long, env = "COWORKING_LINKS_ONLY")]
    pub links_only: bool,

    /// Keep only listings whose name contains this text (case-insensitive)
    #[arg(long, env = "COWORKING_FILTER_NAME")]
    pub name: Option<String>,

    /// Keep only listings whose address contains this area, e.g. "75011 Paris"
    #[arg(long, env = "COWORKING_FILTER_AREA")]
    pub area: Option<String>,
}

impl Cli {
    /// Overlay the flags that were given onto `config`.
    pub fn apply_to(&self, config: &mut PipelineConfig) {
        if let Some(v) = &self.directory_url {
            config.directory_url = v.clone();
        }
        if let Some(v) = &self.section {
            config.section_heading = v.clone();
        }
        if let Some(v) = &self.contact_marker {
            config.contact_marker = v.clone();
        }
        if let Some(v) = &self.user_agent {
            config.user_agent = v.clone();
        }
        if let Some(v) = &self.geocoder_endpoint {
            config.geocoder_endpoint = v.clone();
        }
        if let Some(v) = self.page_timeout_secs {
            config.page_timeout_secs = v;
        }
        if let Some(v) = self.geocode_timeout_secs {
            config.geocode_timeout_secs = v;
        }
        if let Some(v) = self.max_retries {
            config.max_retries = v;
        }
        if let Some(v) = self.retry_backoff_ms {
            config.retry_backoff_ms = v;
        }
        if let Some(v) = self.geocode_interval_ms {
            config.geocode_interval_ms = v;
        }
        if let Some(v) = self.concurrency {
            config.concurrency = v;
        }
        if self.no_geocode {
            config.geocode = false;
        }
    }

    pub fn filter(&self) -> RecordFilter {
        RecordFilter {
            name: self.name.clone(),
            area: self.area.clone(),
        }
    }
}
