//! Utility functions for text normalization, URL naming and file system checks.
//!
//! - Whitespace collapsing for scraped text
//! - String truncation for logging response bodies
//! - URL slug extraction for listings with an empty anchor label
//! - Output directory validation

use crate::error::ScrapeError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs as stdfs;
use tokio::fs;
use tracing::{info, instrument};
use url::Url;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Collapse every run of whitespace (including non-breaking spaces) into a
/// single space and trim both ends.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(collapse_whitespace("  Adresse :\n\t10 Rue "), "Adresse : 10 Rue");
/// ```
pub fn collapse_whitespace(s: &str) -> String {
    WHITESPACE.replace_all(s, " ").trim().to_string()
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to at most `max` bytes (on a char boundary) with an
/// ellipsis and the number of dropped bytes appended.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Last non-empty path segment of a URL, used as a listing name when the
/// directory anchor has no visible text.
///
/// `https://site/coworking/morning-paris/` gives `morning-paris`.
pub fn last_path_segment(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    parsed
        .path_segments()?
        .filter(|s| !s.is_empty())
        .last()
        .map(|s| {
            urlencoding::decode(s)
                .map(|d| d.into_owned())
                .unwrap_or_else(|_| s.to_string())
        })
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then creates and removes a probe file.
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> Result<(), ScrapeError> {
    fs::create_dir_all(path).await?;
    let probe_path = format!("{}/..__probe_write__", path.trim_end_matches('/'));
    stdfs::File::create(&probe_path)?;
    let _ = stdfs::remove_file(&probe_path);
    info!("Output directory is writable");
    Ok(())
}
