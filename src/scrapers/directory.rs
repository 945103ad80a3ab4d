//! Directory page scraper.
//!
//! The directory groups listings by region, each region introduced by a
//! heading such as `Coworking Paris – Île de France :` and followed by a
//! list of links to the listing pages. Relative hrefs are resolved against
//! the directory URL.

use super::{element_text, heading_then_list};
use crate::error::ScrapeError;
use crate::fetch::PageFetcher;
use crate::models::CoworkingLink;
use crate::utils::{collapse_whitespace, last_path_segment};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

static LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("valid selector"));

/// Fetch the directory page and return the links listed under `section_heading`.
///
/// A missing section is logged and yields an empty list. Only a failure to
/// fetch the directory page itself is an error.
#[instrument(level = "info", skip(fetcher, timeout))]
pub async fn discover<F: PageFetcher>(
    fetcher: &F,
    directory_url: &str,
    section_heading: &str,
    timeout: Duration,
) -> Result<Vec<CoworkingLink>, ScrapeError> {
    let base = Url::parse(directory_url).map_err(|source| ScrapeError::InvalidUrl {
        url: directory_url.to_string(),
        source,
    })?;
    let html = fetcher.fetch(directory_url, timeout).await?;

    match parse_directory(&html, &base, section_heading) {
        Ok(links) => {
            info!(count = links.len(), source = directory_url, "Indexed listing URLs");
            debug!(urls = ?links.iter().map(|l| &l.url).collect::<Vec<_>>(), "Listing URLs");
            Ok(links)
        }
        Err(e) => {
            warn!(error = %e, "Directory section not usable; no listings discovered");
            Ok(Vec::new())
        }
    }
}

/// Extract the links of one section from directory markup.
///
/// Errors with [`ScrapeError::StructuralMismatch`] when the heading or the
/// list after it is missing.
pub fn parse_directory(
    html: &str,
    base: &Url,
    section_heading: &str,
) -> Result<Vec<CoworkingLink>, ScrapeError> {
    let document = Html::parse_document(html);
    let wanted = collapse_whitespace(section_heading);

    let (_, list) = heading_then_list(&document, |text| text == wanted).ok_or_else(|| {
        ScrapeError::StructuralMismatch(format!("section heading {wanted:?} not found"))
    })?;
    let list = list.ok_or_else(|| {
        ScrapeError::StructuralMismatch(format!("no list after section heading {wanted:?}"))
    })?;

    let mut links = Vec::new();
    for anchor in list.select(&LINK_SELECTOR) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let url = match base.join(href.trim()) {
            Ok(resolved) => resolved.to_string(),
            Err(e) => {
                warn!(%href, error = %e, "Skipping unresolvable listing link");
                continue;
            }
        };
        let mut name = element_text(&anchor);
        if name.is_empty() {
            name = last_path_segment(&url).unwrap_or_else(|| url.clone());
        }
        links.push(CoworkingLink { name, url });
    }
    Ok(links)
}
