//! Scrapers for the coworking directory and its listing pages.
//!
//! Scraping follows the same two-phase pattern for every run:
//!
//! 1. **Discovery** ([`directory`]): find the listing links under one named
//!    section of the directory page
//! 2. **Extraction** ([`listing`]): pull the contact card out of each
//!    listing page
//!
//! | Page | Module | Anchor in the markup |
//! |------|--------|----------------------|
//! | Directory | [`directory`] | heading with the exact section text, then the next list |
//! | Listing | [`listing`] | heading containing the contact marker, then the next list |
//!
//! Both pages share one structural convention: a heading, followed somewhere
//! later in document order by a `<ul>`/`<ol>`. [`heading_then_list`] finds
//! that pair.

pub mod directory;
pub mod listing;

use crate::utils::collapse_whitespace;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

static HEADINGS_AND_LISTS: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("h1, h2, h3, h4, h5, h6, ul, ol").expect("valid selector")
});

fn is_list(element: &ElementRef<'_>) -> bool {
    matches!(element.value().name(), "ul" | "ol")
}

/// Visible text of an element with whitespace collapsed.
pub(crate) fn element_text(element: &ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

/// Find the first heading whose collapsed text satisfies `matches`, and the
/// first list that comes after it in document order.
///
/// Returns `None` when no heading matches. The list is `None` when the
/// heading is the last list-or-heading in the page.
pub(crate) fn heading_then_list<'a>(
    document: &'a Html,
    matches: impl Fn(&str) -> bool,
) -> Option<(ElementRef<'a>, Option<ElementRef<'a>>)> {
    let mut elements = document.select(&HEADINGS_AND_LISTS);
    let heading = elements
        .by_ref()
        .find(|el| !is_list(el) && matches(&element_text(el)))?;
    let list = elements.find(is_list);
    Some((heading, list))
}
