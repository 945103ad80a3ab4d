//! Listing page scraper.
//!
//! A listing page carries its contact card as a heading such as
//! `Contacter Acme` followed by a list of loosely labelled items:
//!
//! ```html
//! <h2>Contacter Acme</h2>
//! <ul>
//!   <li>Adresse : 10 Rue de Paris, 75001 Paris</li>
//!   <li>Téléphone : 01 23 45 67 89</li>
//!   <li>Site : https://acme.example</li>
//!   <li>Mail : hello@acme.example</li>
//! </ul>
//! ```
//!
//! Items are classified by label substring in a fixed priority order
//! (address, phone, website, email), and an `@` anywhere in an otherwise
//! unmatched item counts as an email. A field may have several label words
//! (`Mail`, `Email`, `E-mail`). Label matching is case-sensitive; stripping
//! the `Label :` prefix is not, but it only strips whole words, so
//! `Email :` never leaves a stray `E` behind.

use super::{element_text, heading_then_list};
use crate::config::ContactLabels;
use crate::error::ScrapeError;
use crate::fetch::PageFetcher;
use crate::models::ContactRecord;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::{debug, instrument, warn};

static ITEM_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("li").expect("valid selector"));

/// Contact fields a list item can fill, in classification priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactField {
    Address,
    Phone,
    Website,
    Email,
}

impl ContactField {
    pub const PRIORITY: [ContactField; 4] = [
        ContactField::Address,
        ContactField::Phone,
        ContactField::Website,
        ContactField::Email,
    ];

    fn slot(self, record: &mut ContactRecord) -> &mut Option<String> {
        match self {
            ContactField::Address => &mut record.address,
            ContactField::Phone => &mut record.phone,
            ContactField::Website => &mut record.website,
            ContactField::Email => &mut record.email,
        }
    }
}

#[derive(Debug, Clone)]
struct LabelRule {
    field: ContactField,
    labels: Vec<String>,
    prefix: Regex,
}

/// Compiled matching rules for one run: the contact marker and the four labels.
#[derive(Debug, Clone)]
pub struct ContactRules {
    marker: String,
    rules: Vec<LabelRule>,
}

impl ContactRules {
    pub fn new(marker: &str, labels: &ContactLabels) -> Result<Self, ScrapeError> {
        let rules = ContactField::PRIORITY
            .iter()
            .map(|&field| {
                let words = match field {
                    ContactField::Address => &labels.address,
                    ContactField::Phone => &labels.phone,
                    ContactField::Website => &labels.website,
                    ContactField::Email => &labels.email,
                };
                if words.is_empty() || words.iter().any(|w| w.trim().is_empty()) {
                    return Err(ScrapeError::Config(format!("empty label for {field:?}")));
                }
                // Longest first so `E-mail` wins over `mail` in the alternation.
                let mut alternatives: Vec<&String> = words.iter().collect();
                alternatives.sort_by_key(|w| std::cmp::Reverse(w.chars().count()));
                let pattern = alternatives
                    .iter()
                    .map(|w| regex::escape(w))
                    .collect::<Vec<_>>()
                    .join("|");
                let prefix = Regex::new(&format!(r"(?i)\b(?:{pattern})\s*:\s*"))
                    .map_err(|e| ScrapeError::Config(e.to_string()))?;
                Ok(LabelRule {
                    field,
                    labels: words.clone(),
                    prefix,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            marker: marker.to_string(),
            rules,
        })
    }

    /// Which field an item belongs to, if any.
    pub fn classify(&self, text: &str) -> Option<ContactField> {
        self.rules
            .iter()
            .find(|rule| rule.labels.iter().any(|label| text.contains(label.as_str())))
            .map(|rule| rule.field)
            .or_else(|| text.contains('@').then_some(ContactField::Email))
    }

    /// Strip every `Label :` occurrence for `field` and trim the rest.
    pub fn clean(&self, field: ContactField, text: &str) -> String {
        self.rules
            .iter()
            .find(|rule| rule.field == field)
            .map(|rule| rule.prefix.replace_all(text, "").trim().to_string())
            .unwrap_or_else(|| text.trim().to_string())
    }

    /// Company name carried by a contact heading.
    pub fn company_name(&self, heading: &str) -> String {
        heading.replace(&self.marker, "").trim().to_string()
    }
}

/// Fetch a listing page and extract its contact card.
///
/// Returns `None` when the page has no contact section or cannot be fetched;
/// one bad listing never fails the run.
#[instrument(level = "info", skip(fetcher, rules, timeout))]
pub async fn extract<F: PageFetcher>(
    fetcher: &F,
    rules: &ContactRules,
    listing_name: &str,
    listing_url: &str,
    timeout: Duration,
) -> Option<ContactRecord> {
    let html = match fetcher.fetch(listing_url, timeout).await {
        Ok(html) => html,
        Err(e) => {
            warn!(error = %e, "Listing fetch failed; skipping");
            return None;
        }
    };

    match parse_contact(&html, rules, listing_name, listing_url) {
        Ok(record) => {
            debug!(company = %record.company_name, "Extracted contact card");
            Some(record)
        }
        Err(e) => {
            debug!(error = %e, "No contact card on listing");
            None
        }
    }
}

/// Extract the contact card from listing markup.
pub fn parse_contact(
    html: &str,
    rules: &ContactRules,
    listing_name: &str,
    listing_url: &str,
) -> Result<ContactRecord, ScrapeError> {
    let document = Html::parse_document(html);

    let (heading, list) = heading_then_list(&document, |text| text.contains(&rules.marker))
        .ok_or_else(|| {
            ScrapeError::StructuralMismatch(format!("no heading containing {:?}", rules.marker))
        })?;
    let list = list.ok_or_else(|| {
        ScrapeError::StructuralMismatch("no list after contact heading".to_string())
    })?;

    let mut record = ContactRecord::new(
        listing_name,
        listing_url,
        &rules.company_name(&element_text(&heading)),
    );
    for item in list.select(&ITEM_SELECTOR) {
        let text = element_text(&item);
        if let Some(field) = rules.classify(&text) {
            *field.slot(&mut record) = Some(rules.clean(field, &text));
        }
    }
    Ok(record)
}
