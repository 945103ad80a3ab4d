//! Discover → extract → geocode orchestration.
//!
//! Each listing moves through
//! `Discovered → ContactExtracted | Dropped → Geocoded | AddressMissing | GeocodeFailed`
//! and ends up either as one [`ContactRecord`](crate::models::ContactRecord) in the output or not at all.
//!
//! Listing pages are fetched up to `concurrency` at a time (`1` by default),
//! but output keeps discovery order and every geocoding call goes through
//! the shared [`RateGate`], so at most one lookup is ever in flight.

use crate::config::PipelineConfig;
use crate::error::ScrapeError;
use crate::fetch::PageFetcher;
use crate::geocode::Geocoder;
use crate::models::{CoworkingLink, ListingOutcome, PipelineReport, RunSummary};
use crate::rate::RateGate;
use crate::scrapers::directory;
use crate::scrapers::listing::{self, ContactRules};
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Runs discovery, extraction and geocoding for one directory section.
///
/// Generic over the [`PageFetcher`] so the same pipeline runs against the
/// network or an in-memory stub.
#[derive(Debug)]
pub struct Pipeline<F> {
    fetcher: F,
    config: PipelineConfig,
    rules: ContactRules,
    gate: Arc<RateGate>,
}

impl<F: PageFetcher> Pipeline<F> {
    /// Build a pipeline from a validated configuration.
    ///
    /// # Arguments
    ///
    /// * `fetcher` - Used for directory, listing and geocoding requests
    /// * `config` - Run settings; checked with [`PipelineConfig::validate`]
    ///
    /// # Returns
    ///
    /// The pipeline with its own [`RateGate`], or [`ScrapeError::Config`] /
    /// [`ScrapeError::InvalidUrl`] when the configuration is unusable.
    pub fn new(fetcher: F, config: PipelineConfig) -> Result<Self, ScrapeError> {
        config.validate()?;
        let rules = ContactRules::new(&config.contact_marker, &config.labels)?;
        let gate = Arc::new(RateGate::new(config.geocode_interval()));
        Ok(Self {
            fetcher,
            config,
            rules,
            gate,
        })
    }

    /// Share a pacing gate with other users of the same geocoding service.
    pub fn with_gate(mut self, gate: Arc<RateGate>) -> Self {
        self.gate = gate;
        self
    }

    /// Links under `section_heading` on the directory page, duplicates included.
    pub async fn discover(
        &self,
        directory_url: &str,
        section_heading: &str,
    ) -> Result<Vec<CoworkingLink>, ScrapeError> {
        directory::discover(
            &self.fetcher,
            directory_url,
            section_heading,
            self.config.page_timeout(),
        )
        .await
    }

    /// Run the whole pipeline over one directory section.
    ///
    /// # Arguments
    ///
    /// * `directory_url` - Absolute URL of the directory page
    /// * `section_heading` - Exact text of the section heading
    ///
    /// # Returns
    ///
    /// One record per unique listing URL that had a contact card, in
    /// discovery order, plus the run's [`RunSummary`].
    ///
    /// Only a failure to fetch the directory page is returned as an error.
    /// Per-listing problems are logged and show up in the summary counts.
    #[instrument(level = "info", skip(self))]
    pub async fn run(
        &self,
        directory_url: &str,
        section_heading: &str,
    ) -> Result<PipelineReport, ScrapeError> {
        let t0 = Instant::now();
        let discovered = self.discover(directory_url, section_heading).await?;
        if discovered.is_empty() {
            warn!("No listings discovered; nothing to scrape");
        }

        let links: Vec<CoworkingLink> = discovered
            .iter()
            .unique_by(|link| link.url.clone())
            .cloned()
            .collect();
        let mut summary = RunSummary {
            discovered: discovered.len(),
            unique_links: links.len(),
            ..RunSummary::default()
        };
        info!(
            discovered = summary.discovered,
            unique = summary.unique_links,
            concurrency = self.config.concurrency,
            "Starting listing processing"
        );

        let outcomes: Vec<ListingOutcome> = stream::iter(links.iter().enumerate())
            .map(|(index, link)| self.process_listing(index, link))
            .buffered(self.config.concurrency.max(1))
            .collect()
            .await;

        let mut records = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            summary.record(&outcome);
            if let Some(record) = outcome.into_record() {
                records.push(record);
            }
        }

        info!(
            discovered = summary.discovered,
            extracted = summary.extracted,
            geocoded = summary.geocoded,
            dropped = summary.dropped,
            address_missing = summary.address_missing,
            geocode_failed = summary.geocode_failed,
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Completed listing processing"
        );
        Ok(PipelineReport { records, summary })
    }

    #[instrument(level = "info", skip_all, fields(index = index, name = %link.name, url = %link.url))]
    async fn process_listing(&self, index: usize, link: &CoworkingLink) -> ListingOutcome {
        let Some(mut record) = listing::extract(
            &self.fetcher,
            &self.rules,
            &link.name,
            &link.url,
            self.config.page_timeout(),
        )
        .await
        else {
            debug!("Listing dropped");
            return ListingOutcome::Dropped;
        };

        if !self.config.geocode {
            return ListingOutcome::GeocodingSkipped(record);
        }
        let Some(address) = record.address.clone() else {
            debug!("No address to geocode");
            return ListingOutcome::AddressMissing(record);
        };

        let coordinates = {
            let _permit = self.gate.acquire().await;
            Geocoder::new(
                &self.fetcher,
                &self.config.geocoder_endpoint,
                self.config.retry_backoff(),
            )
            .resolve(
                &address,
                self.config.max_retries,
                self.config.geocode_timeout(),
            )
            .await
        };

        match coordinates {
            Some(c) => {
                record.coordinates = Some(c);
                ListingOutcome::Geocoded(record)
            }
            None => ListingOutcome::GeocodeFailed(record),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::testing::{StubFetcher, StubResponse};
    use crate::models::GeoCoordinate;
    use std::time::Duration;

    const DIRECTORY_URL: &str = "https://www.example.com/coworking/";
    const SECTION: &str = "Coworking Paris – Île de France :";
    const ENDPOINT: &str = "https://nominatim.example/search";
    const ADDRESS: &str = "10 Rue de Paris, 75001 Paris";

    fn config() -> PipelineConfig {
        PipelineConfig {
            directory_url: DIRECTORY_URL.to_string(),
            geocoder_endpoint: ENDPOINT.to_string(),
            retry_backoff_ms: 0,
            geocode_interval_ms: 0,
            ..PipelineConfig::default()
        }
    }

    fn geocode_url(address: &str) -> String {
        let stub = StubFetcher::new();
        Geocoder::new(&stub, ENDPOINT, Duration::ZERO).query_url(address)
    }

    fn directory(hrefs: &[(&str, &str)]) -> String {
        let items: String = hrefs
            .iter()
            .map(|(href, name)| format!(r#"<li><a href="{href}">{name}</a></li>"#))
            .collect();
        format!("<h3>{SECTION}</h3><ul>{items}</ul>")
    }

    fn listing(company: &str, items: &[&str]) -> String {
        let items: String = items.iter().map(|i| format!("<li>{i}</li>")).collect();
        format!("<h1>{company}</h1><h2>Contacter {company}</h2><ul>{items}</ul>")
    }

    fn acme_fetcher(geocode_body: StubResponse) -> StubFetcher {
        StubFetcher::new()
            .with_page(DIRECTORY_URL, &directory(&[("/coworking/acme/", "Acme Space")]))
            .with_page(
                "https://www.example.com/coworking/acme/",
                &listing(
                    "Acme",
                    &[&format!("Adresse : {ADDRESS}"), "Téléphone : 01 23 45 67 89"],
                ),
            )
            .with_sequence(&geocode_url(ADDRESS), vec![geocode_body])
    }

    #[tokio::test]
    async fn test_geocoded_record() {
        let fetcher = acme_fetcher(StubResponse::Body(r#"[{"lat":"48.86","lon":"2.35"}]"#.to_string()));
        let pipeline = Pipeline::new(fetcher, config()).unwrap();
        let report = pipeline.run(DIRECTORY_URL, SECTION).await.unwrap();

        assert_eq!(report.records.len(), 1);
        let record = &report.records[0];
        assert_eq!(record.listing_name, "Acme Space");
        assert_eq!(record.company_name, "Acme");
        assert_eq!(record.address.as_deref(), Some(ADDRESS));
        assert_eq!(record.phone.as_deref(), Some("01 23 45 67 89"));
        assert_eq!(record.coordinates, Some(GeoCoordinate::new(48.86, 2.35).unwrap()));
        assert_eq!(report.summary.geocoded, 1);
    }

    #[tokio::test]
    async fn test_no_geocoding_match_keeps_record() {
        let fetcher = acme_fetcher(StubResponse::Body("[]".to_string()));
        let pipeline = Pipeline::new(fetcher, config()).unwrap();
        let report = pipeline.run(DIRECTORY_URL, SECTION).await.unwrap();

        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].latitude(), None);
        assert_eq!(report.records[0].longitude(), None);
        assert_eq!(report.summary.geocode_failed, 1);
        assert_eq!(report.summary.extracted, 1);
    }

    #[tokio::test]
    async fn test_failures_stay_local_and_order_is_kept() {
        let fetcher = StubFetcher::new()
            .with_page(
                DIRECTORY_URL,
                &directory(&[
                    ("/a/", "Alpha"),
                    ("/broken/", "Broken"),
                    ("/a/", "Alpha twice"),
                    ("/no-contact/", "Quiet"),
                    ("/b/", "Beta"),
                    ("/c/", "Alpha"),
                ]),
            )
            .with_page("https://www.example.com/a/", &listing("A", &["Téléphone : 1"]))
            .with_failure("https://www.example.com/broken/")
            .with_page("https://www.example.com/no-contact/", "<h2>A propos</h2><ul><li>x</li></ul>")
            .with_page("https://www.example.com/b/", &listing("B", &["Adresse : 2 rue B"]))
            .with_page("https://www.example.com/c/", &listing("C", &["Mail : c@c.fr"]))
            .with_failure(&geocode_url("2 rue B"));
        let pipeline = Pipeline::new(fetcher, config()).unwrap();
        let report = pipeline.run(DIRECTORY_URL, SECTION).await.unwrap();

        let companies: Vec<_> = report.records.iter().map(|r| r.company_name.as_str()).collect();
        assert_eq!(companies, vec!["A", "B", "C"]);
        assert_eq!(
            report.summary,
            RunSummary {
                discovered: 6,
                unique_links: 5,
                extracted: 3,
                dropped: 2,
                geocoded: 0,
                address_missing: 2,
                geocode_failed: 1,
            }
        );
    }

    #[tokio::test]
    async fn test_geocoder_only_called_for_addresses() {
        let fetcher = StubFetcher::new()
            .with_page(DIRECTORY_URL, &directory(&[("/a/", "A"), ("/b/", "B")]))
            .with_page("https://www.example.com/a/", &listing("A", &["Téléphone : 1"]))
            .with_page("https://www.example.com/b/", &listing("B", &["Adresse : 2 rue B"]))
            .with_page(&geocode_url("2 rue B"), r#"[{"lat":"45","lon":"5"}]"#);
        let pipeline = Pipeline::new(&fetcher, config()).unwrap();
        pipeline.run(DIRECTORY_URL, SECTION).await.unwrap();

        let geocode_calls = fetcher
            .calls()
            .iter()
            .filter(|u| u.starts_with(ENDPOINT))
            .count();
        assert_eq!(geocode_calls, 1);
    }

    #[tokio::test]
    async fn test_geocoding_disabled() {
        let fetcher = acme_fetcher(StubResponse::Fail);
        let pipeline = Pipeline::new(
            &fetcher,
            PipelineConfig {
                geocode: false,
                ..config()
            },
        )
        .unwrap();
        let report = pipeline.run(DIRECTORY_URL, SECTION).await.unwrap();
        assert_eq!(report.records.len(), 1);
        assert!(report.records[0].coordinates.is_none());
        assert_eq!(fetcher.calls_to(&geocode_url(ADDRESS)), 0);
    }

    #[tokio::test]
    async fn test_missing_section_gives_empty_report() {
        let fetcher = StubFetcher::new().with_page(DIRECTORY_URL, "<h3>Autre</h3><ul></ul>");
        let pipeline = Pipeline::new(fetcher, config()).unwrap();
        let report = pipeline.run(DIRECTORY_URL, SECTION).await.unwrap();
        assert!(report.records.is_empty());
        assert_eq!(report.summary, RunSummary::default());
    }

    #[tokio::test]
    async fn test_directory_failure_is_error() {
        let fetcher = StubFetcher::new().with_failure(DIRECTORY_URL);
        let pipeline = Pipeline::new(fetcher, config()).unwrap();
        assert!(pipeline.run(DIRECTORY_URL, SECTION).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_extraction_still_paces_geocoding() {
        let hrefs: Vec<(String, String)> = (0..4)
            .map(|i| (format!("/s{i}/"), format!("Space {i}")))
            .collect();
        let refs: Vec<(&str, &str)> = hrefs.iter().map(|(h, n)| (h.as_str(), n.as_str())).collect();
        let mut fetcher = StubFetcher::new().with_page(DIRECTORY_URL, &directory(&refs));
        for i in 0..4 {
            let address = format!("{i} rue du Test");
            fetcher = fetcher
                .with_page(
                    &format!("https://www.example.com/s{i}/"),
                    &listing(&format!("S{i}"), &[&format!("Adresse : {address}")]),
                )
                .with_page(&geocode_url(&address), r#"[{"lat":"48","lon":"2"}]"#);
        }

        let pipeline = Pipeline::new(
            fetcher,
            PipelineConfig {
                concurrency: 4,
                geocode_interval_ms: 1000,
                ..config()
            },
        )
        .unwrap();
        let t0 = tokio::time::Instant::now();
        let report = pipeline.run(DIRECTORY_URL, SECTION).await.unwrap();

        assert_eq!(report.summary.geocoded, 4);
        let names: Vec<_> = report.records.iter().map(|r| r.listing_name.as_str()).collect();
        assert_eq!(names, vec!["Space 0", "Space 1", "Space 2", "Space 3"]);
        // Four lookups, three enforced gaps.
        assert!(t0.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_pacing_without_geocoding_calls() {
        let fetcher = StubFetcher::new()
            .with_page(DIRECTORY_URL, &directory(&[("/a/", "A"), ("/b/", "B"), ("/c/", "C")]))
            .with_page("https://www.example.com/a/", &listing("A", &["Téléphone : 1"]))
            .with_page("https://www.example.com/b/", &listing("B", &["Mail : b@b.fr"]))
            .with_page("https://www.example.com/c/", &listing("C", &["Site : c.fr"]));
        let pipeline = Pipeline::new(
            fetcher,
            PipelineConfig {
                geocode_interval_ms: 1000,
                retry_backoff_ms: 1000,
                ..config()
            },
        )
        .unwrap();

        let t0 = tokio::time::Instant::now();
        let report = pipeline.run(DIRECTORY_URL, SECTION).await.unwrap();
        assert_eq!(report.records.len(), 3);
        assert_eq!(report.summary.address_missing, 3);
        assert_eq!(t0.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shared_gate_paces_across_pipelines() {
        let gate = Arc::new(RateGate::new(Duration::from_secs(1)));
        let body = || StubResponse::Body(r#"[{"lat":"48","lon":"2"}]"#.to_string());
        let first = Pipeline::new(acme_fetcher(body()), config())
            .unwrap()
            .with_gate(Arc::clone(&gate));
        let second = Pipeline::new(acme_fetcher(body()), config())
            .unwrap()
            .with_gate(Arc::clone(&gate));

        let t0 = tokio::time::Instant::now();
        let (a, b) = tokio::join!(
            first.run(DIRECTORY_URL, SECTION),
            second.run(DIRECTORY_URL, SECTION)
        );
        assert_eq!(a.unwrap().summary.geocoded, 1);
        assert_eq!(b.unwrap().summary.geocoded, 1);
        // Each pipeline alone has a zero interval; the shared gate adds one gap.
        assert!(t0.elapsed() >= Duration::from_secs(1));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = Pipeline::new(
            StubFetcher::new(),
            PipelineConfig {
                concurrency: 0,
                ..config()
            },
        );
        assert!(matches!(result, Err(ScrapeError::Config(_))));
    }
}
