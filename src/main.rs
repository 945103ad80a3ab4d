//! # Coworking Scraper
//!
//! Builds a table of coworking spaces from a third-party directory: one
//! contact card per listing, with coordinates when the address geocodes.
//!
//! ## Usage
//!
//! ```sh
//! coworking_scraper -o ./output
//! RUST_LOG=coworking_scraper=debug coworking_scraper --concurrency 4
//! ```

use clap::Parser;
use coworking_scraper::cli::Cli;
use coworking_scraper::config::PipelineConfig;
use coworking_scraper::fetch::HttpFetcher;
use coworking_scraper::filter;
use coworking_scraper::outputs::{csv, json, markdown};
use coworking_scraper::utils::ensure_writable_dir;
use coworking_scraper::Pipeline;
use std::error::Error;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("coworking_scraper starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    // ---- Configuration ----
    let mut config = match &args.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    args.apply_to(&mut config);
    info!(
        directory_url = %config.directory_url,
        section = %config.section_heading,
        geocode = config.geocode,
        concurrency = config.concurrency,
        "Configuration resolved"
    );

    // Early check: the run is wasted if results cannot be written
    if let Err(e) = ensure_writable_dir(&args.output_dir).await {
        error!(
            path = %args.output_dir,
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e.into());
    }

    let fetcher = HttpFetcher::new(&config.user_agent)?;
    let directory_url = config.directory_url.clone();
    let section = config.section_heading.clone();
    let pipeline = Pipeline::new(fetcher, config)?;

    // ---- Links only ----
    if args.links_only {
        let links = pipeline.discover(&directory_url, &section).await?;
        json::write_links(&links, &args.output_dir).await?;
        info!(count = links.len(), elapsed = ?start_time.elapsed(), "Execution complete");
        return Ok(());
    }

    // ---- Discover, extract, geocode ----
    let report = match pipeline.run(&directory_url, &section).await {
        Ok(report) => report,
        Err(e) => {
            error!(url = %directory_url, error = %e, "Directory page could not be scraped");
            return Err(e.into());
        }
    };
    let summary = report.summary;

    let record_filter = args.filter();
    let records = if record_filter.is_empty() {
        report.records
    } else {
        let before = report.records.len();
        let kept = record_filter.apply(report.records);
        info!(before, after = kept.len(), ?record_filter, "Applied record filter");
        kept
    };
    debug!(areas = ?filter::areas(&records), "Areas present in output");

    if records.is_empty() {
        warn!("No records to save");
    }

    // ---- Output ----
    if let Err(e) = json::write_records(&records, &summary, &args.output_dir).await {
        error!(error = %e, "Failed to write JSON");
    }
    if let Err(e) = csv::write_records(&records, &args.output_dir).await {
        error!(error = %e, "Failed to write CSV");
    }
    if let Err(e) = markdown::write_records(&records, &summary, &args.output_dir).await {
        error!(error = %e, "Failed writing Markdown");
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        discovered = summary.discovered,
        extracted = summary.extracted,
        geocoded = summary.geocoded,
        written = records.len(),
        "Execution complete"
    );

    Ok(())
}
