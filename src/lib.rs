//! # Coworking Scraper
//!
//! Scrapes a directory of coworking spaces, extracts each listing's contact
//! card and geocodes its address through Nominatim.
//!
//! ## Architecture
//!
//! 1. **Discovery**: find the listing links under one section of the
//!    directory page ([`scrapers::directory`])
//! 2. **Extraction**: pull company, address, phone, email and website out of
//!    each listing page ([`scrapers::listing`])
//! 3. **Geocoding**: resolve addresses to coordinates with bounded retry
//!    ([`geocode`]), paced by a shared [`rate::RateGate`]
//! 4. **Output**: JSON, CSV and Markdown tables ([`outputs`])
//!
//! [`pipeline::Pipeline`] ties the first three together. A failing listing
//! is dropped or left without coordinates; it never stops the run.

pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;
pub mod filter;
pub mod geocode;
pub mod models;
pub mod outputs;
pub mod pipeline;
pub mod rate;
pub mod scrapers;
pub mod utils;

pub use error::ScrapeError;
pub use models::{ContactRecord, CoworkingLink, GeoCoordinate, PipelineReport, RunSummary};
pub use pipeline::Pipeline;
