//! Output generation for the scraped record table.
//!
//! Every exporter consumes the pipeline's records read-only, through the
//! flat [`crate::models::RecordRow`] view.
//!
//! # Submodules
//!
//! - [`json`]: records plus run summary, for programmatic consumers
//! - [`csv`]: the flat table, one row per listing
//! - [`markdown`]: a readable table
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── coworkings.json
//! ├── coworkings.csv
//! ├── coworkings.md
//! └── links.json        # only with --links-only
//! ```

pub mod csv;
pub mod json;
pub mod markdown;

pub const JSON_FILENAME: &str = "coworkings.json";
pub const CSV_FILENAME: &str = "coworkings.csv";
pub const MARKDOWN_FILENAME: &str = "coworkings.md";
pub const LINKS_FILENAME: &str = "links.json";

/// `{dir}/{filename}` without doubling the separator.
pub fn output_path(dir: &str, filename: &str) -> String {
    format!("{}/{}", dir.trim_end_matches('/'), filename)
}
