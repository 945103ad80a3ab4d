//! CSV output: one row per listing, absent fields as empty cells.

use super::{output_path, CSV_FILENAME};
use crate::error::ScrapeError;
use crate::models::{ContactRecord, RecordRow};
use tracing::{info, instrument};

/// Render records as CSV.
///
/// # Arguments
///
/// * `records` - Records in output order
///
/// # Returns
///
/// The CSV text. The header row is always present, even with no records.
pub fn records_to_csv(records: &[ContactRecord]) -> Result<String, ScrapeError> {
    let mut writer = ::csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(RecordRow::COLUMNS)?;
    for record in records {
        writer.serialize(RecordRow::from(record))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| ScrapeError::Io(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| ScrapeError::Config(format!("CSV is not UTF-8: {e}")))
}

/// Write `{output_dir}/coworkings.csv`, returning the path written.
#[instrument(level = "info", skip_all, fields(%output_dir))]
pub async fn write_records(records: &[ContactRecord], output_dir: &str) -> Result<String, ScrapeError> {
    let csv = records_to_csv(records)?;
    let path = output_path(output_dir, CSV_FILENAME);
    tokio::fs::write(&path, csv).await?;
    info!(path = %path, count = records.len(), "Wrote CSV records");
    Ok(path)
}
