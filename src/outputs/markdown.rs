//! Markdown output: a summary line and a table of records.

use super::{output_path, MARKDOWN_FILENAME};
use crate::error::ScrapeError;
use crate::models::{ContactRecord, RecordRow, RunSummary};
use std::fmt::Write;
use tokio::fs;
use tracing::{info, instrument};

fn cell(value: Option<&str>) -> String {
    value
        .unwrap_or_default()
        .replace('|', "\\|")
        .replace('\n', " ")
}

fn coordinate_cell(row: &RecordRow<'_>) -> String {
    match (row.latitude, row.longitude) {
        (Some(lat), Some(lon)) => format!("{lat:.5}, {lon:.5}"),
        _ => String::new(),
    }
}

/// Render records as a Markdown document.
pub fn records_to_markdown(records: &[ContactRecord], summary: &RunSummary) -> String {
    let mut md = String::new();
    writeln!(md, "# Coworkings\n").unwrap();
    writeln!(
        md,
        "{} listings discovered, {} contact cards extracted, {} geocoded.\n",
        summary.discovered, summary.extracted, summary.geocoded
    )
    .unwrap();

    if records.is_empty() {
        writeln!(md, "_No records._").unwrap();
        return md;
    }

    writeln!(md, "| Coworking | Company | Address | Phone | Email | Website | Coordinates |").unwrap();
    writeln!(md, "|---|---|---|---|---|---|---|").unwrap();
    for record in records {
        let row = RecordRow::from(record);
        writeln!(
            md,
            "| [{}]({}) | {} | {} | {} | {} | {} | {} |",
            cell(Some(row.listing_name)),
            row.listing_url,
            cell(Some(row.company_name)),
            cell(row.address),
            cell(row.phone),
            cell(row.email),
            cell(row.website),
            coordinate_cell(&row)
        )
        .unwrap();
    }
    md
}

/// Write `{output_dir}/coworkings.md`, returning the path written.
#[instrument(level = "info", skip_all, fields(%output_dir))]
pub async fn write_records(
    records: &[ContactRecord],
    summary: &RunSummary,
    output_dir: &str,
) -> Result<String, ScrapeError> {
    let path = output_path(output_dir, MARKDOWN_FILENAME);
    fs::write(&path, records_to_markdown(records, summary)).await?;
    info!(path = %path, count = records.len(), "Wrote Markdown table");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GeoCoordinate;

    #[test]
    fn test_table_rows() {
        let mut record = ContactRecord::new("Acme | Space", "https://example.com/acme/", "Acme");
        record.phone = Some("01 23 45 67 89".to_string());
        record.coordinates = Some(GeoCoordinate::new(48.86, 2.35).unwrap());
        let summary = RunSummary {
            discovered: 3,
            extracted: 1,
            geocoded: 1,
            ..RunSummary::default()
        };

        let md = records_to_markdown(&[record], &summary);
        assert!(md.contains("3 listings discovered, 1 contact cards extracted, 1 geocoded."));
        assert!(md.contains(
            "| [Acme \\| Space](https://example.com/acme/) | Acme |  | 01 23 45 67 89 |  |  | 48.86000, 2.35000 |"
        ));
    }

    #[test]
    fn test_empty_table() {
        let md = records_to_markdown(&[], &RunSummary::default());
        assert!(md.contains("_No records._"));
        assert!(!md.contains("| Coworking |"));
    }
}
