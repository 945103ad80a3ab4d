//! JSON output.
//!
//! The export document carries a UTC timestamp, the run summary and the
//! records. Absent fields are written as `null`.
//!
//! ```json
//! {
//!   "generated_at": "2025-05-06T20:30:00Z",
//!   "summary": { "discovered": 42, "extracted": 40, "geocoded": 37, ... },
//!   "records": [ { "listing_name": "Acme Space", "phone": null, ... } ]
//! }
//! ```

use super::{output_path, JSON_FILENAME, LINKS_FILENAME};
use crate::error::ScrapeError;
use crate::models::{ContactRecord, CoworkingLink, RecordRow, RunSummary};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tokio::fs;
use tracing::{info, instrument};

#[derive(Debug, Serialize)]
struct ExportDocument<'a> {
    generated_at: String,
    summary: &'a RunSummary,
    records: Vec<RecordRow<'a>>,
}

#[derive(Debug, Serialize)]
struct LinksDocument<'a> {
    generated_at: String,
    count: usize,
    links: &'a [CoworkingLink],
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Serialize records and summary to a pretty-printed JSON string.
pub fn records_to_json(
    records: &[ContactRecord],
    summary: &RunSummary,
) -> Result<String, ScrapeError> {
    let document = ExportDocument {
        generated_at: now(),
        summary,
        records: records.iter().map(RecordRow::from).collect(),
    };
    Ok(serde_json::to_string_pretty(&document)?)
}

/// Write `{output_dir}/coworkings.json`, returning the path written.
#[instrument(level = "info", skip_all, fields(%output_dir))]
pub async fn write_records(
    records: &[ContactRecord],
    summary: &RunSummary,
    output_dir: &str,
) -> Result<String, ScrapeError> {
    let json = records_to_json(records, summary)?;
    let path = output_path(output_dir, JSON_FILENAME);
    fs::write(&path, json).await?;
    info!(path = %path, count = records.len(), "Wrote JSON records");
    Ok(path)
}

/// Write `{output_dir}/links.json`, returning the path written.
#[instrument(level = "info", skip_all, fields(%output_dir))]
pub async fn write_links(links: &[CoworkingLink], output_dir: &str) -> Result<String, ScrapeError> {
    let document = LinksDocument {
        generated_at: now(),
        count: links.len(),
        links,
    };
    let path = output_path(output_dir, LINKS_FILENAME);
    fs::write(&path, serde_json::to_string_pretty(&document)?).await?;
    info!(path = %path, count = links.len(), "Wrote discovered links");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GeoCoordinate;

    fn records() -> Vec<ContactRecord> {
        let mut a = ContactRecord::new("Acme Space", "https://example.com/acme/", "Acme");
        a.address = Some("10 Rue de Paris, 75001 Paris".to_string());
        a.coordinates = Some(GeoCoordinate::new(48.86, 2.35).unwrap());
        let b = ContactRecord::new("Beta", "https://example.com/beta/", "Beta");
        vec![a, b]
    }

    #[test]
    fn test_records_to_json() {
        let summary = RunSummary {
            discovered: 2,
            extracted: 2,
            geocoded: 1,
            ..RunSummary::default()
        };
        let json = records_to_json(&records(), &summary).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["summary"]["geocoded"], 1);
        assert_eq!(value["records"][0]["latitude"], 48.86);
        assert_eq!(value["records"][1]["company_name"], "Beta");
        assert!(value["records"][1]["address"].is_null());
        assert!(value["records"][1]["latitude"].is_null());
        assert!(value["generated_at"].as_str().unwrap().ends_with('Z'));
    }

    #[tokio::test]
    async fn test_write_records_and_links() {
        let dir = tempfile::tempdir().unwrap();
        let dir = dir.path().to_str().unwrap().to_string();

        let path = write_records(&records(), &RunSummary::default(), &dir)
            .await
            .unwrap();
        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["records"].as_array().unwrap().len(), 2);

        let links = vec![CoworkingLink {
            name: "Acme Space".to_string(),
            url: "https://example.com/acme/".to_string(),
        }];
        let path = write_links(&links, &dir).await.unwrap();
        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["count"], 1);
        assert_eq!(written["links"][0]["url"], "https://example.com/acme/");
    }
}
