//! Result persistence
//!
//! Target results are written as one CSV or JSON file; company results as
//! one CSV per asset subtype.

use crate::error::BatchError;
use crate::results::{Asset, AssetKind};
use crate::search::CompanyResults;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Row written for a subtype without any record
pub const NO_DATA_MESSAGE: &str = "no data or no permission for this asset type";

const TARGET_COLUMNS: &[&str] = &[
    "ip",
    "domain",
    "port",
    "service",
    "title",
    "status_code",
    "icp_org",
    "location",
    "source",
];

/// Output file format for target results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
}

impl OutputFormat {
    /// Format implied by a file extension, if any
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// JSON document for a target batch
#[derive(Debug, Serialize)]
pub struct TargetReport<'a> {
    pub generated_at: DateTime<Utc>,
    pub total: usize,
    pub cancelled: bool,
    /// Targets for which every backend failed
    pub failed: Vec<&'a str>,
    pub assets: &'a [Asset],
}

impl<'a> TargetReport<'a> {
    pub fn new(assets: &'a [Asset], error: Option<&'a BatchError>, cancelled: bool) -> Self {
        Self {
            generated_at: Utc::now(),
            total: assets.len(),
            cancelled,
            failed: error
                .map(|e| e.failures.iter().map(|f| f.subject.as_str()).collect())
                .unwrap_or_default(),
            assets,
        }
    }
}

fn column(asset: &Asset, name: &str) -> String {
    let text = |v: &Option<String>| v.clone().unwrap_or_default();
    let number = |v: Option<u16>| v.map(|n| n.to_string()).unwrap_or_default();
    match name {
        "ip" => text(&asset.ip),
        "domain" => text(&asset.domain),
        "port" => number(asset.port),
        "service" => text(&asset.service),
        "title" => text(&asset.title),
        "status_code" => number(asset.status_code),
        "icp_org" => text(&asset.icp_org),
        "location" => text(&asset.location),
        "source" => asset.source.clone(),
        "updated_at" => text(&asset.updated_at),
        "registrar" => text(&asset.registrar),
        "register_time" => text(&asset.register_time),
        "expire_time" => text(&asset.expire_time),
        "status" => text(&asset.status),
        "package" => text(&asset.package),
        "version" => text(&asset.version),
        "platform" => text(&asset.platform),
        "size" => text(&asset.size),
        "developer" => text(&asset.developer),
        "category" => text(&asset.category),
        "email" => text(&asset.email),
        "url" => text(&asset.url),
        "language" => text(&asset.language),
        "name" => text(&asset.name),
        "position" => text(&asset.position),
        "department" => text(&asset.department),
        _ => String::new(),
    }
}

fn escape(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

fn push_row<I, S>(csv: &mut String, fields: I)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let row: Vec<String> = fields.into_iter().map(|f| escape(f.as_ref())).collect();
    csv.push_str(&row.join(","));
    csv.push('\n');
}

/// Render assets as CSV with the given columns
pub fn render_csv(assets: &[Asset], columns: &[&str]) -> String {
    let mut csv = columns.join(",");
    csv.push('\n');
    for asset in assets {
        push_row(&mut csv, columns.iter().map(|c| column(asset, c)));
    }
    csv
}

/// CSV of target results
pub fn targets_csv(assets: &[Asset]) -> String {
    render_csv(assets, TARGET_COLUMNS)
}

/// Pretty JSON of target results
pub fn targets_json(report: &TargetReport<'_>) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Write target results to `path`
pub fn write_targets(
    path: &Path,
    format: OutputFormat,
    assets: &[Asset],
    error: Option<&BatchError>,
    cancelled: bool,
) -> Result<()> {
    let content = match format {
        OutputFormat::Csv => targets_csv(assets),
        OutputFormat::Json => targets_json(&TargetReport::new(assets, error, cancelled))?,
    };
    std::fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))?;
    info!("Wrote {} assets to {}", assets.len(), path.display());
    Ok(())
}

/// Report columns of one company subtype
pub fn company_columns(kind: AssetKind) -> &'static [&'static str] {
    match kind {
        AssetKind::Site => &[
            "ip",
            "domain",
            "port",
            "service",
            "title",
            "status_code",
            "location",
            "icp_org",
            "updated_at",
        ],
        AssetKind::Domain => &[
            "domain",
            "registrar",
            "register_time",
            "expire_time",
            "status",
            "icp_org",
            "updated_at",
        ],
        AssetKind::App => &[
            "title",
            "package",
            "version",
            "platform",
            "size",
            "developer",
            "category",
            "updated_at",
        ],
        AssetKind::Email => &["email", "url", "icp_org", "updated_at"],
        AssetKind::Code => &["title", "url", "language", "updated_at"],
        AssetKind::Member => &["name", "position", "department", "icp_org", "updated_at"],
    }
}

/// CSV of one company subtype. Placeholders and empty subtypes are written
/// as a message row so "no permission" and "no data" remain visible.
pub fn company_csv(kind: AssetKind, assets: &[Asset]) -> String {
    let columns = company_columns(kind);
    let mut csv = columns.join(",");
    csv.push('\n');

    if assets.is_empty() {
        push_row(&mut csv, [NO_DATA_MESSAGE]);
        return csv;
    }
    for asset in assets {
        if asset.is_placeholder() {
            let message = asset.service.as_deref().unwrap_or(NO_DATA_MESSAGE);
            push_row(&mut csv, [message]);
        } else {
            push_row(&mut csv, columns.iter().map(|c| column(asset, c)));
        }
    }
    csv
}

/// Write one `<subtype>.csv` per asset subtype into `dir`
pub fn write_company_report(dir: &Path, results: &CompanyResults) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;

    let mut written = Vec::with_capacity(AssetKind::ALL.len());
    for kind in AssetKind::ALL {
        let path = dir.join(format!("{}.csv", kind));
        let assets = results.get(kind);
        std::fs::write(&path, company_csv(kind, assets))
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!("Wrote {} {} records to {}", assets.len(), kind, path.display());
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BatchFailure;

    fn site() -> Asset {
        Asset::new("fofa")
            .with_ip("1.2.3.4")
            .with_port(443)
            .with_title(r#"Say "hi""#)
    }

    #[test]
    fn test_targets_csv() {
        let csv = targets_csv(&[site()]);
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some(TARGET_COLUMNS.join(",").as_str()));
        assert_eq!(
            lines.next(),
            Some(r#""1.2.3.4","","443","","Say ""hi""","","","","fofa""#)
        );
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_targets_json() {
        let assets = vec![site()];
        let error = BatchError::from_failures(
            2,
            vec![BatchFailure {
                subject: "example.com".to_string(),
                reasons: vec!["fofa: boom".to_string()],
            }],
        );
        let report = TargetReport::new(&assets, error.as_ref(), false);
        let json: serde_json::Value = serde_json::from_str(&targets_json(&report).unwrap()).unwrap();

        assert_eq!(json["total"], 1);
        assert_eq!(json["failed"][0], "example.com");
        assert_eq!(json["assets"][0]["port"], 443);
        assert!(json["generated_at"].is_string());
    }

    #[test]
    fn test_company_csv_placeholder_and_empty() {
        let placeholder = Asset::access_restricted("zone", AssetKind::Member, "permission denied");
        let csv = company_csv(AssetKind::Member, &[placeholder]);
        assert!(csv.lines().nth(1).unwrap().contains("no access to member data"));

        let csv = company_csv(AssetKind::Code, &[]);
        assert!(csv.starts_with("title,url,language,updated_at\n"));
        assert!(csv.contains(NO_DATA_MESSAGE));
    }

    #[test]
    fn test_write_company_report() {
        let dir = std::env::temp_dir().join(format!("cscan-report-{}", std::process::id()));
        let mut results = CompanyResults::new();
        results.extend(AssetKind::Site, vec![site()]);

        let written = write_company_report(&dir, &results).unwrap();
        assert_eq!(written.len(), AssetKind::ALL.len());
        let site_csv = std::fs::read_to_string(dir.join("site.csv")).unwrap();
        assert!(site_csv.contains("\"1.2.3.4\""));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(OutputFormat::from_path(Path::new("out.JSON")), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::from_path(Path::new("out.csv")), Some(OutputFormat::Csv));
        assert_eq!(OutputFormat::from_path(Path::new("out")), None);
    }
}
