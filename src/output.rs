use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use csv::Writer;
use flate2::Compression;
use flate2::write::GzEncoder;
use salesview::payload::Period;
use salesview::{DashboardViews, NamedView};
use serde::Serialize;
use tokio::fs;

#[derive(Serialize)]
struct ExportDocument<'a> {
    generated_at: String,
    period: Period,
    label: Option<&'a str>,
    degraded_records: usize,
    rate_divergences: usize,
    views: &'a [NamedView],
}

#[derive(Serialize)]
struct TableCell<'a> {
    widget: &'a str,
    row: usize,
    label: &'a str,
    column: &'a str,
    value: &'a str,
}

pub async fn save_views_json(
    path: &Path,
    views: &DashboardViews,
    generated_at: &DateTime<Local>,
    archive: bool,
) -> Result<PathBuf> {
    let serialized = serialize_views(views, generated_at)?;
    save_output(path, serialized, archive).await
}

pub async fn save_tables_csv(path: &Path, views: &DashboardViews, archive: bool) -> Result<PathBuf> {
    let serialized = serialize_tables(views)?;
    save_output(path, serialized, archive).await
}

fn serialize_views(views: &DashboardViews, generated_at: &DateTime<Local>) -> Result<Vec<u8>> {
    let document = ExportDocument {
        generated_at: generated_at.to_rfc3339(),
        period: views.period,
        label: views.label.as_deref(),
        degraded_records: views.degraded_records,
        rate_divergences: views.rate_divergences,
        views: &views.views,
    };
    serde_json::to_vec_pretty(&document).context("failed to serialize view models")
}

/// One CSV line per formatted table cell: widget, row, label, column, value.
fn serialize_tables(views: &DashboardViews) -> Result<Vec<u8>> {
    let mut writer = Writer::from_writer(Vec::new());
    for named in views.tables() {
        let widget = named.widget.key();
        let view = &named.view;
        for (row_idx, cells) in view.rows.iter().enumerate() {
            let Some((label, values)) = cells.split_first() else {
                continue;
            };
            for (column, value) in view.series_names.iter().zip(values) {
                writer
                    .serialize(TableCell {
                        widget,
                        row: row_idx + 1,
                        label,
                        column,
                        value,
                    })
                    .with_context(|| format!("failed to serialize {widget} table cell"))?;
            }
        }
    }
    finalize_writer(writer, "table CSV writer")
}

fn finalize_writer(mut writer: Writer<Vec<u8>>, label: &str) -> Result<Vec<u8>> {
    writer
        .flush()
        .with_context(|| format!("failed to flush {label}"))?;
    writer
        .into_inner()
        .with_context(|| format!("failed to finalize {label}"))
}

fn gzip(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(bytes)
        .context("failed to compress output")?;
    encoder.finish().context("failed to finish gzip stream")
}

pub fn archive_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".gz");
    PathBuf::from(name)
}

/// Writes `bytes` (gzipped when `archive` is set) and returns the final path.
async fn save_output(path: &Path, bytes: Vec<u8>, archive: bool) -> Result<PathBuf> {
    if archive {
        let target = archive_path(path);
        write_output_file(&target, &gzip(&bytes)?).await?;
        Ok(target)
    } else {
        write_output_file(path, &bytes).await?;
        Ok(path.to_path_buf())
    }
}

pub async fn write_output_file(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }

    fs::write(path, bytes)
        .await
        .with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use salesview::{AssembleOptions, compile_dashboard, payload::DashboardPayload};
    use serde_json::json;
    use std::io::Read;

    fn sample_views() -> DashboardViews {
        let payload = DashboardPayload::from_value(json!({
            "label": "2024-W12",
            "platform_sales_distribution": {"Amazon": 600, "eBay": 400},
        }));
        compile_dashboard(&payload, &AssembleOptions::default())
    }

    #[test]
    fn test_tables_csv_is_long_format() {
        let csv = String::from_utf8(serialize_tables(&sample_views()).unwrap()).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("widget,row,label,column,value"));
        let body: Vec<&str> = lines.collect();
        assert!(body.contains(&"platform_sales_distribution,1,Amazon,Sales,$600.00"));
        assert!(body.contains(&"platform_sales_distribution,2,eBay,Share,40.0%"));
    }

    #[test]
    fn test_views_json_carries_metadata() {
        let generated_at = Local::now();
        let bytes = serialize_views(&sample_views(), &generated_at).unwrap();
        let document: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(document["label"], "2024-W12");
        assert_eq!(document["period"], "weekly");
        assert_eq!(document["generated_at"], generated_at.to_rfc3339());
        assert!(document["views"].as_array().is_some_and(|views| !views.is_empty()));
    }

    #[test]
    fn test_gzip_round_trips_and_renames() {
        let compressed = gzip(b"widget,row").unwrap();
        let mut decoded = String::new();
        GzDecoder::new(compressed.as_slice())
            .read_to_string(&mut decoded)
            .unwrap();
        assert_eq!(decoded, "widget,row");
        assert_eq!(
            archive_path(Path::new("data/output/views.json")),
            PathBuf::from("data/output/views.json.gz")
        );
    }
}
