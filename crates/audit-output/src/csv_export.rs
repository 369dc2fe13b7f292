//! CSV export: one file per report section under `csv_dir`.

use std::path::{Path, PathBuf};

use audit_core::error::{AuditError, Result};
use audit_core::models::{AnalysisReport, BucketStat, SimpleStat, TemporalPoint};
use tracing::info;

use crate::console::join_pairs;
use crate::OutputContext;

/// A named table ready to be written as `<name>.csv`.
struct CsvTable {
    name: &'static str,
    headers: &'static [&'static str],
    rows: Vec<Vec<String>>,
}

pub fn render(report: &AnalysisReport, ctx: &mut OutputContext) -> Result<()> {
    let dir = &ctx.config.csv_dir;
    std::fs::create_dir_all(dir).map_err(|e| AuditError::Export {
        path: dir.clone(),
        message: e.to_string(),
    })?;

    let mut written = Vec::new();
    for table in tables(report) {
        let path = dir.join(format!("{}.csv", table.name));
        write_table(&path, &table)?;
        written.push(path);
    }

    info!("Wrote {} CSV files to {}", written.len(), dir.display());
    ctx.attachments.extend(written);
    Ok(())
}

fn write_table(path: &Path, table: &CsvTable) -> Result<()> {
    let export_err = |e: csv::Error| AuditError::Export {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    let mut writer = csv::Writer::from_path(path).map_err(export_err)?;
    writer.write_record(table.headers).map_err(export_err)?;
    for row in &table.rows {
        writer.write_record(row).map_err(export_err)?;
    }
    writer.flush().map_err(|e| AuditError::Export {
        path: PathBuf::from(path),
        message: e.to_string(),
    })
}

fn tables(report: &AnalysisReport) -> Vec<CsvTable> {
    vec![
        CsvTable {
            name: "queue",
            headers: &["queue", "requests_pct", "pages_pct", "requests", "pages"],
            rows: report
                .queue_stats
                .iter()
                .map(|s| {
                    vec![
                        s.queue.clone(),
                        format!("{:.2}", s.requests_pct),
                        format!("{:.2}", s.pages_pct),
                        s.requests.to_string(),
                        s.pages.to_string(),
                    ]
                })
                .collect(),
        },
        CsvTable {
            name: "queue_user",
            headers: &["queue", "user", "pages"],
            rows: report
                .queue_user_stats
                .iter()
                .map(|s| vec![s.queue.clone(), s.user.clone(), s.pages.to_string()])
                .collect(),
        },
        CsvTable {
            name: "users",
            headers: &["user", "requests", "pages", "pages_per_request"],
            rows: report
                .user_stats
                .iter()
                .map(|s| {
                    vec![
                        s.user.clone(),
                        s.requests.to_string(),
                        s.pages.to_string(),
                        format!("{:.2}", s.pages_per_request),
                    ]
                })
                .collect(),
        },
        CsvTable {
            name: "hourly",
            headers: &["hour", "requests", "pages"],
            rows: temporal_rows(&report.hourly),
        },
        CsvTable {
            name: "daily",
            headers: &["date", "requests", "pages"],
            rows: temporal_rows(&report.daily),
        },
        CsvTable {
            name: "job_buckets",
            headers: &["bucket", "pct_requests", "requests"],
            rows: bucket_rows(&report.job_buckets),
        },
        CsvTable {
            name: "copy_buckets",
            headers: &["bucket", "pct_requests", "requests"],
            rows: bucket_rows(&report.copy_buckets),
        },
        CsvTable {
            name: "cost",
            headers: &["label", "pages", "amount", "top_users", "top_queues"],
            rows: report
                .cost_stats
                .iter()
                .map(|s| {
                    vec![
                        s.label.clone(),
                        s.pages.to_string(),
                        format!("{:.2}", s.amount),
                        join_pairs(&s.per_user, ";"),
                        join_pairs(&s.per_queue, ";"),
                    ]
                })
                .collect(),
        },
        CsvTable {
            name: "clients",
            headers: &["client", "pages"],
            rows: simple_rows(&report.client_stats),
        },
        CsvTable {
            name: "document_types",
            headers: &["extension", "pages"],
            rows: simple_rows(&report.document_types),
        },
        CsvTable {
            name: "media",
            headers: &["media", "pages"],
            rows: simple_rows(&report.media_stats),
        },
        CsvTable {
            name: "duplex",
            headers: &["mode", "pages"],
            rows: simple_rows(&report.duplex_stats),
        },
    ]
}

fn temporal_rows(points: &[TemporalPoint]) -> Vec<Vec<String>> {
    points
        .iter()
        .map(|p| vec![p.key.clone(), p.requests.to_string(), p.pages.to_string()])
        .collect()
}

fn bucket_rows(buckets: &[BucketStat]) -> Vec<Vec<String>> {
    buckets
        .iter()
        .map(|b| {
            vec![
                b.label.clone(),
                format!("{:.2}", b.pct_requests),
                b.request_count.to_string(),
            ]
        })
        .collect()
}

fn simple_rows(stats: &[SimpleStat]) -> Vec<Vec<String>> {
    stats
        .iter()
        .map(|s| vec![s.label.clone(), s.pages.to_string()])
        .collect()
}

// ── Tests ──────────────────────────────────────────────────────────────────────
