//! Self-contained HTML report with tables and two bar charts.
//!
//! The page is rendered from `templates/report.html`; styles, data and the
//! chart script are inlined so the file can be mailed as an attachment and
//! opened offline.

use askama::Template;
use audit_core::error::{AuditError, Result};
use audit_core::formatting::{format_currency, format_number};
use audit_core::models::{AnalysisReport, BucketStat, SimpleStat};
use serde::Serialize;
use tracing::info;

use crate::console::join_pairs;
use crate::{format_event, OutputContext};

/// Queues shown in the queue table and chart.
const TOP_QUEUES: usize = 10;

#[derive(Serialize)]
struct Series {
    labels: Vec<String>,
    pages: Vec<u64>,
}

/// Data embedded for the chart script.
#[derive(Serialize)]
struct ChartData {
    queues: Series,
    hourly: Series,
}

/// One `<h2>` block: optional chart canvas, then a table or `(no data)`.
struct Section {
    title: &'static str,
    /// Canvas id, empty for none.
    chart: &'static str,
    headers: &'static [&'static str],
    rows: Vec<Vec<String>>,
}

#[derive(Template)]
#[template(path = "report.html")]
struct ReportPage {
    requests: String,
    pages: String,
    first_event: String,
    last_event: String,
    sections: Vec<Section>,
    /// Serialized [`ChartData`], already safe to embed in a script block.
    chart_json: String,
}

pub fn render(report: &AnalysisReport, ctx: &mut OutputContext) -> Result<()> {
    let config = ctx.config;
    let path = &config.html_path;
    let page = render_page(
        report,
        config.cli_max_rows,
        &config.costs.currency_symbol,
        &config.costs.currency_code,
    )?;

    let export_err = |e: std::io::Error| AuditError::Export {
        path: path.clone(),
        message: e.to_string(),
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(export_err)?;
    }
    std::fs::write(path, page).map_err(export_err)?;

    info!("Wrote HTML report to {}", path.display());
    ctx.attachments.push(path.clone());
    Ok(())
}

/// Build the full document.
pub fn render_page(
    report: &AnalysisReport,
    max_rows: usize,
    currency_symbol: &str,
    currency_code: &str,
) -> Result<String> {
    let chart_json = serde_json::to_string(&chart_data(report))
        .map_err(|e| AuditError::Other(e.into()))?
        .replace("</", "<\\/");

    let totals = &report.totals;
    let page = ReportPage {
        requests: format_number(totals.requests as f64, 0),
        pages: format_number(totals.pages as f64, 0),
        first_event: format_event(totals.first_event),
        last_event: format_event(totals.last_event),
        sections: sections(report, max_rows, currency_symbol, currency_code),
        chart_json,
    };
    page.render().map_err(|e| AuditError::Other(e.into()))
}

fn sections(
    report: &AnalysisReport,
    max_rows: usize,
    currency_symbol: &str,
    currency_code: &str,
) -> Vec<Section> {
    vec![
        Section {
            title: "Queues",
            chart: "queueChart",
            headers: &["Queue", "%Req", "%Pages", "Req", "Pages"],
            rows: report
                .queue_stats
                .iter()
                .take(TOP_QUEUES)
                .map(|s| {
                    vec![
                        s.queue.clone(),
                        format!("{:.2}%", s.requests_pct),
                        format!("{:.2}%", s.pages_pct),
                        s.requests.to_string(),
                        s.pages.to_string(),
                    ]
                })
                .collect(),
        },
        Section {
            title: "Users",
            chart: "",
            headers: &["User", "Req", "Pages", "Pages/Req"],
            rows: report
                .user_stats
                .iter()
                .take(max_rows)
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
        Section {
            title: "Hourly usage",
            chart: "hourlyChart",
            headers: &["Hour", "Requests", "Pages"],
            rows: report
                .hourly
                .iter()
                .map(|p| vec![p.key.clone(), p.requests.to_string(), p.pages.to_string()])
                .collect(),
        },
        Section {
            title: "Job sizes",
            chart: "",
            headers: &["Bucket", "%Req", "Requests"],
            rows: bucket_rows(&report.job_buckets),
        },
        Section {
            title: "Copies",
            chart: "",
            headers: &["Bucket", "%Req", "Requests"],
            rows: bucket_rows(&report.copy_buckets),
        },
        Section {
            title: "Cost",
            chart: "",
            headers: &["Label", "Pages", "Cost", "Top Users", "Top Queues"],
            rows: report
                .cost_stats
                .iter()
                .map(|s| {
                    vec![
                        s.label.clone(),
                        s.pages.to_string(),
                        format_currency(s.amount, currency_symbol, currency_code),
                        join_pairs(&s.per_user, ", "),
                        join_pairs(&s.per_queue, ", "),
                    ]
                })
                .collect(),
        },
        Section {
            title: "Media",
            chart: "",
            headers: &["Media", "Pages"],
            rows: simple_rows(&report.media_stats, usize::MAX),
        },
        Section {
            title: "Clients",
            chart: "",
            headers: &["Client", "Pages"],
            rows: simple_rows(&report.client_stats, max_rows),
        },
        Section {
            title: "Document types",
            chart: "",
            headers: &["Extension", "Pages"],
            rows: simple_rows(&report.document_types, usize::MAX),
        },
        Section {
            title: "Duplex",
            chart: "",
            headers: &["Mode", "Pages"],
            rows: simple_rows(&report.duplex_stats, usize::MAX),
        },
    ]
}

fn chart_data(report: &AnalysisReport) -> ChartData {
    let queues = report.queue_stats.iter().take(TOP_QUEUES);
    ChartData {
        queues: Series {
            labels: queues.clone().map(|s| s.queue.clone()).collect(),
            pages: queues.map(|s| s.pages).collect(),
        },
        hourly: Series {
            labels: report.hourly.iter().map(|p| p.key.clone()).collect(),
            pages: report.hourly.iter().map(|p| p.pages).collect(),
        },
    }
}

fn bucket_rows(buckets: &[BucketStat]) -> Vec<Vec<String>> {
    buckets
        .iter()
        .map(|b| {
            vec![
                b.label.clone(),
                format!("{:.2}%", b.pct_requests),
                b.request_count.to_string(),
            ]
        })
        .collect()
}

fn simple_rows(stats: &[SimpleStat], limit: usize) -> Vec<Vec<String>> {
    stats
        .iter()
        .take(limit)
        .map(|s| vec![s.label.clone(), s.pages.to_string()])
        .collect()
}

// ── Tests ──────────────────────────────────────────────────────────────────────
