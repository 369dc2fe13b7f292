//! Console report: `plain` rows or `rich` aligned tables.

use std::io::{self, Write};

use audit_core::config::CliMode;
use audit_core::error::Result;
use audit_core::formatting::format_currency;
use audit_core::models::{AnalysisReport, BucketStat, SimpleStat, TemporalPoint};
use crossterm::style::Stylize;
use unicode_width::UnicodeWidthStr;

use crate::{format_event, OutputContext};

/// Queue-user lines shown under the queue table.
const QUEUE_USER_LINES: usize = 10;

/// Hourly points shown in plain mode.
const PLAIN_TEMPORAL_LINES: usize = 24;

const RULE_WIDTH: usize = 72;

pub fn render(report: &AnalysisReport, ctx: &mut OutputContext) -> Result<()> {
    let config = ctx.config;
    let mut console = Console {
        rich: config.cli_mode == CliMode::Rich,
        color: ctx.color,
        max_rows: config.cli_max_rows,
        out: &mut *ctx.out,
    };

    console.summary(report)?;
    if config.section_enabled("queue") || config.section_enabled("queue_user") {
        console.queue_section(
            report,
            config.section_enabled("queue"),
            config.section_enabled("queue_user"),
        )?;
    }
    if config.section_enabled("user") {
        console.user_section(report)?;
    }
    if config.section_enabled("temporal") {
        console.temporal_section(report)?;
    }
    if config.section_enabled("job") {
        console.job_section(report)?;
    }
    if config.section_enabled("cost") {
        console.cost_section(report, &config.costs.currency_symbol, &config.costs.currency_code)?;
    }
    if config.section_enabled("media") {
        console.media_section(report)?;
    }
    console.out.flush()?;
    Ok(())
}

struct Console<'w> {
    rich: bool,
    color: bool,
    max_rows: usize,
    out: &'w mut dyn Write,
}

impl Console<'_> {
    fn heading(&mut self, title: &str) -> io::Result<()> {
        if self.rich && self.color {
            writeln!(self.out, "{}", title.bold())
        } else {
            writeln!(self.out, "{}", title)
        }
    }

    fn summary(&mut self, report: &AnalysisReport) -> io::Result<()> {
        let totals = &report.totals;
        let first = format_event(totals.first_event);
        let last = format_event(totals.last_event);

        if !self.rich {
            writeln!(self.out, "EXECUTIVE SUMMARY")?;
            writeln!(
                self.out,
                "Requests: {} | Pages: {} | Window: {} -> {}",
                totals.requests, totals.pages, first, last
            )?;
            return writeln!(self.out);
        }

        let rule = "=".repeat(RULE_WIDTH);
        writeln!(self.out, "{}", rule)?;
        self.heading(&format!("PrintAudit Summary ({} -> {})", first, last))?;
        writeln!(
            self.out,
            "Total Requests: {:>6} | Total Pages: {:>6}",
            totals.requests, totals.pages
        )?;
        writeln!(self.out, "{}", rule)
    }

    fn queue_section(
        &mut self,
        report: &AnalysisReport,
        show_queues: bool,
        show_queue_users: bool,
    ) -> io::Result<()> {
        self.heading("QUEUE ANALYSIS")?;
        if show_queues {
            let rows = report
                .queue_stats
                .iter()
                .map(|s| {
                    vec![
                        s.queue.clone(),
                        format!("{:5.1}%", s.requests_pct),
                        format!("{:5.1}%", s.pages_pct),
                        s.requests.to_string(),
                        s.pages.to_string(),
                    ]
                })
                .collect();
            self.table(&["Queue", "%Req", "%Pages", "Req", "Pages"], rows, None)?;
        }
        if show_queue_users && !report.queue_user_stats.is_empty() {
            writeln!(self.out, "Queue-User breakdown:")?;
            for item in report.queue_user_stats.iter().take(QUEUE_USER_LINES) {
                writeln!(
                    self.out,
                    "  {} {} {:>6} pages",
                    pad(&item.queue, 20),
                    pad(&item.user, 20),
                    item.pages
                )?;
            }
        }
        writeln!(self.out)
    }

    fn user_section(&mut self, report: &AnalysisReport) -> io::Result<()> {
        self.heading("USER ANALYSIS")?;
        let rows = report
            .user_stats
            .iter()
            .map(|s| {
                vec![
                    s.user.clone(),
                    s.requests.to_string(),
                    s.pages.to_string(),
                    format!("{:5.2}", s.pages_per_request),
                ]
            })
            .collect();
        let limit = Some(self.max_rows);
        self.table(&["User", "Req", "Pages", "Pages/Req"], rows, limit)?;
        writeln!(self.out)
    }

    fn temporal_section(&mut self, report: &AnalysisReport) -> io::Result<()> {
        self.heading("TEMPORAL ANALYSIS")?;
        writeln!(self.out, "Hour usage:")?;
        self.temporal(&report.hourly)?;
        writeln!(self.out, "Daily usage:")?;
        self.temporal(&report.daily)?;
        writeln!(self.out)
    }

    fn temporal(&mut self, points: &[TemporalPoint]) -> io::Result<()> {
        if points.is_empty() {
            return writeln!(self.out, "  (no data)");
        }
        if !self.rich {
            for point in points.iter().take(PLAIN_TEMPORAL_LINES) {
                let marker = if point.within_hours == Some(false) { " !" } else { "" };
                writeln!(
                    self.out,
                    "  {}: {} req / {} pages{}",
                    point.key, point.requests, point.pages, marker
                )?;
            }
            return Ok(());
        }
        let rows = points
            .iter()
            .map(|p| {
                let flag = match p.within_hours {
                    None => "",
                    Some(true) => "in-hours",
                    Some(false) => "off-hours",
                };
                vec![
                    p.key.clone(),
                    p.requests.to_string(),
                    p.pages.to_string(),
                    flag.to_string(),
                ]
            })
            .collect();
        self.table(&["Key", "Requests", "Pages", "Flag"], rows, None)
    }

    fn job_section(&mut self, report: &AnalysisReport) -> io::Result<()> {
        self.heading("JOB ANALYSIS")?;
        self.table(&["Job Size", "%Req", "Requests"], bucket_rows(&report.job_buckets), None)?;
        writeln!(self.out, "Copies:")?;
        self.table(&["Copies", "%Req", "Requests"], bucket_rows(&report.copy_buckets), None)?;
        writeln!(self.out)
    }

    fn cost_section(&mut self, report: &AnalysisReport, symbol: &str, code: &str) -> io::Result<()> {
        self.heading("COST ANALYSIS")?;
        let rows = report
            .cost_stats
            .iter()
            .map(|s| {
                vec![
                    s.label.clone(),
                    s.pages.to_string(),
                    format_currency(s.amount, symbol, code),
                    join_pairs(&s.per_user, ", "),
                ]
            })
            .collect();
        self.table(&["Label", "Pages", "Cost", "Top Users"], rows, None)?;
        writeln!(self.out)
    }

    fn media_section(&mut self, report: &AnalysisReport) -> io::Result<()> {
        self.heading("MEDIA & CLIENT ANALYSIS")?;
        self.table(&["Media", "Pages"], simple_rows(&report.media_stats), None)?;
        writeln!(self.out, "Top clients:")?;
        let limit = Some(self.max_rows);
        self.table(&["Client", "Pages"], simple_rows(&report.client_stats), limit)?;
        writeln!(self.out, "Document types:")?;
        self.table(&["Extension", "Pages"], simple_rows(&report.document_types), None)?;
        writeln!(self.out, "Duplex:")?;
        self.table(&["Mode", "Pages"], simple_rows(&report.duplex_stats), None)?;
        writeln!(self.out)
    }

    /// Print `rows` under `headers`, truncated to `limit` rows with a
    /// `... (N rows)` note.
    fn table(&mut self, headers: &[&str], rows: Vec<Vec<String>>, limit: Option<usize>) -> io::Result<()> {
        if rows.is_empty() {
            return writeln!(self.out, "  (no data)");
        }
        let shown = limit.map_or(rows.len(), |l| l.min(rows.len()));
        let display = &rows[..shown];

        if self.rich {
            let mut widths: Vec<usize> = headers.iter().map(|h| h.width()).collect();
            for row in display {
                for (idx, cell) in row.iter().enumerate() {
                    widths[idx] = widths[idx].max(cell.width());
                }
            }
            let header_cells: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
            writeln!(self.out, "  {}", aligned(&header_cells, &widths))?;
            let bar: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
            writeln!(self.out, "  {}", bar.join("-+-"))?;
            for row in display {
                writeln!(self.out, "  {}", aligned(row, &widths))?;
            }
        } else {
            for row in display {
                writeln!(self.out, "  {}", row.join(" | "))?;
            }
        }

        if shown < rows.len() {
            writeln!(self.out, "  ... ({} rows)", rows.len())?;
        }
        Ok(())
    }
}

fn aligned(cells: &[String], widths: &[usize]) -> String {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| pad(cell, *width))
        .collect();
    padded.join(" | ").trim_end().to_string()
}

/// Left-align `text` to `width` display columns.
fn pad(text: &str, width: usize) -> String {
    let fill = width.saturating_sub(text.width());
    format!("{}{}", text, " ".repeat(fill))
}

fn bucket_rows(buckets: &[BucketStat]) -> Vec<Vec<String>> {
    buckets
        .iter()
        .map(|b| {
            vec![
                b.label.clone(),
                format!("{:5.1}%", b.pct_requests),
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

/// `name:count` pairs joined by `sep`.
pub(crate) fn join_pairs(pairs: &[(String, u64)], sep: &str) -> String {
    pairs
        .iter()
        .map(|(name, count)| format!("{}:{}", name, count))
        .collect::<Vec<_>>()
        .join(sep)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
