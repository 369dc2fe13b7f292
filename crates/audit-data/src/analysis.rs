//! Main analysis pipeline for PrintAudit.
//!
//! Reads a page log to completion, applies the optional date filter, feeds the
//! [`UsageAggregator`] and returns the derived report with run metadata.

use std::io::BufRead;
use std::path::Path;
use std::time::Instant;

use audit_core::error::Result;
use audit_core::models::{AnalysisReport, PageLogEntry};
use chrono::{NaiveDate, Utc};
use tracing::{debug, info};

use crate::aggregator::{AggregatorSettings, UsageAggregator};
use crate::reader::{open_page_log, PageLogReader};

// ── Public types ──────────────────────────────────────────────────────────────

/// Inclusive calendar-date filter; an absent bound is open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    /// Whether the entry's date, as logged, lies within both bounds.
    pub fn contains(&self, entry: &PageLogEntry) -> bool {
        let date = entry.local_date();
        self.start.map_or(true, |start| date >= start) && self.end.map_or(true, |end| date <= end)
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

/// Metadata produced alongside the analysis report.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AnalysisMetadata {
    /// ISO-8601 timestamp when this result was generated.
    pub generated_at: String,
    /// Physical lines read from the log, including blank ones.
    pub lines_read: u64,
    /// Lines rejected by the parser.
    pub lines_skipped: u64,
    /// Entries passed to the aggregator.
    pub entries_ingested: u64,
    /// Parsed entries dropped by the date filter.
    pub entries_filtered: u64,
    /// Wall-clock seconds spent reading and aggregating.
    pub elapsed_seconds: f64,
}

/// The complete output of [`analyze_page_log`].
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub report: AnalysisReport,
    pub metadata: AnalysisMetadata,
}

// ── Public functions ──────────────────────────────────────────────────────────

/// Run the full pipeline over the log at `path`.
///
/// Only opening the file can fail; malformed lines are skipped by the reader.
pub fn analyze_page_log(
    path: &Path,
    settings: AggregatorSettings,
    range: DateRange,
) -> Result<AnalysisOutcome> {
    let reader = open_page_log(path)?;
    info!("Analyzing {}", path.display());
    Ok(analyze_entries(reader, settings, range))
}

/// Same as [`analyze_page_log`] over an already opened reader.
pub fn analyze_entries<R: BufRead>(
    mut reader: PageLogReader<R>,
    settings: AggregatorSettings,
    range: DateRange,
) -> AnalysisOutcome {
    let started = Instant::now();
    let mut aggregator = UsageAggregator::new(settings);
    let mut ingested = 0u64;
    let mut filtered = 0u64;

    for entry in reader.by_ref() {
        if !range.contains(&entry) {
            filtered += 1;
            continue;
        }
        aggregator.ingest(&entry);
        ingested += 1;
    }

    let report = aggregator.build_report();
    let elapsed = started.elapsed().as_secs_f64();

    debug!(
        "Ingested {} entries ({} filtered by date, {} lines skipped) in {:.3}s",
        ingested,
        filtered,
        reader.lines_skipped(),
        elapsed
    );

    AnalysisOutcome {
        report,
        metadata: AnalysisMetadata {
            generated_at: Utc::now().to_rfc3339(),
            lines_read: reader.lines_read(),
            lines_skipped: reader.lines_skipped(),
            entries_ingested: ingested,
            entries_filtered: filtered,
            elapsed_seconds: elapsed,
        },
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
