//! Output layer for PrintAudit.
//!
//! Every [`OutputKind`] renders the same [`AnalysisReport`]: the console
//! renderer writes to the context's writer, the file renderers record what
//! they generated in [`OutputContext::attachments`], and email always runs
//! last so it can attach those files.

pub mod console;
pub mod csv_export;
pub mod email;
pub mod html;

use std::io::Write;
use std::path::PathBuf;

use audit_core::config::{AuditConfig, OutputKind};
use audit_core::error::{AuditError, Result};
use audit_core::models::AnalysisReport;
use chrono::{DateTime, FixedOffset};
use tracing::{debug, error};

pub use audit_core as core;

/// Shared state handed to each output module in turn.
pub struct OutputContext<'a> {
    pub config: &'a AuditConfig,
    /// Files generated so far, in generation order.
    pub attachments: Vec<PathBuf>,
    /// Destination of console output.
    pub out: &'a mut dyn Write,
    /// Emit ANSI styling in rich console mode.
    pub color: bool,
}

impl<'a> OutputContext<'a> {
    pub fn new(config: &'a AuditConfig, out: &'a mut dyn Write) -> Self {
        Self {
            config,
            attachments: Vec::new(),
            out,
            color: false,
        }
    }

    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }
}

/// Keep the configured order but run email once, at the end.
pub fn ordered_outputs(kinds: &[OutputKind]) -> Vec<OutputKind> {
    let mut ordered: Vec<OutputKind> = kinds
        .iter()
        .copied()
        .filter(|kind| *kind != OutputKind::Email)
        .collect();
    if kinds.contains(&OutputKind::Email) {
        ordered.push(OutputKind::Email);
    }
    ordered
}

/// Render one module.
pub fn render_output(kind: OutputKind, report: &AnalysisReport, ctx: &mut OutputContext) -> Result<()> {
    match kind {
        OutputKind::Cli => console::render(report, ctx),
        OutputKind::Csv => csv_export::render(report, ctx),
        OutputKind::Html => html::render(report, ctx),
        OutputKind::Email => email::render(report, ctx),
    }
}

/// Render every module in [`ordered_outputs`] order.
///
/// A failing module is logged and does not prevent later modules from
/// running; the failures are returned.
pub fn render_outputs(
    kinds: &[OutputKind],
    report: &AnalysisReport,
    ctx: &mut OutputContext,
) -> Vec<(OutputKind, AuditError)> {
    let mut failures = Vec::new();
    for kind in ordered_outputs(kinds) {
        debug!("Rendering {} output", kind);
        if let Err(e) = render_output(kind, report, ctx) {
            error!("Output module '{}' failed: {}", kind, e);
            failures.push((kind, e));
        }
    }
    failures
}

/// RFC 3339 timestamp, or `-` when absent.
pub fn format_event(value: Option<DateTime<FixedOffset>>) -> String {
    value.map_or_else(|| "-".to_string(), |ts| ts.to_rfc3339())
}

// ── Tests ──────────────────────────────────────────────────────────────────────
