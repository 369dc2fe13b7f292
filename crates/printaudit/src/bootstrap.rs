use std::fmt::Write as _;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use anyhow::Context;
use audit_core::config::{AuditConfig, OutputKind};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// ── Logging bootstrap ──────────────────────────────────────────────────────────

/// Map a CLI level name to an [`EnvFilter`] directive.
///
/// Unrecognised names fall back to `"info"`.
pub fn log_directive(log_level: &str) -> &'static str {
    match log_level.to_uppercase().as_str() {
        "DEBUG" => "debug",
        "INFO" => "info",
        "WARNING" | "WARN" => "warn",
        "ERROR" | "CRITICAL" => "error",
        _ => "info",
    }
}

/// Initialise the global `tracing` subscriber.
///
/// Logs go to stderr so they never interleave with the console report, or
/// are appended to `log_file` without ANSI colours when one is given.
pub fn setup_logging(log_level: &str, log_file: Option<&Path>) -> anyhow::Result<()> {
    let filter = EnvFilter::new(log_directive(log_level));

    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("cannot open log file {}", path.display()))?;
            let layer = fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file));
            tracing_subscriber::registry().with(filter).with(layer).init();
        }
        None => {
            let layer = fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr);
            tracing_subscriber::registry().with(filter).with(layer).init();
        }
    }

    Ok(())
}

// ── Informational output ───────────────────────────────────────────────────────

/// Line printed by `--list-outputs`.
pub fn output_listing() -> String {
    let names: Vec<&str> = OutputKind::ALL.iter().map(|k| k.name()).collect();
    format!("Available outputs: {}", names.join(", "))
}

/// Human-readable summary of the effective configuration for `--dry-run`.
pub fn describe_config(config: &AuditConfig) -> String {
    let outputs: Vec<&str> = config.outputs.iter().map(|k| k.name()).collect();
    let mut text = String::from("Effective configuration:\n");
    let _ = writeln!(text, "  page_log_path    = {}", config.page_log_path.display());
    let _ = writeln!(text, "  work_hours       = {}-{}", config.work_start, config.work_end);
    let _ = writeln!(text, "  enabled_sections = {}", config.enabled_sections.join(","));
    let _ = writeln!(text, "  outputs          = {}", outputs.join(","));
    let _ = writeln!(text, "  cli_mode         = {}", config.cli_mode);
    let _ = writeln!(text, "  cli_max_rows     = {}", config.cli_max_rows);
    let _ = writeln!(text, "  csv_dir          = {}", config.csv_dir.display());
    let _ = writeln!(text, "  html_path        = {}", config.html_path.display());
    let _ = writeln!(text, "  cost_rules       = {}", config.cost_inference_rules.len());
    let _ = writeln!(
        text,
        "  costs            = {}",
        if config.costs.rates.is_configured() { "configured" } else { "none" }
    );
    let _ = writeln!(
        text,
        "  email            = {}",
        if config.email.enabled {
            format!("enabled ({} recipient(s))", config.email.recipients.len())
        } else {
            "disabled".to_string()
        }
    );
    text
}

// ── Tests ──────────────────────────────────────────────────────────────────────
