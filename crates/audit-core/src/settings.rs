use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;

use crate::config::{AuditConfig, CliMode, OutputKind};
use crate::error::{AuditError, Result};

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Analyze CUPS page_log files and report printing usage
#[derive(Parser, Debug, Clone)]
#[command(
    name = "printaudit",
    about = "Analyze CUPS page_log files and report printing usage",
    version
)]
pub struct Settings {
    /// Path to printaudit.conf
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Comma-separated output modules (overrides config)
    #[arg(short, long)]
    pub outputs: Option<String>,

    /// Console renderer style (overrides config)
    #[arg(long, value_parser = ["plain", "rich"])]
    pub cli_mode: Option<String>,

    /// Print the effective configuration and exit
    #[arg(long)]
    pub dry_run: bool,

    /// List available output modules and exit
    #[arg(long)]
    pub list_outputs: bool,

    /// Only include jobs on or after this date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub start_date: Option<NaiveDate>,

    /// Only include jobs on or before this date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub end_date: Option<NaiveDate>,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse the process arguments and apply the `--debug` flag.
    pub fn load() -> Self {
        Self::resolve(Settings::parse())
    }

    /// Same as [`Settings::load`] with an explicit argument list.
    pub fn load_from_args<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        Self::resolve(Settings::parse_from(args))
    }

    fn resolve(mut settings: Settings) -> Settings {
        // --debug overrides log level.
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }

    /// Apply command-line overrides on top of a loaded configuration.
    pub fn apply_to(&self, config: &mut AuditConfig) -> Result<()> {
        if let Some(raw) = &self.outputs {
            config.outputs = OutputKind::parse_list(raw)?;
        }
        if let Some(mode) = &self.cli_mode {
            config.cli_mode = mode.parse::<CliMode>()?;
        }
        Ok(())
    }
}

/// Strict `YYYY-MM-DD` parser used for the date filter flags.
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| AuditError::InvalidDate(raw.to_string()))
}

// ── Tests ──────────────────────────────────────────────────────────────────────
