use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by PrintAudit outside of per-line log parsing.
#[derive(Error, Debug)]
pub enum AuditError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {}: {source}", .path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// None of the candidate configuration files exists.
    #[error("No configuration file found. Searched: {}", format_paths(.searched))]
    ConfigNotFound { searched: Vec<PathBuf> },

    /// A configuration line is neither a comment, a section header nor `key=value`.
    #[error("Invalid config line {line} in {}: {content:?}", .path.display())]
    ConfigSyntax {
        path: PathBuf,
        line: usize,
        content: String,
    },

    /// A configuration value could not be converted to its expected type.
    #[error("Invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    /// An output module name is not one of the built-in modules.
    #[error("Unknown output module '{0}'. Available: cli, csv, email, html")]
    UnknownOutput(String),

    /// A date string is not in `YYYY-MM-DD` form.
    #[error("Invalid date '{0}'. Use YYYY-MM-DD.")]
    InvalidDate(String),

    /// An output module failed to write one of its artifacts.
    #[error("Failed to export {}: {message}", .path.display())]
    Export { path: PathBuf, message: String },

    /// The report could not be delivered by email.
    #[error("Email delivery failed: {0}")]
    Delivery(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn format_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Convenience alias used throughout the PrintAudit crates.
pub type Result<T> = std::result::Result<T, AuditError>;
