//! Shared types for PrintAudit: the page-log data model, report types,
//! configuration, CLI settings, cost rates and number formatting.

pub mod config;
pub mod error;
pub mod formatting;
pub mod models;
pub mod pricing;
pub mod settings;
