//! Data layer for PrintAudit.
//!
//! Parses CUPS `page_log` lines, reads whole logs, aggregates usage tallies
//! and runs the top-level analysis pipeline.

pub mod aggregator;
pub mod analysis;
pub mod parser;
pub mod reader;

pub use audit_core as core;
