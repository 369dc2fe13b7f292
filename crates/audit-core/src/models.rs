use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

/// One normalized row of a CUPS `page_log`.
///
/// Optional fields are either a trimmed, non-empty string or `None`; they are
/// never `Some("")`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLogEntry {
    /// Printer queue as written in the log (case preserved).
    pub queue: String,
    /// Lower-cased user name, `"unknown"` when the log carries none.
    pub user: String,
    pub job_id: u64,
    /// Timestamp with the UTC offset recorded in the log.
    pub timestamp: DateTime<FixedOffset>,
    pub pages: u64,
    /// Number of copies; `1` for formats that do not record it.
    pub copies: u64,
    pub billing_code: Option<String>,
    /// Originating client host.
    pub host: Option<String>,
    /// Job title, may contain spaces.
    pub job_name: Option<String>,
    pub media: Option<String>,
    /// Raw `sides` attribute, e.g. `"two-sided-long-edge"`.
    pub sides: Option<String>,
}

impl PageLogEntry {
    /// Calendar date of the job in the offset it was logged with.
    pub fn local_date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}

// ── Report types ──────────────────────────────────────────────────────────────

/// Global request/page totals and the observed time window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    pub requests: u64,
    pub pages: u64,
    /// Earliest timestamp ingested.
    pub first_event: Option<DateTime<FixedOffset>>,
    /// Latest timestamp ingested.
    pub last_event: Option<DateTime<FixedOffset>>,
}

/// Usage of a single printer queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueStat {
    pub queue: String,
    /// Share of all requests, in percent with two decimals.
    pub requests_pct: f64,
    /// Share of all pages, in percent with two decimals.
    pub pages_pct: f64,
    pub requests: u64,
    pub pages: u64,
}

/// Pages printed by one user on one queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueUserStat {
    pub queue: String,
    pub user: String,
    pub pages: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserStat {
    pub user: String,
    pub requests: u64,
    pub pages: u64,
    pub pages_per_request: f64,
}

/// Requests and pages in one hour-of-day (`"HH:00"`) or day (`"YYYY-MM-DD"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporalPoint {
    pub key: String,
    pub requests: u64,
    pub pages: u64,
    /// Whether the hour falls inside the configured work hours. Always `None`
    /// for daily points.
    pub within_hours: Option<bool>,
}

/// One populated bucket of the job-size or copy-count histogram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketStat {
    pub label: String,
    pub pct_requests: f64,
    pub request_count: u64,
}

/// Pages and cost attributed to a billing code or inferred cost label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostStat {
    pub label: String,
    pub pages: u64,
    /// Top users by pages within this label.
    pub per_user: Vec<(String, u64)>,
    /// Top queues by pages within this label.
    pub per_queue: Vec<(String, u64)>,
    /// Monetary amount; `0.0` when no rates are configured.
    pub amount: f64,
}

/// A label with a page count (clients, document types, media, duplex).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleStat {
    pub label: String,
    pub pages: u64,
}

/// The complete, immutable result of one analysis run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub totals: Totals,
    pub queue_stats: Vec<QueueStat>,
    pub queue_user_stats: Vec<QueueUserStat>,
    pub user_stats: Vec<UserStat>,
    pub hourly: Vec<TemporalPoint>,
    pub daily: Vec<TemporalPoint>,
    pub job_buckets: Vec<BucketStat>,
    pub copy_buckets: Vec<BucketStat>,
    pub cost_stats: Vec<CostStat>,
    pub client_stats: Vec<SimpleStat>,
    pub document_types: Vec<SimpleStat>,
    pub media_stats: Vec<SimpleStat>,
    pub duplex_stats: Vec<SimpleStat>,
}
