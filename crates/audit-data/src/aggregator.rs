//! Incremental usage aggregation over page-log entries.
//!
//! [`UsageAggregator`] keeps running tallies keyed by queue, user, hour, day,
//! cost label and a few descriptive dimensions. Reports are derived on demand
//! and sorted at derivation time, so the result does not depend on ingestion
//! order.

use std::collections::HashMap;
use std::hash::Hash;

use audit_core::config::AuditConfig;
use audit_core::formatting::{round2, share_pct};
use audit_core::models::{
    AnalysisReport, BucketStat, CostStat, PageLogEntry, QueueStat, QueueUserStat, SimpleStat,
    TemporalPoint, Totals, UserStat,
};
use audit_core::pricing::{infer_cost_label, CostRates, CostRule};
use chrono::{DateTime, FixedOffset};

/// Label for jobs with neither a billing code nor a matching inference rule.
pub const UNASSIGNED_LABEL: &str = "unassigned";

/// Sentinel for absent host, media, sides and unrecognised document types.
pub const UNKNOWN_LABEL: &str = "unknown";

/// Number of users and queues kept per cost label.
pub const TOP_ITEMS: usize = 5;

/// Inclusive `(low, high, label)` ranges; `None` means open-ended.
pub type BucketTable = [(u64, Option<u64>, &'static str)];

/// Job-size histogram on page count.
pub static JOB_BUCKETS: &BucketTable = &[
    (0, Some(10), "0-10"),
    (11, Some(20), "11-20"),
    (21, Some(30), "21-30"),
    (31, Some(40), "31-40"),
    (41, Some(50), "41-50"),
    (51, Some(100), "51-100"),
    (101, Some(200), "101-200"),
    (201, None, "200+"),
];

/// Copy-count histogram.
pub static COPY_BUCKETS: &BucketTable = &[
    (1, Some(1), "1"),
    (2, Some(2), "2"),
    (3, Some(3), "3"),
    (4, Some(4), "4"),
    (5, Some(10), "5-10"),
    (11, Some(20), "11-20"),
    (21, Some(30), "21-30"),
    (31, Some(40), "31-40"),
    (41, Some(50), "41-50"),
    (51, Some(100), "51-100"),
    (101, None, "100+"),
];

/// Bucket used when a value falls outside every range (a zero copy count).
pub const OTHER_BUCKET: &str = "other";

/// Job-name extensions reported as document types.
pub static KNOWN_EXTENSIONS: &[&str] = &[
    // documents
    "pdf", "doc", "docx", "odt", "rtf", "txt", "pages",
    // spreadsheets
    "xls", "xlsx", "xlsm", "csv", "ods", "numbers",
    // presentations
    "ppt", "pptx", "odp", "key",
    // images
    "jpg", "jpeg", "png", "gif", "bmp", "tiff", "tif", "svg",
    // reports
    "frx", "rpt", "mrt", "rep",
    // web and data
    "html", "htm", "xml", "json", "log",
    // print formats
    "ps", "eps", "prn",
    // development
    "cgi", "md", "tex",
];

// ── Settings ──────────────────────────────────────────────────────────────────

/// Construction-time inputs of the aggregator.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatorSettings {
    /// Inference rules, consulted in order.
    pub cost_rules: Vec<CostRule>,
    pub work_start: u32,
    pub work_end: u32,
    pub rates: CostRates,
}

impl Default for AggregatorSettings {
    fn default() -> Self {
        Self {
            cost_rules: Vec::new(),
            work_start: 7,
            work_end: 22,
            rates: CostRates::default(),
        }
    }
}

impl From<&AuditConfig> for AggregatorSettings {
    fn from(config: &AuditConfig) -> Self {
        Self {
            cost_rules: config.cost_inference_rules.clone(),
            work_start: config.work_start,
            work_end: config.work_end,
            rates: config.costs.rates.clone(),
        }
    }
}

// ── Tallies ───────────────────────────────────────────────────────────────────

/// Request and page counters for one key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Tally {
    requests: u64,
    pages: u64,
}

impl Tally {
    fn add(&mut self, pages: u64) {
        self.requests = self.requests.saturating_add(1);
        self.pages = self.pages.saturating_add(pages);
    }

    fn merge(&mut self, other: &Tally) {
        self.requests = self.requests.saturating_add(other.requests);
        self.pages = self.pages.saturating_add(other.pages);
    }
}

/// Pages attributed to one cost label, with nested per-user/per-queue pages.
#[derive(Debug, Clone, Default)]
struct CostTally {
    pages: u64,
    per_user: HashMap<String, u64>,
    per_queue: HashMap<String, u64>,
}

impl CostTally {
    fn merge(&mut self, other: &CostTally) {
        self.pages = self.pages.saturating_add(other.pages);
        merge_counts(&mut self.per_user, &other.per_user);
        merge_counts(&mut self.per_queue, &other.per_queue);
    }
}

// ── UsageAggregator ───────────────────────────────────────────────────────────

/// Running tallies for one analysis run (or one shard of it).
#[derive(Debug, Clone, Default)]
pub struct UsageAggregator {
    settings: AggregatorSettings,
    totals: Totals,
    queues: HashMap<String, Tally>,
    queue_users: HashMap<(String, String), u64>,
    users: HashMap<String, Tally>,
    hourly: HashMap<String, Tally>,
    daily: HashMap<String, Tally>,
    job_histogram: HashMap<&'static str, u64>,
    copy_histogram: HashMap<&'static str, u64>,
    costs: HashMap<String, CostTally>,
    clients: HashMap<String, u64>,
    documents: HashMap<String, u64>,
    media: HashMap<String, u64>,
    duplex: HashMap<String, u64>,
}

impl UsageAggregator {
    pub fn new(settings: AggregatorSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    pub fn settings(&self) -> &AggregatorSettings {
        &self.settings
    }

    /// Running totals so far.
    pub fn totals(&self) -> &Totals {
        &self.totals
    }

    /// Add one entry to every tally.
    pub fn ingest(&mut self, entry: &PageLogEntry) {
        let pages = entry.pages;

        self.totals.requests = self.totals.requests.saturating_add(1);
        self.totals.pages = self.totals.pages.saturating_add(pages);
        widen_window(&mut self.totals, entry.timestamp, entry.timestamp);

        self.queues.entry(entry.queue.clone()).or_default().add(pages);
        bump(
            &mut self.queue_users,
            (entry.queue.clone(), entry.user.clone()),
            pages,
        );
        self.users.entry(entry.user.clone()).or_default().add(pages);

        let hour_key = entry.timestamp.format("%H:00").to_string();
        let day_key = entry.timestamp.format("%Y-%m-%d").to_string();
        self.hourly.entry(hour_key).or_default().add(pages);
        self.daily.entry(day_key).or_default().add(pages);

        bump(&mut self.job_histogram, bucketize(pages, JOB_BUCKETS), 1);
        bump(&mut self.copy_histogram, bucketize(entry.copies, COPY_BUCKETS), 1);

        let label = self.cost_label(entry);
        let cost = self.costs.entry(label).or_default();
        cost.pages = cost.pages.saturating_add(pages);
        bump(&mut cost.per_user, entry.user.clone(), pages);
        bump(&mut cost.per_queue, entry.queue.clone(), pages);

        let client = entry.host.as_deref().unwrap_or(UNKNOWN_LABEL);
        bump(&mut self.clients, client.to_string(), pages);
        bump(
            &mut self.documents,
            document_extension(entry.job_name.as_deref()),
            pages,
        );
        let media = entry.media.as_deref().unwrap_or(UNKNOWN_LABEL);
        bump(&mut self.media, media.to_string(), pages);
        bump(&mut self.duplex, normalize_duplex(entry.sides.as_deref()), pages);
    }

    /// Fold another shard's tallies into this one.
    ///
    /// Counters are summed and the time window widened; settings of `self`
    /// are kept. The operation is associative and commutative.
    pub fn merge(&mut self, other: &UsageAggregator) {
        self.totals.requests = self.totals.requests.saturating_add(other.totals.requests);
        self.totals.pages = self.totals.pages.saturating_add(other.totals.pages);
        if let (Some(first), Some(last)) = (other.totals.first_event, other.totals.last_event) {
            widen_window(&mut self.totals, first, last);
        }

        merge_tallies(&mut self.queues, &other.queues);
        merge_counts(&mut self.queue_users, &other.queue_users);
        merge_tallies(&mut self.users, &other.users);
        merge_tallies(&mut self.hourly, &other.hourly);
        merge_tallies(&mut self.daily, &other.daily);
        merge_counts(&mut self.job_histogram, &other.job_histogram);
        merge_counts(&mut self.copy_histogram, &other.copy_histogram);
        for (label, cost) in &other.costs {
            self.costs.entry(label.clone()).or_default().merge(cost);
        }
        merge_counts(&mut self.clients, &other.clients);
        merge_counts(&mut self.documents, &other.documents);
        merge_counts(&mut self.media, &other.media);
        merge_counts(&mut self.duplex, &other.duplex);
    }

    /// Derive a report from the current tallies. Does not mutate state.
    pub fn build_report(&self) -> AnalysisReport {
        AnalysisReport {
            totals: self.totals.clone(),
            queue_stats: self.queue_stats(),
            queue_user_stats: self.queue_user_stats(),
            user_stats: self.user_stats(),
            hourly: self.hourly_points(),
            daily: self.daily_points(),
            job_buckets: bucket_section(&self.job_histogram),
            copy_buckets: bucket_section(&self.copy_histogram),
            cost_stats: self.cost_stats(),
            client_stats: simple_stats(&self.clients),
            document_types: simple_stats(&self.documents),
            media_stats: simple_stats(&self.media),
            duplex_stats: simple_stats(&self.duplex),
        }
    }

    fn cost_label(&self, entry: &PageLogEntry) -> String {
        if let Some(code) = &entry.billing_code {
            return code.clone();
        }
        infer_cost_label(
            &self.settings.cost_rules,
            &entry.queue,
            &entry.user,
            entry.job_name.as_deref(),
            entry.host.as_deref(),
        )
        .unwrap_or(UNASSIGNED_LABEL)
        .to_string()
    }

    fn queue_stats(&self) -> Vec<QueueStat> {
        let mut queues: Vec<(&String, &Tally)> = self.queues.iter().collect();
        queues.sort_by(|a, b| b.1.pages.cmp(&a.1.pages).then_with(|| a.0.cmp(b.0)));

        queues
            .into_iter()
            .map(|(queue, tally)| QueueStat {
                queue: queue.clone(),
                requests_pct: share_pct(tally.requests, self.totals.requests),
                pages_pct: share_pct(tally.pages, self.totals.pages),
                requests: tally.requests,
                pages: tally.pages,
            })
            .collect()
    }

    fn queue_user_stats(&self) -> Vec<QueueUserStat> {
        let mut stats: Vec<QueueUserStat> = self
            .queue_users
            .iter()
            .map(|((queue, user), pages)| QueueUserStat {
                queue: queue.clone(),
                user: user.clone(),
                pages: *pages,
            })
            .collect();
        stats.sort_by(|a, b| {
            b.pages
                .cmp(&a.pages)
                .then_with(|| a.queue.cmp(&b.queue))
                .then_with(|| a.user.cmp(&b.user))
        });
        stats
    }

    fn user_stats(&self) -> Vec<UserStat> {
        let mut users: Vec<(&String, &Tally)> = self.users.iter().collect();
        users.sort_by(|a, b| b.1.pages.cmp(&a.1.pages).then_with(|| a.0.cmp(b.0)));

        users
            .into_iter()
            .map(|(user, tally)| {
                let ratio = if tally.requests > 0 {
                    tally.pages as f64 / tally.requests as f64
                } else {
                    0.0
                };
                UserStat {
                    user: user.clone(),
                    requests: tally.requests,
                    pages: tally.pages,
                    pages_per_request: round2(ratio),
                }
            })
            .collect()
    }

    fn hourly_points(&self) -> Vec<TemporalPoint> {
        let (start, end) = (self.settings.work_start, self.settings.work_end);
        temporal_points(&self.hourly)
            .into_iter()
            .map(|mut point| {
                let hour = point
                    .key
                    .split(':')
                    .next()
                    .and_then(|h| h.parse::<u32>().ok());
                point.within_hours = hour.map(|h| start <= h && h <= end);
                point
            })
            .collect()
    }

    fn daily_points(&self) -> Vec<TemporalPoint> {
        temporal_points(&self.daily)
    }

    fn cost_stats(&self) -> Vec<CostStat> {
        let rates = &self.settings.rates;
        let priced = rates.is_configured();

        let mut labels: Vec<(&String, &CostTally)> = self.costs.iter().collect();
        labels.sort_by(|a, b| b.1.pages.cmp(&a.1.pages).then_with(|| a.0.cmp(b.0)));

        labels
            .into_iter()
            .map(|(label, cost)| {
                let queues = ranked(&cost.per_queue);
                let amount = if priced {
                    queues
                        .iter()
                        .map(|(queue, pages)| *pages as f64 * rates.resolve_rate(label, queue))
                        .sum::<f64>()
                } else {
                    0.0
                };
                CostStat {
                    label: label.clone(),
                    pages: cost.pages,
                    per_user: ranked(&cost.per_user).into_iter().take(TOP_ITEMS).collect(),
                    per_queue: queues.into_iter().take(TOP_ITEMS).collect(),
                    amount,
                }
            })
            .collect()
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn widen_window(
    totals: &mut Totals,
    first: DateTime<FixedOffset>,
    last: DateTime<FixedOffset>,
) {
    if totals.first_event.map_or(true, |current| first < current) {
        totals.first_event = Some(first);
    }
    if totals.last_event.map_or(true, |current| last > current) {
        totals.last_event = Some(last);
    }
}

/// Add to a counter, saturating at `u64::MAX`.
fn bump<K: Eq + Hash>(counts: &mut HashMap<K, u64>, key: K, amount: u64) {
    let count = counts.entry(key).or_default();
    *count = count.saturating_add(amount);
}

fn merge_counts<K: Clone + Eq + Hash>(into: &mut HashMap<K, u64>, from: &HashMap<K, u64>) {
    for (key, count) in from {
        bump(into, key.clone(), *count);
    }
}

fn merge_tallies(into: &mut HashMap<String, Tally>, from: &HashMap<String, Tally>) {
    for (key, tally) in from {
        into.entry(key.clone()).or_default().merge(tally);
    }
}

/// Entries by descending count, ties broken by key ascending.
fn ranked(counts: &HashMap<String, u64>) -> Vec<(String, u64)> {
    let mut items: Vec<(String, u64)> = counts.iter().map(|(k, v)| (k.clone(), *v)).collect();
    items.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    items
}

fn simple_stats(counts: &HashMap<String, u64>) -> Vec<SimpleStat> {
    ranked(counts)
        .into_iter()
        .map(|(label, pages)| SimpleStat { label, pages })
        .collect()
}

/// Points sorted ascending by key, without a work-hours flag.
fn temporal_points(tallies: &HashMap<String, Tally>) -> Vec<TemporalPoint> {
    let mut points: Vec<TemporalPoint> = tallies
        .iter()
        .map(|(key, tally)| TemporalPoint {
            key: key.clone(),
            requests: tally.requests,
            pages: tally.pages,
            within_hours: None,
        })
        .collect();
    points.sort_by(|a, b| a.key.cmp(&b.key));
    points
}

/// Populated buckets with their share of the histogram, sorted by label as
/// strings (`"0-10"`, `"101-200"`, `"11-20"`, ...).
fn bucket_section(histogram: &HashMap<&'static str, u64>) -> Vec<BucketStat> {
    let total = histogram.values().fold(0u64, |acc, n| acc.saturating_add(*n));
    if total == 0 {
        return Vec::new();
    }
    let mut buckets: Vec<BucketStat> = histogram
        .iter()
        .map(|(label, count)| BucketStat {
            label: label.to_string(),
            pct_requests: share_pct(*count, total),
            request_count: *count,
        })
        .collect();
    buckets.sort_by(|a, b| a.label.cmp(&b.label));
    buckets
}

/// Label of the first bucket whose inclusive range contains `value`.
pub fn bucketize(value: u64, table: &BucketTable) -> &'static str {
    table
        .iter()
        .find(|(low, high, _)| value >= *low && high.map_or(true, |h| value <= h))
        .map(|(_, _, label)| *label)
        .unwrap_or(OTHER_BUCKET)
}

/// Lower-cased extension of a job name when it is a known document type,
/// `"unknown"` otherwise.
pub fn document_extension(job_name: Option<&str>) -> String {
    let Some(name) = job_name else {
        return UNKNOWN_LABEL.to_string();
    };
    let lowered = name.to_lowercase();
    match lowered.rsplit_once('.') {
        Some((_, ext)) if KNOWN_EXTENSIONS.contains(&ext) => ext.to_string(),
        _ => UNKNOWN_LABEL.to_string(),
    }
}

/// Collapse the CUPS `sides` attribute to `duplex`, `simplex` or the raw
/// lower-cased value.
pub fn normalize_duplex(sides: Option<&str>) -> String {
    let Some(sides) = sides.filter(|s| !s.is_empty()) else {
        return UNKNOWN_LABEL.to_string();
    };
    let value = sides.to_lowercase();
    if value.starts_with("two-sided") {
        "duplex".to_string()
    } else if value == "one-sided" || value == "simplex" {
        "simplex".to_string()
    } else {
        value
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(queue: &str, user: &str, ts: &str, pages: u64) -> PageLogEntry {
        PageLogEntry {
            queue: queue.to_string(),
            user: user.to_string(),
            job_id: 1,
            timestamp: DateTime::parse_from_rfc3339(ts).unwrap(),
            pages,
            copies: 1,
            billing_code: None,
            host: None,
            job_name: None,
            media: None,
            sides: None,
        }
    }

    fn scenario_entries() -> Vec<PageLogEntry> {
        vec![
            entry("Printer01", "alice", "2025-04-01T09:00:00-03:00", 5),
            entry("Printer02", "bob", "2025-04-01T10:00:00-03:00", 10),
            entry("Printer01", "alice", "2025-04-02T23:00:00-03:00", 3),
        ]
    }

    fn aggregate(entries: &[PageLogEntry]) -> UsageAggregator {
        let mut agg = UsageAggregator::default();
        for e in entries {
            agg.ingest(e);
        }
        agg
    }

    // ── construction ─────────────────────────────────────────────────────────

    #[test]
    fn test_default_settings() {
        let agg = UsageAggregator::default();
        assert_eq!(agg.settings().work_start, 7);
        assert_eq!(agg.settings().work_end, 22);
        assert_eq!(agg.settings().rates.default_rate, 0.0);
        assert_eq!(agg.totals().requests, 0);
    }

    #[test]
    fn test_settings_from_config() {
        let mut config = AuditConfig::default();
        config.work_start = 8;
        config.cost_inference_rules = vec![CostRule::parse("finance", "acct")];
        config.costs.rates.default_rate = 0.1;

        let settings = AggregatorSettings::from(&config);
        assert_eq!(settings.work_start, 8);
        assert_eq!(settings.work_end, 22);
        assert_eq!(settings.cost_rules.len(), 1);
        assert_eq!(settings.rates.default_rate, 0.1);
    }

    #[test]
    fn test_empty_report() {
        let report = UsageAggregator::default().build_report();
        assert_eq!(report, AnalysisReport::default());
    }

    // ── end to end ───────────────────────────────────────────────────────────

    #[test]
    fn test_three_record_scenario() {
        let report = aggregate(&scenario_entries()).build_report();

        assert_eq!(report.totals.requests, 3);
        assert_eq!(report.totals.pages, 18);
        assert_eq!(report.queue_stats.len(), 2);
        assert_eq!(report.queue_stats[0].queue, "Printer02");
        assert_eq!(report.queue_stats[0].pages, 10);
        assert_eq!(report.queue_stats[1].queue, "Printer01");
        assert_eq!(report.queue_stats[1].pages, 8);
        assert_eq!(report.queue_stats[1].requests, 2);
        assert_eq!(report.queue_stats[1].pages_pct, 44.44);
        assert_eq!(report.queue_stats[1].requests_pct, 66.67);
        assert_eq!(report.user_stats.len(), 2);
        assert_eq!(report.user_stats[0].user, "bob");
        assert_eq!(report.user_stats[1].pages_per_request, 4.0);
    }

    #[test]
    fn test_time_window_is_widened() {
        let agg = aggregate(&scenario_entries());
        let totals = agg.totals();
        assert_eq!(
            totals.first_event,
            Some(DateTime::parse_from_rfc3339("2025-04-01T09:00:00-03:00").unwrap())
        );
        assert_eq!(
            totals.last_event,
            Some(DateTime::parse_from_rfc3339("2025-04-02T23:00:00-03:00").unwrap())
        );
    }

    #[test]
    fn test_queue_user_stats_ordering() {
        let entries = vec![
            entry("B", "zed", "2025-04-01T09:00:00+00:00", 4),
            entry("A", "zed", "2025-04-01T09:00:00+00:00", 4),
            entry("A", "amy", "2025-04-01T09:00:00+00:00", 4),
            entry("C", "bob", "2025-04-01T09:00:00+00:00", 9),
        ];
        let report = aggregate(&entries).build_report();
        let order: Vec<(&str, &str)> = report
            .queue_user_stats
            .iter()
            .map(|s| (s.queue.as_str(), s.user.as_str()))
            .collect();
        assert_eq!(order, vec![("C", "bob"), ("A", "amy"), ("A", "zed"), ("B", "zed")]);
    }

    #[test]
    fn test_temporal_points_use_logged_offset() {
        let report = aggregate(&scenario_entries()).build_report();

        let hours: Vec<&str> = report.hourly.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(hours, vec!["09:00", "10:00", "23:00"]);
        assert_eq!(report.hourly[0].within_hours, Some(true));
        assert_eq!(report.hourly[2].within_hours, Some(false));

        let days: Vec<&str> = report.daily.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(days, vec!["2025-04-01", "2025-04-02"]);
        assert!(report.daily.iter().all(|p| p.within_hours.is_none()));
        assert_eq!(report.daily[0].requests, 2);
        assert_eq!(report.daily[0].pages, 15);
    }

    #[test]
    fn test_work_hours_are_inclusive() {
        let settings = AggregatorSettings {
            work_start: 9,
            work_end: 10,
            ..AggregatorSettings::default()
        };
        let mut agg = UsageAggregator::new(settings);
        for e in scenario_entries() {
            agg.ingest(&e);
        }
        let flags: Vec<Option<bool>> = agg.build_report().hourly.iter().map(|p| p.within_hours).collect();
        assert_eq!(flags, vec![Some(true), Some(true), Some(false)]);
    }

    // ── properties ───────────────────────────────────────────────────────────

    #[test]
    fn test_build_report_is_idempotent() {
        let agg = aggregate(&scenario_entries());
        assert_eq!(agg.build_report(), agg.build_report());
    }

    #[test]
    fn test_merge_matches_single_run() {
        let entries = scenario_entries();
        let single = aggregate(&entries).build_report();

        let mut left = aggregate(&entries[..1]);
        let right = aggregate(&entries[1..]);
        left.merge(&right);
        assert_eq!(left.build_report(), single);

        let mut right = aggregate(&entries[1..]);
        right.merge(&aggregate(&entries[..1]));
        assert_eq!(right.build_report(), single);
    }

    #[test]
    fn test_merge_is_associative_across_three_shards() {
        let entries = scenario_entries();
        let single = aggregate(&entries).build_report();
        let shard = |i: usize| aggregate(&entries[i..=i]);

        let mut left_first = shard(0);
        left_first.merge(&shard(1));
        left_first.merge(&shard(2));

        let mut tail = shard(1);
        tail.merge(&shard(2));
        let mut right_first = shard(0);
        right_first.merge(&tail);

        let mut rotated = shard(2);
        rotated.merge(&shard(0));
        rotated.merge(&shard(1));

        assert_eq!(left_first.build_report(), single);
        assert_eq!(right_first.build_report(), single);
        assert_eq!(rotated.build_report(), single);
    }

    #[test]
    fn test_merge_with_empty_shard() {
        let entries = scenario_entries();
        let mut agg = aggregate(&entries);
        agg.merge(&UsageAggregator::default());
        assert_eq!(agg.build_report(), aggregate(&entries).build_report());

        let mut empty = UsageAggregator::default();
        empty.merge(&aggregate(&entries));
        assert_eq!(empty.build_report(), aggregate(&entries).build_report());
    }

    #[test]
    fn test_report_independent_of_ingest_order() {
        let mut entries = scenario_entries();
        let forward = aggregate(&entries).build_report();
        entries.reverse();
        assert_eq!(aggregate(&entries).build_report(), forward);
    }

    #[test]
    fn test_percentages_sum_to_hundred() {
        let entries: Vec<PageLogEntry> = (0..7)
            .map(|i| entry(&format!("Q{}", i % 3), "u", "2025-04-01T09:00:00+00:00", i + 1))
            .collect();
        let report = aggregate(&entries).build_report();

        let sum: f64 = report.queue_stats.iter().map(|q| q.pages_pct).sum();
        assert!((sum - 100.0).abs() <= 0.1 * report.queue_stats.len() as f64);
        for q in &report.queue_stats {
            assert!((0.0..=100.0).contains(&q.pages_pct));
            assert!((0.0..=100.0).contains(&q.requests_pct));
        }
    }

    #[test]
    fn test_bucket_counts_cover_every_request() {
        let mut entries: Vec<PageLogEntry> = [0, 10, 11, 55, 200, 201, 5000]
            .iter()
            .map(|&p| entry("Q", "u", "2025-04-01T09:00:00+00:00", p))
            .collect();
        entries[1].copies = 7;
        entries[2].copies = 150;
        entries[3].copies = 0;
        let report = aggregate(&entries).build_report();

        let job_total: u64 = report.job_buckets.iter().map(|b| b.request_count).sum();
        let copy_total: u64 = report.copy_buckets.iter().map(|b| b.request_count).sum();
        assert_eq!(job_total, 7);
        assert_eq!(copy_total, 7);
    }

    #[test]
    fn test_bucket_labels_sort_lexicographically() {
        let entries: Vec<PageLogEntry> = [5, 150, 15, 250, 25]
            .iter()
            .map(|&p| entry("Q", "u", "2025-04-01T09:00:00+00:00", p))
            .collect();
        let report = aggregate(&entries).build_report();
        let labels: Vec<&str> = report.job_buckets.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["0-10", "101-200", "11-20", "200+", "21-30"]);
        assert_eq!(report.job_buckets[0].pct_requests, 20.0);
    }

    #[test]
    fn test_bucketize_boundaries() {
        assert_eq!(bucketize(0, JOB_BUCKETS), "0-10");
        assert_eq!(bucketize(10, JOB_BUCKETS), "0-10");
        assert_eq!(bucketize(200, JOB_BUCKETS), "101-200");
        assert_eq!(bucketize(201, JOB_BUCKETS), "200+");
        assert_eq!(bucketize(1, COPY_BUCKETS), "1");
        assert_eq!(bucketize(100, COPY_BUCKETS), "51-100");
        assert_eq!(bucketize(101, COPY_BUCKETS), "100+");
        assert_eq!(bucketize(0, COPY_BUCKETS), OTHER_BUCKET);
    }

    #[test]
    fn test_page_totals_saturate_instead_of_overflowing() {
        let entries = vec![
            entry("Q1", "bob", "2024-01-01T00:00:00+00:00", u64::MAX),
            entry("Q1", "bob", "2024-01-01T00:05:00+00:00", 5),
        ];
        let report = aggregate(&entries).build_report();

        assert_eq!(report.totals.requests, 2);
        assert_eq!(report.totals.pages, u64::MAX);
        assert_eq!(report.queue_stats[0].pages, u64::MAX);
        assert_eq!(report.user_stats[0].pages, u64::MAX);
        assert_eq!(report.cost_stats[0].pages, u64::MAX);
        assert_eq!(report.client_stats[0].pages, u64::MAX);
        assert_eq!(report.queue_stats[0].pages_pct, 100.0);

        let mut merged = aggregate(&entries);
        merged.merge(&aggregate(&entries));
        assert_eq!(merged.totals().pages, u64::MAX);
        assert_eq!(merged.totals().requests, 4);
    }

    // ── cost attribution ─────────────────────────────────────────────────────

    #[test]
    fn test_billing_code_beats_inference() {
        let settings = AggregatorSettings {
            cost_rules: vec![CostRule::parse("sales", "alice")],
            ..AggregatorSettings::default()
        };
        let mut agg = UsageAggregator::new(settings);
        let mut billed = entry("Printer01", "alice", "2025-04-01T09:00:00+00:00", 4);
        billed.billing_code = Some("PROJECT123".to_string());
        agg.ingest(&billed);
        agg.ingest(&entry("Printer01", "alice", "2025-04-01T09:00:00+00:00", 2));
        agg.ingest(&entry("Printer01", "bob", "2025-04-01T09:00:00+00:00", 1));

        let report = agg.build_report();
        let labels: Vec<(&str, u64)> = report
            .cost_stats
            .iter()
            .map(|c| (c.label.as_str(), c.pages))
            .collect();
        assert_eq!(labels, vec![("PROJECT123", 4), ("sales", 2), ("unassigned", 1)]);
    }

    #[test]
    fn test_cost_amount_zero_without_rates() {
        let report = aggregate(&scenario_entries()).build_report();
        assert_eq!(report.cost_stats.len(), 1);
        assert_eq!(report.cost_stats[0].label, UNASSIGNED_LABEL);
        assert_eq!(report.cost_stats[0].amount, 0.0);
    }

    #[test]
    fn test_cost_amount_uses_rate_precedence() {
        let mut rates = CostRates::new(0.05, HashMap::new(), HashMap::new());
        rates.set_queue_rate("printer01", 0.02);
        rates.set_label_rate("acct1", 0.5);
        let settings = AggregatorSettings {
            rates,
            ..AggregatorSettings::default()
        };
        let mut agg = UsageAggregator::new(settings);

        agg.ingest(&entry("Printer01", "alice", "2025-04-01T09:00:00+00:00", 10));
        agg.ingest(&entry("Printer02", "bob", "2025-04-01T09:00:00+00:00", 10));
        let mut billed = entry("Printer01", "carol", "2025-04-01T09:00:00+00:00", 2);
        billed.billing_code = Some("ACCT1".to_string());
        agg.ingest(&billed);

        let report = agg.build_report();
        let unassigned = &report.cost_stats[0];
        assert_eq!(unassigned.label, UNASSIGNED_LABEL);
        assert!((unassigned.amount - (10.0 * 0.02 + 10.0 * 0.05)).abs() < 1e-9);

        let acct = &report.cost_stats[1];
        assert_eq!(acct.label, "ACCT1");
        assert!((acct.amount - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_cost_top_items_limited_to_five() {
        let entries: Vec<PageLogEntry> = (0..7)
            .map(|i| entry(&format!("Q{i}"), &format!("user{i}"), "2025-04-01T09:00:00+00:00", i + 1))
            .collect();
        let report = aggregate(&entries).build_report();
        let cost = &report.cost_stats[0];
        assert_eq!(cost.per_user.len(), TOP_ITEMS);
        assert_eq!(cost.per_user[0], ("user6".to_string(), 7));
        assert_eq!(cost.per_queue.len(), TOP_ITEMS);
        assert_eq!(cost.pages, 28);
    }

    // ── descriptive dimensions ───────────────────────────────────────────────

    #[test]
    fn test_simple_stats_use_sentinels() {
        let mut described = entry("Q", "u", "2025-04-01T09:00:00+00:00", 6);
        described.host = Some("10.0.0.5".to_string());
        described.job_name = Some("Budget.XLSX".to_string());
        described.media = Some("iso_a4_210x297mm".to_string());
        described.sides = Some("two-sided-long-edge".to_string());
        let bare = entry("Q", "u", "2025-04-01T09:00:00+00:00", 2);

        let report = aggregate(&[described, bare]).build_report();
        assert_eq!(
            report.client_stats,
            vec![
                SimpleStat { label: "10.0.0.5".into(), pages: 6 },
                SimpleStat { label: "unknown".into(), pages: 2 },
            ]
        );
        assert_eq!(report.document_types[0].label, "xlsx");
        assert_eq!(report.media_stats[0].label, "iso_a4_210x297mm");
        assert_eq!(report.duplex_stats[0].label, "duplex");
        assert_eq!(report.duplex_stats[1].label, "unknown");
    }

    #[test]
    fn test_document_extension() {
        assert_eq!(document_extension(Some("report.PDF")), "pdf");
        assert_eq!(document_extension(Some("archive.tar.gz")), "unknown");
        assert_eq!(document_extension(Some("README")), "unknown");
        assert_eq!(document_extension(Some("notes.")), "unknown");
        assert_eq!(document_extension(None), "unknown");
    }

    #[test]
    fn test_normalize_duplex() {
        assert_eq!(normalize_duplex(Some("two-sided-short-edge")), "duplex");
        assert_eq!(normalize_duplex(Some("One-Sided")), "simplex");
        assert_eq!(normalize_duplex(Some("simplex")), "simplex");
        assert_eq!(normalize_duplex(Some("Tumble")), "tumble");
        assert_eq!(normalize_duplex(None), "unknown");
    }
}
