use std::collections::HashMap;

/// Characters that separate tokens in a raw cost-rule value.
const RULE_DELIMITERS: &[char] = &[',', '|', ';'];

// ── CostRule ──────────────────────────────────────────────────────────────────

/// Maps a cost label to substring tokens used to attribute unbilled jobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CostRule {
    pub label: String,
    /// Lower-cased, trimmed, non-empty tokens.
    pub tokens: Vec<String>,
}

impl CostRule {
    /// Build a rule from a raw value such as `"acct1, acct2|finance;fin"`.
    pub fn parse(label: impl Into<String>, raw_tokens: &str) -> Self {
        let tokens = raw_tokens
            .split(RULE_DELIMITERS)
            .map(|token| token.trim().to_lowercase())
            .filter(|token| !token.is_empty())
            .collect();
        Self {
            label: label.into(),
            tokens,
        }
    }

    /// `true` when any token occurs in the (already lower-cased) haystack.
    /// A rule without tokens never matches.
    pub fn matches(&self, haystack: &str) -> bool {
        self.tokens.iter().any(|token| haystack.contains(token.as_str()))
    }
}

/// Infer a cost label for a job without a billing code.
///
/// The haystack is built from the non-empty parts among queue, user, job name
/// and host, joined with single spaces and lower-cased. The first rule in
/// declaration order with a matching token wins.
pub fn infer_cost_label<'a>(
    rules: &'a [CostRule],
    queue: &str,
    user: &str,
    job_name: Option<&str>,
    host: Option<&str>,
) -> Option<&'a str> {
    if rules.is_empty() {
        return None;
    }

    let haystack = [
        queue,
        user,
        job_name.unwrap_or_default(),
        host.unwrap_or_default(),
    ]
    .iter()
    .filter(|part| !part.is_empty())
    .copied()
    .collect::<Vec<_>>()
    .join(" ")
    .to_lowercase();

    rules
        .iter()
        .find(|rule| rule.matches(&haystack))
        .map(|rule| rule.label.as_str())
}

// ── CostRates ─────────────────────────────────────────────────────────────────

/// Per-page rates used to turn attributed pages into money.
///
/// Table keys are stored lower-cased so lookups are case-insensitive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CostRates {
    /// Fallback rate when neither a label nor a queue rate applies.
    pub default_rate: f64,
    queue_rates: HashMap<String, f64>,
    label_rates: HashMap<String, f64>,
}

impl CostRates {
    pub fn new(
        default_rate: f64,
        queue_rates: HashMap<String, f64>,
        label_rates: HashMap<String, f64>,
    ) -> Self {
        Self {
            default_rate,
            queue_rates: lower_keys(queue_rates),
            label_rates: lower_keys(label_rates),
        }
    }

    /// Set the rate for one queue (case-insensitive).
    pub fn set_queue_rate(&mut self, queue: &str, rate: f64) {
        self.queue_rates.insert(queue.to_lowercase(), rate);
    }

    /// Set the rate for one cost label (case-insensitive).
    pub fn set_label_rate(&mut self, label: &str, rate: f64) {
        self.label_rates.insert(label.to_lowercase(), rate);
    }

    pub fn queue_rates(&self) -> &HashMap<String, f64> {
        &self.queue_rates
    }

    pub fn label_rates(&self) -> &HashMap<String, f64> {
        &self.label_rates
    }

    /// `true` when any rate is configured and amounts should be computed.
    pub fn is_configured(&self) -> bool {
        self.default_rate != 0.0 || !self.queue_rates.is_empty() || !self.label_rates.is_empty()
    }

    /// Resolve the effective per-page rate for pages of `label` printed on
    /// `queue`, consulting in priority order:
    /// 1. Label rate.
    /// 2. Queue rate.
    /// 3. Default rate.
    pub fn resolve_rate(&self, label: &str, queue: &str) -> f64 {
        if let Some(rate) = self.label_rates.get(&label.to_lowercase()) {
            return *rate;
        }
        if let Some(rate) = self.queue_rates.get(&queue.to_lowercase()) {
            return *rate;
        }
        self.default_rate
    }
}

fn lower_keys(map: HashMap<String, f64>) -> HashMap<String, f64> {
    map.into_iter().map(|(k, v)| (k.to_lowercase(), v)).collect()
}

// ── Tests ──────────────────────────────────────────────────────────────────────
