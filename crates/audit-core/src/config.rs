//! Configuration file loading for PrintAudit.
//!
//! The file is a flat `key=value` list with optional `[section]` headers:
//!
//! ```text
//! [core]
//! page_log_path=/var/log/cups/page_log
//! outputs=cli,csv
//!
//! [costs]
//! default=0.02
//! printer.Laser01=0.05
//!
//! [cost_rules]
//! finance=acct,ledger
//!
//! [email]
//! enabled=yes
//! recipients=ops@example.com
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::debug;

use crate::error::{AuditError, Result};
use crate::pricing::{CostRates, CostRule};

/// Environment variable that points at an explicit configuration file.
pub const CONFIG_ENV_VAR: &str = "PRINTAUDIT_CONFIG";

/// Sections rendered when `enabled_sections` is not configured.
pub const DEFAULT_SECTIONS: &[&str] = &[
    "queue",
    "queue_user",
    "user",
    "temporal",
    "job",
    "cost",
    "media",
];

// ── OutputKind ────────────────────────────────────────────────────────────────

/// The closed set of output modules a report can be rendered to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputKind {
    Cli,
    Csv,
    Html,
    Email,
}

impl OutputKind {
    /// All modules, sorted by name.
    pub const ALL: [OutputKind; 4] = [
        OutputKind::Cli,
        OutputKind::Csv,
        OutputKind::Email,
        OutputKind::Html,
    ];

    pub fn name(self) -> &'static str {
        match self {
            OutputKind::Cli => "cli",
            OutputKind::Csv => "csv",
            OutputKind::Html => "html",
            OutputKind::Email => "email",
        }
    }

    /// Parse a comma-separated list such as `"cli, csv"`; empty items are dropped.
    pub fn parse_list(raw: &str) -> Result<Vec<OutputKind>> {
        split_csv(raw).iter().map(|name| name.parse()).collect()
    }
}

impl FromStr for OutputKind {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "cli" => Ok(OutputKind::Cli),
            "csv" => Ok(OutputKind::Csv),
            "html" => Ok(OutputKind::Html),
            "email" => Ok(OutputKind::Email),
            _ => Err(AuditError::UnknownOutput(s.trim().to_string())),
        }
    }
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── CliMode ───────────────────────────────────────────────────────────────────

/// Console renderer style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CliMode {
    Plain,
    #[default]
    Rich,
}

impl FromStr for CliMode {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "plain" => Ok(CliMode::Plain),
            "rich" => Ok(CliMode::Rich),
            other => Err(AuditError::InvalidValue {
                key: "cli_mode".to_string(),
                value: other.to_string(),
                reason: "expected 'plain' or 'rich'".to_string(),
            }),
        }
    }
}

impl fmt::Display for CliMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliMode::Plain => f.write_str("plain"),
            CliMode::Rich => f.write_str("rich"),
        }
    }
}

// ── Settings groups ───────────────────────────────────────────────────────────

/// SMTP delivery settings from the `[email]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailSettings {
    pub enabled: bool,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_user: String,
    pub smtp_password: String,
    pub use_tls: bool,
    pub recipients: Vec<String>,
    pub attach_csv: bool,
    pub attach_html: bool,
    pub from_address: String,
}

impl Default for EmailSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            smtp_host: String::new(),
            smtp_port: 25,
            smtp_user: String::new(),
            smtp_password: String::new(),
            use_tls: false,
            recipients: Vec::new(),
            attach_csv: false,
            attach_html: false,
            from_address: String::new(),
        }
    }
}

/// Rates and currency presentation from the `[costs]` section.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CostSettings {
    pub rates: CostRates,
    pub currency_symbol: String,
    pub currency_code: String,
}

// ── AuditConfig ───────────────────────────────────────────────────────────────

/// Fully-typed PrintAudit configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditConfig {
    pub page_log_path: PathBuf,
    /// First hour (0-23) considered working time, inclusive.
    pub work_start: u32,
    /// Last hour (0-23) considered working time, inclusive.
    pub work_end: u32,
    pub enabled_sections: Vec<String>,
    pub outputs: Vec<OutputKind>,
    pub cli_mode: CliMode,
    pub cli_max_rows: usize,
    pub csv_dir: PathBuf,
    pub html_path: PathBuf,
    /// Inference rules in file order.
    pub cost_inference_rules: Vec<CostRule>,
    pub costs: CostSettings,
    pub email: EmailSettings,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            page_log_path: PathBuf::from("/var/log/cups/page_log"),
            work_start: 7,
            work_end: 22,
            enabled_sections: DEFAULT_SECTIONS.iter().map(|s| s.to_string()).collect(),
            outputs: vec![OutputKind::Cli],
            cli_mode: CliMode::Rich,
            cli_max_rows: 15,
            csv_dir: PathBuf::from("./reports"),
            html_path: PathBuf::from("./reports/printaudit.html"),
            cost_inference_rules: Vec::new(),
            costs: CostSettings::default(),
            email: EmailSettings::default(),
        }
    }
}

impl AuditConfig {
    /// Discover and load the configuration file.
    ///
    /// `explicit` (from `--config`) wins; otherwise [`CONFIG_ENV_VAR`] and
    /// then [`default_config_paths`] are consulted.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from);
        let path = discover_config_file(explicit, env_path, &default_config_paths())?;
        Self::load_from(&path)
    }

    /// Load and parse a specific file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| AuditError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Loading configuration from {}", path.display());
        Self::parse_str(&content, path)
    }

    /// Parse configuration text. `origin` is only used in error messages.
    pub fn parse_str(content: &str, origin: &Path) -> Result<Self> {
        let raw = RawConfig::parse(content, origin)?;
        let mut config = AuditConfig::default();

        if let Some(v) = raw.get("page_log_path") {
            config.page_log_path = PathBuf::from(v);
        }
        if let Some(v) = raw.get("work_start") {
            config.work_start = parse_hour("work_start", v)?;
        }
        if let Some(v) = raw.get("work_end") {
            config.work_end = parse_hour("work_end", v)?;
        }
        if let Some(v) = raw.get("enabled_sections") {
            config.enabled_sections = split_csv(v);
        }
        if let Some(v) = raw.get("outputs") {
            config.outputs = OutputKind::parse_list(v)?;
        }
        if let Some(v) = raw.get("cli_mode") {
            config.cli_mode = v.parse()?;
        }
        if let Some(v) = raw.get("cli_max_rows") {
            config.cli_max_rows = parse_number("cli_max_rows", v)?;
        }
        if let Some(v) = raw.get("csv_dir") {
            config.csv_dir = PathBuf::from(v);
        }
        if let Some(v) = raw.get("html_path") {
            config.html_path = PathBuf::from(v);
        }

        config.cost_inference_rules = raw
            .rules
            .iter()
            .map(|(label, tokens)| CostRule::parse(label.clone(), tokens))
            .collect();

        load_cost_settings(&mut config.costs, &raw)?;
        load_email_settings(&mut config.email, &raw)?;

        Ok(config)
    }

    /// Whether a console/report section is enabled (case-insensitive).
    pub fn section_enabled(&self, name: &str) -> bool {
        self.enabled_sections
            .iter()
            .any(|s| s.eq_ignore_ascii_case(name))
    }
}

// ── Discovery ─────────────────────────────────────────────────────────────────

/// Candidate locations searched when neither `--config` nor the environment
/// variable names a file.
pub fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = vec![
        PathBuf::from("/etc/printaudit/printaudit.conf"),
        PathBuf::from("/etc/printaudit.conf"),
    ];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("printaudit").join("printaudit.conf"));
    }
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    paths.push(cwd.join("printaudit.conf"));
    paths
}

/// Return the first existing file among the candidates.
///
/// An explicit path, or failing that the environment path, is the *only*
/// candidate when present; the defaults are used otherwise.
pub fn discover_config_file(
    explicit: Option<&Path>,
    env_path: Option<PathBuf>,
    defaults: &[PathBuf],
) -> Result<PathBuf> {
    let candidates: Vec<PathBuf> = match (explicit, env_path) {
        (Some(path), _) => vec![path.to_path_buf()],
        (None, Some(path)) => vec![path],
        (None, None) => defaults.to_vec(),
    };

    let found = candidates.iter().find(|p| p.is_file()).cloned();
    found.ok_or(AuditError::ConfigNotFound {
        searched: candidates,
    })
}

// ── Raw key/value layer ───────────────────────────────────────────────────────

/// Section-flattened view of the file before typing.
///
/// Keys outside a section or under `[core]` are stored bare; `[email]` and
/// `[costs]` keys are prefixed (`email.smtp_host`, `costs.default`); other
/// sections use `section.key`. Rules keep file order.
#[derive(Debug, Default)]
struct RawConfig {
    values: HashMap<String, String>,
    rules: Vec<(String, String)>,
}

impl RawConfig {
    fn parse(content: &str, origin: &Path) -> Result<Self> {
        let mut raw = RawConfig::default();
        let mut section: Option<String> = None;

        for (index, line) in content.lines().enumerate() {
            let stripped = line.trim();
            if stripped.is_empty() || stripped.starts_with('#') {
                continue;
            }

            if stripped.starts_with('[') && stripped.ends_with(']') {
                let name = stripped[1..stripped.len() - 1].trim().to_lowercase();
                section = if name.is_empty() { None } else { Some(name) };
                continue;
            }

            let Some((key, value)) = stripped.split_once('=') else {
                return Err(AuditError::ConfigSyntax {
                    path: origin.to_path_buf(),
                    line: index + 1,
                    content: line.to_string(),
                });
            };
            let key = key.trim().to_lowercase();
            let value = value.trim().to_string();

            match section.as_deref() {
                None | Some("core") => {
                    if let Some(label) = key.strip_prefix("cost_rule.") {
                        raw.push_rule(label, value);
                    } else {
                        raw.values.insert(key, value);
                    }
                }
                Some("cost_rules") => raw.push_rule(&key, value),
                Some(name) => {
                    raw.values.insert(format!("{}.{}", name, key), value);
                }
            }
        }

        Ok(raw)
    }

    fn push_rule(&mut self, label: &str, tokens: String) {
        match self.rules.iter_mut().find(|(l, _)| l == label) {
            Some(existing) => existing.1 = tokens,
            None => self.rules.push((label.to_string(), tokens)),
        }
    }

    fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Entries whose key starts with `prefix`, with the prefix removed.
    fn with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = (&'a str, &'a str)> {
        self.values.iter().filter_map(move |(k, v)| {
            k.strip_prefix(prefix)
                .filter(|rest| !rest.is_empty())
                .map(|rest| (rest, v.as_str()))
        })
    }
}

fn load_cost_settings(costs: &mut CostSettings, raw: &RawConfig) -> Result<()> {
    if let Some(v) = raw.get("costs.default") {
        costs.rates.default_rate = parse_number("costs.default", v)?;
    }
    if let Some(v) = raw.get("costs.currency_symbol") {
        costs.currency_symbol = v.to_string();
    }
    if let Some(v) = raw.get("costs.currency_code") {
        costs.currency_code = v.to_string();
    }
    for (queue, v) in raw.with_prefix("costs.printer.") {
        let rate = parse_number(&format!("costs.printer.{}", queue), v)?;
        costs.rates.set_queue_rate(queue, rate);
    }
    for (label, v) in raw.with_prefix("costs.label.") {
        let rate = parse_number(&format!("costs.label.{}", label), v)?;
        costs.rates.set_label_rate(label, rate);
    }
    Ok(())
}

fn load_email_settings(email: &mut EmailSettings, raw: &RawConfig) -> Result<()> {
    if let Some(v) = raw.get("email.enabled") {
        email.enabled = parse_bool(v);
    }
    if let Some(v) = raw.get("email.smtp_host") {
        email.smtp_host = v.to_string();
    }
    if let Some(v) = raw.get("email.smtp_port") {
        email.smtp_port = parse_number("email.smtp_port", v)?;
    }
    if let Some(v) = raw.get("email.smtp_user") {
        email.smtp_user = v.to_string();
    }
    if let Some(v) = raw.get("email.smtp_password") {
        email.smtp_password = v.to_string();
    }
    if let Some(v) = raw.get("email.use_tls") {
        email.use_tls = parse_bool(v);
    }
    if let Some(v) = raw.get("email.recipients") {
        email.recipients = split_csv(v);
    }
    if let Some(v) = raw.get("email.attach_csv") {
        email.attach_csv = parse_bool(v);
    }
    if let Some(v) = raw.get("email.attach_html") {
        email.attach_html = parse_bool(v);
    }
    if let Some(v) = raw.get("email.from_address") {
        email.from_address = v.to_string();
    }
    Ok(())
}

// ── Value helpers ─────────────────────────────────────────────────────────────

/// `1`, `true`, `yes` and `on` (any case) are true; everything else is false.
pub fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Split a comma list, trimming items and dropping empty ones.
pub fn split_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_number<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| AuditError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: e.to_string(),
    })
}

fn parse_hour(key: &str, value: &str) -> Result<u32> {
    let hour: u32 = parse_number(key, value)?;
    if hour > 23 {
        return Err(AuditError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: "hour must be between 0 and 23".to_string(),
        });
    }
    Ok(hour)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
