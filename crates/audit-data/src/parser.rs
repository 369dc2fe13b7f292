//! Parsing of single CUPS `page_log` lines.
//!
//! Two payload dialects share one header:
//!
//! ```text
//! <queue> <user> <job_id> [<timestamp>] <payload>
//!
//! legacy:   <pages> <copies> <billing>
//! standard: total|page <pages> <billing> <host> [<job name ...>] <media> <sides>
//! ```

use std::sync::OnceLock;

use audit_core::models::PageLogEntry;
use chrono::DateTime;
use regex::Regex;
use thiserror::Error;

/// Timestamp layout inside the brackets, e.g. `01/Apr/2025:09:03:11 -0300`.
pub const TIMESTAMP_FORMAT: &str = "%d/%b/%Y:%H:%M:%S %z";

/// Why a single line was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unrecognized header")]
    UnrecognizedHeader,

    #[error("invalid timestamp '{0}'")]
    InvalidTimestamp(String),

    #[error("missing data payload")]
    MissingPayload,

    #[error("legacy payload too short")]
    LegacyPayloadTooShort,

    #[error("unknown keyword '{0}'")]
    UnknownKeyword(String),

    #[error("default payload too short")]
    DefaultPayloadTooShort,

    #[error("default payload missing host/job/media info")]
    MissingHostJobMedia,

    #[error("invalid {field} '{value}'")]
    InvalidNumber { field: &'static str, value: String },
}

fn header_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?P<queue>\S+)\s+(?P<user>\S+)\s+(?P<job_id>\d+)\s+\[(?P<timestamp>[^\]]+)\]\s+(?P<payload>.+)$")
            .expect("regex is valid")
    })
}

/// Payload fields shared by both dialects.
#[derive(Debug, Default)]
struct Payload {
    pages: u64,
    copies: u64,
    billing_code: Option<String>,
    host: Option<String>,
    job_name: Option<String>,
    media: Option<String>,
    sides: Option<String>,
}

/// Parse one line (without its terminator) into a [`PageLogEntry`].
pub fn parse_line(line: &str) -> Result<PageLogEntry, ParseError> {
    let caps = header_regex()
        .captures(line)
        .ok_or(ParseError::UnrecognizedHeader)?;

    let queue = caps["queue"].to_string();
    let user = normalize_user(&caps["user"]);
    let job_id = parse_count("job id", &caps["job_id"])?;
    let raw_ts = &caps["timestamp"];
    let timestamp = DateTime::parse_from_str(raw_ts, TIMESTAMP_FORMAT)
        .map_err(|_| ParseError::InvalidTimestamp(raw_ts.to_string()))?;

    let payload = parse_payload(&caps["payload"])?;

    Ok(PageLogEntry {
        queue,
        user,
        job_id,
        timestamp,
        pages: payload.pages,
        copies: payload.copies,
        billing_code: payload.billing_code,
        host: payload.host,
        job_name: payload.job_name,
        media: payload.media,
        sides: payload.sides,
    })
}

fn parse_payload(payload: &str) -> Result<Payload, ParseError> {
    let tokens: Vec<&str> = payload.split_whitespace().collect();
    let Some(first) = tokens.first() else {
        return Err(ParseError::MissingPayload);
    };

    if first.bytes().all(|b| b.is_ascii_digit()) {
        return parse_legacy(&tokens);
    }

    let keyword = first.to_lowercase();
    if keyword != "total" && keyword != "page" {
        return Err(ParseError::UnknownKeyword(first.to_string()));
    }
    parse_standard(&tokens)
}

/// `<pages> <copies> <billing>`; extra tokens are ignored.
fn parse_legacy(tokens: &[&str]) -> Result<Payload, ParseError> {
    if tokens.len() < 3 {
        return Err(ParseError::LegacyPayloadTooShort);
    }
    Ok(Payload {
        pages: parse_count("pages", tokens[0])?,
        copies: parse_count("copies", tokens[1])?,
        billing_code: normalize_billing(tokens[2]),
        ..Payload::default()
    })
}

/// `<keyword> <pages> <billing> <host> [<job name ...>] <media> <sides>`
fn parse_standard(tokens: &[&str]) -> Result<Payload, ParseError> {
    if tokens.len() < 4 {
        return Err(ParseError::DefaultPayloadTooShort);
    }
    let pages = parse_count("pages", tokens[1])?;
    let billing_code = normalize_billing(tokens[2]);

    let remaining = &tokens[3..];
    if remaining.len() < 3 {
        return Err(ParseError::MissingHostJobMedia);
    }

    let n = remaining.len();
    let name_tokens = &remaining[1..n - 2];
    let job_name = if name_tokens.is_empty() {
        None
    } else {
        normalize_optional(&name_tokens.join(" "))
    };

    Ok(Payload {
        pages,
        copies: 1,
        billing_code,
        host: normalize_optional(remaining[0]),
        job_name,
        media: normalize_optional(remaining[n - 2]),
        sides: normalize_optional(remaining[n - 1]),
    })
}

fn parse_count(field: &'static str, raw: &str) -> Result<u64, ParseError> {
    raw.parse().map_err(|_| ParseError::InvalidNumber {
        field,
        value: raw.to_string(),
    })
}

// ── Normalization ─────────────────────────────────────────────────────────────

/// Trim and lower-case; an empty user becomes `"unknown"`.
pub fn normalize_user(raw: &str) -> String {
    let user = raw.trim().to_lowercase();
    if user.is_empty() {
        "unknown".to_string()
    } else {
        user
    }
}

/// Trimmed value, or `None` for empty strings and the `-` placeholder.
pub fn normalize_optional(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "-" {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Like [`normalize_optional`], also treating `-none-` as absent.
pub fn normalize_billing(raw: &str) -> Option<String> {
    normalize_optional(raw).filter(|value| value != "-none-")
}

// ── Tests ──────────────────────────────────────────────────────────────────────
