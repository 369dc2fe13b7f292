//! Email delivery of the summary and generated report files over SMTP.

use std::path::{Path, PathBuf};
use std::time::Duration;

use audit_core::config::EmailSettings;
use audit_core::error::{AuditError, Result};
use audit_core::models::AnalysisReport;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tracing::{debug, info};

use crate::{format_event, OutputContext};

pub const SUBJECT: &str = "PrintAudit report";

const FALLBACK_SENDER: &str = "printaudit@localhost";

const SMTP_TIMEOUT: Duration = Duration::from_secs(30);

pub fn render(report: &AnalysisReport, ctx: &mut OutputContext) -> Result<()> {
    let settings = &ctx.config.email;
    if !settings.enabled {
        debug!("Email output requested but email.enabled is false; skipping");
        return Ok(());
    }

    let attachments = select_attachments(settings, &ctx.attachments);
    let message = build_message(settings, report, &attachments)?;
    let mailer = transport(settings)?;
    mailer
        .send(&message)
        .map_err(|e| AuditError::Delivery(e.to_string()))?;

    info!(
        "Sent report to {} recipient(s) with {} attachment(s)",
        settings.recipients.len(),
        attachments.len()
    );
    Ok(())
}

/// Files from earlier outputs that the settings ask to attach.
pub fn select_attachments(settings: &EmailSettings, generated: &[PathBuf]) -> Vec<PathBuf> {
    generated
        .iter()
        .filter(|path| {
            let ext = path
                .extension()
                .and_then(|e| e.to_str())
                .map(str::to_ascii_lowercase)
                .unwrap_or_default();
            match ext.as_str() {
                "csv" => settings.attach_csv,
                "htm" | "html" => settings.attach_html,
                _ => false,
            }
        })
        .cloned()
        .collect()
}

pub fn summary_body(report: &AnalysisReport) -> String {
    let totals = &report.totals;
    format!(
        "PrintAudit summary\nRequests: {}\nPages: {}\nWindow: {} -> {}\n",
        totals.requests,
        totals.pages,
        format_event(totals.first_event),
        format_event(totals.last_event)
    )
}

fn sender(settings: &EmailSettings) -> &str {
    if !settings.from_address.is_empty() {
        &settings.from_address
    } else if !settings.smtp_user.is_empty() {
        &settings.smtp_user
    } else {
        FALLBACK_SENDER
    }
}

fn mailbox(raw: &str) -> Result<Mailbox> {
    raw.parse()
        .map_err(|e| AuditError::Delivery(format!("invalid address '{}': {}", raw, e)))
}

/// Assemble the message: plain-text summary plus one part per attachment.
pub fn build_message(
    settings: &EmailSettings,
    report: &AnalysisReport,
    attachments: &[PathBuf],
) -> Result<Message> {
    if settings.recipients.is_empty() {
        return Err(AuditError::Delivery(
            "email.enabled is true but no recipients are configured".to_string(),
        ));
    }

    let mut builder = Message::builder()
        .from(mailbox(sender(settings))?)
        .subject(SUBJECT);
    for recipient in &settings.recipients {
        builder = builder.to(mailbox(recipient)?);
    }

    let octet_stream = ContentType::parse("application/octet-stream")
        .map_err(|e| AuditError::Delivery(e.to_string()))?;
    let mut body = MultiPart::mixed().singlepart(SinglePart::plain(summary_body(report)));
    for path in attachments {
        body = body.singlepart(attachment_part(path, octet_stream.clone())?);
    }

    builder
        .multipart(body)
        .map_err(|e| AuditError::Delivery(e.to_string()))
}

fn attachment_part(path: &Path, content_type: ContentType) -> Result<SinglePart> {
    let bytes = std::fs::read(path).map_err(|source| AuditError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "attachment".to_string());
    Ok(Attachment::new(name).body(bytes, content_type))
}

/// SMTP transport: STARTTLS when `use_tls`, otherwise plain.
fn transport(settings: &EmailSettings) -> Result<SmtpTransport> {
    let host = if settings.smtp_host.is_empty() {
        "localhost"
    } else {
        settings.smtp_host.as_str()
    };

    let mut builder = if settings.use_tls {
        SmtpTransport::starttls_relay(host).map_err(|e| AuditError::Delivery(e.to_string()))?
    } else {
        SmtpTransport::builder_dangerous(host)
    };
    builder = builder.port(settings.smtp_port).timeout(Some(SMTP_TIMEOUT));

    if !settings.smtp_user.is_empty() || !settings.smtp_password.is_empty() {
        builder = builder.credentials(Credentials::new(
            settings.smtp_user.clone(),
            settings.smtp_password.clone(),
        ));
    }
    Ok(builder.build())
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use audit_core::config::AuditConfig;
    use audit_core::models::Totals;
    use tempfile::TempDir;

    fn settings() -> EmailSettings {
        EmailSettings {
            enabled: true,
            recipients: vec!["ops@example.com".into(), "it@example.com".into()],
            from_address: "audit@example.com".into(),
            ..EmailSettings::default()
        }
    }

    fn formatted(message: &Message) -> String {
        String::from_utf8_lossy(&message.formatted()).into_owned()
    }

    // ── select_attachments ───────────────────────────────────────────────────

    #[test]
    fn test_select_attachments_by_extension() {
        let generated = vec![
            PathBuf::from("reports/queue.csv"),
            PathBuf::from("reports/printaudit.html"),
            PathBuf::from("reports/old.HTM"),
            PathBuf::from("reports/notes.txt"),
        ];
        let mut s = settings();

        assert!(select_attachments(&s, &generated).is_empty());

        s.attach_csv = true;
        assert_eq!(select_attachments(&s, &generated), vec![PathBuf::from("reports/queue.csv")]);

        s.attach_csv = false;
        s.attach_html = true;
        assert_eq!(
            select_attachments(&s, &generated),
            vec![
                PathBuf::from("reports/printaudit.html"),
                PathBuf::from("reports/old.HTM")
            ]
        );
    }

    // ── build_message ────────────────────────────────────────────────────────

    #[test]
    fn test_summary_body() {
        let report = AnalysisReport {
            totals: Totals {
                requests: 3,
                pages: 18,
                ..Totals::default()
            },
            ..AnalysisReport::default()
        };
        assert_eq!(
            summary_body(&report),
            "PrintAudit summary\nRequests: 3\nPages: 18\nWindow: - -> -\n"
        );
    }

    #[test]
    fn test_build_message_headers() {
        let message = build_message(&settings(), &AnalysisReport::default(), &[]).unwrap();
        let raw = formatted(&message);

        assert!(raw.contains("Subject: PrintAudit report"));
        assert!(raw.contains("audit@example.com"));
        assert!(raw.contains("ops@example.com"));
        assert!(raw.contains("it@example.com"));
        assert!(raw.contains("PrintAudit summary"));
    }

    #[test]
    fn test_sender_fallbacks() {
        let mut s = settings();
        assert_eq!(sender(&s), "audit@example.com");
        s.from_address.clear();
        s.smtp_user = "relay@example.com".into();
        assert_eq!(sender(&s), "relay@example.com");
        s.smtp_user.clear();
        assert_eq!(sender(&s), FALLBACK_SENDER);
    }

    #[test]
    fn test_build_message_without_recipients_fails() {
        let mut s = settings();
        s.recipients.clear();
        let err = build_message(&s, &AnalysisReport::default(), &[]).unwrap_err();
        assert!(matches!(err, AuditError::Delivery(_)));
    }

    #[test]
    fn test_build_message_rejects_invalid_recipient() {
        let mut s = settings();
        s.recipients = vec!["not an address".into()];
        let err = build_message(&s, &AnalysisReport::default(), &[]).unwrap_err();
        assert!(matches!(err, AuditError::Delivery(_)));
    }

    #[test]
    fn test_build_message_attaches_files() {
        let tmp = TempDir::new().expect("tempdir");
        let csv = tmp.path().join("queue.csv");
        std::fs::write(&csv, "queue,pages\n").unwrap();

        let message = build_message(&settings(), &AnalysisReport::default(), &[csv]).unwrap();
        let raw = formatted(&message);
        assert!(raw.contains("multipart/mixed"));
        assert!(raw.contains("queue.csv"));
        assert!(raw.contains("application/octet-stream"));
    }

    #[test]
    fn test_missing_attachment_is_error() {
        let tmp = TempDir::new().expect("tempdir");
        let missing = tmp.path().join("gone.csv");
        let err = build_message(&settings(), &AnalysisReport::default(), &[missing]).unwrap_err();
        assert!(matches!(err, AuditError::FileRead { .. }));
    }

    // ── render ───────────────────────────────────────────────────────────────

    #[test]
    fn test_disabled_email_is_noop() {
        let config = AuditConfig::default();
        let mut sink: Vec<u8> = Vec::new();
        let mut ctx = OutputContext::new(&config, &mut sink);
        assert!(render(&AnalysisReport::default(), &mut ctx).is_ok());
    }

    #[test]
    fn test_enabled_without_recipients_fails_before_connecting() {
        let mut config = AuditConfig::default();
        config.email.enabled = true;
        let mut sink: Vec<u8> = Vec::new();
        let mut ctx = OutputContext::new(&config, &mut sink);
        let err = render(&AnalysisReport::default(), &mut ctx).unwrap_err();
        assert!(matches!(err, AuditError::Delivery(_)));
    }
}
