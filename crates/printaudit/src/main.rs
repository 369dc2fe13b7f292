mod bootstrap;

use std::io::{self, IsTerminal, Write};

use anyhow::{Context, Result};
use audit_core::config::{AuditConfig, CliMode};
use audit_core::settings::Settings;
use audit_data::aggregator::AggregatorSettings;
use audit_data::analysis::{analyze_page_log, DateRange};
use audit_output::{render_outputs, OutputContext};

fn main() -> Result<()> {
    let settings = Settings::load();

    if settings.list_outputs {
        println!("{}", bootstrap::output_listing());
        return Ok(());
    }

    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_deref())?;
    tracing::info!("PrintAudit v{} starting", env!("CARGO_PKG_VERSION"));

    let mut config =
        AuditConfig::load(settings.config.as_deref()).context("failed to load configuration")?;
    settings
        .apply_to(&mut config)
        .context("invalid command-line override")?;

    if settings.dry_run {
        print!("{}", bootstrap::describe_config(&config));
        return Ok(());
    }

    let range = DateRange::new(settings.start_date, settings.end_date);
    if !range.is_unbounded() {
        tracing::info!(
            "Filtering jobs between {} and {}",
            range.start.map_or_else(|| "-".to_string(), |d| d.to_string()),
            range.end.map_or_else(|| "-".to_string(), |d| d.to_string())
        );
    }

    let outcome = analyze_page_log(
        &config.page_log_path,
        AggregatorSettings::from(&config),
        range,
    )
    .with_context(|| format!("cannot analyze {}", config.page_log_path.display()))?;
    tracing::info!(
        "Read {} lines ({} skipped), {} entries ingested in {:.3}s",
        outcome.metadata.lines_read,
        outcome.metadata.lines_skipped,
        outcome.metadata.entries_ingested,
        outcome.metadata.elapsed_seconds
    );

    let stdout = io::stdout();
    let color = stdout.is_terminal() && config.cli_mode == CliMode::Rich;
    let mut out = stdout.lock();
    let mut ctx = OutputContext::new(&config, &mut out).with_color(color);
    let failures = render_outputs(&config.outputs, &outcome.report, &mut ctx);
    let attachments = std::mem::take(&mut ctx.attachments);
    drop(ctx);

    if !attachments.is_empty() {
        writeln!(out, "Artifacts generated:")?;
        for path in &attachments {
            writeln!(out, "  {}", path.display())?;
        }
    }
    out.flush()?;

    if !failures.is_empty() {
        tracing::warn!("{} output module(s) failed", failures.len());
    }
    Ok(())
}
