//! Rendering search and download results for the terminal

use std::io::{self, Write};

use mediagrab::{DisplayItem, DownloadResult, SearchReport, SourceStatus, CREDENTIAL_ENV_VARS, SUPPORTED_SOURCES};

fn status_icon(status: &SourceStatus) -> &'static str {
    match status {
        SourceStatus::Found(_) => "✅",
        SourceStatus::NoItems => "➖",
        SourceStatus::Failed { .. } => "❌",
    }
}

/// Per-source status lines
pub fn write_statuses<W: Write>(out: &mut W, report: &SearchReport) -> io::Result<()> {
    for (source, status) in &report.statuses {
        writeln!(out, "{} {source}: {status}", status_icon(status))?;
    }
    if report.skipped > 0 {
        writeln!(out, "⚠️  {} item(s) skipped: missing or invalid media URL", report.skipped)?;
    }
    Ok(())
}

/// Numbered item listing
pub fn write_items<W: Write>(out: &mut W, items: &[DisplayItem]) -> io::Result<()> {
    for (i, item) in items.iter().enumerate() {
        writeln!(out, "{:>3}. {item}", i + 1)?;
        writeln!(out, "     {}", item.url)?;
    }
    Ok(())
}

/// One line per download outcome
pub fn write_results<W: Write>(out: &mut W, results: &[DownloadResult]) -> io::Result<()> {
    for result in results {
        match &result.outcome {
            Ok(saved) => writeln!(
                out,
                "✅ {} -> {} ({})",
                result.filename,
                saved.path.display(),
                mediagrab::format_size(saved.bytes)
            )?,
            Err(failure) => writeln!(
                out,
                "❌ {} [{}]: {} ({} attempt(s))",
                result.filename, failure.kind, failure.message, failure.attempts
            )?,
        }
    }
    let ok = results.iter().filter(|r| r.is_success()).count();
    writeln!(out, "📦 {ok}/{} item(s) downloaded", results.len())
}

/// Registry listing for `--list-sources`
pub fn write_sources<W: Write>(out: &mut W) -> io::Result<()> {
    for source in SUPPORTED_SOURCES {
        match CREDENTIAL_ENV_VARS.iter().find(|(s, _)| s == source) {
            Some((_, var)) => writeln!(out, "{source:<10} (credential: {var})")?,
            None => writeln!(out, "{source}")?,
        }
    }
    Ok(())
}
