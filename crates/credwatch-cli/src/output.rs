//! Terminal output helpers.

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;

use credwatch_core::{CreditsReport, TemplatesReport};

/// Print a success message.
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print an error message.
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a labeled field.
pub fn field(label: &str, value: &str) {
    println!("{}: {}", label.dimmed(), value);
}

/// Print a value as pretty-printed JSON.
pub fn json_pretty<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn credits(report: &CreditsReport) {
    let balance = report.reading.credits.to_string();
    if report.alerted {
        println!("{} {}", "!".yellow().bold(), "Credit balance is low".yellow());
        field("Credits", &balance.yellow().to_string());
    } else {
        field("Credits", &balance);
    }
    field("Checked", &report.reading.observed_at.to_rfc3339());
}

pub fn templates(report: &TemplatesReport) {
    field("Templates", &report.templates.len().to_string());
    if report.recent_disabled.is_empty() {
        field("Recently disabled", "none");
        return;
    }

    field(
        "Recently disabled",
        &report.recent_disabled.len().to_string().red().to_string(),
    );
    for record in &report.recent_disabled {
        println!(
            "  {} {} ({})",
            "-".red(),
            record.name,
            record.rejected_reason.as_deref().unwrap_or("no reason given")
        );
    }
}
