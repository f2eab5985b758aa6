pub mod aggregate;
pub mod export;
pub mod generate;
pub mod generate_all;
pub mod hook;
pub mod init;
pub mod install_hook;
pub mod list;
pub mod scan;
pub mod untrack;

use anyhow::{Context, Result};
use colored::Colorize;
use gitjournal_core::{GenerationReport, Journal, RepositoryEntry};
use std::path::Path;

pub fn open_journal() -> Result<Journal> {
    Journal::open_default().context("Failed to open the gitjournal home")
}

/// The tracked entry for the repository containing `path`, registering it
/// on first use.
pub fn repository_at(journal: &Journal, path: &Path) -> Result<RepositoryEntry> {
    let registration = journal
        .track(path)
        .with_context(|| format!("No git repository at {}", path.display()))?;
    if registration.newly_added {
        println!(
            "{} {}",
            "Now tracking".green(),
            registration.entry.display_name.bold()
        );
    }
    Ok(registration.entry)
}

pub fn print_generation(report: &GenerationReport) {
    if let Some(discontinuity) = &report.discontinuity {
        println!("{} {}", "warning:".yellow().bold(), discontinuity);
    }

    if report.is_noop() {
        println!(
            "{} {}",
            report.display_name.bold(),
            "is up to date".dimmed()
        );
        return;
    }

    println!(
        "{} {} ({} new commit(s))",
        "✓".green(),
        report.display_name.bold(),
        report.new_commits.to_string().yellow()
    );
    for path in &report.written {
        println!("  {}: {}", "Wrote".bold(), path.display());
    }
    if let Some(hash) = &report.journal_commit {
        println!("  {}: {}", "Committed".bold(), short(hash).cyan());
    }
}

pub fn short(hash: &str) -> &str {
    hash.get(..7).unwrap_or(hash)
}
