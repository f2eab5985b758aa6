use anyhow::Result;
use colored::Colorize;
use dialoguer::Confirm;
use gitjournal_core::ScanReport;
use std::path::Path;

pub fn run(dir: &Path, depth: Option<usize>, yes: bool) -> Result<()> {
    let journal = super::open_journal()?;
    let depth = depth.unwrap_or(journal.config().scan_max_depth);

    println!(
        "{} {} (depth {})",
        "Scanning".bold().cyan(),
        dir.display(),
        depth
    );

    if yes {
        let report = journal.scan(dir, Some(depth))?;
        print_report(&report);
        return Ok(());
    }

    let found = journal.discover(dir, Some(depth))?;
    if found.is_empty() {
        println!("{}", "No git repositories found".yellow());
        return Ok(());
    }

    println!(
        "{} {}",
        "Found".bold(),
        format!("{} repositories:", found.len()).yellow()
    );
    for path in &found {
        println!("  {}", path.display());
    }
    println!();

    let proceed = Confirm::new()
        .with_prompt("Track these repositories?")
        .default(true)
        .interact()?;
    if !proceed {
        println!("{}", "Nothing tracked".dimmed());
        return Ok(());
    }

    let report = journal.register_all(found);
    print_report(&report);

    Ok(())
}

fn print_report(report: &ScanReport) {
    for entry in &report.registered {
        println!("  {} {}", "✓".green(), entry.display_name);
    }
    for entry in &report.already_tracked {
        println!(
            "  {} {} {}",
            "·".dimmed(),
            entry.display_name,
            "(already tracked)".dimmed()
        );
    }
    for (path, e) in &report.failed {
        println!("  {} {} - {}", "✗".red(), path.display(), e);
    }

    println!();
    println!(
        "{} new, {} already tracked, {} failed",
        report.registered.len().to_string().green(),
        report.already_tracked.len(),
        report.failed.len().to_string().red()
    );
    if !report.registered.is_empty() {
        println!("Run {} to write their journals", "gitjournal generate-all".cyan());
    }
}
