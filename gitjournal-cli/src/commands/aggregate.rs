use anyhow::Result;
use colored::Colorize;

pub fn run() -> Result<()> {
    let journal = super::open_journal()?;

    if journal.list()?.is_empty() {
        println!("{}", "No repositories tracked yet".yellow());
        println!("Run {} in your repositories first", "gitjournal init".cyan());
        return Ok(());
    }

    let report = journal.aggregate()?;

    for (entry, reason) in &report.skipped {
        println!(
            "{} {} - {}",
            "skipped".yellow(),
            entry.display_name.bold(),
            reason
        );
    }

    println!(
        "{} {} ({} entries from {} repositories)",
        "✓ Wrote".green(),
        report.output.display(),
        report.entries.to_string().yellow(),
        report.repositories
    );

    Ok(())
}
