use anyhow::Result;
use colored::Colorize;
use gitjournal_core::GenerateOptions;
use indicatif::{ProgressBar, ProgressStyle};

pub fn run(changelog: bool) -> Result<()> {
    let journal = super::open_journal()?;

    let bar = ProgressBar::new(0);
    bar.set_style(ProgressStyle::with_template(
        "{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}",
    )?);

    let options = GenerateOptions {
        changelog,
        force: false,
    };
    let summary = journal.generate_all(options, |entry, index, total| {
        bar.set_length(total as u64);
        bar.set_position(index as u64);
        bar.set_message(entry.display_name.clone());
    })?;
    bar.finish_and_clear();

    if summary.succeeded.is_empty() && summary.failed.is_empty() {
        println!("{}", "No repositories tracked yet".yellow());
        return Ok(());
    }

    for report in &summary.succeeded {
        super::print_generation(report);
    }
    for (entry, e) in &summary.failed {
        println!("{} {} - {}", "✗".red(), entry.display_name.bold(), e);
    }

    println!();
    println!(
        "{} succeeded, {} failed",
        summary.succeeded.len().to_string().green(),
        summary.failed.len().to_string().red()
    );

    if !summary.failed.is_empty() {
        anyhow::bail!("{} repositories failed", summary.failed.len());
    }
    Ok(())
}
