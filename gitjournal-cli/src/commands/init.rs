use anyhow::Result;
use colored::Colorize;
use std::path::Path;

pub fn run(path: &Path, install_hook: bool) -> Result<()> {
    let journal = super::open_journal()?;
    let report = journal.init_repo(path, install_hook)?;
    let entry = &report.entry;

    println!("{}", "Journal initialized".bold().cyan());
    println!("  {}: {}", "Repository".bold(), entry.display_name);
    println!("  {}: {}", "Path".bold(), entry.path.display());
    println!("  {}: {}", "ID".bold(), entry.repo_id);
    println!("  {}: {}", "Devlog".bold(), entry.devlog_path.display());
    if !report.newly_added {
        println!("  {}", "(already tracked, cursor reset)".dimmed());
    }
    println!();

    super::print_generation(&report.generation);

    match &report.hook {
        Some(hook) => println!("{} {}", "Installed hook".green(), hook.display()),
        None => println!(
            "Run {} to update the devlog on every commit",
            "gitjournal install-hook".cyan()
        ),
    }

    Ok(())
}
