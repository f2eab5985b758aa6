use anyhow::Result;
use colored::Colorize;

pub fn run() -> Result<()> {
    let journal = super::open_journal()?;
    let entries = journal.list()?;

    if entries.is_empty() {
        println!("{}", "No repositories tracked yet".yellow());
        return Ok(());
    }

    println!(
        "{} {}",
        "Tracked repositories".bold().cyan(),
        format!("({})", entries.len()).yellow()
    );
    println!();

    for entry in &entries {
        let cursor = journal.state().get_cursor(&entry.repo_id)?;

        let name = if entry.exists() {
            entry.display_name.bold()
        } else {
            entry.display_name.red().bold()
        };
        println!("{} {}", name, entry.repo_id.dimmed());
        println!("  {}: {}", "Path".bold(), entry.path.display());
        if !entry.exists() {
            println!("  {}", "missing on disk".red());
        }
        match cursor {
            Some(cursor) => println!(
                "  {}: {} ({})",
                "Journaled up to".bold(),
                super::short(&cursor.last_processed_hash).yellow(),
                cursor.last_processed_date.format("%Y-%m-%d %H:%M")
            ),
            None => println!("  {}", "never journaled".dimmed()),
        }
        if entry.exists() {
            match (journal.hook_present(entry), entry.hook_installed) {
                (true, _) => println!("  {}", "hook installed".green()),
                (false, true) => println!("  {}", "hook removed since install".yellow()),
                (false, false) => {}
            }
        }
    }

    Ok(())
}
