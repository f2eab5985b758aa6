use anyhow::Result;
use colored::Colorize;

pub fn run(repo: &str) -> Result<()> {
    let journal = super::open_journal()?;

    let Some(entry) = journal.untrack(repo)? else {
        println!("{} {}", repo.bold(), "is not tracked".dimmed());
        return Ok(());
    };

    println!(
        "{} {} ({})",
        "Stopped tracking".green(),
        entry.display_name.bold(),
        entry.path.display()
    );
    println!(
        "{}",
        "Journal files inside the repository were left in place.".dimmed()
    );

    Ok(())
}
