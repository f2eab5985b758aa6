use anyhow::Result;
use colored::Colorize;
use std::path::Path;

pub fn run(path: &Path) -> Result<()> {
    let journal = super::open_journal()?;
    let entry = super::repository_at(&journal, path)?;

    let hook = journal.install_hook(&entry)?;
    println!("{} {}", "✓ Installed".green(), hook.display());
    println!(
        "{}",
        "The devlog now updates after every commit.".dimmed()
    );

    Ok(())
}
