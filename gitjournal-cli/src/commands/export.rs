use anyhow::Result;
use colored::Colorize;
use std::path::Path;

pub fn run(path: &Path) -> Result<()> {
    let journal = super::open_journal()?;
    let entry = super::repository_at(&journal, path)?;

    let output = journal.export_html(&entry)?;
    println!("{} {}", "✓ Exported".green(), output.display());

    Ok(())
}
