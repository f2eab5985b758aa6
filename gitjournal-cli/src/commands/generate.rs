use anyhow::Result;
use gitjournal_core::GenerateOptions;
use std::path::Path;

pub fn run(path: &Path, changelog: bool, force: bool) -> Result<()> {
    let journal = super::open_journal()?;
    let entry = super::repository_at(&journal, path)?;

    let report = journal.generate(&entry, GenerateOptions { changelog, force })?;
    super::print_generation(&report);

    Ok(())
}
