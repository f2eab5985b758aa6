use anyhow::Result;
use std::path::Path;

/// Run from the post-commit hook. Stays quiet unless something is worth
/// saying, and never makes the commit itself fail.
pub fn run(path: &Path) -> Result<()> {
    let journal = super::open_journal()?;

    match journal.on_new_commit(path) {
        Ok(report) => {
            if let Some(discontinuity) = &report.discontinuity {
                eprintln!("gitjournal: {}", discontinuity);
            }
        }
        Err(e) => {
            tracing::error!("post-commit journal update failed: {}", e);
            eprintln!("gitjournal: {}", e);
        }
    }

    Ok(())
}
