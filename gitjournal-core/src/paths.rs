//! Layout of the journal home directory.
//!
//! Everything gitjournal persists outside of the repositories themselves lives
//! under one directory, `$GITJOURNAL_HOME` or `~/.gitjournal`:
//!
//! ```text
//! config.toml            global configuration
//! repos.json             repository registry
//! cursors/<repo_id>.json one journal cursor per repository
//! locks/*.lock           advisory locks guarding the files above
//! COMBINED_DEVLOG.md     output of `gitjournal aggregate`
//! ```

use std::path::{Path, PathBuf};

pub const HOME_ENV: &str = "GITJOURNAL_HOME";

const REGISTRY_LOCK: &str = "registry";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalHome {
    root: PathBuf,
}

impl JournalHome {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `$GITJOURNAL_HOME`, falling back to `~/.gitjournal`.
    pub fn from_env() -> Self {
        let root = std::env::var_os(HOME_ENV)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(".gitjournal")
            });
        Self::new(root)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.toml")
    }

    pub fn registry_file(&self) -> PathBuf {
        self.root.join("repos.json")
    }

    pub fn cursor_file(&self, repo_id: &str) -> PathBuf {
        self.root.join("cursors").join(format!("{}.json", repo_id))
    }

    pub fn cursor_lock(&self, repo_id: &str) -> PathBuf {
        self.lock_file(repo_id)
    }

    pub fn registry_lock(&self) -> PathBuf {
        self.lock_file(REGISTRY_LOCK)
    }

    pub fn combined_devlog(&self) -> PathBuf {
        self.root.join("COMBINED_DEVLOG.md")
    }

    fn lock_file(&self, name: &str) -> PathBuf {
        self.root.join("locks").join(format!("{}.lock", name))
    }
}
