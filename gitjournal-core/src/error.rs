use chrono::{DateTime, FixedOffset};
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Configuration could not be encoded: {0}")]
    ConfigEncode(#[from] toml::ser::Error),

    #[error("Repository unavailable at {}: {reason}", path.display())]
    RepositoryUnavailable { path: PathBuf, reason: String },

    #[error("Not a git repository: {}", .0.display())]
    NotAGitRepository(PathBuf),

    #[error(
        "Cursor for {repo_id} would move backwards from {stored} to {attempted} \
         (history rewritten? rerun with --force to accept it)"
    )]
    NonMonotonicUpdate {
        repo_id: String,
        stored: DateTime<FixedOffset>,
        attempted: DateTime<FixedOffset>,
    },

    #[error("Journal state at {} is corrupt: {reason}", path.display())]
    StateCorruption { path: PathBuf, reason: String },

    #[error("Repository not tracked: {0}")]
    RepositoryNotTracked(String),

    #[error("A post-commit hook not managed by gitjournal already exists: {}", .0.display())]
    HookConflict(PathBuf),
}

impl Error {
    pub(crate) fn unavailable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Error::RepositoryUnavailable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Error::StateCorruption {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
