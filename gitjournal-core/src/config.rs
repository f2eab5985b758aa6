//! Global configuration for gitjournal
//!
//! Read from `config.toml` in the journal home. Every key is optional and
//! falls back to its default, so a missing file is the same as an empty one.
use crate::categorize::Categorizer;
use crate::error::Result;
use crate::models::Category;
use crate::storage;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Devlog file name inside each repository
    #[serde(default = "default_devlog_filename")]
    pub default_devlog_filename: String,

    /// Changelog file name inside each repository
    #[serde(default = "default_changelog_filename")]
    pub default_changelog_filename: String,

    /// Newest entries kept in a rendered devlog
    #[serde(default = "default_max_commits_in_devlog")]
    pub max_commits_in_devlog: usize,

    /// Commits read when there is no usable cursor
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    /// Commit the regenerated journal files back into the repository
    #[serde(default)]
    pub auto_commit_devlog: bool,

    /// Directory levels searched by `scan`
    #[serde(default = "default_scan_max_depth")]
    pub scan_max_depth: usize,

    /// Leave merge commits out of journals
    #[serde(default = "default_skip_merge_commits")]
    pub skip_merge_commits: bool,

    /// Commits read per repository for the combined devlog
    #[serde(default = "default_aggregate_commits_per_repo")]
    pub aggregate_commits_per_repo: usize,

    /// Entries kept in the combined devlog
    #[serde(default = "default_aggregate_max_entries")]
    pub aggregate_max_entries: usize,

    /// Extra `prefix = "Category"` pairs, applied over the built-in table.
    /// Kept last so it serializes as a trailing TOML table.
    #[serde(default)]
    pub category_prefix_overrides: IndexMap<String, Category>,
}

fn default_devlog_filename() -> String {
    "DEVLOG.md".to_string()
}

fn default_changelog_filename() -> String {
    "CHANGELOG.md".to_string()
}

fn default_max_commits_in_devlog() -> usize {
    50
}

fn default_history_window() -> usize {
    200
}

fn default_scan_max_depth() -> usize {
    3
}

fn default_skip_merge_commits() -> bool {
    true
}

fn default_aggregate_commits_per_repo() -> usize {
    20
}

fn default_aggregate_max_entries() -> usize {
    100
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_devlog_filename: default_devlog_filename(),
            default_changelog_filename: default_changelog_filename(),
            max_commits_in_devlog: default_max_commits_in_devlog(),
            history_window: default_history_window(),
            auto_commit_devlog: false,
            scan_max_depth: default_scan_max_depth(),
            skip_merge_commits: default_skip_merge_commits(),
            aggregate_commits_per_repo: default_aggregate_commits_per_repo(),
            aggregate_max_entries: default_aggregate_max_entries(),
            category_prefix_overrides: IndexMap::new(),
        }
    }
}

impl Config {
    /// Load configuration, using defaults when the file does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        tracing::debug!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        storage::write_atomic(path, content.as_bytes())
    }

    pub fn categorizer(&self) -> Categorizer {
        Categorizer::with_overrides(
            self.category_prefix_overrides
                .iter()
                .map(|(prefix, category)| (prefix, *category)),
        )
    }
}
