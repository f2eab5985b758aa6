//! Repository Registry: the set of tracked repositories.
//!
//! Persisted as one JSON document, `repos.json`, keyed by repo_id. Every
//! mutation loads the document, applies the change and writes it back
//! atomically while holding the registry lock.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::history::HistoryProvider;
use crate::models::{repo_id_for, RepositoryEntry};
use crate::paths::JournalHome;
use crate::state::StateStore;
use crate::storage::{self, FileLock};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Directory names never searched for repositories.
const SKIPPED_DIRS: &[&str] = &[
    "node_modules",
    "venv",
    "env",
    "__pycache__",
    "vendor",
    "build",
    "dist",
    "target",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct RegistryDocument {
    #[serde(default)]
    repos: BTreeMap<String, RepositoryEntry>,
}

/// Result of [`Registry::register`].
#[derive(Debug, Clone)]
pub struct Registration {
    pub entry: RepositoryEntry,
    /// False when the path was already tracked.
    pub newly_added: bool,
}

/// Result of [`Registry::scan`].
#[derive(Debug, Default)]
pub struct ScanReport {
    pub registered: Vec<RepositoryEntry>,
    pub already_tracked: Vec<RepositoryEntry>,
    pub failed: Vec<(PathBuf, Error)>,
}

#[derive(Debug, Clone)]
pub struct Registry {
    home: JournalHome,
}

impl Registry {
    pub fn new(home: JournalHome) -> Self {
        Self { home }
    }

    fn load(&self) -> Result<RegistryDocument> {
        Ok(storage::read_json(&self.home.registry_file())?.unwrap_or_default())
    }

    /// Read-modify-write under the registry lock. The document is only
    /// written back if `f` changed it.
    fn update<T>(&self, f: impl FnOnce(&mut RegistryDocument) -> Result<T>) -> Result<T> {
        let _lock = FileLock::acquire(&self.home.registry_lock())?;
        let original = self.load()?;
        let mut document = original.clone();

        let value = f(&mut document)?;
        if document != original {
            storage::write_json(&self.home.registry_file(), &document)?;
        }
        Ok(value)
    }

    /// Track the repository at `path`. Registering a path that is already
    /// tracked returns the existing entry.
    pub fn register(
        &self,
        path: &Path,
        provider: &dyn HistoryProvider,
        config: &Config,
    ) -> Result<Registration> {
        let canonical = path
            .canonicalize()
            .map_err(|_| Error::NotAGitRepository(path.to_path_buf()))?;
        if !provider.is_repository(&canonical) {
            return Err(Error::NotAGitRepository(canonical));
        }

        let repo_id = repo_id_for(&canonical);
        if let Some(existing) = self.get(&repo_id)? {
            return Ok(Registration {
                entry: existing,
                newly_added: false,
            });
        }

        let display_name = provider
            .origin_name(&canonical)
            .or_else(|| {
                canonical
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
            })
            .unwrap_or_else(|| canonical.display().to_string());

        self.update(|document| {
            // Another process may have won the race since `get`.
            if let Some(existing) = document.repos.get(&repo_id) {
                return Ok(Registration {
                    entry: existing.clone(),
                    newly_added: false,
                });
            }

            let entry = RepositoryEntry::new(
                canonical.clone(),
                display_name,
                &config.default_devlog_filename,
                &config.default_changelog_filename,
            );
            tracing::info!("Registered {} at {:?} as {}", entry.display_name, canonical, repo_id);
            document.repos.insert(repo_id.clone(), entry.clone());
            Ok(Registration {
                entry,
                newly_added: true,
            })
        })
    }

    /// Repository roots at most `max_depth` levels below `root`, sorted.
    ///
    /// A repository is a leaf: nothing inside it is searched.
    pub fn discover(root: &Path, max_depth: usize) -> Result<Vec<PathBuf>> {
        if !root.is_dir() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} is not a directory", root.display()),
            )
            .into());
        }

        let mut found = Vec::new();
        let mut walker = WalkDir::new(root)
            .max_depth(max_depth)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_skipped_dir(e));

        while let Some(entry) = walker.next() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable path during scan: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_dir() {
                continue;
            }
            if entry.path().join(".git").exists() {
                found.push(entry.path().to_path_buf());
                walker.skip_current_dir();
            }
        }

        found.sort();
        tracing::debug!("Discovered {} repositories under {:?}", found.len(), root);
        Ok(found)
    }

    /// Discover repositories under `root` and register each one. Only a bad
    /// `root` fails the whole scan.
    pub fn scan(
        &self,
        root: &Path,
        max_depth: usize,
        provider: &dyn HistoryProvider,
        config: &Config,
    ) -> Result<ScanReport> {
        let paths = Self::discover(root, max_depth)?;
        Ok(self.register_all(paths, provider, config))
    }

    /// Register every path, collecting failures instead of stopping at the
    /// first one.
    pub fn register_all(
        &self,
        paths: impl IntoIterator<Item = PathBuf>,
        provider: &dyn HistoryProvider,
        config: &Config,
    ) -> ScanReport {
        let mut report = ScanReport::default();

        for path in paths {
            match self.register(&path, provider, config) {
                Ok(Registration {
                    entry,
                    newly_added: true,
                }) => report.registered.push(entry),
                Ok(Registration { entry, .. }) => report.already_tracked.push(entry),
                Err(e) => {
                    tracing::warn!("Could not register {:?}: {}", path, e);
                    report.failed.push((path, e));
                }
            }
        }

        report
    }

    /// Tracked repositories ordered by display name (case-insensitive), then
    /// repo_id.
    pub fn list(&self) -> Result<Vec<RepositoryEntry>> {
        let mut entries: Vec<_> = self.load()?.repos.into_values().collect();
        entries.sort_by(|a, b| {
            a.display_name
                .to_lowercase()
                .cmp(&b.display_name.to_lowercase())
                .then_with(|| a.repo_id.cmp(&b.repo_id))
        });
        Ok(entries)
    }

    pub fn get(&self, repo_id: &str) -> Result<Option<RepositoryEntry>> {
        Ok(self.load()?.repos.remove(repo_id))
    }

    /// Entry whose resolved path equals `path` resolved.
    pub fn find_by_path(&self, path: &Path) -> Result<Option<RepositoryEntry>> {
        let resolved = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        self.get(&repo_id_for(&resolved))
    }

    /// Stop tracking a repository and drop its cursor. Returns the removed
    /// entry, `None` if it was not tracked.
    pub fn unregister(&self, repo_id: &str) -> Result<Option<RepositoryEntry>> {
        let removed = self.update(|document| Ok(document.repos.remove(repo_id)))?;
        StateStore::new(self.home.clone()).remove_cursor(repo_id)?;

        if let Some(entry) = &removed {
            tracing::info!("Unregistered {} ({})", entry.display_name, repo_id);
        }
        Ok(removed)
    }

    pub fn mark_hook_installed(&self, repo_id: &str) -> Result<()> {
        self.update(|document| match document.repos.get_mut(repo_id) {
            Some(entry) => {
                entry.hook_installed = true;
                Ok(())
            }
            None => Err(Error::RepositoryNotTracked(repo_id.to_string())),
        })
    }
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }
    match entry.file_name().to_str() {
        Some(name) => name.starts_with('.') || SKIPPED_DIRS.contains(&name),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::tests::TestRepo;
    use crate::history::GitHistory;
    use crate::models::Cursor;
    use chrono::DateTime;
    use git2::Repository;
    use std::fs;
    use tempfile::TempDir;

    fn registry() -> (TempDir, Registry) {
        let dir = TempDir::new().unwrap();
        let registry = Registry::new(JournalHome::new(dir.path()));
        (dir, registry)
    }

    fn init_repo(path: &Path) {
        fs::create_dir_all(path).unwrap();
        Repository::init(path).unwrap();
    }

    #[test]
    fn test_register_is_idempotent() {
        let (_home, registry) = registry();
        let repo = TestRepo::new();
        let history = GitHistory::new();
        let config = Config::default();

        let first = registry.register(repo.path(), &history, &config).unwrap();
        assert!(first.newly_added);
        assert!(first.entry.path.is_absolute());
        assert_eq!(first.entry.devlog_path, first.entry.path.join("DEVLOG.md"));

        let second = registry.register(repo.path(), &history, &config).unwrap();
        assert!(!second.newly_added);
        assert_eq!(second.entry, first.entry);
        assert_eq!(registry.list().unwrap().len(), 1);
    }

    #[test]
    fn test_display_name_prefers_origin() {
        let (_home, registry) = registry();
        let repo = TestRepo::new();
        repo.repo
            .remote("origin", "https://github.com/someone/widgets.git")
            .unwrap();

        let registration = registry
            .register(repo.path(), &GitHistory::new(), &Config::default())
            .unwrap();
        assert_eq!(registration.entry.display_name, "widgets");
    }

    #[test]
    fn test_display_name_falls_back_to_directory() {
        let (_home, registry) = registry();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("my-project");
        init_repo(&path);

        let registration = registry
            .register(&path, &GitHistory::new(), &Config::default())
            .unwrap();
        assert_eq!(registration.entry.display_name, "my-project");
    }

    #[test]
    fn test_register_rejects_non_repositories() {
        let (_home, registry) = registry();
        let dir = TempDir::new().unwrap();
        let history = GitHistory::new();
        let config = Config::default();

        assert!(matches!(
            registry.register(dir.path(), &history, &config),
            Err(Error::NotAGitRepository(_))
        ));
        assert!(matches!(
            registry.register(&dir.path().join("missing"), &history, &config),
            Err(Error::NotAGitRepository(_))
        ));
        assert!(registry.list().unwrap().is_empty());
    }

    #[test]
    fn test_discover_stops_at_repository_boundary() {
        let dir = TempDir::new().unwrap();
        let outer = dir.path().join("outer");
        init_repo(&outer);
        init_repo(&outer.join("nested"));

        let found = Registry::discover(dir.path(), 1).unwrap();
        assert_eq!(found, vec![outer.clone()]);

        // Deeper search still treats the outer repository as a leaf.
        let found = Registry::discover(dir.path(), 3).unwrap();
        assert_eq!(found, vec![outer]);
    }

    #[test]
    fn test_discover_respects_depth_and_skips() {
        let dir = TempDir::new().unwrap();
        let shallow = dir.path().join("b-shallow");
        let deep = dir.path().join("group").join("a-deep");
        init_repo(&shallow);
        init_repo(&deep);
        init_repo(&dir.path().join("node_modules").join("dep"));
        init_repo(&dir.path().join(".hidden").join("repo"));

        assert_eq!(Registry::discover(dir.path(), 1).unwrap(), vec![shallow.clone()]);

        let found = Registry::discover(dir.path(), 2).unwrap();
        assert_eq!(found, vec![shallow, deep]);
    }

    #[test]
    fn test_discover_missing_root_is_io_error() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            Registry::discover(&dir.path().join("nope"), 2),
            Err(Error::Io(_))
        ));
    }

    #[test]
    fn test_scan_reports_new_and_known() {
        let (_home, registry) = registry();
        let dir = TempDir::new().unwrap();
        init_repo(&dir.path().join("one"));
        init_repo(&dir.path().join("two"));
        let history = GitHistory::new();
        let config = Config::default();

        registry
            .register(&dir.path().join("one"), &history, &config)
            .unwrap();
        let report = registry.scan(dir.path(), 2, &history, &config).unwrap();

        assert_eq!(report.registered.len(), 1);
        assert_eq!(report.registered[0].display_name, "two");
        assert_eq!(report.already_tracked.len(), 1);
        assert!(report.failed.is_empty());
    }

    #[test]
    fn test_register_all_collects_failures() {
        let (_home, registry) = registry();
        let dir = TempDir::new().unwrap();
        let good = dir.path().join("good");
        init_repo(&good);
        let plain = dir.path().join("plain");
        fs::create_dir_all(&plain).unwrap();

        let report = registry.register_all(
            vec![good, plain.clone()],
            &GitHistory::new(),
            &Config::default(),
        );
        assert_eq!(report.registered.len(), 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, plain);
        assert!(matches!(report.failed[0].1, Error::NotAGitRepository(_)));
    }

    #[test]
    fn test_list_is_sorted_case_insensitively() {
        let (_home, registry) = registry();
        let dir = TempDir::new().unwrap();
        for name in ["beta", "Alpha", "gamma"] {
            init_repo(&dir.path().join(name));
        }
        registry
            .scan(dir.path(), 1, &GitHistory::new(), &Config::default())
            .unwrap();

        let names: Vec<_> = registry
            .list()
            .unwrap()
            .into_iter()
            .map(|e| e.display_name)
            .collect();
        assert_eq!(names, vec!["Alpha", "beta", "gamma"]);
    }

    #[test]
    fn test_unregister_removes_entry_and_cursor() {
        let dir = TempDir::new().unwrap();
        let home = JournalHome::new(dir.path().join("home"));
        let registry = Registry::new(home.clone());
        let repo = TestRepo::new();

        let entry = registry
            .register(repo.path(), &GitHistory::new(), &Config::default())
            .unwrap()
            .entry;
        let state = StateStore::new(home);
        state
            .advance_cursor(
                &entry.repo_id,
                "0123456789abcdef",
                DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z").unwrap(),
                false,
            )
            .unwrap();

        assert_eq!(registry.find_by_path(repo.path()).unwrap(), Some(entry.clone()));
        assert_eq!(registry.unregister(&entry.repo_id).unwrap(), Some(entry.clone()));
        assert!(registry.get(&entry.repo_id).unwrap().is_none());
        assert_eq!(state.get_cursor(&entry.repo_id).unwrap(), None::<Cursor>);

        assert!(registry.unregister(&entry.repo_id).unwrap().is_none());
    }

    #[test]
    fn test_mark_hook_installed() {
        let (_home, registry) = registry();
        let repo = TestRepo::new();
        let entry = registry
            .register(repo.path(), &GitHistory::new(), &Config::default())
            .unwrap()
            .entry;
        assert!(!entry.hook_installed);

        registry.mark_hook_installed(&entry.repo_id).unwrap();
        assert!(registry.get(&entry.repo_id).unwrap().unwrap().hook_installed);

        assert!(matches!(
            registry.mark_hook_installed("unknown"),
            Err(Error::RepositoryNotTracked(_))
        ));
    }

    #[test]
    fn test_entry_survives_missing_directory() {
        let (_home, registry) = registry();
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("doomed");
        init_repo(&path);
        let entry = registry
            .register(&path, &GitHistory::new(), &Config::default())
            .unwrap()
            .entry;

        fs::remove_dir_all(&path).unwrap();
        let listed = registry.list().unwrap();
        assert_eq!(listed.len(), 1);
        assert!(!listed[0].exists());
        assert_eq!(listed[0].repo_id, entry.repo_id);
    }

    #[test]
    fn test_malformed_registry_is_corruption() {
        let (home, registry) = registry();
        fs::write(home.path().join("repos.json"), "[1, 2").unwrap();

        assert!(matches!(registry.list(), Err(Error::StateCorruption { .. })));
    }
}
