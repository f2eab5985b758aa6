//! Journal State Store: one persisted cursor per repository.
//!
//! A cursor names the newest commit that has been journaled. Every
//! read-modify-write of a cursor happens under that repository's lock file,
//! so two invocations against the same repository serialize while other
//! repositories are untouched.

use crate::error::{Error, Result};
use crate::models::{CommitRecord, Cursor};
use crate::paths::JournalHome;
use crate::storage::{self, FileLock};
use chrono::{DateTime, FixedOffset};
use std::path::PathBuf;

/// Outcome of [`StateStore::advance_cursor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CursorUpdate {
    /// First cursor for this repository.
    Created(Cursor),
    Advanced { previous: Cursor, current: Cursor },
    /// The cursor already pointed at the commit; nothing was written.
    Unchanged,
}

impl CursorUpdate {
    pub fn is_unchanged(&self) -> bool {
        matches!(self, CursorUpdate::Unchanged)
    }
}

#[derive(Debug, Clone)]
pub struct StateStore {
    home: JournalHome,
}

impl StateStore {
    pub fn new(home: JournalHome) -> Self {
        Self { home }
    }

    /// Take the repository's lock. Hold the returned guard for a whole
    /// generation pass so its cursor read and write cannot interleave with
    /// another process.
    pub fn lock(&self, repo_id: &str) -> Result<CursorGuard<'_>> {
        let lock = FileLock::acquire(&self.home.cursor_lock(repo_id))?;
        Ok(CursorGuard {
            store: self,
            repo_id: repo_id.to_string(),
            _lock: lock,
        })
    }

    /// `None` means the repository has never been journaled.
    pub fn get_cursor(&self, repo_id: &str) -> Result<Option<Cursor>> {
        let path = self.home.cursor_file(repo_id);
        let cursor: Option<Cursor> = storage::read_json(&path)?;

        match cursor {
            Some(cursor) if cursor.repo_id != repo_id => Err(Error::corrupt(
                path,
                format!("cursor belongs to repository {}", cursor.repo_id),
            )),
            cursor => Ok(cursor),
        }
    }

    pub fn advance_cursor(
        &self,
        repo_id: &str,
        new_hash: &str,
        new_date: DateTime<FixedOffset>,
        force: bool,
    ) -> Result<CursorUpdate> {
        self.lock(repo_id)?.advance(new_hash, new_date, force)
    }

    /// Commits of `commits` not yet covered by the stored cursor.
    pub fn filter_new(&self, repo_id: &str, commits: &[CommitRecord]) -> Result<Vec<CommitRecord>> {
        let cursor = self.get_cursor(repo_id)?;
        Ok(commits_after(cursor.as_ref(), commits).to_vec())
    }

    /// Forget the cursor so the next pass starts from scratch. Returns
    /// whether a cursor existed.
    pub fn reset_cursor(&self, repo_id: &str) -> Result<bool> {
        self.lock(repo_id)?.reset()
    }

    /// Drop a repository's journal state when it stops being tracked.
    /// Idempotent. The lock file is left in place since another process may
    /// be holding it.
    pub fn remove_cursor(&self, repo_id: &str) -> Result<bool> {
        let guard = self.lock(repo_id)?;
        let removed = guard.reset()?;
        if removed {
            tracing::debug!("Removed journal state for {}", repo_id);
        }
        Ok(removed)
    }

    fn cursor_path(&self, repo_id: &str) -> PathBuf {
        self.home.cursor_file(repo_id)
    }
}

/// Exclusive access to one repository's cursor.
pub struct CursorGuard<'a> {
    store: &'a StateStore,
    repo_id: String,
    _lock: FileLock,
}

impl CursorGuard<'_> {
    pub fn repo_id(&self) -> &str {
        &self.repo_id
    }

    pub fn cursor(&self) -> Result<Option<Cursor>> {
        self.store.get_cursor(&self.repo_id)
    }

    /// Fail with [`Error::NonMonotonicUpdate`] if moving the cursor to a
    /// commit dated `new_date` would take it backwards in time.
    pub fn check_advance(&self, new_date: DateTime<FixedOffset>, force: bool) -> Result<()> {
        match self.cursor()? {
            Some(stored) => ensure_monotonic(&stored, new_date, force),
            None => Ok(()),
        }
    }

    pub fn advance(
        &self,
        new_hash: &str,
        new_date: DateTime<FixedOffset>,
        force: bool,
    ) -> Result<CursorUpdate> {
        let previous = self.cursor()?;

        if let Some(stored) = &previous {
            if stored.points_at(new_hash) {
                tracing::debug!("Cursor for {} already at {}", self.repo_id, new_hash);
                return Ok(CursorUpdate::Unchanged);
            }
            ensure_monotonic(stored, new_date, force)?;
            if force && new_date < stored.last_processed_date {
                tracing::warn!(
                    "Forcing cursor for {} back from {} to {}",
                    self.repo_id,
                    stored.last_processed_date,
                    new_date
                );
            }
        }

        let current = Cursor::new(self.repo_id.clone(), new_hash, new_date);
        storage::write_json(&self.store.cursor_path(&self.repo_id), &current)?;
        tracing::info!("Cursor for {} advanced to {}", self.repo_id, new_hash);

        Ok(match previous {
            None => CursorUpdate::Created(current),
            Some(previous) => CursorUpdate::Advanced { previous, current },
        })
    }

    pub fn reset(&self) -> Result<bool> {
        let removed = storage::remove_if_exists(&self.store.cursor_path(&self.repo_id))?;
        if removed {
            tracing::info!("Reset cursor for {}", self.repo_id);
        }
        Ok(removed)
    }
}

fn ensure_monotonic(stored: &Cursor, new_date: DateTime<FixedOffset>, force: bool) -> Result<()> {
    if new_date < stored.last_processed_date && !force {
        return Err(Error::NonMonotonicUpdate {
            repo_id: stored.repo_id.clone(),
            stored: stored.last_processed_date,
            attempted: new_date,
        });
    }
    Ok(())
}

/// The suffix of `commits` strictly after the cursor's commit, or all of
/// them when there is no cursor or its commit is not in the sequence.
///
/// Matching is by hash, never by date: dates repeat and can go backwards
/// after a rebase.
pub fn commits_after<'c>(
    cursor: Option<&Cursor>,
    commits: &'c [CommitRecord],
) -> &'c [CommitRecord] {
    let Some(cursor) = cursor else {
        return commits;
    };

    match commits.iter().position(|commit| cursor.points_at(&commit.hash)) {
        Some(index) => &commits[index + 1..],
        None => commits,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn date(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    fn hash(n: u8) -> String {
        format!("{:02x}", n).repeat(20)
    }

    fn commit(n: u8) -> CommitRecord {
        CommitRecord::new(
            "repo",
            hash(n),
            date(&format!("2024-01-{:02}T12:00:00Z", n)),
            &format!("feat: commit {}", n),
        )
    }

    fn store() -> (TempDir, StateStore) {
        let dir = TempDir::new().unwrap();
        let store = StateStore::new(JournalHome::new(dir.path()));
        (dir, store)
    }

    #[test]
    fn test_first_run_has_no_cursor() {
        let (_dir, store) = store();

        assert!(store.get_cursor("repo").unwrap().is_none());
        let commits = vec![commit(1), commit(2)];
        assert_eq!(store.filter_new("repo", &commits).unwrap(), commits);
    }

    #[test]
    fn test_advance_and_filter() {
        let (_dir, store) = store();
        let commits = vec![commit(1), commit(2), commit(3)];

        let update = store
            .advance_cursor("repo", &hash(2), commits[1].author_date, false)
            .unwrap();
        assert!(matches!(update, CursorUpdate::Created(_)));

        let fresh = store.filter_new("repo", &commits).unwrap();
        assert_eq!(fresh, vec![commit(3)]);

        let update = store
            .advance_cursor("repo", &hash(3), commits[2].author_date, false)
            .unwrap();
        assert!(matches!(update, CursorUpdate::Advanced { .. }));
        assert!(store.filter_new("repo", &commits).unwrap().is_empty());
    }

    #[test]
    fn test_filter_uses_hash_prefix() {
        let (_dir, store) = store();
        let commits = vec![commit(1), commit(2)];

        store
            .advance_cursor("repo", &hash(1)[..7], commits[0].author_date, false)
            .unwrap();
        assert_eq!(store.filter_new("repo", &commits).unwrap(), vec![commit(2)]);
    }

    #[test]
    fn test_unknown_cursor_hash_returns_everything() {
        let (_dir, store) = store();
        let commits = vec![commit(1), commit(2)];

        store
            .advance_cursor("repo", &hash(9), date("2023-01-01T00:00:00Z"), false)
            .unwrap();
        assert_eq!(store.filter_new("repo", &commits).unwrap(), commits);
    }

    #[test]
    fn test_same_hash_skips_the_write() {
        let (_dir, store) = store();
        let path = store.cursor_path("repo");

        store
            .advance_cursor("repo", &hash(1), date("2024-01-01T00:00:00Z"), false)
            .unwrap();
        let before = std::fs::read(&path).unwrap();

        let update = store
            .advance_cursor("repo", &hash(1), date("2024-01-01T00:00:00Z"), false)
            .unwrap();
        assert!(update.is_unchanged());
        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    #[test]
    fn test_regression_is_rejected_unless_forced() {
        let (_dir, store) = store();
        store
            .advance_cursor("repo", &hash(2), date("2024-01-02T00:00:00Z"), false)
            .unwrap();

        let result = store.advance_cursor("repo", &hash(1), date("2024-01-01T00:00:00Z"), false);
        assert!(matches!(result, Err(Error::NonMonotonicUpdate { .. })));
        let cursor = store.get_cursor("repo").unwrap().unwrap();
        assert_eq!(cursor.last_processed_hash, hash(2));

        store
            .advance_cursor("repo", &hash(1), date("2024-01-01T00:00:00Z"), true)
            .unwrap();
        let cursor = store.get_cursor("repo").unwrap().unwrap();
        assert_eq!(cursor.last_processed_hash, hash(1));
    }

    #[test]
    fn test_equal_dates_are_monotonic() {
        let (_dir, store) = store();
        let when = date("2024-01-02T00:00:00Z");
        store.advance_cursor("repo", &hash(1), when, false).unwrap();

        assert!(store.advance_cursor("repo", &hash(2), when, false).is_ok());
    }

    #[test]
    fn test_cursors_are_independent() {
        let (_dir, store) = store();
        store
            .advance_cursor("a", &hash(1), date("2024-01-01T00:00:00Z"), false)
            .unwrap();

        // Holding a's lock must not block b.
        let _guard = store.lock("a").unwrap();
        store
            .advance_cursor("b", &hash(2), date("2024-01-02T00:00:00Z"), false)
            .unwrap();

        assert_eq!(store.get_cursor("a").unwrap().unwrap().last_processed_hash, hash(1));
        assert_eq!(store.get_cursor("b").unwrap().unwrap().last_processed_hash, hash(2));
    }

    #[test]
    fn test_reset_is_idempotent() {
        let (_dir, store) = store();
        store
            .advance_cursor("repo", &hash(1), date("2024-01-01T00:00:00Z"), false)
            .unwrap();

        assert!(store.reset_cursor("repo").unwrap());
        assert!(!store.reset_cursor("repo").unwrap());
        assert!(store.get_cursor("repo").unwrap().is_none());
    }

    #[test]
    fn test_remove_cursor_keeps_lock_file() {
        let dir = TempDir::new().unwrap();
        let home = JournalHome::new(dir.path());
        let store = StateStore::new(home.clone());
        store
            .advance_cursor("repo", &hash(1), date("2024-01-01T00:00:00Z"), false)
            .unwrap();
        assert!(home.cursor_lock("repo").exists());

        assert!(store.remove_cursor("repo").unwrap());
        assert!(store.get_cursor("repo").unwrap().is_none());
        assert!(home.cursor_lock("repo").exists());
        assert!(!store.remove_cursor("repo").unwrap());

        // The surviving lock file is still usable.
        let guard = store.lock("repo").unwrap();
        assert!(guard.cursor().unwrap().is_none());
    }

    #[test]
    fn test_corrupt_cursor_fails_closed() {
        let (_dir, store) = store();
        let path = store.cursor_path("repo");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "garbage").unwrap();

        assert!(matches!(
            store.get_cursor("repo"),
            Err(Error::StateCorruption { .. })
        ));
        assert!(store
            .advance_cursor("repo", &hash(1), date("2024-01-01T00:00:00Z"), false)
            .is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "garbage");
    }

    #[test]
    fn test_cursor_for_another_repo_is_corruption() {
        let (_dir, store) = store();
        store
            .advance_cursor("a", &hash(1), date("2024-01-01T00:00:00Z"), false)
            .unwrap();
        std::fs::copy(store.cursor_path("a"), store.cursor_path("b")).unwrap();

        assert!(matches!(
            store.get_cursor("b"),
            Err(Error::StateCorruption { .. })
        ));
    }
}
