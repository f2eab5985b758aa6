#![allow(dead_code)]

use git2::{Oid, Repository, Signature, Time};
use gitjournal_core::{Journal, JournalHome};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

pub const DAY: i64 = 86_400;
pub const BASE: i64 = 1_704_067_200; // 2024-01-01T00:00:00Z

/// A journal home in a temp dir, with an optional `config.toml`.
pub struct TestHome {
    pub dir: TempDir,
}

impl TestHome {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    pub fn with_config(config: &str) -> Self {
        let home = Self::new();
        fs::write(home.dir.path().join("config.toml"), config).unwrap();
        home
    }

    pub fn home(&self) -> JournalHome {
        JournalHome::new(self.dir.path())
    }

    pub fn journal(&self) -> Journal {
        Journal::open(self.home()).unwrap()
    }
}

/// Scratch repository with commits at controlled timestamps.
pub struct GitFixture {
    pub repo: Repository,
    pub dir: TempDir,
}

impl GitFixture {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        Self { repo, dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    fn tree_with(&self, file: &str, content: &str) -> Oid {
        fs::write(self.path().join(file), content).unwrap();
        let mut index = self.repo.index().unwrap();
        index.add_path(Path::new(file)).unwrap();
        index.write().unwrap();
        index.write_tree().unwrap()
    }

    /// Commit a change to `file` at `seconds` on top of HEAD.
    pub fn commit_at(&self, file: &str, message: &str, seconds: i64) -> String {
        let tree = self
            .repo
            .find_tree(self.tree_with(file, &format!("{}\n{}\n", message, seconds)))
            .unwrap();
        let signature = Signature::new("Tester", "tester@example.com", &Time::new(seconds, 0)).unwrap();
        let parent = self.repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();

        self.repo
            .commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)
            .unwrap()
            .to_string()
    }

    /// Replace the HEAD commit with a new one, as `git commit --amend` does.
    pub fn amend_head(&self, message: &str, seconds: i64) -> String {
        let head = self.repo.head().unwrap();
        let branch = head.name().unwrap().to_string();
        let old = head.peel_to_commit().unwrap();
        let parents: Vec<git2::Commit> = old.parents().collect();
        let parent_refs: Vec<&git2::Commit> = parents.iter().collect();

        let tree = self
            .repo
            .find_tree(self.tree_with("amended.txt", message))
            .unwrap();
        let signature = Signature::new("Tester", "tester@example.com", &Time::new(seconds, 0)).unwrap();
        let oid = self
            .repo
            .commit(None, &signature, &signature, message, &tree, &parent_refs)
            .unwrap();
        self.repo.reference(&branch, oid, true, "amend").unwrap();
        oid.to_string()
    }

    pub fn head(&self) -> String {
        self.repo
            .head()
            .unwrap()
            .peel_to_commit()
            .unwrap()
            .id()
            .to_string()
    }
}
