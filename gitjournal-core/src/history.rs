//! History Reader: commit history out of a version-control system.
//!
//! The engine only talks to the VCS through [`HistoryProvider`]. The stock
//! implementation, [`GitHistory`], reads repositories with libgit2 and
//! never touches the working tree except for [`HistoryProvider::commit_paths`].

use crate::error::{Error, Result};
use crate::models::{hashes_match, CommitRecord};
use chrono::{DateTime, FixedOffset, TimeZone};
use git2::{ErrorCode, Oid, Repository, Signature, Sort};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Commits returned by a history read, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryRead {
    pub commits: Vec<CommitRecord>,
    pub discontinuity: Option<HistoryDiscontinuity>,
}

/// The commit a read was asked to start after is no longer in history,
/// typically after a rebase or force-push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryDiscontinuity {
    pub repo_path: PathBuf,
    pub missing_hash: String,
}

impl fmt::Display for HistoryDiscontinuity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "history of {} no longer contains {}; journaling the most recent commits instead",
            self.repo_path.display(),
            self.missing_hash
        )
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CommitOptions {
    /// Do not run the repository's post-commit hook for this commit.
    pub skip_hook: bool,
}

/// A commit created through [`HistoryProvider::commit_paths`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedCommit {
    pub hash: String,
    pub author_date: DateTime<FixedOffset>,
}

pub trait HistoryProvider {
    /// Whether `path` is the root of a repository.
    fn is_repository(&self, path: &Path) -> bool;

    /// Root of the repository containing `path`, searching upwards.
    fn repository_root(&self, path: &Path) -> Option<PathBuf>;

    /// Commits reachable from HEAD, oldest first.
    ///
    /// With `since` found in history: every commit strictly after it. With
    /// `since` absent: the newest `max_count` commits. With `since` not
    /// found: the newest `max_count` commits plus a discontinuity.
    fn list_commits(
        &self,
        path: &Path,
        repo_id: &str,
        since: Option<&str>,
        max_count: usize,
    ) -> Result<HistoryRead>;

    /// Short name from the `origin` remote URL, if there is one.
    fn origin_name(&self, path: &Path) -> Option<String>;

    /// Stage `files` and commit them on top of HEAD.
    fn commit_paths(
        &self,
        path: &Path,
        files: &[PathBuf],
        message: &str,
        options: &CommitOptions,
    ) -> Result<CreatedCommit>;
}

/// Read commits for the journal, logging any discontinuity.
pub fn read_commits(
    provider: &dyn HistoryProvider,
    repo_path: &Path,
    repo_id: &str,
    since: Option<&str>,
    window: usize,
) -> Result<HistoryRead> {
    let read = provider.list_commits(repo_path, repo_id, since, window)?;

    if let Some(discontinuity) = &read.discontinuity {
        tracing::warn!("{}", discontinuity);
    }
    tracing::debug!(
        "Read {} commit(s) from {:?} since {:?}",
        read.commits.len(),
        repo_path,
        since
    );
    Ok(read)
}

/// [`HistoryProvider`] backed by libgit2.
#[derive(Debug, Clone)]
pub struct GitHistory {
    skip_merge_commits: bool,
}

impl Default for GitHistory {
    fn default() -> Self {
        Self {
            skip_merge_commits: true,
        }
    }
}

impl GitHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn skip_merge_commits(mut self, skip: bool) -> Self {
        self.skip_merge_commits = skip;
        self
    }

    fn open(path: &Path) -> Result<Repository> {
        Repository::open(path).map_err(|e| Error::unavailable(path, e.message()))
    }

    fn to_record(
        repo: &Repository,
        commit: &git2::Commit,
        repo_id: &str,
        path: &Path,
    ) -> Result<CommitRecord> {
        let message = commit.message().ok_or_else(|| {
            Error::unavailable(path, format!("commit {} has a non UTF-8 message", commit.id()))
        })?;
        let author_date = git_time(&commit.author().when()).ok_or_else(|| {
            Error::unavailable(path, format!("commit {} has an invalid author date", commit.id()))
        })?;
        let files = changed_files(repo, commit).map_err(|e| Error::unavailable(path, e.message()))?;

        Ok(
            CommitRecord::new(repo_id, commit.id().to_string(), author_date, message)
                .with_files(files),
        )
    }
}

impl HistoryProvider for GitHistory {
    fn is_repository(&self, path: &Path) -> bool {
        Repository::open(path).is_ok()
    }

    fn repository_root(&self, path: &Path) -> Option<PathBuf> {
        let repo = Repository::discover(path).ok()?;
        repo.workdir().map(Path::to_path_buf)
    }

    fn list_commits(
        &self,
        path: &Path,
        repo_id: &str,
        since: Option<&str>,
        max_count: usize,
    ) -> Result<HistoryRead> {
        let repo = Self::open(path)?;
        let git_err = |e: git2::Error| Error::unavailable(path, e.message());

        match repo.head() {
            Ok(_) => {}
            Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => {
                tracing::debug!("{:?} has no commits yet", path);
                return Ok(HistoryRead::default());
            }
            Err(e) => return Err(git_err(e)),
        }

        let mut revwalk = repo.revwalk().map_err(git_err)?;
        revwalk
            .set_sorting(Sort::TOPOLOGICAL | Sort::TIME)
            .map_err(git_err)?;
        revwalk.push_head().map_err(git_err)?;

        // Newest first while walking.
        let mut selected: Vec<Oid> = Vec::new();
        let mut since_found = false;

        for oid in revwalk {
            let oid = oid.map_err(git_err)?;

            if let Some(since) = since {
                if hashes_match(since, &oid.to_string()) {
                    since_found = true;
                    break;
                }
            } else if selected.len() >= max_count {
                break;
            }

            if self.skip_merge_commits {
                let commit = repo.find_commit(oid).map_err(git_err)?;
                if commit.parent_count() > 1 {
                    continue;
                }
            }
            selected.push(oid);
        }

        let discontinuity = match since {
            Some(missing) if !since_found => {
                selected.truncate(max_count);
                Some(HistoryDiscontinuity {
                    repo_path: path.to_path_buf(),
                    missing_hash: missing.to_string(),
                })
            }
            _ => None,
        };

        let mut commits = Vec::with_capacity(selected.len());
        for oid in selected.into_iter().rev() {
            let commit = repo.find_commit(oid).map_err(git_err)?;
            commits.push(Self::to_record(&repo, &commit, repo_id, path)?);
        }

        Ok(HistoryRead {
            commits,
            discontinuity,
        })
    }

    fn origin_name(&self, path: &Path) -> Option<String> {
        let repo = Repository::open(path).ok()?;
        let remote = repo.find_remote("origin").ok()?;
        name_from_remote_url(remote.url()?)
    }

    fn commit_paths(
        &self,
        path: &Path,
        files: &[PathBuf],
        message: &str,
        options: &CommitOptions,
    ) -> Result<CreatedCommit> {
        let repo = Self::open(path)?;
        let git_err = |e: git2::Error| Error::unavailable(path, e.message());
        let workdir = repo
            .workdir()
            .ok_or_else(|| Error::unavailable(path, "bare repositories have no working tree"))?
            .to_path_buf();

        let mut index = repo.index().map_err(git_err)?;
        for file in files {
            let relative = relative_to(file, &workdir);
            index.add_path(&relative).map_err(git_err)?;
        }
        index.write().map_err(git_err)?;

        let tree_oid = index.write_tree().map_err(git_err)?;
        let tree = repo.find_tree(tree_oid).map_err(git_err)?;
        let signature = repo
            .signature()
            .or_else(|_| Signature::now("gitjournal", "gitjournal@localhost"))
            .map_err(git_err)?;

        let parent = repo.head().ok().and_then(|head| head.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();

        let oid = repo
            .commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)
            .map_err(git_err)?;
        tracing::info!("Committed {} file(s) to {:?} as {}", files.len(), path, oid);

        // libgit2 never runs hooks, so emulate `git commit` unless told not to.
        if options.skip_hook {
            tracing::debug!("Skipping post-commit hook for {}", oid);
        } else {
            run_post_commit_hook(&repo, &workdir);
        }

        let commit = repo.find_commit(oid).map_err(git_err)?;
        let author_date = git_time(&commit.author().when())
            .ok_or_else(|| Error::unavailable(path, "new commit has an invalid date"))?;

        Ok(CreatedCommit {
            hash: oid.to_string(),
            author_date,
        })
    }
}

/// `file` relative to the working tree, resolving symlinked temp dirs and
/// the like when a plain prefix strip fails.
fn relative_to(file: &Path, workdir: &Path) -> PathBuf {
    if let Ok(relative) = file.strip_prefix(workdir) {
        return relative.to_path_buf();
    }
    match (file.canonicalize(), workdir.canonicalize()) {
        (Ok(file_abs), Ok(workdir_abs)) => file_abs
            .strip_prefix(&workdir_abs)
            .map(Path::to_path_buf)
            .unwrap_or(file_abs),
        _ => file.to_path_buf(),
    }
}

fn git_time(time: &git2::Time) -> Option<DateTime<FixedOffset>> {
    let offset = FixedOffset::east_opt(time.offset_minutes() * 60)?;
    offset.timestamp_opt(time.seconds(), 0).single()
}

fn changed_files(
    repo: &Repository,
    commit: &git2::Commit,
) -> std::result::Result<Vec<String>, git2::Error> {
    let tree = commit.tree()?;
    let parent_tree = if commit.parent_count() > 0 {
        Some(commit.parent(0)?.tree()?)
    } else {
        None
    };

    let diff = repo.diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None)?;

    Ok(diff
        .deltas()
        .filter_map(|delta| delta.new_file().path().or_else(|| delta.old_file().path()))
        .map(|path| path.to_string_lossy().replace('\\', "/"))
        .collect())
}

fn run_post_commit_hook(repo: &Repository, workdir: &Path) {
    let hook = repo.path().join("hooks").join("post-commit");
    if !hook.is_file() {
        return;
    }

    match Command::new(&hook).current_dir(workdir).status() {
        Ok(status) if status.success() => tracing::debug!("Ran post-commit hook {:?}", hook),
        Ok(status) => tracing::warn!("Post-commit hook {:?} exited with {}", hook, status),
        Err(e) => tracing::warn!("Failed to run post-commit hook {:?}: {}", hook, e),
    }
}

/// `git@github.com:org/name.git` and `https://host/org/name` both give `name`.
fn name_from_remote_url(url: &str) -> Option<String> {
    let trimmed = url.trim().trim_end_matches('/');
    let last = trimmed.rsplit(['/', ':']).next()?;
    let name = last.strip_suffix(".git").unwrap_or(last);
    (!name.is_empty()).then(|| name.to_string())
}
