//! The engine facade: every operation the CLI and the post-commit hook need,
//! wired to one journal home.

use crate::aggregate;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::history::{
    read_commits, CommitOptions, GitHistory, HistoryDiscontinuity, HistoryProvider,
};
use crate::hook;
use crate::models::{CommitRecord, Cursor, RepositoryEntry, JOURNAL_COMMIT_MARKER};
use crate::paths::JournalHome;
use crate::registry::{Registration, Registry, ScanReport};
use crate::render::{Format, RenderOptions, Renderer};
use crate::state::StateStore;
use crate::storage;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Subject of commits made by the auto-commit option.
pub fn journal_commit_subject() -> String {
    format!("chore: update journal {}", JOURNAL_COMMIT_MARKER)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GenerateOptions {
    /// Write the changelog too. It is always refreshed when it already exists.
    pub changelog: bool,
    /// Re-render even without new commits, and accept a cursor that moves
    /// backwards in time.
    pub force: bool,
}

#[derive(Debug, Clone)]
pub struct GenerationReport {
    pub repo_id: String,
    pub display_name: String,
    /// New commits that made it into the journal.
    pub new_commits: usize,
    pub discontinuity: Option<HistoryDiscontinuity>,
    /// Files whose content changed.
    pub written: Vec<PathBuf>,
    /// Hash of the auto-commit, if one was made.
    pub journal_commit: Option<String>,
    /// Cursor after the pass.
    pub cursor: Option<Cursor>,
}

impl GenerationReport {
    pub fn is_noop(&self) -> bool {
        self.new_commits == 0 && self.written.is_empty()
    }
}

/// Outcome of [`Journal::generate_all`].
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub succeeded: Vec<GenerationReport>,
    pub failed: Vec<(RepositoryEntry, Error)>,
}

#[derive(Debug)]
pub struct InitReport {
    pub entry: RepositoryEntry,
    pub newly_added: bool,
    pub generation: GenerationReport,
    pub hook: Option<PathBuf>,
}

#[derive(Debug)]
pub struct AggregateReport {
    pub output: PathBuf,
    pub entries: usize,
    pub repositories: usize,
    /// Repositories left out, with the reason.
    pub skipped: Vec<(RepositoryEntry, Error)>,
}

pub struct Journal {
    home: JournalHome,
    config: Config,
    registry: Registry,
    state: StateStore,
    history: Box<dyn HistoryProvider>,
    renderer: Renderer,
}

impl Journal {
    /// Open the journal rooted at `home`, loading its configuration.
    pub fn open(home: JournalHome) -> Result<Self> {
        let config = Config::load(&home.config_file())?;
        let history = GitHistory::new().skip_merge_commits(config.skip_merge_commits);

        Ok(Self {
            registry: Registry::new(home.clone()),
            state: StateStore::new(home.clone()),
            renderer: Renderer::new(config.categorizer()),
            history: Box::new(history),
            config,
            home,
        })
    }

    /// Open the journal at `$GITJOURNAL_HOME` or `~/.gitjournal`.
    pub fn open_default() -> Result<Self> {
        Self::open(JournalHome::from_env())
    }

    /// Swap the version-control backend.
    pub fn with_provider(mut self, provider: impl HistoryProvider + 'static) -> Self {
        self.history = Box::new(provider);
        self
    }

    pub fn home(&self) -> &JournalHome {
        &self.home
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn state(&self) -> &StateStore {
        &self.state
    }

    pub fn list(&self) -> Result<Vec<RepositoryEntry>> {
        self.registry.list()
    }

    /// Register the repository containing `path`, if it is not already.
    pub fn track(&self, path: &Path) -> Result<Registration> {
        let root = self
            .history
            .repository_root(path)
            .ok_or_else(|| Error::NotAGitRepository(path.to_path_buf()))?;
        self.registry.register(&root, self.history.as_ref(), &self.config)
    }

    /// Look up a tracked repository by repo_id or by a path inside it.
    pub fn resolve(&self, key: &str) -> Result<RepositoryEntry> {
        if let Some(entry) = self.registry.get(key)? {
            return Ok(entry);
        }

        let path = Path::new(key);
        let root = self
            .history
            .repository_root(path)
            .unwrap_or_else(|| path.to_path_buf());
        self.registry
            .find_by_path(&root)?
            .ok_or_else(|| Error::RepositoryNotTracked(key.to_string()))
    }

    /// Start journaling a repository from scratch: register it, forget any
    /// previous cursor, write the devlog and optionally install the hook.
    pub fn init_repo(&self, path: &Path, install_hook: bool) -> Result<InitReport> {
        let Registration { entry, newly_added } = self.track(path)?;

        if self.state.reset_cursor(&entry.repo_id)? {
            tracing::info!("Re-initializing {}", entry.display_name);
        }
        let generation = self.generate(&entry, GenerateOptions::default())?;

        let hook = if install_hook {
            Some(self.install_hook(&entry)?)
        } else {
            None
        };

        let entry = self.registry.get(&entry.repo_id)?.unwrap_or(entry);
        Ok(InitReport {
            entry,
            newly_added,
            generation,
            hook,
        })
    }

    pub fn install_hook(&self, entry: &RepositoryEntry) -> Result<PathBuf> {
        let hook = hook::install(&entry.path)?;
        self.registry.mark_hook_installed(&entry.repo_id)?;
        Ok(hook)
    }

    /// One generation pass for one repository.
    ///
    /// The repository's lock is held from the cursor read to the cursor
    /// write. Documents are rendered from the bounded history window, so a
    /// pass after a history rewrite shows the recent commits rather than
    /// failing.
    pub fn generate(
        &self,
        entry: &RepositoryEntry,
        options: GenerateOptions,
    ) -> Result<GenerationReport> {
        if !entry.exists() {
            tracing::warn!("Repository {} is missing at {:?}", entry.display_name, entry.path);
            return Err(Error::unavailable(&entry.path, "working directory no longer exists"));
        }

        let guard = self.state.lock(&entry.repo_id)?;
        let cursor = guard.cursor()?;
        let since = cursor.as_ref().map(|c| c.last_processed_hash.as_str());

        let read = read_commits(
            self.history.as_ref(),
            &entry.path,
            &entry.repo_id,
            since,
            self.config.history_window,
        )?;
        // Providers may return more than was asked for; the cursor decides.
        let new_commits = self
            .state
            .filter_new(&entry.repo_id, &read.commits)?
            .iter()
            .filter(|c| !c.is_journal_commit())
            .count();
        let force_cursor = options.force || read.discontinuity.is_some();

        let write_changelog = options.changelog || entry.changelog_path.exists();
        let missing_document = !entry.devlog_path.exists()
            || (options.changelog && !entry.changelog_path.exists());

        let mut written = Vec::new();
        if new_commits > 0 || options.force || missing_document {
            // A read from the cursor only holds the new commits; documents
            // always show the whole window.
            let window = if since.is_none() || read.discontinuity.is_some() {
                read.commits.clone()
            } else {
                read_commits(
                    self.history.as_ref(),
                    &entry.path,
                    &entry.repo_id,
                    None,
                    self.config.history_window,
                )?
                .commits
            };
            let window = without_journal_commits(window);

            if !window.is_empty() || options.force {
                if let Some(newest) = read.commits.last() {
                    guard.check_advance(newest.author_date, force_cursor)?;
                }
                written = self.write_documents(entry, &window, write_changelog)?;
            }
        }

        let mut target = read.commits.last().map(|c| (c.hash.clone(), c.author_date));
        let mut journal_commit = None;

        if self.config.auto_commit_devlog && !written.is_empty() {
            let created = self.history.commit_paths(
                &entry.path,
                &written,
                &journal_commit_subject(),
                &CommitOptions { skip_hook: true },
            )?;
            target = Some((created.hash.clone(), created.author_date));
            journal_commit = Some(created.hash);
        }

        if let Some((hash, date)) = target {
            // The journal commit is a child of the newest commit, whatever
            // its clock says.
            guard.advance(&hash, date, force_cursor || journal_commit.is_some())?;
        }

        let report = GenerationReport {
            repo_id: entry.repo_id.clone(),
            display_name: entry.display_name.clone(),
            new_commits,
            discontinuity: read.discontinuity,
            written,
            journal_commit,
            cursor: guard.cursor()?,
        };

        if report.is_noop() {
            tracing::debug!("Nothing new in {}", entry.display_name);
        } else {
            tracing::info!(
                "Journaled {} new commit(s) in {}, {} file(s) written",
                report.new_commits,
                entry.display_name,
                report.written.len()
            );
        }
        Ok(report)
    }

    fn write_documents(
        &self,
        entry: &RepositoryEntry,
        window: &[CommitRecord],
        changelog: bool,
    ) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();

        let devlog = self.renderer.render(
            window,
            &RenderOptions::devlog(format!("Development Log - {}", entry.display_name))
                .max_entries(self.config.max_commits_in_devlog),
        );
        if storage::write_if_changed(&entry.devlog_path, &devlog)? {
            tracing::info!("Wrote {:?}", entry.devlog_path);
            written.push(entry.devlog_path.clone());
        }

        if changelog {
            let changelog = self.renderer.render(
                window,
                &RenderOptions::changelog(format!("Changelog - {}", entry.display_name)),
            );
            if storage::write_if_changed(&entry.changelog_path, &changelog)? {
                tracing::info!("Wrote {:?}", entry.changelog_path);
                written.push(entry.changelog_path.clone());
            }
        }

        Ok(written)
    }

    /// Generate every tracked repository in turn. A failure is recorded and
    /// the batch moves on. `on_start` sees each entry with its index and the
    /// total before it is processed.
    pub fn generate_all(
        &self,
        options: GenerateOptions,
        mut on_start: impl FnMut(&RepositoryEntry, usize, usize),
    ) -> Result<BatchSummary> {
        let entries = self.registry.list()?;
        let total = entries.len();
        let mut summary = BatchSummary::default();

        for (index, entry) in entries.into_iter().enumerate() {
            on_start(&entry, index, total);
            match self.generate(&entry, options) {
                Ok(report) => summary.succeeded.push(report),
                Err(e) => {
                    tracing::warn!("Generation failed for {}: {}", entry.display_name, e);
                    summary.failed.push((entry, e));
                }
            }
        }

        Ok(summary)
    }

    /// Post-commit entry point: track the repository containing `path` if
    /// needed and bring its journal up to date.
    pub fn on_new_commit(&self, path: &Path) -> Result<GenerationReport> {
        let Registration { entry, .. } = self.track(path)?;
        self.generate(&entry, GenerateOptions::default())
    }

    /// Write the combined devlog of every tracked repository.
    pub fn aggregate(&self) -> Result<AggregateReport> {
        let mut per_repo: BTreeMap<String, Vec<CommitRecord>> = BTreeMap::new();
        let mut options = RenderOptions::devlog("Combined Development Log")
            .max_entries(self.config.aggregate_max_entries);
        let mut skipped = Vec::new();

        for entry in self.registry.list()? {
            if !entry.exists() {
                tracing::warn!("Repository {} is missing at {:?}", entry.display_name, entry.path);
                let reason = Error::unavailable(&entry.path, "working directory no longer exists");
                skipped.push((entry, reason));
                continue;
            }

            match read_commits(
                self.history.as_ref(),
                &entry.path,
                &entry.repo_id,
                None,
                self.config.aggregate_commits_per_repo,
            ) {
                Ok(read) => {
                    let commits = without_journal_commits(read.commits);
                    options = options.label(entry.repo_id.clone(), entry.display_name.clone());
                    per_repo.insert(entry.repo_id, commits);
                }
                Err(e) => {
                    tracing::warn!("Skipping {} in combined devlog: {}", entry.display_name, e);
                    skipped.push((entry, e));
                }
            }
        }

        let repositories = per_repo.len();
        let merged = aggregate::merge(per_repo);
        let entries = merged.len().min(self.config.aggregate_max_entries);
        let document = self.renderer.render(&merged, &options);

        let output = self.home.combined_devlog();
        if storage::write_if_changed(&output, &document)? {
            tracing::info!("Wrote combined devlog {:?}", output);
        }

        Ok(AggregateReport {
            output,
            entries,
            repositories,
            skipped,
        })
    }

    /// Render the devlog window as a standalone HTML page next to the
    /// Markdown devlog.
    pub fn export_html(&self, entry: &RepositoryEntry) -> Result<PathBuf> {
        if !entry.exists() {
            return Err(Error::unavailable(&entry.path, "working directory no longer exists"));
        }

        let read = read_commits(
            self.history.as_ref(),
            &entry.path,
            &entry.repo_id,
            None,
            self.config.history_window,
        )?;
        let commits = without_journal_commits(read.commits);

        let html = self.renderer.render(
            &commits,
            &RenderOptions::devlog(format!("Development Log - {}", entry.display_name))
                .max_entries(self.config.max_commits_in_devlog)
                .format(Format::Html),
        );

        let output = entry.devlog_path.with_extension("html");
        if storage::write_if_changed(&output, &html)? {
            tracing::info!("Exported {:?}", output);
        }
        Ok(output)
    }

    /// Stop tracking a repository, by repo_id or path. Its journal files
    /// inside the repository are left alone. `None` when it was not tracked.
    pub fn untrack(&self, key: &str) -> Result<Option<RepositoryEntry>> {
        let entry = match self.resolve(key) {
            Ok(entry) => entry,
            Err(Error::RepositoryNotTracked(_)) => {
                tracing::debug!("{} is not tracked, nothing to untrack", key);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        self.registry.unregister(&entry.repo_id)
    }

    /// Whether our post-commit hook is present in the repository right now,
    /// regardless of what the registry recorded.
    pub fn hook_present(&self, entry: &RepositoryEntry) -> bool {
        hook::is_installed(&entry.path)
    }

    /// Repositories under `root`, at most `max_depth` levels down (the
    /// configured depth when `None`).
    pub fn discover(&self, root: &Path, max_depth: Option<usize>) -> Result<Vec<PathBuf>> {
        Registry::discover(root, max_depth.unwrap_or(self.config.scan_max_depth))
    }

    pub fn register_all(&self, paths: Vec<PathBuf>) -> ScanReport {
        self.registry.register_all(paths, self.history.as_ref(), &self.config)
    }

    /// Discover and register in one step, without a chance to review.
    pub fn scan(&self, root: &Path, max_depth: Option<usize>) -> Result<ScanReport> {
        self.registry.scan(
            root,
            max_depth.unwrap_or(self.config.scan_max_depth),
            self.history.as_ref(),
            &self.config,
        )
    }
}

fn without_journal_commits(commits: Vec<CommitRecord>) -> Vec<CommitRecord> {
    commits
        .into_iter()
        .filter(|commit| !commit.is_journal_commit())
        .collect()
}
