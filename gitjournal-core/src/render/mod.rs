//! Renderer: journal documents from commit records.
//!
//! Rendering is a pure function of its input. Nothing here looks at the
//! clock, so the same commits always give byte-identical output, which is
//! what lets a regeneration with no new commits leave files untouched.

mod html;
mod markdown;

use crate::aggregate::chronological;
use crate::categorize::Categorizer;
use crate::models::{Category, CommitRecord};
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Chronological, one section per day.
    Devlog,
    /// Grouped by category, newest first.
    Changelog,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Markdown,
    Html,
}

#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub mode: Mode,
    pub format: Format,
    /// Top-level heading of the document.
    pub title: String,
    /// Keep only the newest N commits.
    pub max_entries: Option<usize>,
    /// repo_id -> label shown on entries when a document spans several
    /// repositories. Unlisted ids are shown as-is.
    pub repo_labels: BTreeMap<String, String>,
}

impl RenderOptions {
    pub fn devlog(title: impl Into<String>) -> Self {
        Self {
            mode: Mode::Devlog,
            format: Format::Markdown,
            title: title.into(),
            max_entries: None,
            repo_labels: BTreeMap::new(),
        }
    }

    pub fn changelog(title: impl Into<String>) -> Self {
        Self {
            mode: Mode::Changelog,
            ..Self::devlog(title)
        }
    }

    pub fn format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    pub fn max_entries(mut self, max: usize) -> Self {
        self.max_entries = Some(max);
        self
    }

    pub fn label(mut self, repo_id: impl Into<String>, label: impl Into<String>) -> Self {
        self.repo_labels.insert(repo_id.into(), label.into());
        self
    }

    fn label_for<'a>(&'a self, commit: &'a CommitRecord) -> &'a str {
        self.repo_labels
            .get(&commit.repo_id)
            .map(String::as_str)
            .unwrap_or(commit.repo_id.as_str())
    }
}

/// One rendered commit.
pub(crate) struct Entry<'a> {
    pub commit: &'a CommitRecord,
    /// Present only in multi-repository documents.
    pub label: Option<&'a str>,
    /// Subject as displayed; the changelog drops the recognised prefix.
    pub description: &'a str,
}

pub(crate) struct Day<'a> {
    pub date: NaiveDate,
    pub entries: Vec<Entry<'a>>,
}

pub(crate) struct Section<'a> {
    pub category: Category,
    pub entries: Vec<Entry<'a>>,
}

#[derive(Debug, Clone, Default)]
pub struct Renderer {
    categorizer: Categorizer,
}

impl Renderer {
    pub fn new(categorizer: Categorizer) -> Self {
        Self { categorizer }
    }

    /// Render `commits`, in any order, as one document.
    pub fn render(&self, commits: &[CommitRecord], options: &RenderOptions) -> String {
        let selected = select(commits, options.max_entries);
        let labelled = selected
            .iter()
            .map(|commit| commit.repo_id.as_str())
            .collect::<BTreeSet<_>>()
            .len()
            > 1;

        match options.mode {
            Mode::Devlog => {
                // Days are the author's local dates, which need not follow
                // the UTC order of the commits when offsets differ.
                let mut by_date: BTreeMap<NaiveDate, Vec<Entry>> = BTreeMap::new();
                for commit in selected {
                    by_date
                        .entry(commit.author_date.date_naive())
                        .or_default()
                        .push(Entry {
                            commit,
                            label: labelled.then(|| options.label_for(commit)),
                            description: commit.subject.as_str(),
                        });
                }
                let days: Vec<Day> = by_date
                    .into_iter()
                    .map(|(date, entries)| Day { date, entries })
                    .collect();

                match options.format {
                    Format::Markdown => markdown::devlog(&options.title, &days),
                    Format::Html => html::devlog(&options.title, &days),
                }
            }
            Mode::Changelog => {
                let mut by_category: BTreeMap<Category, Vec<Entry>> = BTreeMap::new();
                for commit in selected.into_iter().rev() {
                    let (category, description) = self.categorizer.split(&commit.subject);
                    by_category.entry(category).or_default().push(Entry {
                        commit,
                        label: labelled.then(|| options.label_for(commit)),
                        description,
                    });
                }
                let sections: Vec<Section> = by_category
                    .into_iter()
                    .map(|(category, entries)| Section { category, entries })
                    .collect();

                match options.format {
                    Format::Markdown => markdown::changelog(&options.title, &sections),
                    Format::Html => html::changelog(&options.title, &sections),
                }
            }
        }
    }
}

/// Commits in chronological order, trimmed to the newest `max`.
fn select(commits: &[CommitRecord], max: Option<usize>) -> Vec<&CommitRecord> {
    let mut selected: Vec<&CommitRecord> = commits.iter().collect();
    selected.sort_by(|a, b| chronological(a, b));

    if let Some(max) = max {
        let excess = selected.len().saturating_sub(max);
        selected.drain(..excess);
    }
    selected
}
