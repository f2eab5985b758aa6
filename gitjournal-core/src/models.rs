use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};

/// Length of the abbreviated hash shown in journals.
pub const SHORT_HASH_LEN: usize = 7;

/// Subject marker carried by commits the journal makes itself. Such commits
/// never show up in a devlog or changelog.
pub const JOURNAL_COMMIT_MARKER: &str = "[skip journal]";

/// Change category derived from a commit subject.
///
/// Declaration order is the order sections appear in a changelog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Category {
    Added,
    Fixed,
    Documentation,
    Changed,
    Security,
    Performance,
    Testing,
    Maintenance,
    Other,
}

impl Category {
    pub const ALL: [Category; 9] = [
        Category::Added,
        Category::Fixed,
        Category::Documentation,
        Category::Changed,
        Category::Security,
        Category::Performance,
        Category::Testing,
        Category::Maintenance,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Added => "Added",
            Category::Fixed => "Fixed",
            Category::Documentation => "Documentation",
            Category::Changed => "Changed",
            Category::Security => "Security",
            Category::Performance => "Performance",
            Category::Testing => "Testing",
            Category::Maintenance => "Maintenance",
            Category::Other => "Other",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(s.trim()))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Category {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Category::parse(&value).ok_or_else(|| format!("unknown category `{}`", value))
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        category.as_str().to_string()
    }
}

/// One commit as read from a repository's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub hash: String,
    pub author_date: DateTime<FixedOffset>,
    pub subject: String,
    pub body: String,
    pub files_changed: Vec<String>,
    pub repo_id: String,
}

impl CommitRecord {
    /// Builds a record from a raw commit message, splitting it into subject
    /// and body.
    pub fn new(
        repo_id: impl Into<String>,
        hash: impl Into<String>,
        author_date: DateTime<FixedOffset>,
        message: &str,
    ) -> Self {
        let (subject, body) = split_message(message);
        Self {
            hash: hash.into(),
            author_date,
            subject,
            body,
            files_changed: Vec::new(),
            repo_id: repo_id.into(),
        }
    }

    pub fn with_files(mut self, files: Vec<String>) -> Self {
        self.files_changed = files;
        self
    }

    pub fn short_hash(&self) -> &str {
        self.hash.get(..SHORT_HASH_LEN).unwrap_or(&self.hash)
    }

    /// True for commits created by the journal's own auto-commit.
    pub fn is_journal_commit(&self) -> bool {
        self.subject.contains(JOURNAL_COMMIT_MARKER)
    }
}

fn split_message(message: &str) -> (String, String) {
    let message = message.trim();
    match message.split_once('\n') {
        Some((subject, body)) => (subject.trim().to_string(), body.trim().to_string()),
        None => (message.to_string(), String::new()),
    }
}

/// Whether two commit hashes name the same commit, allowing either side to
/// be abbreviated to at least [`SHORT_HASH_LEN`] characters.
pub fn hashes_match(a: &str, b: &str) -> bool {
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    short.len() >= SHORT_HASH_LEN
        && long
            .get(..short.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(short))
}

/// Last commit of a repository that has been journaled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    pub repo_id: String,
    pub last_processed_hash: String,
    pub last_processed_date: DateTime<FixedOffset>,
    pub updated_at: DateTime<Utc>,
}

impl Cursor {
    pub fn new(
        repo_id: impl Into<String>,
        hash: impl Into<String>,
        date: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            repo_id: repo_id.into(),
            last_processed_hash: hash.into(),
            last_processed_date: date,
            updated_at: Utc::now(),
        }
    }

    pub fn points_at(&self, hash: &str) -> bool {
        hashes_match(&self.last_processed_hash, hash)
    }
}

/// A tracked repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryEntry {
    pub repo_id: String,
    pub path: PathBuf,
    pub display_name: String,
    pub devlog_path: PathBuf,
    pub changelog_path: PathBuf,
    pub registered_at: DateTime<Utc>,
    #[serde(default)]
    pub hook_installed: bool,
}

impl RepositoryEntry {
    pub fn new(
        path: PathBuf,
        display_name: String,
        devlog_filename: &str,
        changelog_filename: &str,
    ) -> Self {
        Self {
            repo_id: repo_id_for(&path),
            devlog_path: path.join(devlog_filename),
            changelog_path: path.join(changelog_filename),
            path,
            display_name,
            registered_at: Utc::now(),
            hook_installed: false,
        }
    }

    /// Whether the working directory is still on disk.
    pub fn exists(&self) -> bool {
        self.path.is_dir()
    }
}

/// Stable identifier for a repository, derived from its resolved absolute
/// path so renaming the display name never severs tracking.
pub fn repo_id_for(path: &Path) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.to_string_lossy().as_bytes());
    let digest = hex::encode(hasher.finalize());
    digest[..16].to_string()
}
