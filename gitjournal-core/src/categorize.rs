//! Conventional-commit style categorization of commit subjects.

use crate::models::Category;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Built-in `prefix -> category` table.
pub const DEFAULT_PREFIXES: &[(&str, Category)] = &[
    ("feat", Category::Added),
    ("fix", Category::Fixed),
    ("docs", Category::Documentation),
    ("refactor", Category::Changed),
    ("security", Category::Security),
    ("perf", Category::Performance),
    ("test", Category::Testing),
    ("chore", Category::Maintenance),
];

// `type(scope)!: description`, scope and breaking marker optional.
static PREFIX_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([A-Za-z][\w-]*)(?:\([^)]*\))?!?:\s*").expect("Invalid commit prefix regex")
});

static DEFAULT_CATEGORIZER: LazyLock<Categorizer> = LazyLock::new(Categorizer::default);

/// Categorize with the built-in prefix table.
pub fn categorize(subject: &str) -> Category {
    DEFAULT_CATEGORIZER.categorize(subject)
}

#[derive(Debug, Clone)]
pub struct Categorizer {
    table: HashMap<String, Category>,
}

impl Default for Categorizer {
    fn default() -> Self {
        Self {
            table: DEFAULT_PREFIXES
                .iter()
                .map(|(prefix, category)| (prefix.to_string(), *category))
                .collect(),
        }
    }
}

impl Categorizer {
    /// Default table with `overrides` merged on top; later entries win.
    pub fn with_overrides<I, K>(overrides: I) -> Self
    where
        I: IntoIterator<Item = (K, Category)>,
        K: AsRef<str>,
    {
        let mut categorizer = Self::default();
        for (prefix, category) in overrides {
            categorizer
                .table
                .insert(prefix.as_ref().trim().to_ascii_lowercase(), category);
        }
        categorizer
    }

    pub fn categorize(&self, subject: &str) -> Category {
        self.split(subject).0
    }

    /// Category plus the subject with a recognised prefix removed.
    ///
    /// Unrecognised prefixes are left in place, so `wip: stuff` stays
    /// `wip: stuff` under [`Category::Other`].
    pub fn split<'s>(&self, subject: &'s str) -> (Category, &'s str) {
        let Some(captures) = PREFIX_REGEX.captures(subject) else {
            return (Category::Other, subject.trim());
        };

        let prefix = captures[1].to_ascii_lowercase();
        match self.table.get(&prefix) {
            Some(category) => {
                let rest = subject[captures[0].len()..].trim();
                let description = if rest.is_empty() { subject.trim() } else { rest };
                (*category, description)
            }
            None => (Category::Other, subject.trim()),
        }
    }
}
