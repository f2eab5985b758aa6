use super::{Day, Entry, Section};
use std::fmt::Write;

const DEVLOG_INTRO: &str = "Auto-generated journal of project changes.";
const CHANGELOG_INTRO: &str = "All notable changes to this project will be documented in this file.\n\
     Auto-generated from git commits.";

pub(crate) fn devlog(title: &str, days: &[Day]) -> String {
    let mut out = format!("# {}\n\n{}\n\n", title, DEVLOG_INTRO);

    if days.is_empty() {
        out.push_str("_No commits yet._\n");
        return out;
    }

    for day in days {
        let _ = write!(out, "## {}\n\n", day.date.format("%Y-%m-%d"));
        for entry in &day.entries {
            devlog_entry(&mut out, entry);
        }
    }
    out
}

fn devlog_entry(out: &mut String, entry: &Entry) {
    let commit = entry.commit;
    let _ = write!(out, "### {}\n\n", entry.description);
    let _ = writeln!(out, "**Commit:** `{}`  ", commit.short_hash());
    if let Some(label) = entry.label {
        let _ = writeln!(out, "**Repository:** {}  ", label);
    }
    let _ = writeln!(out, "**Time:** {}", commit.author_date.format("%H:%M %:z"));
    out.push('\n');

    if !commit.body.is_empty() {
        out.push_str(&commit.body);
        out.push_str("\n\n");
    }

    if !commit.files_changed.is_empty() {
        let files: Vec<String> = commit
            .files_changed
            .iter()
            .map(|file| format!("`{}`", file))
            .collect();
        let _ = write!(out, "**Files:** {}\n\n", files.join(", "));
    }

    out.push_str("---\n\n");
}

pub(crate) fn changelog(title: &str, sections: &[Section]) -> String {
    let mut out = format!("# {}\n\n{}\n\n", title, CHANGELOG_INTRO);

    if sections.is_empty() {
        out.push_str("_No commits yet._\n");
        return out;
    }

    for section in sections {
        let _ = write!(out, "### {}\n\n", section.category);
        for entry in &section.entries {
            out.push_str("- ");
            if let Some(label) = entry.label {
                let _ = write!(out, "**[{}]** ", label);
            }
            let _ = writeln!(
                out,
                "{} (`{}`, {})",
                entry.description,
                entry.commit.short_hash(),
                entry.commit.author_date.format("%Y-%m-%d")
            );
        }
        out.push('\n');
    }
    out
}
