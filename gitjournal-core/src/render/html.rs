use super::{Day, Entry, Section};
use html_escape::encode_text;
use std::fmt::Write;

const STYLE: &str = r#"
    body {
        font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
        max-width: 900px;
        margin: 40px auto;
        padding: 20px;
        line-height: 1.6;
        color: #1f2937;
    }
    h1 { color: #1e40af; border-bottom: 3px solid #1e40af; padding-bottom: 10px; }
    h2 { color: #2563eb; border-bottom: 1px solid #e5e7eb; padding-bottom: 5px; margin-top: 25px; }
    h3 { color: #059669; margin-bottom: 4px; }
    code {
        background-color: #f3f4f6;
        padding: 2px 6px;
        border-radius: 4px;
        font-family: 'SF Mono', Consolas, monospace;
        color: #dc2626;
        font-size: 0.9em;
    }
    .meta { color: #6b7280; font-size: 0.9em; }
    .repo { color: #4f46e5; font-weight: 600; }
    .body { white-space: pre-wrap; }
    hr { border: none; border-top: 1px solid #e5e7eb; margin: 20px 0; }
"#;

fn document(title: &str, content: &str) -> String {
    let title = encode_text(title);
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"UTF-8\">\n<title>{title}</title>\n\
         <style>{STYLE}</style>\n</head>\n<body>\n<h1>{title}</h1>\n{content}</body>\n</html>\n"
    )
}

pub(crate) fn devlog(title: &str, days: &[Day]) -> String {
    let mut content = String::new();

    if days.is_empty() {
        content.push_str("<p><em>No commits yet.</em></p>\n");
    }

    for day in days {
        let _ = writeln!(content, "<h2>{}</h2>", day.date.format("%Y-%m-%d"));
        for entry in &day.entries {
            devlog_entry(&mut content, entry);
        }
    }

    document(title, &content)
}

fn devlog_entry(out: &mut String, entry: &Entry) {
    let commit = entry.commit;
    let _ = writeln!(out, "<h3>{}</h3>", encode_text(entry.description));

    out.push_str("<p class=\"meta\">");
    if let Some(label) = entry.label {
        let _ = write!(out, "<span class=\"repo\">[{}]</span> ", encode_text(label));
    }
    let _ = writeln!(
        out,
        "<code>{}</code> {}</p>",
        encode_text(commit.short_hash()),
        commit.author_date.format("%H:%M %:z")
    );

    if !commit.body.is_empty() {
        let _ = writeln!(out, "<p class=\"body\">{}</p>", encode_text(&commit.body));
    }

    if !commit.files_changed.is_empty() {
        let files: Vec<String> = commit
            .files_changed
            .iter()
            .map(|file| format!("<code>{}</code>", encode_text(file)))
            .collect();
        let _ = writeln!(out, "<p><strong>Files:</strong> {}</p>", files.join(", "));
    }

    out.push_str("<hr/>\n");
}

pub(crate) fn changelog(title: &str, sections: &[Section]) -> String {
    let mut content = String::new();

    if sections.is_empty() {
        content.push_str("<p><em>No commits yet.</em></p>\n");
    }

    for section in sections {
        let _ = writeln!(content, "<h2>{}</h2>\n<ul>", section.category);
        for entry in &section.entries {
            content.push_str("<li>");
            if let Some(label) = entry.label {
                let _ = write!(content, "<span class=\"repo\">[{}]</span> ", encode_text(label));
            }
            let _ = writeln!(
                content,
                "{} <code>{}</code> <span class=\"meta\">{}</span></li>",
                encode_text(entry.description),
                encode_text(entry.commit.short_hash()),
                entry.commit.author_date.format("%Y-%m-%d")
            );
        }
        content.push_str("</ul>\n");
    }

    document(title, &content)
}
