//! Editable text form of an entry
//!
//! An entry is rendered as YAML front matter between `---` lines followed by
//! the description as the document body:
//!
//! ```text
//! ---
//! name: Apple Pie
//! type: Note
//! tags:
//! - food
//! links:
//! - banana
//! created: 2024-03-01T09:30:00Z
//! modified: 2024-03-02T18:00:00Z
//! ---
//! Best with a [Banana] on the side.
//! ```
//!
//! `linked_from` is rendered for reference only; the store owns it.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{MemoryError, MemoryResult};
use crate::models::{Entry, EntryKind};
use crate::slug::slugify;

/// `[Entry Name]` references in a description
static LINK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[([^\[\]\n]+)\]").unwrap());

const DELIMITER: &str = "---";

#[derive(Debug, Serialize, Deserialize)]
struct FrontMatter {
    name: String,
    #[serde(flatten)]
    kind: EntryKind,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    links: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    linked_from: Vec<String>,
    #[serde(default)]
    created: Option<DateTime<Utc>>,
    #[serde(default)]
    modified: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "is_false")]
    exclude: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    custom: BTreeMap<String, String>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Render an entry as front matter plus description
pub fn render(entry: &Entry) -> MemoryResult<String> {
    let front = FrontMatter {
        name: entry.name.clone(),
        kind: entry.kind.clone(),
        tags: entry.tags.clone(),
        links: entry.links_to.clone(),
        linked_from: entry.linked_from.clone(),
        created: Some(entry.created),
        modified: Some(entry.modified),
        exclude: entry.exclude,
        custom: entry.custom.clone(),
    };

    let yaml = serde_yaml::to_string(&front)
        .map_err(|e| MemoryError::Render {
            name: entry.name.clone(),
            message: e.to_string(),
        })?;
    Ok(format!(
        "{DELIMITER}\n{yaml}{DELIMITER}\n{}\n",
        entry.description
    ))
}

/// Parse edited text back into an entry
///
/// The result carries a slug derived from the edited name. Callers editing
/// a stored entry should follow up with [`Entry::retain_identity`].
/// Missing timestamps default to now.
pub fn parse(text: &str) -> MemoryResult<Entry> {
    let (yaml, body) = split_front_matter(text).ok_or_else(|| {
        MemoryError::format(
            "expected front matter between '---' lines at the top",
            text,
        )
    })?;

    let front: FrontMatter =
        serde_yaml::from_str(yaml).map_err(|e| MemoryError::format(e.to_string(), text))?;

    let mut entry = Entry::with_kind(front.kind, front.name.trim());
    entry.description = body.strip_suffix('\n').unwrap_or(body).to_string();
    entry.tags = front.tags;
    entry.links_to = front.links;
    entry.linked_from = front.linked_from;
    entry.exclude = front.exclude;
    entry.custom = front.custom;
    if let Some(created) = front.created {
        entry.created = created;
    }
    if let Some(modified) = front.modified {
        entry.modified = modified;
    }
    Ok(entry)
}

/// Slugs of `[Entry Name]` references in text, in order of appearance
///
/// Markdown links (`[text](url)`) are skipped.
pub fn detect_links(text: &str) -> Vec<String> {
    let mut slugs = Vec::new();
    for caps in LINK_RE.captures_iter(text) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if text[whole.end()..].starts_with('(') {
            continue;
        }
        let slug = slugify(name.as_str());
        if !slug.is_empty() && !slugs.contains(&slug) {
            slugs.push(slug);
        }
    }
    slugs
}

/// Split text into (yaml, body) at the first two delimiter lines
fn split_front_matter(text: &str) -> Option<(&str, &str)> {
    let text = text.trim_start_matches('\u{feff}');
    let mut lines = text.split_inclusive('\n');
    let first = lines.next()?;
    if first.trim_end() != DELIMITER {
        return None;
    }

    let mut offset = first.len();
    for line in lines {
        if line.trim_end() == DELIMITER {
            let yaml = &text[first.len()..offset];
            let body = &text[offset + line.len()..];
            return Some((yaml, body));
        }
        offset += line.len();
    }
    None
}
