//! Data models for Memory
//!
//! An [`Entry`] is one knowledge item. The fields every entry shares live on
//! the struct itself; the few type-specific fields live in the closed
//! [`EntryKind`] payload.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::slug::slugify;

/// The closed set of entry types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntryType {
    Note,
    Event,
    Person,
    Place,
    Thing,
}

impl EntryType {
    /// Every type, in the order used for deterministic iteration
    pub const ALL: [EntryType; 5] = [
        EntryType::Note,
        EntryType::Event,
        EntryType::Person,
        EntryType::Place,
        EntryType::Thing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::Note => "Note",
            EntryType::Event => "Event",
            EntryType::Person => "Person",
            EntryType::Place => "Place",
            EntryType::Thing => "Thing",
        }
    }

    pub fn plural(&self) -> &'static str {
        match self {
            EntryType::Note => "Notes",
            EntryType::Event => "Events",
            EntryType::Person => "People",
            EntryType::Place => "Places",
            EntryType::Thing => "Things",
        }
    }

    /// Position in [`EntryType::ALL`]
    pub fn index(&self) -> usize {
        match self {
            EntryType::Note => 0,
            EntryType::Event => 1,
            EntryType::Person => 2,
            EntryType::Place => 3,
            EntryType::Thing => 4,
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryType {
    type Err = ValidationError;

    /// Accepts singular or plural forms in any case ("note", "People")
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "note" | "notes" => Ok(EntryType::Note),
            "event" | "events" => Ok(EntryType::Event),
            "person" | "people" | "persons" => Ok(EntryType::Person),
            "place" | "places" => Ok(EntryType::Place),
            "thing" | "things" => Ok(EntryType::Thing),
            _ => Err(ValidationError::InvalidType(s.to_string())),
        }
    }
}

/// Type-specific payload of an entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EntryKind {
    Note,
    Event {
        #[serde(default)]
        start: Option<String>,
        #[serde(default)]
        end: Option<String>,
    },
    Person,
    Place {
        #[serde(default)]
        latitude: Option<String>,
        #[serde(default)]
        longitude: Option<String>,
        #[serde(default)]
        address: Option<String>,
    },
    Thing,
}

impl EntryKind {
    /// Empty payload for a type
    pub fn empty(entry_type: EntryType) -> Self {
        match entry_type {
            EntryType::Note => EntryKind::Note,
            EntryType::Event => EntryKind::Event {
                start: None,
                end: None,
            },
            EntryType::Person => EntryKind::Person,
            EntryType::Place => EntryKind::Place {
                latitude: None,
                longitude: None,
                address: None,
            },
            EntryType::Thing => EntryKind::Thing,
        }
    }

    pub fn entry_type(&self) -> EntryType {
        match self {
            EntryKind::Note => EntryType::Note,
            EntryKind::Event { .. } => EntryType::Event,
            EntryKind::Person => EntryType::Person,
            EntryKind::Place { .. } => EntryType::Place,
            EntryKind::Thing => EntryType::Thing,
        }
    }
}

/// One knowledge item: a note, event, person, place or thing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Entry {
    /// Display name, unique across the store once slugified
    pub name: String,
    /// Identity key, derived from the name when the entry is stored
    pub slug: String,
    /// Free-form body text
    #[serde(default)]
    pub description: String,
    /// Labels, compared case-insensitively, kept in insertion order
    #[serde(default)]
    pub tags: Vec<String>,
    /// Slugs this entry references
    #[serde(default)]
    pub links_to: Vec<String>,
    /// Slugs of entries referencing this one (maintained by the store)
    #[serde(default)]
    pub linked_from: Vec<String>,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    /// Type and type-specific fields
    #[serde(flatten)]
    pub kind: EntryKind,
    /// Ad hoc attributes
    #[serde(default)]
    pub custom: BTreeMap<String, String>,
    /// Hidden from default listings but still reachable by link
    #[serde(default)]
    pub exclude: bool,
}

impl Entry {
    /// Create a new, unsaved entry of the given type
    pub fn new(entry_type: EntryType, name: impl Into<String>) -> Self {
        Self::with_kind(EntryKind::empty(entry_type), name)
    }

    /// Create a new, unsaved entry with a type-specific payload
    pub fn with_kind(kind: EntryKind, name: impl Into<String>) -> Self {
        let name = name.into();
        let now = Utc::now();
        Self {
            slug: slugify(&name),
            name,
            description: String::new(),
            tags: Vec::new(),
            links_to: Vec::new(),
            linked_from: Vec::new(),
            created: now,
            modified: now,
            kind,
            custom: BTreeMap::new(),
            exclude: false,
        }
    }

    pub fn entry_type(&self) -> EntryType {
        self.kind.entry_type()
    }

    /// Rename the entry
    ///
    /// The slug is left alone: it still identifies the stored entry until
    /// the store accepts the update and re-derives it.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.touch();
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
        self.touch();
    }

    /// Add a tag unless an equal tag (ignoring case) is already present
    pub fn add_tag(&mut self, tag: impl Into<String>) {
        let tag = tag.into();
        let tag = tag.trim();
        if tag.is_empty() || self.has_tag(tag) {
            return;
        }
        self.tags.push(tag.to_string());
        self.touch();
    }

    /// Remove a tag, ignoring case
    pub fn remove_tag(&mut self, tag: &str) {
        let tag = tag.to_lowercase();
        if let Some(pos) = self.tags.iter().position(|t| t.to_lowercase() == tag) {
            self.tags.remove(pos);
            self.touch();
        }
    }

    /// Set all tags (replacing existing, dropping case-insensitive duplicates)
    pub fn set_tags(&mut self, tags: Vec<String>) {
        self.tags = dedup_tags(tags);
        self.touch();
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        let tag = tag.to_lowercase();
        self.tags.iter().any(|t| t.to_lowercase() == tag)
    }

    /// Tags as a comma-separated string
    pub fn tags_string(&self) -> String {
        self.tags.join(",")
    }

    /// Declare an outgoing link to the entry with the given name
    pub fn add_link(&mut self, name: &str) {
        let slug = slugify(name);
        if !slug.is_empty() && !self.links_to.contains(&slug) {
            self.links_to.push(slug);
            self.touch();
        }
    }

    /// Drop an outgoing link by name or slug
    pub fn remove_link(&mut self, name: &str) {
        let slug = slugify(name);
        if let Some(pos) = self.links_to.iter().position(|s| *s == slug) {
            self.links_to.remove(pos);
            self.touch();
        }
    }

    pub fn links_to_entry(&self, slug: &str) -> bool {
        self.links_to.iter().any(|s| s == slug)
    }

    pub fn set_custom(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.custom.insert(key.into(), value.into());
        self.touch();
    }

    /// Outgoing links followed by incoming ones, as shown when browsing
    pub fn all_links(&self) -> impl Iterator<Item = &String> {
        self.links_to.iter().chain(self.linked_from.iter())
    }

    /// Carry the store-owned fields of `original` over to an edited copy
    ///
    /// Keeps the original slug (so the store can detect a rename), the
    /// creation time and the incoming link set.
    pub fn retain_identity(&mut self, original: &Entry) {
        self.slug = original.slug.clone();
        self.created = original.created;
        self.linked_from = original.linked_from.clone();
    }

    fn touch(&mut self) {
        self.modified = Utc::now();
    }
}

/// Drop blank tags and case-insensitive duplicates, keeping first spelling
pub(crate) fn dedup_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if tag.is_empty() {
            continue;
        }
        let lower = tag.to_lowercase();
        if !out.iter().any(|t| t.to_lowercase() == lower) {
            out.push(tag.to_string());
        }
    }
    out
}

/// Normalise a link list into unique, non-empty slugs, keeping order
pub(crate) fn dedup_links(links: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(links.len());
    for link in links {
        let slug = slugify(&link);
        if !slug.is_empty() && !out.contains(&slug) {
            out.push(slug);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_new() {
        let entry = Entry::new(EntryType::Note, "Apple Pie");
        assert_eq!(entry.name, "Apple Pie");
        assert_eq!(entry.slug, "apple-pie");
        assert_eq!(entry.entry_type(), EntryType::Note);
        assert!(entry.tags.is_empty());
        assert!(entry.links_to.is_empty());
        assert!(entry.linked_from.is_empty());
        assert!(!entry.exclude);
    }

    #[test]
    fn test_entry_type_payloads() {
        let event = Entry::new(EntryType::Event, "Launch");
        assert_eq!(
            event.kind,
            EntryKind::Event {
                start: None,
                end: None
            }
        );
        let place = Entry::new(EntryType::Place, "Home");
        assert_eq!(place.entry_type(), EntryType::Place);
    }

    #[test]
    fn test_entry_type_from_str() {
        assert_eq!("note".parse::<EntryType>().unwrap(), EntryType::Note);
        assert_eq!("People".parse::<EntryType>().unwrap(), EntryType::Person);
        assert_eq!(" THINGS ".parse::<EntryType>().unwrap(), EntryType::Thing);
        assert_eq!(
            "widget".parse::<EntryType>(),
            Err(ValidationError::InvalidType("widget".to_string()))
        );
    }

    #[test]
    fn test_set_name_keeps_slug() {
        let mut entry = Entry::new(EntryType::Note, "Apple Pie");
        let original_modified = entry.modified;
        std::thread::sleep(std::time::Duration::from_millis(10));
        entry.set_name("Apple Tart");
        assert_eq!(entry.name, "Apple Tart");
        assert_eq!(entry.slug, "apple-pie");
        assert!(entry.modified > original_modified);
    }

    #[test]
    fn test_tags_case_insensitive() {
        let mut entry = Entry::new(EntryType::Note, "Apple Pie");
        entry.add_tag("Food");
        entry.add_tag("dessert");
        entry.add_tag("food");
        assert_eq!(entry.tags, vec!["Food", "dessert"]);
        assert!(entry.has_tag("FOOD"));

        entry.remove_tag("DESSERT");
        assert_eq!(entry.tags, vec!["Food"]);

        entry.set_tags(vec!["a".into(), "A".into(), " ".into(), "b".into()]);
        assert_eq!(entry.tags, vec!["a", "b"]);
        assert_eq!(entry.tags_string(), "a,b");
    }

    #[test]
    fn test_links_are_slugs() {
        let mut entry = Entry::new(EntryType::Note, "Apple Pie");
        entry.add_link("Banana");
        entry.add_link("banana");
        entry.add_link("Apple Tree");
        assert_eq!(entry.links_to, vec!["banana", "apple-tree"]);
        assert!(entry.links_to_entry("banana"));

        entry.remove_link("BANANA");
        assert_eq!(entry.links_to, vec!["apple-tree"]);
    }

    #[test]
    fn test_retain_identity() {
        let mut original = Entry::new(EntryType::Note, "Apple Pie");
        original.linked_from.push("banana".to_string());

        let mut edited = Entry::new(EntryType::Note, "Apple Tart");
        edited.retain_identity(&original);

        assert_eq!(edited.slug, "apple-pie");
        assert_eq!(edited.created, original.created);
        assert_eq!(edited.linked_from, vec!["banana"]);
        assert_eq!(edited.name, "Apple Tart");
    }

    #[test]
    fn test_all_links_order() {
        let mut entry = Entry::new(EntryType::Note, "Apple Pie");
        entry.links_to = vec!["banana".into()];
        entry.linked_from = vec!["apple-tree".into()];
        let all: Vec<_> = entry.all_links().cloned().collect();
        assert_eq!(all, vec!["banana", "apple-tree"]);
    }

    #[test]
    fn test_dedup_links() {
        let links = dedup_links(vec![
            "Banana".into(),
            "banana".into(),
            "!!".into(),
            "Apple Tree".into(),
        ]);
        assert_eq!(links, vec!["banana", "apple-tree"]);
    }

    #[test]
    fn test_entry_serialization_keeps_empty_link_sets() {
        let mut entry = Entry::new(EntryType::Place, "Home");
        if let EntryKind::Place { address, .. } = &mut entry.kind {
            *address = Some("1 Main St".to_string());
        }
        entry.set_custom("color", "blue");

        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"links_to\":[]"));
        assert!(json.contains("\"linked_from\":[]"));
        assert!(json.contains("\"type\":\"Place\""));

        let deserialized: Entry = serde_json::from_str(&json).unwrap();
        assert_eq!(entry, deserialized);
    }
}
