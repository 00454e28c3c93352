//! Entry store
//!
//! The `EntryStore` owns every entry. Entries are indexed by slug for link
//! resolution and kept in one insertion-ordered sequence per type for
//! deterministic iteration. Every mutation runs its link-graph repair before
//! returning, so callers never observe a half-repaired graph.
//!
//! ## Usage
//!
//! ```ignore
//! let mut store = EntryStore::new(StoreSettings::default());
//!
//! let mut pie = Entry::new(EntryType::Note, "Apple Pie");
//! pie.add_link("Banana");
//! store.create(pie)?;
//!
//! let pie = store.get(EntryType::Note, "apple pie")?;
//! ```
//!
//! The store has no persistence of its own: it is built from a
//! [`Snapshot`] at startup and turned back into one on save.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{MemoryError, MemoryResult, ValidationError};
use crate::graph::{EntryMap, LinkGraph, LinkIssue};
use crate::models::{dedup_links, dedup_tags, Entry, EntryType};
use crate::query::{Query, QueryEngine, QueryResults};
use crate::slug::slugify;

/// Current snapshot format version
pub const SNAPSHOT_VERSION: u32 = 1;

/// Limits applied when entries are created or renamed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSettings {
    /// Maximum length of an entry name, in characters
    pub max_name_len: usize,
    /// Ceiling used when a query asks for no limit
    pub default_limit: usize,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            max_name_len: crate::config::DEFAULT_MAX_NAME_LEN,
            default_limit: crate::config::DEFAULT_LIMIT,
        }
    }
}

impl From<&Config> for StoreSettings {
    fn from(config: &Config) -> Self {
        Self {
            max_name_len: config.max_name_len,
            default_limit: config.default_limit,
        }
    }
}

/// Serialized form of the whole collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    /// Entries grouped by type, each group in insertion order
    pub entries: Vec<Entry>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            entries: Vec::new(),
        }
    }
}

/// Whether soft-excluded entries can be returned by a lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Hide entries marked `exclude`
    Default,
    /// Return excluded entries too
    IncludeExcluded,
}

/// The authoritative in-memory collection of entries
#[derive(Debug, Clone)]
pub struct EntryStore {
    /// Every entry, keyed by slug
    entries: EntryMap,
    /// Slugs per type in insertion order, indexed by `EntryType::index`
    order: [Vec<String>; 5],
    settings: StoreSettings,
}

impl Default for EntryStore {
    fn default() -> Self {
        Self::new(StoreSettings::default())
    }
}

impl EntryStore {
    /// Create an empty store
    pub fn new(settings: StoreSettings) -> Self {
        Self {
            entries: EntryMap::new(),
            order: Default::default(),
            settings,
        }
    }

    /// Rebuild a store from a persisted snapshot
    ///
    /// Slugs are re-derived from names. Duplicate slugs are rejected, and
    /// backlinks are recomputed from outgoing links so the graph is
    /// symmetric even if the file was edited by hand.
    pub fn from_snapshot(snapshot: Snapshot, settings: StoreSettings) -> MemoryResult<Self> {
        let mut store = Self::new(settings);
        for mut entry in snapshot.entries {
            entry.name = entry.name.trim().to_string();
            entry.slug = slugify(&entry.name);
            if entry.slug.is_empty() {
                return Err(ValidationError::EmptyName.into());
            }
            if let Some(existing) = store.entries.get(&entry.slug) {
                return Err(MemoryError::DuplicateName {
                    name: entry.name,
                    existing: existing.name.clone(),
                });
            }
            entry.links_to = dedup_links(entry.links_to);
            store.order[entry.entry_type().index()].push(entry.slug.clone());
            store.entries.insert(entry.slug.clone(), entry);
        }

        let repaired = LinkGraph::new(&mut store.entries).rebuild();
        if repaired > 0 {
            warn!(repaired, "repaired backlinks while loading entries");
        }
        info!(entries = store.entries.len(), "loaded entry store");
        Ok(store)
    }

    /// Export every entry, grouped by type in insertion order
    pub fn snapshot(&self) -> Snapshot {
        let entries = EntryType::ALL
            .iter()
            .flat_map(|t| self.all(*t))
            .cloned()
            .collect();
        Snapshot {
            version: SNAPSHOT_VERSION,
            entries,
        }
    }

    pub fn settings(&self) -> &StoreSettings {
        &self.settings
    }

    // ==================== Mutations ====================

    /// Insert a new entry
    ///
    /// Fails if the name is invalid or its slug is already used by an entry
    /// of any type. Stamps `created`/`modified`, derives the slug and wires
    /// the entry into the link graph. Caller-supplied backlinks are ignored.
    pub fn create(&mut self, mut entry: Entry) -> MemoryResult<&Entry> {
        let (name, slug) = self.validate_name(&entry.name)?;
        entry.name = name;
        if let Some(existing) = self.entries.get(&slug) {
            return Err(MemoryError::DuplicateName {
                name: entry.name,
                existing: existing.name.clone(),
            });
        }

        let now = Utc::now();
        entry.slug = slug.clone();
        entry.created = now;
        entry.modified = now;
        entry.tags = dedup_tags(entry.tags);
        entry.links_to = dedup_links(entry.links_to);
        entry.linked_from.clear();

        debug!(slug = %slug, entry_type = %entry.entry_type(), "creating entry");
        self.order[entry.entry_type().index()].push(slug.clone());
        self.entries.insert(slug.clone(), entry);
        LinkGraph::new(&mut self.entries).attach(&slug);

        Ok(&self.entries[&slug])
    }

    /// Replace a stored entry with an edited copy
    ///
    /// The entry is located by its `slug` field, which must still hold the
    /// identity it was stored under. If the name now slugifies differently
    /// the entry is renamed: uniqueness is re-checked and every link to the
    /// old slug is rewritten. `created` and `linked_from` are taken from the
    /// stored entry; `modified` is always bumped.
    pub fn update(&mut self, mut entry: Entry) -> MemoryResult<&Entry> {
        let old_slug = entry.slug.clone();
        let stored = self
            .entries
            .get(&old_slug)
            .ok_or_else(|| MemoryError::not_found(None, entry.name.clone()))?;

        let (name, new_slug) = self.validate_name(&entry.name)?;
        entry.name = name;
        let renamed = new_slug != old_slug;
        if renamed {
            if let Some(existing) = self.entries.get(&new_slug) {
                return Err(MemoryError::DuplicateName {
                    name: entry.name,
                    existing: existing.name.clone(),
                });
            }
        }

        let old_type = stored.entry_type();
        let mut previous_links = stored.links_to.clone();
        entry.created = stored.created;
        entry.linked_from = stored.linked_from.clone();
        entry.modified = Utc::now();
        entry.slug = new_slug.clone();
        entry.tags = dedup_tags(entry.tags);
        entry.links_to = dedup_links(entry.links_to);
        let new_type = entry.entry_type();

        debug!(old = %old_slug, new = %new_slug, "updating entry");
        self.entries.remove(&old_slug);
        self.entries.insert(new_slug.clone(), entry);
        self.reorder(&old_slug, old_type, &new_slug, new_type);

        let mut graph = LinkGraph::new(&mut self.entries);
        if renamed {
            graph.rename(&old_slug, &new_slug);
            for link in previous_links.iter_mut().filter(|l| **l == old_slug) {
                *link = new_slug.clone();
            }
        }
        graph.relink(&new_slug, &previous_links);

        Ok(&self.entries[&new_slug])
    }

    /// Remove an entry and strip its slug from every link set
    ///
    /// Excluded entries can be deleted. Entries that referenced the deleted
    /// one are repaired, never removed.
    pub fn delete(&mut self, entry_type: EntryType, name: &str) -> MemoryResult<Entry> {
        let slug = self
            .lookup(Some(entry_type), name, Visibility::IncludeExcluded)?
            .slug
            .clone();

        let removed = self
            .entries
            .remove(&slug)
            .ok_or_else(|| MemoryError::not_found(Some(entry_type), name))?;
        self.order[entry_type.index()].retain(|s| *s != slug);
        LinkGraph::new(&mut self.entries).detach(&slug);

        debug!(slug = %slug, "deleted entry");
        Ok(removed)
    }

    /// Rebuild every backlink set from the outgoing links
    ///
    /// Returns the number of entries that changed.
    pub fn repair_links(&mut self) -> usize {
        let repaired = LinkGraph::new(&mut self.entries).rebuild();
        if repaired > 0 {
            info!(repaired, "repaired backlinks");
        }
        repaired
    }

    // ==================== Lookups ====================

    /// Get a visible entry of the given type by name
    pub fn get(&self, entry_type: EntryType, name: &str) -> MemoryResult<&Entry> {
        self.lookup(Some(entry_type), name, Visibility::Default)
    }

    /// Get an entry by name, optionally restricted to one type
    ///
    /// The name is slugified before lookup. A slug held by an entry of a
    /// different type, or by an excluded entry when `visibility` is
    /// `Default`, is reported as not found.
    pub fn lookup(
        &self,
        entry_type: Option<EntryType>,
        name: &str,
        visibility: Visibility,
    ) -> MemoryResult<&Entry> {
        let not_found = || MemoryError::not_found(entry_type, name);
        let entry = self.resolve(&slugify(name)).ok_or_else(not_found)?;
        if entry_type.is_some_and(|t| t != entry.entry_type()) {
            return Err(not_found());
        }
        if entry.exclude && visibility == Visibility::Default {
            return Err(not_found());
        }
        Ok(entry)
    }

    /// Find an entry of any type by name, including excluded entries
    pub fn find(&self, name: &str) -> Option<&Entry> {
        self.resolve(&slugify(name))
    }

    /// Resolve a link target; `None` means the link dangles
    pub fn resolve(&self, slug: &str) -> Option<&Entry> {
        self.entries.get(slug)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Entries of one type in insertion order
    ///
    /// The iterator borrows the store and can be recreated at will.
    pub fn all(&self, entry_type: EntryType) -> impl Iterator<Item = &Entry> + '_ {
        self.order[entry_type.index()]
            .iter()
            .filter_map(|slug| self.entries.get(slug))
    }

    /// Every entry, types in `EntryType::ALL` order, each in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Entry> + '_ {
        EntryType::ALL.into_iter().flat_map(|t| self.all(t))
    }

    /// Run a query over the whole collection
    pub fn query(&self, query: Query) -> QueryResults<'_> {
        QueryEngine::new(self.settings.default_limit).run(self.iter(), query)
    }

    /// Total number of entries, excluded ones included
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn count_of(&self, entry_type: EntryType) -> usize {
        self.order[entry_type.index()].len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Tags with usage counts, merged case-insensitively, sorted by name
    ///
    /// The first spelling encountered is the one reported.
    pub fn tag_counts(&self) -> Vec<(String, usize)> {
        let mut counts: Vec<(String, usize)> = Vec::new();
        for entry in self.iter() {
            for tag in &entry.tags {
                let lower = tag.to_lowercase();
                match counts.iter_mut().find(|(t, _)| t.to_lowercase() == lower) {
                    Some((_, n)) => *n += 1,
                    None => counts.push((tag.clone(), 1)),
                }
            }
        }
        counts.sort_by_key(|(t, _)| t.to_lowercase());
        counts
    }

    /// Audit the link graph
    pub fn check_links(&self) -> Vec<LinkIssue> {
        LinkGraph::issues(&self.entries)
    }

    // ==================== Internals ====================

    /// Returns the trimmed display name and its slug
    fn validate_name(&self, name: &str) -> Result<(String, String), ValidationError> {
        let trimmed = name.trim();
        if trimmed.chars().count() > self.settings.max_name_len {
            return Err(ValidationError::NameTooLong {
                name: trimmed.to_string(),
                max: self.settings.max_name_len,
            });
        }
        let slug = slugify(trimmed);
        if slug.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        Ok((trimmed.to_string(), slug))
    }

    fn reorder(&mut self, old_slug: &str, old_type: EntryType, new_slug: &str, new_type: EntryType) {
        let old_seq = &mut self.order[old_type.index()];
        if old_type == new_type {
            if let Some(pos) = old_seq.iter().position(|s| s == old_slug) {
                old_seq[pos] = new_slug.to_string();
            }
        } else {
            old_seq.retain(|s| s != old_slug);
            self.order[new_type.index()].push(new_slug.to_string());
        }
    }
}
