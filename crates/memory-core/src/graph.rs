//! Link graph maintenance
//!
//! Entries reference each other by slug. Each edge is recorded twice: in the
//! source's `links_to` and in the target's `linked_from`. `LinkGraph` is the
//! only code that writes `linked_from`, and it keeps the two sides symmetric:
//!
//! `b.slug ∈ a.links_to  ⇔  a.slug ∈ b.linked_from`
//!
//! A slug in `links_to` that resolves to no entry is a dangling link. It is
//! tolerated and becomes a live edge as soon as an entry with that slug is
//! created or renamed into place.
//!
//! Rename and delete repair scan every entry. That is linear in the size of
//! the collection, which is fine for a personal knowledge base.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::models::Entry;

/// All stored entries, keyed by slug
pub(crate) type EntryMap = HashMap<String, Entry>;

/// A problem found while auditing the link graph
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LinkIssue {
    /// `from` links to `to`, but `to` does not list `from` as a backlink
    MissingBacklink { from: String, to: String },
    /// `entry` lists `from` as a backlink, but `from` does not link to it
    StaleBacklink { entry: String, from: String },
    /// `from` links to a slug that no entry has
    Dangling { from: String, to: String },
}

impl LinkIssue {
    /// Whether the issue breaks link symmetry (dangling links do not)
    pub fn is_violation(&self) -> bool {
        !matches!(self, LinkIssue::Dangling { .. })
    }
}

impl std::fmt::Display for LinkIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkIssue::MissingBacklink { from, to } => {
                write!(f, "{} links to {} but is missing from its backlinks", from, to)
            }
            LinkIssue::StaleBacklink { entry, from } => {
                write!(f, "{} lists {} as a backlink but {} does not link to it", entry, from, from)
            }
            LinkIssue::Dangling { from, to } => {
                write!(f, "{} links to {}, which does not exist", from, to)
            }
        }
    }
}

/// Keeps `links_to`/`linked_from` symmetric across store mutations
///
/// Every method assumes the store has already committed the entry change it
/// is repairing for; none of them can fail.
pub(crate) struct LinkGraph<'a> {
    entries: &'a mut EntryMap,
}

impl<'a> LinkGraph<'a> {
    pub(crate) fn new(entries: &'a mut EntryMap) -> Self {
        Self { entries }
    }

    /// Wire up a freshly inserted entry
    ///
    /// Registers its outgoing links as backlinks on their targets and
    /// adopts every existing entry that already linked to its slug.
    pub(crate) fn attach(&mut self, slug: &str) {
        let outgoing = match self.entries.get(slug) {
            Some(entry) => entry.links_to.clone(),
            None => return,
        };
        for target in &outgoing {
            self.add_backlink(target, slug);
        }
        self.adopt_inbound(slug);
        debug!(slug, outgoing = outgoing.len(), "attached entry to link graph");
    }

    /// Apply a change to an entry's outgoing links
    ///
    /// `previous` is the entry's `links_to` before the change, expressed in
    /// current slugs. Removed targets that no longer exist are skipped.
    pub(crate) fn relink(&mut self, slug: &str, previous: &[String]) {
        let current = match self.entries.get(slug) {
            Some(entry) => entry.links_to.clone(),
            None => return,
        };
        for removed in previous.iter().filter(|s| !current.contains(s)) {
            self.remove_backlink(removed, slug);
        }
        for added in current.iter().filter(|s| !previous.contains(s)) {
            self.add_backlink(added, slug);
        }
    }

    /// Rewrite every reference to `old` so it points at `new`
    ///
    /// The renamed entry must already be stored under `new`.
    pub(crate) fn rename(&mut self, old: &str, new: &str) {
        let mut rewritten = 0usize;
        for entry in self.entries.values_mut() {
            if replace_slug(&mut entry.links_to, old, new) {
                rewritten += 1;
            }
            if replace_slug(&mut entry.linked_from, old, new) {
                rewritten += 1;
            }
        }
        // Links that dangled towards the new name now resolve.
        self.adopt_inbound(new);
        debug!(old, new, rewritten, "rewrote links after rename");
    }

    /// Strip a deleted slug from every link set
    ///
    /// The deleted entry must already be gone from the map.
    pub(crate) fn detach(&mut self, slug: &str) {
        let mut touched = 0usize;
        for entry in self.entries.values_mut() {
            let before = entry.links_to.len() + entry.linked_from.len();
            entry.links_to.retain(|s| s != slug);
            entry.linked_from.retain(|s| s != slug);
            if entry.links_to.len() + entry.linked_from.len() != before {
                touched += 1;
            }
        }
        debug!(slug, touched, "detached entry from link graph");
    }

    /// Recompute every `linked_from` set from the `links_to` sets
    ///
    /// Returns the number of entries whose backlinks changed.
    pub(crate) fn rebuild(&mut self) -> usize {
        let mut expected: HashMap<String, Vec<String>> = HashMap::new();
        let mut sources: Vec<&String> = self.entries.keys().collect();
        sources.sort();
        for source in sources {
            for target in &self.entries[source].links_to {
                if self.entries.contains_key(target) {
                    expected
                        .entry(target.clone())
                        .or_default()
                        .push(source.clone());
                }
            }
        }

        let mut changed = 0usize;
        for (slug, entry) in self.entries.iter_mut() {
            let wanted = expected.remove(slug).unwrap_or_default();
            if !same_members(&entry.linked_from, &wanted) {
                // Keep surviving backlinks in their existing order.
                let mut rebuilt: Vec<String> = Vec::with_capacity(wanted.len());
                for source in entry.linked_from.iter().filter(|s| wanted.contains(s)) {
                    if !rebuilt.contains(source) {
                        rebuilt.push(source.clone());
                    }
                }
                for source in wanted {
                    if !rebuilt.contains(&source) {
                        rebuilt.push(source);
                    }
                }
                entry.linked_from = rebuilt;
                changed += 1;
            }
        }
        changed
    }

    /// Audit the graph without changing it
    pub(crate) fn issues(entries: &EntryMap) -> Vec<LinkIssue> {
        let mut issues = Vec::new();
        for (slug, entry) in entries {
            for target in &entry.links_to {
                match entries.get(target) {
                    Some(t) if t.linked_from.contains(slug) => {}
                    Some(_) => issues.push(LinkIssue::MissingBacklink {
                        from: slug.clone(),
                        to: target.clone(),
                    }),
                    None => issues.push(LinkIssue::Dangling {
                        from: slug.clone(),
                        to: target.clone(),
                    }),
                }
            }
            for source in &entry.linked_from {
                let links_back = entries
                    .get(source)
                    .map(|s| s.links_to.contains(slug))
                    .unwrap_or(false);
                if !links_back {
                    issues.push(LinkIssue::StaleBacklink {
                        entry: slug.clone(),
                        from: source.clone(),
                    });
                }
            }
        }
        issues.sort();
        issues
    }

    fn adopt_inbound(&mut self, slug: &str) {
        let mut inbound: Vec<String> = self
            .entries
            .values()
            .filter(|e| e.links_to.iter().any(|s| s == slug))
            .map(|e| e.slug.clone())
            .collect();
        inbound.sort();
        if let Some(entry) = self.entries.get_mut(slug) {
            for source in inbound {
                if !entry.linked_from.contains(&source) {
                    entry.linked_from.push(source);
                }
            }
        }
    }

    fn add_backlink(&mut self, target: &str, source: &str) {
        if let Some(entry) = self.entries.get_mut(target) {
            if !entry.linked_from.iter().any(|s| s == source) {
                entry.linked_from.push(source.to_string());
            }
        }
    }

    fn remove_backlink(&mut self, target: &str, source: &str) {
        if let Some(entry) = self.entries.get_mut(target) {
            entry.linked_from.retain(|s| s != source);
        }
    }
}

/// Replace `old` with `new` in a slug list, dropping a resulting duplicate
fn replace_slug(slugs: &mut Vec<String>, old: &str, new: &str) -> bool {
    let Some(pos) = slugs.iter().position(|s| s == old) else {
        return false;
    };
    if slugs.iter().any(|s| s == new) {
        slugs.remove(pos);
    } else {
        slugs[pos] = new.to_string();
    }
    true
}

fn same_members(a: &[String], b: &[String]) -> bool {
    a.len() == b.len() && a.iter().all(|s| b.contains(s)) && b.iter().all(|s| a.contains(s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntryType;

    fn entry(name: &str, links: &[&str]) -> Entry {
        let mut e = Entry::new(EntryType::Note, name);
        e.links_to = links.iter().map(|s| s.to_string()).collect();
        e
    }

    fn map(entries: Vec<Entry>) -> EntryMap {
        entries.into_iter().map(|e| (e.slug.clone(), e)).collect()
    }

    fn assert_symmetric(entries: &EntryMap) {
        let violations: Vec<_> = LinkGraph::issues(entries)
            .into_iter()
            .filter(LinkIssue::is_violation)
            .collect();
        assert!(violations.is_empty(), "asymmetric graph: {:?}", violations);
    }

    #[test]
    fn test_attach_adds_backlinks_and_adopts_inbound() {
        let mut entries = map(vec![entry("Banana", &[]), entry("Cherry", &["apple-pie"])]);
        entries.insert("apple-pie".into(), entry("Apple Pie", &["banana"]));

        LinkGraph::new(&mut entries).attach("apple-pie");

        assert_eq!(entries["banana"].linked_from, vec!["apple-pie"]);
        assert_eq!(entries["apple-pie"].linked_from, vec!["cherry"]);
        assert_symmetric(&entries);
    }

    #[test]
    fn test_attach_tolerates_dangling_targets() {
        let mut entries = map(vec![entry("Apple Pie", &["nowhere"])]);
        LinkGraph::new(&mut entries).attach("apple-pie");

        let issues = LinkGraph::issues(&entries);
        assert_eq!(
            issues,
            vec![LinkIssue::Dangling {
                from: "apple-pie".into(),
                to: "nowhere".into()
            }]
        );
        assert!(!issues[0].is_violation());
    }

    #[test]
    fn test_relink_diff() {
        let mut entries = map(vec![
            entry("Apple Pie", &["banana"]),
            entry("Banana", &[]),
            entry("Cherry", &[]),
        ]);
        LinkGraph::new(&mut entries).rebuild();

        entries.get_mut("apple-pie").unwrap().links_to = vec!["cherry".into()];
        LinkGraph::new(&mut entries).relink("apple-pie", &["banana".to_string()]);

        assert!(entries["banana"].linked_from.is_empty());
        assert_eq!(entries["cherry"].linked_from, vec!["apple-pie"]);
        assert_symmetric(&entries);
    }

    #[test]
    fn test_relink_removed_target_missing_is_not_an_error() {
        let mut entries = map(vec![entry("Apple Pie", &[])]);
        LinkGraph::new(&mut entries).relink("apple-pie", &["gone".to_string()]);
        assert_symmetric(&entries);
    }

    #[test]
    fn test_rename_rewrites_both_sides() {
        let mut entries = map(vec![
            entry("Apple Pie", &["banana"]),
            entry("Banana", &["apple-pie"]),
        ]);
        LinkGraph::new(&mut entries).rebuild();

        let mut renamed = entries.remove("apple-pie").unwrap();
        renamed.name = "Apple Tart".into();
        renamed.slug = "apple-tart".into();
        entries.insert("apple-tart".into(), renamed);
        LinkGraph::new(&mut entries).rename("apple-pie", "apple-tart");

        assert_eq!(entries["banana"].links_to, vec!["apple-tart"]);
        assert_eq!(entries["banana"].linked_from, vec!["apple-tart"]);
        assert_eq!(entries["apple-tart"].linked_from, vec!["banana"]);
        for e in entries.values() {
            assert!(!e.all_links().any(|s| s == "apple-pie"));
        }
        assert_symmetric(&entries);
    }

    #[test]
    fn test_rename_adopts_links_dangling_towards_new_name() {
        let mut entries = map(vec![entry("Apple Pie", &[]), entry("Cherry", &["apple-tart"])]);

        let mut renamed = entries.remove("apple-pie").unwrap();
        renamed.slug = "apple-tart".into();
        entries.insert("apple-tart".into(), renamed);
        LinkGraph::new(&mut entries).rename("apple-pie", "apple-tart");

        assert_eq!(entries["apple-tart"].linked_from, vec!["cherry"]);
        assert_symmetric(&entries);
    }

    #[test]
    fn test_detach_strips_slug_everywhere() {
        let mut entries = map(vec![
            entry("Apple Pie", &["banana"]),
            entry("Banana", &["apple-pie"]),
        ]);
        LinkGraph::new(&mut entries).rebuild();

        entries.remove("apple-pie");
        LinkGraph::new(&mut entries).detach("apple-pie");

        assert!(entries["banana"].links_to.is_empty());
        assert!(entries["banana"].linked_from.is_empty());
        assert!(LinkGraph::issues(&entries).is_empty());
    }

    #[test]
    fn test_rebuild_repairs_hand_edited_backlinks() {
        let mut entries = map(vec![entry("Apple Pie", &["banana"]), entry("Banana", &[])]);
        entries.get_mut("banana").unwrap().linked_from = vec!["ghost".into()];

        let issues = LinkGraph::issues(&entries);
        assert!(issues.contains(&LinkIssue::MissingBacklink {
            from: "apple-pie".into(),
            to: "banana".into()
        }));
        assert!(issues.contains(&LinkIssue::StaleBacklink {
            entry: "banana".into(),
            from: "ghost".into()
        }));

        assert_eq!(LinkGraph::new(&mut entries).rebuild(), 1);
        assert_eq!(entries["banana"].linked_from, vec!["apple-pie"]);
        assert!(LinkGraph::issues(&entries).is_empty());

        // Nothing left to repair
        assert_eq!(LinkGraph::new(&mut entries).rebuild(), 0);
    }

    #[test]
    fn test_replace_slug_dedups() {
        let mut slugs = vec!["a".to_string(), "b".to_string()];
        assert!(replace_slug(&mut slugs, "a", "b"));
        assert_eq!(slugs, vec!["b"]);
        assert!(!replace_slug(&mut slugs, "z", "y"));
    }
}
