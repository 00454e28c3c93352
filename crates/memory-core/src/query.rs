//! Query engine
//!
//! A query is a pure function of (entries, filters, sort, limit). Filters
//! run in a fixed order, each narrowing the previous stage's output:
//!
//! 1. visibility (soft-excluded entries are dropped unless requested)
//! 2. entry type
//! 3. name prefix (case-insensitive)
//! 4. name substring (case-insensitive)
//! 5. tags (any requested tag matches, case-insensitive)
//! 6. free text, delegated to a [`SearchBackend`]
//!
//! An empty criterion never filters anything out. Results are then sorted
//! (stable) and truncated. Queries cannot fail; unsatisfiable filters just
//! produce an empty result.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::models::{Entry, EntryType};

/// A selection of entry types
///
/// Selecting none or all five means "every type".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryTypes {
    pub note: bool,
    pub event: bool,
    pub person: bool,
    pub place: bool,
    pub thing: bool,
}

impl EntryTypes {
    /// Every type selected
    pub fn all() -> Self {
        Self {
            note: true,
            event: true,
            person: true,
            place: true,
            thing: true,
        }
    }

    /// Exactly one type selected
    pub fn only(entry_type: EntryType) -> Self {
        Self::default().with(entry_type)
    }

    /// Add a type to the selection
    pub fn with(mut self, entry_type: EntryType) -> Self {
        *self.flag_mut(entry_type) = true;
        self
    }

    /// Parse user words such as "notes", "Person", "places"
    pub fn from_names<I, S>(names: I) -> Result<Self, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut types = Self::default();
        for name in names {
            let name = name.as_ref();
            if name.trim().is_empty() {
                continue;
            }
            types = types.with(name.parse()?);
        }
        Ok(types)
    }

    /// True if either all or none of the types are selected
    pub fn has_all(&self) -> bool {
        let selected = self.selected();
        selected.is_empty() || selected.len() == EntryType::ALL.len()
    }

    /// Whether entries of this type pass the type filter
    pub fn contains(&self, entry_type: EntryType) -> bool {
        self.has_all() || self.flag(entry_type)
    }

    /// The explicitly selected types, in `EntryType::ALL` order
    pub fn selected(&self) -> Vec<EntryType> {
        EntryType::ALL
            .into_iter()
            .filter(|t| self.flag(*t))
            .collect()
    }

    fn flag(&self, entry_type: EntryType) -> bool {
        match entry_type {
            EntryType::Note => self.note,
            EntryType::Event => self.event,
            EntryType::Person => self.person,
            EntryType::Place => self.place,
            EntryType::Thing => self.thing,
        }
    }

    fn flag_mut(&mut self, entry_type: EntryType) -> &mut bool {
        match entry_type {
            EntryType::Note => &mut self.note,
            EntryType::Event => &mut self.event,
            EntryType::Person => &mut self.person,
            EntryType::Place => &mut self.place,
            EntryType::Thing => &mut self.thing,
        }
    }
}

impl fmt::Display for EntryTypes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.has_all() {
            return f.write_str("All types");
        }
        let names: Vec<&str> = self.selected().iter().map(|t| t.plural()).collect();
        f.write_str(&names.join(", "))
    }
}

/// Result ordering
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Most recently modified first
    #[default]
    Recent,
    /// Name ascending, case-sensitive
    Name,
}

impl SortOrder {
    /// Map a requested sort field to an ordering
    ///
    /// "modified" and "recent" sort by modification time; any other field
    /// falls back to name order.
    pub fn from_field(field: &str) -> Self {
        match field.trim().to_lowercase().as_str() {
            "modified" | "recent" => SortOrder::Recent,
            _ => SortOrder::Name,
        }
    }
}

impl FromStr for SortOrder {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_field(s))
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Recent => f.write_str("most recently modified"),
            SortOrder::Name => f.write_str("name"),
        }
    }
}

/// Filter, sort and limit parameters for one query
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub types: EntryTypes,
    pub starts_with: String,
    pub contains: String,
    pub search: String,
    pub tags: Vec<String>,
    pub sort: SortOrder,
    /// Zero or negative means "up to the configured ceiling"
    pub limit: i64,
    pub include_excluded: bool,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn types(mut self, types: EntryTypes) -> Self {
        self.types = types;
        self
    }

    pub fn of_type(self, entry_type: EntryType) -> Self {
        let types = self.types.with(entry_type);
        self.types(types)
    }

    pub fn starts_with(mut self, prefix: impl Into<String>) -> Self {
        self.starts_with = prefix.into();
        self
    }

    pub fn contains(mut self, needle: impl Into<String>) -> Self {
        self.contains = needle.into();
        self
    }

    pub fn search(mut self, keywords: impl Into<String>) -> Self {
        self.search = keywords.into();
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn sort(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    pub fn include_excluded(mut self, include: bool) -> Self {
        self.include_excluded = include;
        self
    }
}

/// Entries matching a query, plus the parameters that produced them
///
/// `query.limit` holds the limit actually applied.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResults<'a> {
    pub entries: Vec<&'a Entry>,
    pub query: Query,
}

impl<'a> QueryResults<'a> {
    pub fn names(&self) -> Vec<&'a str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// One-line description of the view, e.g.
    /// "Notes starting with 'Apple', sorted by name"
    pub fn describe(&self) -> String {
        let q = &self.query;
        let mut parts = vec![q.types.to_string()];
        if !q.starts_with.is_empty() {
            parts.push(format!("starting with '{}'", q.starts_with));
        }
        if !q.contains.is_empty() {
            parts.push(format!("containing '{}'", q.contains));
        }
        if !q.tags.is_empty() {
            parts.push(format!("tagged {}", q.tags.join(" or ")));
        }
        if !q.search.is_empty() {
            parts.push(format!("matching '{}'", q.search));
        }
        if q.include_excluded {
            parts.push("including excluded".to_string());
        }
        format!("{}, sorted by {}", parts.join(" "), q.sort)
    }
}

/// Free-text filter stage
///
/// Implementations receive the entries that survived the earlier filters
/// and return the ones matching `keywords`, in the order they should be
/// considered before sorting.
pub trait SearchBackend {
    fn filter<'a>(&self, entries: Vec<&'a Entry>, keywords: &str) -> Vec<&'a Entry>;
}

/// Search backend that matches everything
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl SearchBackend for PassThrough {
    fn filter<'a>(&self, entries: Vec<&'a Entry>, _keywords: &str) -> Vec<&'a Entry> {
        entries
    }
}

/// Runs queries over a sequence of entries
pub struct QueryEngine {
    default_limit: usize,
    search: Box<dyn SearchBackend>,
}

impl QueryEngine {
    /// Engine with the pass-through free-text stage
    pub fn new(default_limit: usize) -> Self {
        Self::with_search(default_limit, Box::new(PassThrough))
    }

    pub fn with_search(default_limit: usize, search: Box<dyn SearchBackend>) -> Self {
        Self {
            default_limit,
            search,
        }
    }

    /// Filter, sort and limit `entries`
    ///
    /// The input order is the tie-breaker for equal sort keys.
    pub fn run<'a, I>(&self, entries: I, mut query: Query) -> QueryResults<'a>
    where
        I: IntoIterator<Item = &'a Entry>,
    {
        let mut results: Vec<&Entry> = entries
            .into_iter()
            .filter(|e| query.include_excluded || !e.exclude)
            .filter(|e| query.types.contains(e.entry_type()))
            .collect();
        results = filter_starts_with(results, &query.starts_with);
        results = filter_contains(results, &query.contains);
        results = filter_tags(results, &query.tags);
        if !query.search.trim().is_empty() {
            results = self.search.filter(results, &query.search);
        }

        sort_entries(&mut results, query.sort);

        let limit = effective_limit(query.limit, self.default_limit);
        results.truncate(limit);
        query.limit = i64::try_from(limit).unwrap_or(i64::MAX);

        QueryResults {
            entries: results,
            query,
        }
    }
}

/// Keep entries whose name starts with `prefix`, ignoring case
pub fn filter_starts_with<'a>(mut entries: Vec<&'a Entry>, prefix: &str) -> Vec<&'a Entry> {
    if prefix.is_empty() {
        return entries;
    }
    let prefix = prefix.to_lowercase();
    entries.retain(|e| e.name.to_lowercase().starts_with(&prefix));
    entries
}

/// Keep entries whose name contains `needle`, ignoring case
pub fn filter_contains<'a>(mut entries: Vec<&'a Entry>, needle: &str) -> Vec<&'a Entry> {
    if needle.is_empty() {
        return entries;
    }
    let needle = needle.to_lowercase();
    entries.retain(|e| e.name.to_lowercase().contains(&needle));
    entries
}

/// Keep entries carrying any of `tags`, ignoring case
pub fn filter_tags<'a>(mut entries: Vec<&'a Entry>, tags: &[String]) -> Vec<&'a Entry> {
    let wanted: Vec<String> = tags
        .iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();
    if wanted.is_empty() {
        return entries;
    }
    entries.retain(|e| e.tags.iter().any(|t| wanted.contains(&t.to_lowercase())));
    entries
}

/// Stable sort by the requested order
pub fn sort_entries(entries: &mut [&Entry], order: SortOrder) {
    match order {
        SortOrder::Name => entries.sort_by(|a, b| a.name.cmp(&b.name)),
        SortOrder::Recent => entries.sort_by(|a, b| b.modified.cmp(&a.modified)),
    }
}

/// Non-positive limits mean "up to the ceiling"
pub fn effective_limit(limit: i64, ceiling: usize) -> usize {
    if limit <= 0 {
        ceiling
    } else {
        usize::try_from(limit).unwrap_or(usize::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn entry(entry_type: EntryType, name: &str, tags: &[&str], age_minutes: i64) -> Entry {
        let mut e = Entry::new(entry_type, name);
        e.tags = tags.iter().map(|t| t.to_string()).collect();
        e.modified = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
            - Duration::minutes(age_minutes);
        e
    }

    fn fixture() -> Vec<Entry> {
        vec![
            entry(EntryType::Note, "Apple Tree", &["plant"], 30),
            entry(EntryType::Note, "Banana", &["food"], 10),
            entry(EntryType::Note, "Apple Pie", &["Food"], 20),
            entry(EntryType::Place, "Apple Store", &["shop"], 5),
            entry(EntryType::Person, "Ada", &[], 40),
        ]
    }

    fn run(entries: &[Entry], query: Query) -> Vec<String> {
        QueryEngine::new(999)
            .run(entries, query)
            .names()
            .into_iter()
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_scenario_notes_starting_with_apple() {
        let store = vec![
            entry(EntryType::Note, "Apple Pie", &["food"], 0),
            entry(EntryType::Note, "Apple Tree", &["plant"], 0),
            entry(EntryType::Note, "Banana", &["food"], 0),
        ];
        let query = Query::new()
            .of_type(EntryType::Note)
            .starts_with("Apple")
            .sort(SortOrder::Name)
            .limit(10);
        assert_eq!(run(&store, query), vec!["Apple Pie", "Apple Tree"]);
    }

    #[test]
    fn test_type_filter_none_or_all_means_all() {
        let entries = fixture();
        let none = run(&entries, Query::new().sort(SortOrder::Name));
        let all = run(&entries, Query::new().types(EntryTypes::all()).sort(SortOrder::Name));
        assert_eq!(none.len(), 5);
        assert_eq!(none, all);

        let some = run(
            &entries,
            Query::new()
                .types(EntryTypes::only(EntryType::Place).with(EntryType::Person))
                .sort(SortOrder::Name),
        );
        assert_eq!(some, vec!["Ada", "Apple Store"]);
    }

    #[test]
    fn test_prefix_and_contains_ignore_case() {
        let entries = fixture();
        assert_eq!(
            run(&entries, Query::new().starts_with("APPLE").sort(SortOrder::Name)),
            vec!["Apple Pie", "Apple Store", "Apple Tree"]
        );
        assert_eq!(
            run(&entries, Query::new().contains("TRE").sort(SortOrder::Name)),
            vec!["Apple Tree"]
        );
    }

    #[test]
    fn test_tag_filter_is_or_and_case_insensitive() {
        let entries = fixture();
        assert_eq!(
            run(&entries, Query::new().tag("FOOD").sort(SortOrder::Name)),
            vec!["Apple Pie", "Banana"]
        );
        assert_eq!(
            run(&entries, Query::new().tag("food").tag("shop").sort(SortOrder::Name)),
            vec!["Apple Pie", "Apple Store", "Banana"]
        );
        assert_eq!(run(&entries, Query::new().tag("  ")).len(), 5);
    }

    #[test]
    fn test_filters_are_monotonic() {
        let entries = fixture();
        let base = run(&entries, Query::new()).len();
        for query in [
            Query::new().starts_with("a"),
            Query::new().contains("e"),
            Query::new().tag("food"),
            Query::new().starts_with("a").contains("p").tag("food"),
        ] {
            assert!(run(&entries, query).len() <= base);
        }
    }

    #[test]
    fn test_unsatisfiable_query_is_empty_not_error() {
        let entries = fixture();
        assert!(run(&entries, Query::new().starts_with("zzz")).is_empty());
        assert!(run(&[], Query::new()).is_empty());
    }

    #[test]
    fn test_excluded_hidden_by_default() {
        let mut entries = fixture();
        entries[1].exclude = true;
        let visible = run(&entries, Query::new().sort(SortOrder::Name));
        assert!(!visible.contains(&"Banana".to_string()));

        let all = run(&entries, Query::new().include_excluded(true));
        assert!(all.contains(&"Banana".to_string()));
    }

    #[test]
    fn test_sort_recent_with_stable_ties() {
        let mut entries = fixture();
        assert_eq!(
            run(&entries, Query::new().sort(SortOrder::Recent)),
            vec!["Apple Store", "Banana", "Apple Pie", "Apple Tree", "Ada"]
        );

        // Equal timestamps keep input order
        let same = entries[0].modified;
        for e in entries.iter_mut() {
            e.modified = same;
        }
        assert_eq!(
            run(&entries, Query::new().sort(SortOrder::Recent)),
            vec!["Apple Tree", "Banana", "Apple Pie", "Apple Store", "Ada"]
        );
    }

    #[test]
    fn test_sort_name_is_case_sensitive() {
        let entries = vec![
            entry(EntryType::Note, "banana", &[], 0),
            entry(EntryType::Note, "Cherry", &[], 0),
            entry(EntryType::Note, "Apple", &[], 0),
        ];
        assert_eq!(
            run(&entries, Query::new().sort(SortOrder::Name)),
            vec!["Apple", "Cherry", "banana"]
        );
    }

    #[test]
    fn test_sort_is_idempotent() {
        let entries = fixture();
        for order in [SortOrder::Name, SortOrder::Recent] {
            let mut once: Vec<&Entry> = entries.iter().collect();
            sort_entries(&mut once, order);
            let mut twice = once.clone();
            sort_entries(&mut twice, order);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_sort_field_fallback() {
        assert_eq!(SortOrder::from_field("Modified"), SortOrder::Recent);
        assert_eq!(SortOrder::from_field("recent"), SortOrder::Recent);
        assert_eq!(SortOrder::from_field("name"), SortOrder::Name);
        assert_eq!(SortOrder::from_field("created"), SortOrder::Name);
        assert_eq!("whatever".parse::<SortOrder>(), Ok(SortOrder::Name));
    }

    #[test]
    fn test_limit_rules() {
        let entries = fixture();
        let engine = QueryEngine::new(3);

        let results = engine.run(&entries, Query::new().limit(0));
        assert_eq!(results.len(), 3);
        assert_eq!(results.query.limit, 3);

        let results = engine.run(&entries, Query::new().limit(-5));
        assert_eq!(results.len(), 3);

        let results = engine.run(&entries, Query::new().limit(2).sort(SortOrder::Name));
        assert_eq!(results.names(), vec!["Ada", "Apple Pie"]);

        let results = engine.run(&entries, Query::new().limit(50));
        assert_eq!(results.len(), 5);
        assert_eq!(results.query.limit, 50);
    }

    #[test]
    fn test_limit_twice_equals_once() {
        let entries = fixture();
        let engine = QueryEngine::new(999);
        let once = engine.run(&entries, Query::new().sort(SortOrder::Name).limit(2));
        let twice = engine.run(once.entries.clone(), once.query.clone());
        assert_eq!(once.names(), twice.names());
    }

    #[test]
    fn test_results_echo_parameters() {
        let entries = fixture();
        let query = Query::new()
            .of_type(EntryType::Note)
            .starts_with("Apple")
            .contains("p")
            .search("crust")
            .tag("food")
            .sort(SortOrder::Name)
            .limit(10);
        let results = QueryEngine::new(999).run(&entries, query.clone());
        assert_eq!(results.query, query);
        assert_eq!(results.names(), vec!["Apple Pie"]);
        assert_eq!(
            results.describe(),
            "Notes starting with 'Apple' containing 'p' tagged food matching 'crust', sorted by name"
        );
    }

    struct DescriptionSearch;

    impl SearchBackend for DescriptionSearch {
        fn filter<'a>(&self, entries: Vec<&'a Entry>, keywords: &str) -> Vec<&'a Entry> {
            entries
                .into_iter()
                .filter(|e| e.description.contains(keywords))
                .collect()
        }
    }

    #[test]
    fn test_search_defaults_to_pass_through() {
        let entries = fixture();
        assert_eq!(run(&entries, Query::new().search("anything")).len(), 5);
    }

    #[test]
    fn test_custom_search_backend() {
        let mut entries = fixture();
        entries[2].description = "Buttery crust".to_string();
        let engine = QueryEngine::with_search(999, Box::new(DescriptionSearch));
        let results = engine.run(&entries, Query::new().search("crust"));
        assert_eq!(results.names(), vec!["Apple Pie"]);
    }

    #[test]
    fn test_entry_types_parsing_and_display() {
        let types = EntryTypes::from_names(["notes", "People", ""]).unwrap();
        assert_eq!(types.selected(), vec![EntryType::Note, EntryType::Person]);
        assert_eq!(types.to_string(), "Notes, People");
        assert!(!types.has_all());
        assert!(types.contains(EntryType::Person));
        assert!(!types.contains(EntryType::Place));

        assert_eq!(EntryTypes::default().to_string(), "All types");
        assert_eq!(EntryTypes::all().to_string(), "All types");
        assert!(EntryTypes::from_names(["gadgets"]).is_err());
    }
}
