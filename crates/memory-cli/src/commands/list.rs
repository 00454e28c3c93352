//! List command handler

use anyhow::{Context, Result};
use clap::Args;

use memory_core::{EntryStore, EntryTypes, Query, SortOrder};

use crate::output::Output;

/// Filters for `memory list`
#[derive(Args, Debug, Default)]
pub struct ListArgs {
    /// Entry types to include, comma-separated (notes, events, people, places, things)
    #[arg(short = 'T', long, value_delimiter = ',')]
    pub types: Vec<String>,

    /// Only names starting with this text
    #[arg(short, long)]
    pub starts_with: Option<String>,

    /// Only names containing this text
    #[arg(short, long)]
    pub contains: Option<String>,

    /// Free-text search keywords
    #[arg(long)]
    pub search: Option<String>,

    /// Only entries with this tag (repeatable, any tag matches)
    #[arg(short, long)]
    pub tag: Vec<String>,

    /// Sort order: name or recent
    #[arg(long, default_value = "recent")]
    pub sort: String,

    /// Maximum number of entries (0 for no limit)
    #[arg(short = 'n', long, default_value_t = 0, allow_negative_numbers = true)]
    pub limit: i64,

    /// Include excluded entries
    #[arg(short, long)]
    pub all: bool,
}

impl ListArgs {
    /// Build the query these arguments describe
    pub fn to_query(&self) -> Result<Query> {
        let types = EntryTypes::from_names(&self.types).context("Invalid --types value")?;

        let mut query = Query::new()
            .types(types)
            .tags(self.tag.clone())
            .sort(SortOrder::from_field(&self.sort))
            .limit(self.limit)
            .include_excluded(self.all);
        if let Some(ref prefix) = self.starts_with {
            query = query.starts_with(prefix.as_str());
        }
        if let Some(ref needle) = self.contains {
            query = query.contains(needle.as_str());
        }
        if let Some(ref keywords) = self.search {
            query = query.search(keywords.as_str());
        }
        Ok(query)
    }
}

/// List entries matching the given filters
pub fn list(store: &EntryStore, args: &ListArgs, truncate_at: usize, output: &Output) -> Result<()> {
    let results = store.query(args.to_query()?);
    output.print_results(&results, truncate_at);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use memory_core::EntryType;

    #[test]
    fn test_default_args_query_everything() {
        let query = ListArgs {
            sort: "recent".to_string(),
            ..ListArgs::default()
        }
        .to_query()
        .unwrap();

        assert!(query.types.has_all());
        assert_eq!(query.sort, SortOrder::Recent);
        assert_eq!(query.limit, 0);
        assert!(!query.include_excluded);
        assert!(query.starts_with.is_empty());
    }

    #[test]
    fn test_args_to_query() {
        let args = ListArgs {
            types: vec!["notes".to_string(), "People".to_string()],
            starts_with: Some("Ap".to_string()),
            contains: Some("pie".to_string()),
            search: None,
            tag: vec!["food".to_string()],
            sort: "name".to_string(),
            limit: 5,
            all: true,
        };
        let query = args.to_query().unwrap();

        assert!(query.types.contains(EntryType::Note));
        assert!(query.types.contains(EntryType::Person));
        assert!(!query.types.contains(EntryType::Place));
        assert_eq!(query.starts_with, "Ap");
        assert_eq!(query.contains, "pie");
        assert_eq!(query.tags, vec!["food".to_string()]);
        assert_eq!(query.sort, SortOrder::Name);
        assert_eq!(query.limit, 5);
        assert!(query.include_excluded);
    }

    #[test]
    fn test_unknown_type_rejected() {
        let args = ListArgs {
            types: vec!["gadgets".to_string()],
            ..ListArgs::default()
        };
        assert!(args.to_query().is_err());
    }

    #[test]
    fn test_unknown_sort_falls_back_to_name() {
        let args = ListArgs {
            sort: "size".to_string(),
            ..ListArgs::default()
        };
        assert_eq!(args.to_query().unwrap().sort, SortOrder::Name);
    }
}
