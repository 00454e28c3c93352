//! Links command handler

use anyhow::Result;

use memory_core::{EntryStore, EntryType, Visibility};

use crate::output::Output;

/// Show what an entry links to and what links to it
///
/// Excluded entries are reachable here, as they are by following a link.
pub fn show(
    store: &EntryStore,
    name: String,
    entry_type: Option<EntryType>,
    output: &Output,
) -> Result<()> {
    let entry = store.lookup(entry_type, &name, Visibility::IncludeExcluded)?;
    output.print_links(entry, store);
    Ok(())
}
