//! Tag command handlers

use anyhow::Result;

use memory_core::EntryStore;

use crate::output::Output;

/// List all tags with usage counts
pub fn list(store: &EntryStore, output: &Output) -> Result<()> {
    let tags = store.tag_counts();
    output.print_tags(&tags);
    Ok(())
}
