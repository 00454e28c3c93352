//! Check command handler

use anyhow::Result;

use memory_core::EntryStore;

use crate::output::Output;

/// Audit the link graph, optionally rebuilding backlinks
pub fn check(store: &mut EntryStore, repair: bool, output: &Output) -> Result<()> {
    let issues = store.check_links();
    output.print_issues(&issues);

    if repair {
        let repaired = store.repair_links();
        if repaired == 0 {
            output.message("Backlinks already consistent.");
        } else {
            output.success(&format!(
                "Repaired backlinks on {} entr{}",
                repaired,
                if repaired == 1 { "y" } else { "ies" }
            ));
        }
    }
    Ok(())
}
