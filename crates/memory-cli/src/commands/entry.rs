//! Entry command handlers

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Args;
use tracing::{debug, warn};

use memory_core::markup;
use memory_core::slug::same_entry;
use memory_core::{Config, Entry, EntryStore, EntryType, Visibility};

use crate::editor::{confirm, edit_text};
use crate::output::Output;

/// Arguments for `memory add`
#[derive(Args, Debug)]
pub struct AddArgs {
    /// Entry type (note, event, person, place, thing)
    pub entry_type: EntryType,

    /// Entry name
    pub name: String,

    /// Tags to add
    #[arg(short, long)]
    pub tag: Vec<String>,

    /// Names of entries to link to
    #[arg(short, long)]
    pub link: Vec<String>,

    /// Description text
    #[arg(short, long)]
    pub description: Option<String>,

    /// Open the entry in the editor before saving
    #[arg(short, long)]
    pub edit: bool,

    /// Hide the entry from default listings
    #[arg(long)]
    pub exclude: bool,
}

/// Create a new entry
pub fn add(store: &mut EntryStore, config: &Config, args: AddArgs, output: &Output) -> Result<()> {
    let mut entry = Entry::new(args.entry_type, args.name.trim());
    for tag in args.tag {
        entry.add_tag(tag);
    }
    for link in &args.link {
        entry.add_link(link);
    }
    if let Some(description) = args.description {
        entry.set_description(description);
    }
    entry.exclude = args.exclude;

    if args.edit {
        let text = markup::render(&entry)?;
        entry = edit_until_parsed(config, output, text, &entry.slug)?;
    }
    add_detected_links(&mut entry);

    let slug = store.create(entry)?.slug.clone();
    debug!(slug = %slug, "added entry");

    if let Some(created) = store.resolve(&slug) {
        output.success(&format!("Added {} '{}'", created.entry_type(), created.name));
        if !output.is_quiet() {
            output.print_entry(created, store);
        }
    }
    Ok(())
}

/// Show a single entry
pub fn show(
    store: &EntryStore,
    name: String,
    entry_type: Option<EntryType>,
    output: &Output,
) -> Result<()> {
    let entry = store.lookup(entry_type, &name, Visibility::IncludeExcluded)?;
    output.print_entry(entry, store);
    Ok(())
}

/// Edit an entry in the external editor
///
/// Renames and link changes are repaired by the store. If the edited text
/// can't be used, the user may edit again; otherwise the text is written to
/// the recovery directory so nothing is lost.
pub fn edit(
    store: &mut EntryStore,
    config: &Config,
    name: String,
    entry_type: Option<EntryType>,
    output: &Output,
) -> Result<()> {
    let original = store
        .lookup(entry_type, &name, Visibility::IncludeExcluded)?
        .clone();
    let mut text = markup::render(&original)?;

    loop {
        let mut edited = edit_until_parsed(config, output, text.clone(), &original.slug)?;
        edited.retain_identity(&original);
        add_detected_links(&mut edited);

        if edited == original {
            output.message("No changes.");
            return Ok(());
        }

        match store.update(edited.clone()).map(|e| e.slug.clone()) {
            Ok(slug) => {
                if let Some(updated) = store.resolve(&slug) {
                    if !same_entry(&original.name, &updated.name) {
                        output.message(&format!(
                            "Renamed '{}' to '{}'; {} linking entr{} updated.",
                            original.name,
                            updated.name,
                            updated.linked_from.len(),
                            if updated.linked_from.len() == 1 { "y" } else { "ies" }
                        ));
                    }
                    output.success(&format!("Updated {} '{}'", updated.entry_type(), updated.name));
                    if !output.is_quiet() {
                        output.print_entry(updated, store);
                    }
                }
                return Ok(());
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                text = markup::render(&edited)?;
                if output.should_prompt() && confirm("Edit again?")? {
                    continue;
                }
                let path = save_recovered(config, &original.slug, &text)?;
                return Err(e).with_context(|| {
                    format!("Changes not saved. Your text was kept in {}", path.display())
                });
            }
        }
    }
}

/// Delete an entry
pub fn delete(
    store: &mut EntryStore,
    name: String,
    entry_type: Option<EntryType>,
    force: bool,
    output: &Output,
) -> Result<()> {
    let target = store.lookup(entry_type, &name, Visibility::IncludeExcluded)?;
    let target_type = target.entry_type();

    if !force && output.should_prompt() {
        println!("Delete {}: {}", target_type, target.name);
        if !target.linked_from.is_empty() {
            println!(
                "{} other entr{} link here; those links will be removed.",
                target.linked_from.len(),
                if target.linked_from.len() == 1 { "y" } else { "ies" }
            );
        }
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let removed = store.delete(target_type, &name)?;
    output.success(&format!("Deleted {} '{}'", target_type, removed.name));
    Ok(())
}

/// Run the editor until its output parses as an entry
fn edit_until_parsed(config: &Config, output: &Output, initial: String, slug: &str) -> Result<Entry> {
    let mut text = initial;
    loop {
        let edited = edit_text(&text, config.editor.as_deref())?;
        match markup::parse(&edited) {
            Ok(entry) => return Ok(entry),
            Err(e) => {
                eprintln!("Error: {}", e);
                text = e.unparsed_text().unwrap_or(&edited).to_string();
                if output.should_prompt() && confirm("Edit again?")? {
                    continue;
                }
                let path = save_recovered(config, slug, &text)?;
                bail!("Changes not saved. Your text was kept in {}", path.display());
            }
        }
    }
}

/// Merge `[Entry Name]` references in the description into the link set
fn add_detected_links(entry: &mut Entry) {
    for slug in markup::detect_links(&entry.description) {
        if !entry.links_to.contains(&slug) {
            entry.links_to.push(slug);
        }
    }
}

/// Write text that couldn't be saved into the recovery directory
fn save_recovered(config: &Config, slug: &str, text: &str) -> Result<PathBuf> {
    let dir = config.recovery_dir();
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create recovery directory: {:?}", dir))?;

    let stem = if slug.is_empty() { "entry" } else { slug };
    let path = dir.join(format!("{}-{}.md", stem, Utc::now().format("%Y%m%d%H%M%S")));
    fs::write(&path, text).with_context(|| format!("Failed to write {:?}", path))?;

    warn!(?path, "kept unsaved edit");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_add_detected_links() {
        let mut entry = Entry::new(EntryType::Note, "Trip");
        entry.add_link("Ada");
        entry.set_description("Went with [Ada] to [The Pub].");

        add_detected_links(&mut entry);
        assert_eq!(entry.links_to, vec!["ada".to_string(), "the-pub".to_string()]);
    }

    #[test]
    fn test_save_recovered() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config {
            data_dir: temp_dir.path().to_path_buf(),
            ..Config::default()
        };

        let path = save_recovered(&config, "apple-pie", "---\nbroken").unwrap();
        assert!(path.starts_with(config.recovery_dir()));
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("apple-pie-"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "---\nbroken");
    }
}
