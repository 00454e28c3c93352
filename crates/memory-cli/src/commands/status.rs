//! Status command handler

use anyhow::Result;

use memory_core::{EntryStore, EntryType, JsonPersistence};

use crate::output::{Output, OutputFormat};

/// Show collection counts and storage location
pub fn show(store: &EntryStore, persistence: &JsonPersistence, output: &Output) -> Result<()> {
    let config = persistence.config();
    let data_path = config.data_path();
    let file_size = std::fs::metadata(&data_path).map(|m| m.len()).ok();
    let problems = store
        .check_links()
        .iter()
        .filter(|issue| issue.is_violation())
        .count();

    match output.format {
        OutputFormat::Json => {
            let counts: serde_json::Map<String, serde_json::Value> = EntryType::ALL
                .iter()
                .map(|t| (t.plural().to_lowercase(), store.count_of(*t).into()))
                .collect();
            println!(
                "{}",
                serde_json::json!({
                    "data_file": data_path,
                    "data_file_exists": file_size.is_some(),
                    "data_file_size": file_size,
                    "entries": store.count(),
                    "counts": counts,
                    "tags": store.tag_counts().len(),
                    "link_problems": problems
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", store.count());
        }
        OutputFormat::Human => {
            println!("Memory Status");
            println!("=============");
            println!();
            println!("Storage:");
            println!("  Location: {}", data_path.display());
            match file_size {
                Some(size) => println!("  Size:     {}", human_size(size)),
                None => println!("  Size:     (not saved yet)"),
            }
            println!();
            println!("Contents:");
            for entry_type in EntryType::ALL {
                println!(
                    "  {:<7} {}",
                    format!("{}:", entry_type.plural()),
                    store.count_of(entry_type)
                );
            }
            println!("  Tags:   {}", store.tag_counts().len());
            if problems > 0 {
                println!();
                println!("{} link problem(s). Run `memory check` for details.", problems);
            }
        }
    }

    Ok(())
}

/// Format a byte count for display
fn human_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_human_size() {
        assert_eq!(human_size(512), "512 bytes");
        assert_eq!(human_size(2048), "2.0 KB");
        assert_eq!(human_size(3 * 1024 * 1024), "3.0 MB");
    }
}
