//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use serde::Serialize;

use memory_core::{Entry, EntryStore, LinkIssue, QueryResults};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// One end of a link as shown to the user
#[derive(Debug, Serialize)]
struct LinkView<'a> {
    slug: &'a str,
    name: Option<&'a str>,
    #[serde(rename = "type")]
    entry_type: Option<&'static str>,
}

impl<'a> LinkView<'a> {
    fn resolve(slug: &'a str, store: &'a EntryStore) -> Self {
        let target = store.resolve(slug);
        Self {
            slug,
            name: target.map(|e| e.name.as_str()),
            entry_type: target.map(|e| e.entry_type().as_str()),
        }
    }

    fn label(&self) -> String {
        match (self.name, self.entry_type) {
            (Some(name), Some(t)) => format!("{} ({})", name, t),
            _ => format!("{} (missing)", self.slug),
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    /// Print a single entry with its links resolved to names
    pub fn print_entry(&self, entry: &Entry, store: &EntryStore) {
        match self.format {
            OutputFormat::Human => {
                println!("Name:     {}", entry.name);
                println!("Type:     {}", entry.entry_type());
                if !entry.tags.is_empty() {
                    println!("Tags:     {}", entry.tags_string());
                }
                for (key, value) in &entry.custom {
                    println!("{:<9} {}", format!("{}:", key), value);
                }
                if entry.exclude {
                    println!("Excluded: yes");
                }
                println!("Created:  {}", entry.created.format("%Y-%m-%d %H:%M"));
                println!("Modified: {}", entry.modified.format("%Y-%m-%d %H:%M"));

                if !entry.description.is_empty() {
                    println!();
                    println!("{}", entry.description);
                }

                self.print_link_sections(entry, store);
            }
            OutputFormat::Json => print_json(entry),
            OutputFormat::Quiet => println!("{}", entry.name),
        }
    }

    /// Print query results under a header describing the view
    pub fn print_results(&self, results: &QueryResults<'_>, truncate_at: usize) {
        match self.format {
            OutputFormat::Human => {
                println!("{}", results.describe());
                println!();
                if results.is_empty() {
                    println!("No entries found.");
                    return;
                }
                for entry in &results.entries {
                    let tags = if entry.tags.is_empty() {
                        String::new()
                    } else {
                        format!(" [{}]", entry.tags_string())
                    };
                    println!("{:<7}| {}{}", entry.entry_type().as_str(), entry.name, tags);
                    if !entry.description.is_empty() {
                        println!("       | {}", truncate_line(&entry.description, truncate_at));
                    }
                }
                println!("\n{} entr{}", results.len(), if results.len() == 1 { "y" } else { "ies" });
            }
            OutputFormat::Json => print_json(results),
            OutputFormat::Quiet => {
                for entry in &results.entries {
                    println!("{}", entry.name);
                }
            }
        }
    }

    /// Print the outgoing and incoming links of an entry
    pub fn print_links(&self, entry: &Entry, store: &EntryStore) {
        match self.format {
            OutputFormat::Human => {
                println!("Links for: {}", entry.name);
                if entry.links_to.is_empty() && entry.linked_from.is_empty() {
                    println!();
                    println!("No links.");
                    return;
                }
                self.print_link_sections(entry, store);
            }
            OutputFormat::Json => {
                let views = |slugs: &[String]| -> Vec<serde_json::Value> {
                    slugs
                        .iter()
                        .map(|s| serde_json::json!(LinkView::resolve(s, store)))
                        .collect()
                };
                print_json(&serde_json::json!({
                    "name": entry.name,
                    "links_to": views(&entry.links_to),
                    "linked_from": views(&entry.linked_from),
                }));
            }
            OutputFormat::Quiet => {
                for slug in entry.all_links() {
                    println!("{}", slug);
                }
            }
        }
    }

    fn print_link_sections(&self, entry: &Entry, store: &EntryStore) {
        if !entry.links_to.is_empty() {
            println!();
            println!("── Links to ({}) ──", entry.links_to.len());
            for slug in &entry.links_to {
                println!("  {}", LinkView::resolve(slug, store).label());
            }
        }
        if !entry.linked_from.is_empty() {
            println!();
            println!("── Linked from ({}) ──", entry.linked_from.len());
            for slug in &entry.linked_from {
                println!("  {}", LinkView::resolve(slug, store).label());
            }
        }
    }

    /// Print a list of tags
    pub fn print_tags(&self, tags: &[(String, usize)]) {
        match self.format {
            OutputFormat::Human => {
                if tags.is_empty() {
                    println!("No tags found.");
                    return;
                }
                for (name, count) in tags {
                    println!("{} ({})", name, count);
                }
                println!("\n{} tag(s)", tags.len());
            }
            OutputFormat::Json => {
                let json_tags: Vec<_> = tags
                    .iter()
                    .map(|(name, count)| serde_json::json!({"name": name, "count": count}))
                    .collect();
                print_json(&json_tags);
            }
            OutputFormat::Quiet => {
                for (name, _) in tags {
                    println!("{}", name);
                }
            }
        }
    }

    /// Print link graph audit results
    pub fn print_issues(&self, issues: &[LinkIssue]) {
        match self.format {
            OutputFormat::Human => {
                if issues.is_empty() {
                    println!("No link problems found.");
                    return;
                }
                for issue in issues {
                    let marker = if issue.is_violation() { "✗" } else { "·" };
                    println!("{} {}", marker, issue);
                }
                let violations = issues.iter().filter(|i| i.is_violation()).count();
                println!(
                    "\n{} problem(s), {} dangling link(s)",
                    violations,
                    issues.len() - violations
                );
            }
            OutputFormat::Json => print_json(issues),
            OutputFormat::Quiet => {
                for issue in issues {
                    println!("{}", issue);
                }
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Check if we should prompt for confirmation
    pub fn should_prompt(&self) -> bool {
        self.format == OutputFormat::Human
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error: failed to encode output: {}", e),
    }
}

/// Truncate a string to max characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Truncate to first line and max length
pub fn truncate_line(s: &str, max_len: usize) -> String {
    let first_line = s.lines().next().unwrap_or("");
    truncate(first_line, max_len)
}
