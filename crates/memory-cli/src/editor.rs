//! Interactive editing support
//!
//! Opens the configured editor (or $EDITOR) on a temporary file holding an
//! entry's text form, and asks yes/no questions on the terminal.

use anyhow::{bail, Context, Result};
use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::process::Command;
use std::sync::atomic::{AtomicUsize, Ordering};

static EDIT_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// Open content in the user's preferred editor
///
/// `configured` is the editor command from the config file and may carry
/// arguments (e.g. `code --wait`). Falls back to $EDITOR, $VISUAL, or a
/// common editor found on the PATH.
pub fn edit_text(initial_content: &str, configured: Option<&str>) -> Result<String> {
    let editor = find_editor(configured)?;

    let temp_path = env::temp_dir().join(format!(
        "memory_edit_{}_{}.md",
        std::process::id(),
        EDIT_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));
    fs::write(&temp_path, initial_content)
        .with_context(|| format!("Failed to create temp file: {:?}", temp_path))?;

    let status = editor_command(&editor, &temp_path)
        .status()
        .with_context(|| format!("Failed to run editor: {}", editor))?;

    if !status.success() {
        // The temp file is left in place so nothing typed is lost
        bail!(
            "Editor '{}' exited with non-zero status. Your text is still in {:?}.",
            editor,
            temp_path
        );
    }

    let content = fs::read_to_string(&temp_path)
        .with_context(|| format!("Failed to read edited file: {:?}", temp_path))?;

    let _ = fs::remove_file(&temp_path);

    Ok(content)
}

/// Build the editor invocation, splitting any arguments off the command
fn editor_command(editor: &str, path: &Path) -> Command {
    let mut parts = editor.split_whitespace();
    let program = parts.next().unwrap_or(editor);
    let mut cmd = Command::new(program);
    cmd.args(parts).arg(path);
    cmd
}

/// Find the user's preferred editor
fn find_editor(configured: Option<&str>) -> Result<String> {
    if let Some(editor) = configured.map(str::trim).filter(|e| !e.is_empty()) {
        return Ok(editor.to_string());
    }

    if let Ok(editor) = env::var("EDITOR") {
        if !editor.is_empty() {
            return Ok(editor);
        }
    }

    if let Ok(visual) = env::var("VISUAL") {
        if !visual.is_empty() {
            return Ok(visual);
        }
    }

    // Try common editors
    let common_editors = ["nano", "vim", "vi", "emacs", "notepad"];

    for editor in common_editors {
        if command_exists(editor) {
            return Ok(editor.to_string());
        }
    }

    bail!(
        "No editor found. Set `editor` in the config file or the $EDITOR environment variable.\n\
         Example: memory config set editor nano"
    )
}

/// Check if a command exists in PATH
fn command_exists(cmd: &str) -> bool {
    Command::new("which")
        .arg(cmd)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Prompt for confirmation
///
/// Returns true if user confirms, false otherwise.
/// In non-interactive mode (no TTY), returns false.
pub fn confirm(prompt: &str) -> Result<bool> {
    if !atty::is(atty::Stream::Stdin) {
        return Ok(false);
    }

    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    let input = input.trim().to_lowercase();
    Ok(input == "y" || input == "yes")
}
