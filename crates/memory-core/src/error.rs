//! Core error taxonomy
//!
//! Store and graph operations either succeed completely or fail with one of
//! these errors and leave the store untouched.

use thiserror::Error;

use crate::models::EntryType;
use crate::storage::StorageError;

/// Errors raised by store, query and markup operations
#[derive(Error, Debug)]
pub enum MemoryError {
    /// Lookup by type and name found nothing visible
    #[error("{}", not_found_message(.entry_type, .name))]
    NotFound {
        entry_type: Option<EntryType>,
        name: String,
    },

    /// Create or rename collides with an existing slug (any type)
    #[error("An entry named '{existing}' already exists; '{name}' would have the same identifier")]
    DuplicateName { name: String, existing: String },

    /// Input rejected before touching the store
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Edited markup could not be parsed; `text` holds the unparsed input
    #[error("Could not parse entry: {message}")]
    Format { message: String, text: String },

    /// An entry could not be turned into editable text
    #[error("Could not render entry '{name}': {message}")]
    Render { name: String, message: String },

    /// Persistence boundary failure
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Reasons an entry is rejected before it reaches the store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Entry name must contain at least one letter or digit")]
    EmptyName,

    #[error("Entry name '{name}' is longer than {max} characters")]
    NameTooLong { name: String, max: usize },

    #[error("'{0}' is not a valid entry type (expected note, event, person, place or thing)")]
    InvalidType(String),
}

fn not_found_message(entry_type: &Option<EntryType>, name: &str) -> String {
    match entry_type {
        Some(t) => format!("There is no {} named '{}'", t.as_str().to_lowercase(), name),
        None => format!("There is no entry named '{}'", name),
    }
}

impl MemoryError {
    pub(crate) fn not_found(entry_type: Option<EntryType>, name: impl Into<String>) -> Self {
        MemoryError::NotFound {
            entry_type,
            name: name.into(),
        }
    }

    pub(crate) fn format(message: impl Into<String>, text: impl Into<String>) -> Self {
        MemoryError::Format {
            message: message.into(),
            text: text.into(),
        }
    }

    /// The unparsed text carried by a format error, so edits are not lost
    pub fn unparsed_text(&self) -> Option<&str> {
        match self {
            MemoryError::Format { text, .. } => Some(text),
            _ => None,
        }
    }
}

/// Result type for core operations
pub type MemoryResult<T> = Result<T, MemoryError>;
