//! Memory Core Library
//!
//! This crate provides the core functionality for Memory, a personal
//! knowledge base of typed, cross-linked entries: notes, events, people,
//! places and things.
//!
//! # Architecture
//!
//! - **EntryStore**: The authoritative in-memory collection. Every mutation
//!   keeps outgoing links and backlinks symmetric before it returns.
//! - **Query**: A filter, sort and limit pipeline over the store.
//! - **JSON snapshot**: The whole collection is persisted as one file.
//!
//! # Quick Start
//!
//! ```text
//! let persistence = JsonPersistence::new(Config::load()?);
//! let mut store = persistence.open_store()?;
//!
//! // Add an entry that links to another
//! let mut pie = Entry::new(EntryType::Note, "Apple Pie");
//! pie.add_link("Banana");
//! store.create(pie)?;
//!
//! // Query entries
//! let results = store.query(Query::new().tag("food").sort(SortOrder::Name));
//! persistence.save_store(&store)?;
//! ```
//!
//! # Modules
//!
//! - `store`: Entry collection and link-graph maintenance (main entry point)
//! - `models`: Entries and entry types
//! - `query`: Filtering, sorting and limiting
//! - `markup`: Text form of an entry for external editors
//! - `storage`: JSON persistence
//! - `config`: Application configuration

pub mod config;
pub mod error;
mod graph;
pub mod markup;
pub mod models;
pub mod query;
pub mod slug;
pub mod storage;
pub mod store;

pub use config::Config;
pub use error::{MemoryError, MemoryResult, ValidationError};
pub use graph::LinkIssue;
pub use models::{Entry, EntryKind, EntryType};
pub use query::{
    EntryTypes, PassThrough, Query, QueryEngine, QueryResults, SearchBackend, SortOrder,
};
pub use slug::slugify;
pub use storage::{JsonPersistence, StorageError};
pub use store::{EntryStore, Snapshot, StoreSettings, Visibility};
