//! Storage layer
//!
//! The whole entry collection is persisted as a single JSON snapshot.
//! Writes go through a temp file and a rename so the data file is never
//! left half-written.

pub mod error;
pub mod persistence;

pub use error::{StorageError, StorageResult};
pub use persistence::JsonPersistence;
