//! JSON snapshot persistence
//!
//! Handles saving and loading the entry collection to/from the filesystem.
//! Uses atomic writes (write to temp file, then rename) to prevent corruption.
//!
//! Storage location: `~/.local/share/memory/` (configurable via `Config`)
//!
//! Files:
//! - `memory.json` - Every entry, grouped by type

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use tracing::debug;

use super::error::{StorageError, StorageResult};
use crate::config::Config;
use crate::error::MemoryResult;
use crate::store::{EntryStore, Snapshot, StoreSettings};

/// Persistence layer for the entry collection
pub struct JsonPersistence {
    config: Config,
}

impl JsonPersistence {
    /// Create a new persistence handler with the given configuration
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Check if a data file exists on disk
    pub fn exists(&self) -> bool {
        self.config.data_path().exists()
    }

    /// Load the snapshot from disk
    ///
    /// Returns `None` if the data file doesn't exist.
    /// Returns an error if the file exists but can't be read or parsed.
    pub fn load(&self) -> StorageResult<Option<Snapshot>> {
        let path = self.config.data_path();

        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::from_read(e, path)),
        };

        let snapshot = serde_json::from_slice(&bytes).map_err(|e| StorageError::Decode {
            path: path.clone(),
            details: e.to_string(),
        })?;

        debug!(?path, bytes = bytes.len(), "loaded snapshot");
        Ok(Some(snapshot))
    }

    /// Save a snapshot to disk using atomic write
    pub fn save(&self, snapshot: &Snapshot) -> StorageResult<()> {
        let bytes = serde_json::to_vec_pretty(snapshot).map_err(StorageError::Encode)?;
        let path = self.config.data_path();

        atomic_write(&path, &bytes)?;
        debug!(?path, entries = snapshot.entries.len(), "saved snapshot");
        Ok(())
    }

    /// Load the store from disk, or start an empty one
    pub fn open_store(&self) -> MemoryResult<EntryStore> {
        let settings = StoreSettings::from(&self.config);
        match self.load()? {
            Some(snapshot) => EntryStore::from_snapshot(snapshot, settings),
            None => Ok(EntryStore::new(settings)),
        }
    }

    /// Persist the current state of a store
    pub fn save_store(&self, store: &EntryStore) -> StorageResult<()> {
        self.save(&store.snapshot())
    }
}

/// Write data to a file atomically
///
/// 1. Write to a temporary file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
pub(crate) fn atomic_write(path: &Path, data: &[u8]) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| StorageError::CreateDirectory {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    // Same directory as the target so the rename stays on one filesystem
    let temp_path = path.with_extension("tmp");

    let mut file =
        File::create(&temp_path).map_err(|e| StorageError::from_io(e, temp_path.clone()))?;
    file.write_all(data)
        .map_err(|e| StorageError::from_io(e, temp_path.clone()))?;
    file.sync_all()
        .map_err(|e| StorageError::from_io(e, temp_path.clone()))?;

    fs::rename(&temp_path, path).map_err(|e| StorageError::AtomicWriteFailed {
        from: temp_path.clone(),
        to: path.to_path_buf(),
        source: e,
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MemoryError;
    use crate::models::{Entry, EntryType};
    use tempfile::TempDir;

    fn test_config(temp_dir: &TempDir) -> Config {
        Config {
            data_dir: temp_dir.path().to_path_buf(),
            ..Config::default()
        }
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let persistence = JsonPersistence::new(test_config(&temp_dir));

        // Initially no data file
        assert!(!persistence.exists());
        assert!(persistence.load().unwrap().is_none());

        let mut store = EntryStore::default();
        let mut pie = Entry::new(EntryType::Note, "Apple Pie");
        pie.add_link("Banana");
        store.create(pie).unwrap();
        store.create(Entry::new(EntryType::Thing, "Banana")).unwrap();

        persistence.save_store(&store).unwrap();
        assert!(persistence.exists());

        let loaded = persistence.load().unwrap().unwrap();
        assert_eq!(loaded, store.snapshot());
    }

    #[test]
    fn test_open_store_empty() {
        let temp_dir = TempDir::new().unwrap();
        let persistence = JsonPersistence::new(test_config(&temp_dir));

        let store = persistence.open_store().unwrap();
        assert!(store.is_empty());
        // Opening alone never writes
        assert!(!persistence.exists());
    }

    #[test]
    fn test_open_store_restores_links() {
        let temp_dir = TempDir::new().unwrap();
        let persistence = JsonPersistence::new(test_config(&temp_dir));

        let mut store = EntryStore::default();
        let mut pie = Entry::new(EntryType::Note, "Apple Pie");
        pie.add_link("Banana");
        store.create(pie).unwrap();
        store.create(Entry::new(EntryType::Thing, "Banana")).unwrap();
        persistence.save_store(&store).unwrap();

        let reopened = persistence.open_store().unwrap();
        let banana = reopened.get(EntryType::Thing, "Banana").unwrap();
        assert_eq!(banana.linked_from, vec!["apple-pie".to_string()]);
        assert!(reopened.check_links().is_empty());
    }

    #[test]
    fn test_open_store_uses_config_limits() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config {
            max_name_len: 5,
            ..test_config(&temp_dir)
        };
        let persistence = JsonPersistence::new(config);

        let mut store = persistence.open_store().unwrap();
        let err = store
            .create(Entry::new(EntryType::Note, "Far too long"))
            .unwrap_err();
        assert!(matches!(err, MemoryError::Validation(_)));
    }

    #[test]
    fn test_load_invalid_json() {
        let temp_dir = TempDir::new().unwrap();
        let persistence = JsonPersistence::new(test_config(&temp_dir));
        fs::write(persistence.config().data_path(), "{ not json").unwrap();

        let err = persistence.load().unwrap_err();
        assert!(matches!(err, StorageError::Decode { .. }));

        let err = persistence.open_store().unwrap_err();
        assert!(matches!(err, MemoryError::Storage(StorageError::Decode { .. })));
    }

    #[test]
    fn test_save_overwrites_and_leaves_no_temp_file() {
        let temp_dir = TempDir::new().unwrap();
        let persistence = JsonPersistence::new(test_config(&temp_dir));

        let mut store = EntryStore::default();
        store.create(Entry::new(EntryType::Person, "Ada")).unwrap();
        persistence.save_store(&store).unwrap();

        store.delete(EntryType::Person, "Ada").unwrap();
        persistence.save_store(&store).unwrap();

        let loaded = persistence.load().unwrap().unwrap();
        assert!(loaded.entries.is_empty());
        assert!(!temp_dir.path().join("memory.tmp").exists());
    }

    #[test]
    fn test_atomic_write_creates_parent_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let nested_path = temp_dir
            .path()
            .join("a")
            .join("b")
            .join("c")
            .join("file.txt");

        atomic_write(&nested_path, b"test data").unwrap();

        assert!(nested_path.exists());
        let content = fs::read_to_string(&nested_path).unwrap();
        assert_eq!(content, "test data");
    }
}
