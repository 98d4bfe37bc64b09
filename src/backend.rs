// Key-value byte stores backing task persistence

use eyre::{Context, Result, eyre};
use fs2::FileExt;
use rusqlite::{Connection, OptionalExtension};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Key-value storage of opaque bytes
///
/// `set` fully replaces any previous value under the key.
pub trait ByteStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    fn set(&mut self, key: &str, value: &[u8]) -> Result<()>;

    fn remove(&mut self, key: &str) -> Result<()>;
}

impl<B: ByteStore + ?Sized> ByteStore for Box<B> {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        (**self).remove(key)
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(eyre!("Storage key cannot be empty"));
    }
    if key.len() > 64 {
        return Err(eyre!("Storage key too long: {} (max 64 chars)", key));
    }
    if !key.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-') {
        return Err(eyre!("Invalid storage key: {} (must be alphanumeric with _/-)", key));
    }
    Ok(())
}

// ============================================================================
// In-memory
// ============================================================================

/// In-memory store; clones share the same map
#[derive(Debug, Clone, Default)]
pub struct MemoryByteStore {
    entries: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryByteStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ByteStore for MemoryByteStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        validate_key(key)?;
        let entries = self.entries.lock().map_err(|_| eyre!("Memory store lock poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<()> {
        validate_key(key)?;
        let mut entries = self.entries.lock().map_err(|_| eyre!("Memory store lock poisoned"))?;
        entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        validate_key(key)?;
        let mut entries = self.entries.lock().map_err(|_| eyre!("Memory store lock poisoned"))?;
        entries.remove(key);
        Ok(())
    }
}

// ============================================================================
// File per key
// ============================================================================

/// Directory-backed store: each key lives in `{dir}/{key}.json`
///
/// Writes go to a sibling temp file under an exclusive lock, then rename over
/// the target, so a reader never sees a half-written value.
#[derive(Debug)]
pub struct FileByteStore {
    base_path: PathBuf,
}

impl FileByteStore {
    /// Open or create a store in the given directory
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let base_path = path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path).context("Failed to create store directory")?;
        Ok(Self { base_path })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.base_path.join(format!("{}.json", key))
    }
}

impl ByteStore for FileByteStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        validate_key(key)?;
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }

        let bytes = fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(Some(bytes))
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<()> {
        validate_key(key)?;
        let path = self.path_for(key);
        let tmp_path = self.base_path.join(format!(".{}.json.tmp", key));

        let mut file = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&tmp_path)
            .context("Failed to open temp file for writing")?;

        // Acquire exclusive lock before writing
        file.lock_exclusive().context("Failed to acquire file lock")?;

        file.write_all(value)?;
        file.sync_all()?;

        fs::rename(&tmp_path, &path).with_context(|| format!("Failed to replace {}", path.display()))?;
        debug!(key, bytes = value.len(), path = ?path, "Wrote value");

        // Lock is released when file is dropped
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        validate_key(key)?;
        let path = self.path_for(key);
        if path.exists() {
            fs::remove_file(&path).with_context(|| format!("Failed to remove {}", path.display()))?;
        }
        Ok(())
    }
}

// ============================================================================
// SQLite
// ============================================================================

/// SQLite-backed store: a single `kv` table keyed by storage key
pub struct SqliteByteStore {
    db: Connection,
}

impl SqliteByteStore {
    /// Open or create `taskmaster.db` in the given directory
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let base_path = path.as_ref();
        fs::create_dir_all(base_path).context("Failed to create store directory")?;

        let db_path = base_path.join("taskmaster.db");
        let db = Connection::open(&db_path).context("Failed to open SQLite database")?;

        let store = Self { db };
        store.create_schema()?;
        Ok(store)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        let db = Connection::open_in_memory().context("Failed to open in-memory SQLite database")?;
        let store = Self { db };
        store.create_schema()?;
        Ok(store)
    }

    fn create_schema(&self) -> Result<()> {
        debug!("Creating database schema");

        self.db.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value BLOB NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        )?;

        Ok(())
    }
}

impl ByteStore for SqliteByteStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        validate_key(key)?;
        let value = self
            .db
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get::<_, Vec<u8>>(0))
            .optional()
            .context("Failed to read value from database")?;
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<()> {
        validate_key(key)?;
        self.db
            .execute(
                "INSERT OR REPLACE INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![key, value, chrono::Utc::now().timestamp_millis()],
            )
            .context("Failed to write value to database")?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        validate_key(key)?;
        self.db
            .execute("DELETE FROM kv WHERE key = ?1", [key])
            .context("Failed to delete value from database")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn exercise(store: &mut dyn ByteStore) {
        assert_eq!(store.get("tasks").unwrap(), None);

        store.set("tasks", b"first").unwrap();
        assert_eq!(store.get("tasks").unwrap(), Some(b"first".to_vec()));

        store.set("tasks", b"second").unwrap();
        assert_eq!(store.get("tasks").unwrap(), Some(b"second".to_vec()));

        store.remove("tasks").unwrap();
        assert_eq!(store.get("tasks").unwrap(), None);
    }

    #[test]
    fn test_memory_store() {
        let mut store = MemoryByteStore::new();
        exercise(&mut store);
    }

    #[test]
    fn test_memory_store_clones_share_state() {
        let mut a = MemoryByteStore::new();
        let b = a.clone();
        a.set("k", b"v").unwrap();
        assert_eq!(b.get("k").unwrap(), Some(b"v".to_vec()));
    }

    #[test]
    fn test_file_store() {
        let temp = TempDir::new().unwrap();
        let mut store = FileByteStore::open(temp.path().join("data")).unwrap();
        exercise(&mut store);
    }

    #[test]
    fn test_file_store_writes_key_file() {
        let temp = TempDir::new().unwrap();
        let mut store = FileByteStore::open(temp.path()).unwrap();
        store.set("taskmaster_tasks", b"{}").unwrap();

        let path = temp.path().join("taskmaster_tasks.json");
        assert_eq!(fs::read(path).unwrap(), b"{}");
        assert!(!temp.path().join(".taskmaster_tasks.json.tmp").exists());
    }

    #[test]
    fn test_file_store_persists_across_instances() {
        let temp = TempDir::new().unwrap();
        {
            let mut store = FileByteStore::open(temp.path()).unwrap();
            store.set("k", b"kept").unwrap();
        }
        let store = FileByteStore::open(temp.path()).unwrap();
        assert_eq!(store.get("k").unwrap(), Some(b"kept".to_vec()));
    }

    #[test]
    fn test_sqlite_store() {
        let temp = TempDir::new().unwrap();
        let mut store = SqliteByteStore::open(temp.path()).unwrap();
        assert!(temp.path().join("taskmaster.db").exists());
        exercise(&mut store);
    }

    #[test]
    fn test_sqlite_in_memory_store() {
        let mut store = SqliteByteStore::open_in_memory().unwrap();
        exercise(&mut store);
    }

    #[test]
    fn test_boxed_store() {
        let mut store: Box<dyn ByteStore> = Box::new(MemoryByteStore::new());
        exercise(&mut store);
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("taskmaster_tasks").is_ok());
        assert!(validate_key("task-list").is_ok());

        assert!(validate_key("").is_err());
        assert!(validate_key("../escape").is_err());
        assert!(validate_key(&"a".repeat(65)).is_err());
    }

    fn assert_rejects_bad_keys(store: &mut dyn ByteStore) {
        for key in ["", "a/b", "../escape"] {
            assert!(store.get(key).is_err(), "get accepted {:?}", key);
            assert!(store.set(key, b"x").is_err(), "set accepted {:?}", key);
            assert!(store.remove(key).is_err(), "remove accepted {:?}", key);
        }
    }

    #[test]
    fn test_invalid_key_rejected_by_every_store() {
        let temp = TempDir::new().unwrap();
        assert_rejects_bad_keys(&mut MemoryByteStore::new());
        assert_rejects_bad_keys(&mut FileByteStore::open(temp.path().join("files")).unwrap());
        assert_rejects_bad_keys(&mut SqliteByteStore::open(temp.path().join("db")).unwrap());
    }
}
