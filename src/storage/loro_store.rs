use std::fs;
use std::path::{Path, PathBuf};

use loro::{LoroDoc, LoroValue, ValueOrContainer};
use tracing::debug;

use super::KvStore;
use crate::error::{LessonNoteError, Result};

pub const DATA_DIR: &str = ".lessonnote";
const STORE_DB: &str = "store.db";
const KV_MAP: &str = "kv";

/// Key-value store backed by a single Loro document.
///
/// Records are kept as JSON strings in one top-level map. Writes are
/// committed to the document immediately; [`LoroStore::save`] persists the
/// document to disk.
pub struct LoroStore {
    doc: LoroDoc,
    path: Option<PathBuf>,
}

impl LoroStore {
    /// Initialize a new workspace under `root`
    pub fn init(root: &Path) -> Result<Self> {
        let data_dir = root.join(DATA_DIR);

        if data_dir.exists() {
            return Err(LessonNoteError::AlreadyInitialized);
        }

        fs::create_dir_all(&data_dir)?;

        let store = Self {
            doc: LoroDoc::new(),
            path: Some(data_dir.join(STORE_DB)),
        };
        store.save()?;

        Ok(store)
    }

    /// Open an existing workspace
    pub fn open(root: &Path) -> Result<Self> {
        let path = root.join(DATA_DIR).join(STORE_DB);

        if !path.exists() {
            return Err(LessonNoteError::NotInitialized);
        }

        let bytes = fs::read(&path)?;
        let doc = LoroDoc::new();
        doc.import(&bytes)?;
        debug!(path = %path.display(), bytes = bytes.len(), "opened store");

        Ok(Self {
            doc,
            path: Some(path),
        })
    }

    /// A store that is never written to disk
    pub fn in_memory() -> Self {
        Self {
            doc: LoroDoc::new(),
            path: None,
        }
    }

    /// Save the document to disk. No-op for in-memory stores.
    pub fn save(&self) -> Result<()> {
        if let Some(path) = &self.path {
            let bytes = self.doc.export(loro::ExportMode::Snapshot)?;
            fs::write(path, bytes)?;
        }
        Ok(())
    }

    /// The `.lessonnote` directory holding this store
    pub fn data_dir(&self) -> Result<&Path> {
        self.path
            .as_deref()
            .and_then(Path::parent)
            .ok_or_else(|| LessonNoteError::Storage("in-memory store has no data directory".to_string()))
    }

    /// Version hash of the current document state, used for cache invalidation
    pub fn version_hash(&self) -> String {
        let vv = self.doc.oplog_vv();
        format!("{:?}", vv)
    }
}

impl KvStore for LoroStore {
    fn get_raw(&self, key: &str) -> Result<Option<String>> {
        let kv = self.doc.get_map(KV_MAP);
        match kv.get(key) {
            None => Ok(None),
            Some(ValueOrContainer::Value(LoroValue::String(s))) => Ok(Some(s.to_string())),
            Some(_) => Err(LessonNoteError::Storage(format!(
                "record '{}' is not a JSON string",
                key
            ))),
        }
    }

    fn put_raw(&self, key: &str, value: String) -> Result<()> {
        let kv = self.doc.get_map(KV_MAP);
        kv.insert(key, value)?;
        self.doc.commit();
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        let kv = self.doc.get_map(KV_MAP);
        if kv.get(key).is_none() {
            return Ok(false);
        }
        kv.delete(key)?;
        self.doc.commit();
        Ok(true)
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let kv = self.doc.get_map(KV_MAP);
        let mut keys = Vec::new();

        if let LoroValue::Map(map) = kv.get_deep_value() {
            for (key, _) in map.iter() {
                if key.starts_with(prefix) {
                    keys.push(key.to_string());
                }
            }
        }

        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_init_creates_data_directory() {
        let tmp = TempDir::new().unwrap();
        let _store = LoroStore::init(tmp.path()).unwrap();

        assert!(tmp.path().join(".lessonnote").exists());
        assert!(tmp.path().join(".lessonnote/store.db").exists());
    }

    #[test]
    fn test_init_fails_if_already_initialized() {
        let tmp = TempDir::new().unwrap();
        LoroStore::init(tmp.path()).unwrap();

        let result = LoroStore::init(tmp.path());
        assert!(matches!(result, Err(LessonNoteError::AlreadyInitialized)));
    }

    #[test]
    fn test_open_fails_if_not_initialized() {
        let tmp = TempDir::new().unwrap();
        let result = LoroStore::open(tmp.path());
        assert!(matches!(result, Err(LessonNoteError::NotInitialized)));
    }

    #[test]
    fn test_put_get_remove() {
        let store = LoroStore::in_memory();

        store.put("lessons:1", &json!({"title": "X"})).unwrap();
        let value: serde_json::Value = store.get("lessons:1").unwrap().unwrap();
        assert_eq!(value["title"], "X");

        assert!(store.remove("lessons:1").unwrap());
        assert!(!store.remove("lessons:1").unwrap());
        assert!(store.get_raw("lessons:1").unwrap().is_none());
    }

    #[test]
    fn test_keys_with_prefix_sorted() {
        let store = LoroStore::in_memory();
        store.put_raw("notes:u1:b", "1".to_string()).unwrap();
        store.put_raw("notes:u1:a", "2".to_string()).unwrap();
        store.put_raw("notes:u10:a", "3".to_string()).unwrap();
        store.put_raw("tags:u1:a", "4".to_string()).unwrap();

        let keys = store.keys_with_prefix("notes:u1:").unwrap();
        assert_eq!(keys, vec!["notes:u1:a".to_string(), "notes:u1:b".to_string()]);
    }

    #[test]
    fn test_scan_skips_undecodable() {
        let store = LoroStore::in_memory();
        store.put_raw("n:1", "{\"v\": 1}".to_string()).unwrap();
        store.put_raw("n:2", "not json".to_string()).unwrap();

        let rows: Vec<(String, serde_json::Value)> = store.scan("n:").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].0, "n:1");
    }

    #[test]
    fn test_save_and_reopen() {
        let tmp = TempDir::new().unwrap();
        {
            let store = LoroStore::init(tmp.path()).unwrap();
            store.put("lessons:1", &json!({"title": "Persisted"})).unwrap();
            store.save().unwrap();
        }

        let store = LoroStore::open(tmp.path()).unwrap();
        let value: serde_json::Value = store.get("lessons:1").unwrap().unwrap();
        assert_eq!(value["title"], "Persisted");
    }

    #[test]
    fn test_version_hash_changes_on_write() {
        let store = LoroStore::in_memory();
        let before = store.version_hash();
        store.put_raw("k", "1".to_string()).unwrap();
        assert_ne!(before, store.version_hash());
    }

    #[test]
    fn test_in_memory_has_no_data_dir() {
        let store = LoroStore::in_memory();
        assert!(store.data_dir().is_err());
        assert!(store.save().is_ok());
    }
}
