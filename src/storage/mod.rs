//! Key-value storage.
//!
//! Every record (lessons, notes, tags, note-index entries) lives under a
//! string key as a JSON document. [`KvStore`] is the seam the rest of the
//! crate is written against; [`LoroStore`] is the on-disk implementation.

pub mod keys;
mod loro_store;

pub use loro_store::{LoroStore, DATA_DIR};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

/// A string-keyed store of JSON records
pub trait KvStore {
    /// Raw JSON text stored under `key`
    fn get_raw(&self, key: &str) -> Result<Option<String>>;

    /// Store raw JSON text under `key`, replacing any previous value
    fn put_raw(&self, key: &str, value: String) -> Result<()>;

    /// Remove `key`. Returns false if it was not present.
    fn remove(&self, key: &str) -> Result<bool>;

    /// All keys starting with `prefix`, sorted
    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>>;

    /// Deserialize the record under `key`
    fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get_raw(key)? {
            Some(text) => Ok(Some(serde_json::from_str(&text)?)),
            None => Ok(None),
        }
    }

    /// Serialize `value` and store it under `key`
    fn put<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let text = serde_json::to_string(value)?;
        self.put_raw(key, text)
    }

    /// Every record under `prefix` that decodes as `T`.
    ///
    /// Records that fail to decode are logged and left out.
    fn scan<T: DeserializeOwned>(&self, prefix: &str) -> Result<Vec<(String, T)>> {
        let mut out = Vec::new();
        for key in self.keys_with_prefix(prefix)? {
            let Some(text) = self.get_raw(&key)? else {
                continue;
            };
            match serde_json::from_str(&text) {
                Ok(value) => out.push((key, value)),
                Err(e) => tracing::warn!(key = %key, error = %e, "skipping undecodable record"),
            }
        }
        Ok(out)
    }
}
