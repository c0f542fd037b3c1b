//! Secondary index from lessons to the notes that copy them.
//!
//! `note-index:{userId}:by-lesson:{lessonId}` holds the IDs of that user's
//! notes for the lesson. Older records hold a single ID string; both
//! shapes are read, and writes always produce a list.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::storage::keys::{self, NOTE_INDEX_PREFIX};
use crate::storage::KvStore;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum IndexValue {
    One(String),
    Many(Vec<String>),
}

impl IndexValue {
    fn into_ids(self) -> Vec<Uuid> {
        let raw = match self {
            IndexValue::One(id) => vec![id],
            IndexValue::Many(ids) => ids,
        };
        raw.iter()
            .filter_map(|id| match id.parse() {
                Ok(uuid) => Some(uuid),
                Err(_) => {
                    tracing::warn!(id = %id, "ignoring malformed note ID in index");
                    None
                }
            })
            .collect()
    }
}

/// A `(user, note)` pair found in the index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedNote {
    pub user_id: String,
    pub note_id: Uuid,
}

fn read_ids<S: KvStore>(store: &S, key: &str) -> Result<Vec<Uuid>> {
    Ok(store
        .get::<IndexValue>(key)?
        .map(IndexValue::into_ids)
        .unwrap_or_default())
}

/// Record that `note_id` belongs to `lesson_id` for `user_id`
pub fn add_to_index<S: KvStore>(
    store: &S,
    user_id: &str,
    lesson_id: &str,
    note_id: &Uuid,
) -> Result<()> {
    let key = keys::note_index_key(user_id, lesson_id);
    let mut ids = read_ids(store, &key)?;
    if !ids.contains(note_id) {
        ids.push(*note_id);
    }
    let value = IndexValue::Many(ids.iter().map(Uuid::to_string).collect());
    store.put(&key, &value)
}

/// Drop `note_id` from the index entry; the entry is deleted once empty
pub fn remove_from_index<S: KvStore>(
    store: &S,
    user_id: &str,
    lesson_id: &str,
    note_id: &Uuid,
) -> Result<()> {
    let key = keys::note_index_key(user_id, lesson_id);
    let ids: Vec<Uuid> = read_ids(store, &key)?
        .into_iter()
        .filter(|id| id != note_id)
        .collect();

    if ids.is_empty() {
        store.remove(&key)?;
    } else {
        let value = IndexValue::Many(ids.iter().map(Uuid::to_string).collect());
        store.put(&key, &value)?;
    }
    Ok(())
}

/// Every indexed note for `lesson_id`, across all users.
///
/// An index value that cannot be read is logged and skipped so the other
/// users' entries are still returned.
pub fn notes_for_lesson<S: KvStore>(store: &S, lesson_id: &str) -> Result<Vec<IndexedNote>> {
    let mut found = Vec::new();

    for key in store.keys_with_prefix(NOTE_INDEX_PREFIX)? {
        let Some((user_id, indexed_lesson)) = keys::parse_note_index_key(&key) else {
            tracing::debug!(key = %key, "skipping unrecognized index key");
            continue;
        };
        if indexed_lesson != lesson_id {
            continue;
        }
        let ids = match read_ids(store, &key) {
            Ok(ids) => ids,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "skipping unreadable index entry");
                continue;
            }
        };
        for note_id in ids {
            found.push(IndexedNote {
                user_id: user_id.to_string(),
                note_id,
            });
        }
    }

    Ok(found)
}
