mod sqlite_cache;

pub use sqlite_cache::{NoteHit, SqliteCache};

use crate::entity::Note;
use crate::error::Result;
use crate::storage::keys::NOTES_PREFIX;
use crate::storage::{KvStore, LoroStore};

/// Reindex `cache` from every note in `store` if the store changed since the
/// last build. Returns true when a reindex ran.
pub fn refresh_cache(store: &LoroStore, cache: &SqliteCache) -> Result<bool> {
    let version = store.version_hash();
    if cache.get_store_version()?.as_deref() == Some(version.as_str()) {
        return Ok(false);
    }

    let notes: Vec<Note> = store
        .scan::<Note>(NOTES_PREFIX)?
        .into_iter()
        .map(|(_, note)| note)
        .collect();
    cache.sync_from_store(&notes, &version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::NewNote;
    use crate::notes::NoteRepo;
    use crate::search::SearchFilter;

    #[test]
    fn test_refresh_cache_tracks_store_version() {
        let store = LoroStore::in_memory();
        let cache = SqliteCache::open_in_memory().unwrap();

        NoteRepo::new(&store)
            .create(NewNote {
                user_id: "u1".to_string(),
                title: Some("Groente".to_string()),
                content: Some("wortel en ui".to_string()),
                ..Default::default()
            })
            .unwrap();

        assert!(refresh_cache(&store, &cache).unwrap());
        assert!(!refresh_cache(&store, &cache).unwrap());

        let hits = cache
            .search_notes("u1", "WORTEL", &SearchFilter::default(), None)
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Groente");
    }
}
