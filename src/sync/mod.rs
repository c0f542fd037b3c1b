//! Lesson-to-note sync.
//!
//! When a lesson is saved, every note indexed under it gets a fresh copy of
//! the lesson's class information and vocabulary. Only those two fields and
//! `updatedAt` are written; the user's title, content and tags are left as
//! they are.
//!
//! The batch is best-effort. A note that cannot be loaded or saved is
//! logged and recorded, and the remaining notes are still updated. Nothing
//! is rolled back.

use chrono::Utc;
use serde::{Serialize, Serializer};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::entity::{ClassInfo, Lesson, Note, PageType, VocabularyItem};
use crate::error::Result;
use crate::notes::index::{self, IndexedNote};
use crate::storage::{keys, KvStore};

/// Class information as it should appear on notes for `lesson`
pub fn extract_class_info(lesson: &Lesson) -> ClassInfo {
    ClassInfo {
        lesson_title: lesson.title.clone(),
        lesson_date: lesson.date.clone().unwrap_or_default(),
        topic_name: lesson.topic_name.clone().unwrap_or_default(),
        level: lesson.level.clone().unwrap_or_default(),
        series_info: lesson.series_info.clone(),
    }
}

/// All words from the lesson's vocabulary pages, in page order then word order
pub fn extract_vocabulary(lesson: &Lesson) -> Vec<VocabularyItem> {
    lesson
        .pages_of_type(PageType::Vocabulary)
        .flat_map(|page| page.vocabulary_words())
        .map(|word| VocabularyItem {
            word: word.dutch,
            translation: word.english,
            example_sentence: word.example.filter(|s| !s.trim().is_empty()),
            audio_url: word.audio_url.filter(|s| !s.trim().is_empty()),
        })
        .collect()
}

/// A note the sync job did not update
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteIssue {
    pub user_id: String,
    pub note_id: Uuid,
    pub reason: String,
}

impl NoteIssue {
    fn new(entry: &IndexedNote, reason: impl Into<String>) -> Self {
        Self {
            user_id: entry.user_id.clone(),
            note_id: entry.note_id,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStats {
    pub lesson_id: String,
    pub updated_count: usize,
    /// Index entries pointing at notes that no longer exist or moved
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<NoteIssue>,
    /// Notes that could not be read or written
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed: Vec<NoteIssue>,
}

/// Result of one sync run.
///
/// Serializes as `{"success": true, "updatedCount": n, ...}` or
/// `{"success": false, "error": "..."}`.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    Completed(SyncStats),
    Failed { error: String },
}

impl SyncOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SyncOutcome::Completed(_))
    }

    pub fn updated_count(&self) -> usize {
        match self {
            SyncOutcome::Completed(stats) => stats.updated_count,
            SyncOutcome::Failed { .. } => 0,
        }
    }
}

impl Serialize for SyncOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Completed<'a> {
            success: bool,
            #[serde(flatten)]
            stats: &'a SyncStats,
        }

        #[derive(Serialize)]
        struct Failed<'a> {
            success: bool,
            error: &'a str,
        }

        match self {
            SyncOutcome::Completed(stats) => Completed {
                success: true,
                stats,
            }
            .serialize(serializer),
            SyncOutcome::Failed { error } => Failed {
                success: false,
                error,
            }
            .serialize(serializer),
        }
    }
}

/// Refresh `classInfo` and `vocabulary` on every note indexed under `lesson_id`.
///
/// Never returns an error: a failure of the whole run is reported as
/// [`SyncOutcome::Failed`].
pub fn sync_lesson_notes<S: KvStore>(store: &S, lesson_id: &str, lesson: &Lesson) -> SyncOutcome {
    match run_sync(store, lesson_id, lesson) {
        Ok(stats) => {
            info!(
                lesson_id = %lesson_id,
                updated = stats.updated_count,
                skipped = stats.skipped.len(),
                failed = stats.failed.len(),
                "synced lesson notes"
            );
            SyncOutcome::Completed(stats)
        }
        Err(e) => {
            error!(lesson_id = %lesson_id, error = %e, "lesson note sync failed");
            SyncOutcome::Failed {
                error: e.to_string(),
            }
        }
    }
}

fn run_sync<S: KvStore>(store: &S, lesson_id: &str, lesson: &Lesson) -> Result<SyncStats> {
    let indexed = index::notes_for_lesson(store, lesson_id)?;

    let class_info = extract_class_info(lesson);
    let vocabulary = extract_vocabulary(lesson);

    let mut stats = SyncStats {
        lesson_id: lesson_id.to_string(),
        ..Default::default()
    };

    for entry in &indexed {
        let key = keys::note_key(&entry.user_id, &entry.note_id);

        let mut note: Note = match store.get(&key) {
            Ok(Some(note)) => note,
            Ok(None) => {
                warn!(user_id = %entry.user_id, note_id = %entry.note_id, "indexed note not found, skipping");
                stats.skipped.push(NoteIssue::new(entry, "note not found"));
                continue;
            }
            Err(e) => {
                warn!(user_id = %entry.user_id, note_id = %entry.note_id, error = %e, "failed to load note");
                stats.failed.push(NoteIssue::new(entry, e.to_string()));
                continue;
            }
        };

        if let Some(other) = note.lesson_id.as_deref().filter(|l| *l != lesson_id) {
            warn!(note_id = %entry.note_id, lesson_id = %other, "note now belongs to another lesson, skipping");
            stats
                .skipped
                .push(NoteIssue::new(entry, format!("note references lesson {}", other)));
            continue;
        }

        note.class_info = Some(class_info.clone());
        note.vocabulary = vocabulary.clone();
        note.updated_at = Utc::now();

        match store.put(&key, &note) {
            Ok(()) => stats.updated_count += 1,
            Err(e) => {
                warn!(user_id = %entry.user_id, note_id = %entry.note_id, error = %e, "failed to save note");
                stats.failed.push(NoteIssue::new(entry, e.to_string()));
            }
        }
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LessonNoteError;
    use crate::notes::index::add_to_index;
    use crate::storage::LoroStore;
    use serde_json::json;

    fn example_lesson() -> Lesson {
        serde_json::from_value(json!({
            "id": "l1",
            "title": "X",
            "topic": "Y",
            "level": "A1",
            "pages": [
                {"id": "p1", "type": "vocabulary", "title": "Words",
                 "content": {"words": [{"dutch": "hond", "english": "dog"}]}}
            ]
        }))
        .unwrap()
    }

    fn stored_note(store: &LoroStore, user: &str, lesson_id: &str, content: &str) -> Note {
        let mut note = Note::new(user, "My note");
        note.lesson_id = Some(lesson_id.to_string());
        note.content = content.to_string();
        store.put(&keys::note_key(user, &note.id), &note).unwrap();
        add_to_index(store, user, lesson_id, &note.id).unwrap();
        note
    }

    fn load(store: &LoroStore, note: &Note) -> Note {
        store
            .get(&keys::note_key(&note.user_id, &note.id))
            .unwrap()
            .unwrap()
    }

    /// Fails every write to one key
    struct FailingWrites<'a> {
        inner: &'a LoroStore,
        poisoned: String,
    }

    impl KvStore for FailingWrites<'_> {
        fn get_raw(&self, key: &str) -> Result<Option<String>> {
            self.inner.get_raw(key)
        }

        fn put_raw(&self, key: &str, value: String) -> Result<()> {
            if key == self.poisoned {
                return Err(LessonNoteError::Storage("disk full".to_string()));
            }
            self.inner.put_raw(key, value)
        }

        fn remove(&self, key: &str) -> Result<bool> {
            self.inner.remove(key)
        }

        fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
            self.inner.keys_with_prefix(prefix)
        }
    }

    /// Fails every prefix scan
    struct BrokenIndex;

    impl KvStore for BrokenIndex {
        fn get_raw(&self, _key: &str) -> Result<Option<String>> {
            Ok(None)
        }

        fn put_raw(&self, _key: &str, _value: String) -> Result<()> {
            Ok(())
        }

        fn remove(&self, _key: &str) -> Result<bool> {
            Ok(false)
        }

        fn keys_with_prefix(&self, _prefix: &str) -> Result<Vec<String>> {
            Err(LessonNoteError::Storage("index unavailable".to_string()))
        }
    }

    #[test]
    fn test_extract_class_info() {
        let info = extract_class_info(&example_lesson());
        assert_eq!(info.lesson_title, "X");
        assert_eq!(info.topic_name, "Y");
        assert_eq!(info.level, "A1");
        assert_eq!(info.lesson_date, "");
        assert!(info.series_info.is_none());
    }

    #[test]
    fn test_extract_vocabulary_example() {
        let vocab = extract_vocabulary(&example_lesson());
        assert_eq!(vocab, vec![VocabularyItem::new("hond", "dog")]);
        assert!(vocab[0].example_sentence.is_none());
    }

    #[test]
    fn test_extract_vocabulary_page_then_word_order() {
        let lesson: Lesson = serde_json::from_value(json!({
            "id": "l1",
            "title": "X",
            "pages": [
                {"id": "1", "type": "vocabulary", "title": "A",
                 "content": {"words": [{"dutch": "een", "english": "one"}, {"dutch": "twee", "english": "two"}]}},
                {"id": "2", "type": "matching", "title": "M",
                 "content": {"pairs": [{"left": "x", "right": "y"}]}},
                {"id": "3", "type": "vocabulary", "title": "B",
                 "content": {"words": [{"dutch": "drie", "english": "three", "example": "Drie katten."}]}}
            ]
        }))
        .unwrap();

        let words: Vec<String> = extract_vocabulary(&lesson).into_iter().map(|v| v.word).collect();
        assert_eq!(words, vec!["een", "twee", "drie"]);
    }

    #[test]
    fn test_sync_updates_all_notes_and_keeps_content() {
        let store = LoroStore::in_memory();
        let a = stored_note(&store, "u1", "l1", "my own words");
        let b = stored_note(&store, "u2", "l1", "other student");
        let untouched = stored_note(&store, "u1", "l2", "different lesson");

        let lesson = example_lesson();
        let outcome = sync_lesson_notes(&store, "l1", &lesson);

        assert!(outcome.is_success());
        assert_eq!(outcome.updated_count(), 2);

        for (before, content) in [(&a, "my own words"), (&b, "other student")] {
            let after = load(&store, before);
            assert_eq!(after.class_info, Some(extract_class_info(&lesson)));
            assert_eq!(after.vocabulary, extract_vocabulary(&lesson));
            assert_eq!(after.content, content);
            assert_eq!(after.title, before.title);
            assert_eq!(after.last_edited_at, before.last_edited_at);
            assert!(after.updated_at >= before.updated_at);
        }

        assert!(load(&store, &untouched).class_info.is_none());
    }

    #[test]
    fn test_sync_is_idempotent() {
        let store = LoroStore::in_memory();
        let note = stored_note(&store, "u1", "l1", "text");
        let lesson = example_lesson();

        sync_lesson_notes(&store, "l1", &lesson);
        let first = load(&store, &note);
        sync_lesson_notes(&store, "l1", &lesson);
        let second = load(&store, &note);

        assert_eq!(first.class_info, second.class_info);
        assert_eq!(first.vocabulary, second.vocabulary);
        assert_eq!(first.content, second.content);
    }

    #[test]
    fn test_missing_note_is_skipped() {
        let store = LoroStore::in_memory();
        let ghost = Uuid::new_v4();
        add_to_index(&store, "u1", "l1", &ghost).unwrap();
        stored_note(&store, "u2", "l1", "");

        let outcome = sync_lesson_notes(&store, "l1", &example_lesson());
        match outcome {
            SyncOutcome::Completed(stats) => {
                assert_eq!(stats.updated_count, 1);
                assert_eq!(stats.skipped.len(), 1);
                assert_eq!(stats.skipped[0].note_id, ghost);
            }
            SyncOutcome::Failed { error } => panic!("sync failed: {}", error),
        }
    }

    #[test]
    fn test_moved_note_is_skipped() {
        let store = LoroStore::in_memory();
        let mut note = stored_note(&store, "u1", "l1", "");
        note.lesson_id = Some("l9".to_string());
        store.put(&keys::note_key("u1", &note.id), &note).unwrap();

        let outcome = sync_lesson_notes(&store, "l1", &example_lesson());
        assert_eq!(outcome.updated_count(), 0);
        assert!(load(&store, &note).class_info.is_none());
    }

    #[test]
    fn test_write_failure_continues_batch() {
        let store = LoroStore::in_memory();
        let bad = stored_note(&store, "u1", "l1", "");
        let good = stored_note(&store, "u2", "l1", "");

        let failing = FailingWrites {
            inner: &store,
            poisoned: keys::note_key("u1", &bad.id),
        };

        let outcome = sync_lesson_notes(&failing, "l1", &example_lesson());
        match outcome {
            SyncOutcome::Completed(stats) => {
                assert_eq!(stats.updated_count, 1);
                assert_eq!(stats.failed.len(), 1);
                assert!(stats.failed[0].reason.contains("disk full"));
            }
            SyncOutcome::Failed { error } => panic!("sync failed: {}", error),
        }
        assert!(load(&store, &good).class_info.is_some());
        assert!(load(&store, &bad).class_info.is_none());
    }

    #[test]
    fn test_unreadable_index_entry_does_not_stop_sync() {
        let store = LoroStore::in_memory();
        store
            .put_raw(&keys::note_index_key("u1", "l1"), "42".to_string())
            .unwrap();
        let good = stored_note(&store, "u2", "l1", "still here");

        let outcome = sync_lesson_notes(&store, "l1", &example_lesson());

        assert!(outcome.is_success());
        assert_eq!(outcome.updated_count(), 1);
        let after = load(&store, &good);
        assert_eq!(after.class_info, Some(extract_class_info(&example_lesson())));
        assert_eq!(after.content, "still here");
    }

    #[test]
    fn test_malformed_word_keeps_rest_of_page() {
        let lesson: Lesson = serde_json::from_value(json!({
            "id": "l1",
            "title": "X",
            "pages": [
                {"id": "p1", "type": "vocabulary", "title": "Words",
                 "content": {"words": [
                     {"dutch": "hond", "english": "dog"},
                     {"dutch": "kat", "english": null},
                     {"dutch": "vis", "english": "fish"}
                 ]}}
            ]
        }))
        .unwrap();
        let store = LoroStore::in_memory();
        let note = stored_note(&store, "u1", "l1", "");

        sync_lesson_notes(&store, "l1", &lesson);

        let words: Vec<String> = load(&store, &note).vocabulary.into_iter().map(|v| v.word).collect();
        assert_eq!(words, vec!["hond", "vis"]);
    }

    #[test]
    fn test_index_failure_reports_error() {
        let outcome = sync_lesson_notes(&BrokenIndex, "l1", &example_lesson());
        assert!(!outcome.is_success());

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["success"], false);
        assert!(json["error"].as_str().unwrap().contains("index unavailable"));
    }

    #[test]
    fn test_outcome_serialization() {
        let store = LoroStore::in_memory();
        stored_note(&store, "u1", "l1", "");

        let outcome = sync_lesson_notes(&store, "l1", &example_lesson());
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["updatedCount"], 1);
        assert_eq!(json["lessonId"], "l1");
        assert!(json.get("skipped").is_none());
    }

    #[test]
    fn test_no_notes_is_success() {
        let store = LoroStore::in_memory();
        let outcome = sync_lesson_notes(&store, "l1", &example_lesson());
        assert!(outcome.is_success());
        assert_eq!(outcome.updated_count(), 0);
    }
}
