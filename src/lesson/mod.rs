//! Lesson records and the save path that triggers note sync.

use chrono::Utc;
use serde::Serialize;

use crate::entity::Lesson;
use crate::error::{LessonNoteError, Result};
use crate::storage::keys::{self, LESSONS_PREFIX};
use crate::storage::KvStore;
use crate::sync::{sync_lesson_notes, SyncOutcome};

/// A saved lesson together with the sync run it triggered
#[derive(Debug, Clone, Serialize)]
pub struct LessonSave {
    pub lesson: Lesson,
    pub sync: SyncOutcome,
}

pub struct LessonRepo<'a, S: KvStore> {
    store: &'a S,
}

impl<'a, S: KvStore> LessonRepo<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub fn find(&self, lesson_id: &str) -> Result<Option<Lesson>> {
        self.store.get(&keys::lesson_key(lesson_id))
    }

    pub fn get(&self, lesson_id: &str) -> Result<Lesson> {
        self.find(lesson_id)?
            .ok_or_else(|| LessonNoteError::LessonNotFound(lesson_id.to_string()))
    }

    /// All lessons, ordered by ID
    pub fn list(&self) -> Result<Vec<Lesson>> {
        Ok(self
            .store
            .scan::<Lesson>(LESSONS_PREFIX)?
            .into_iter()
            .map(|(_, lesson)| lesson)
            .collect())
    }

    /// Persist `lesson` and propagate it to every note that copies it.
    ///
    /// The lesson write itself must succeed; the sync run afterwards is
    /// best-effort and its outcome is returned alongside.
    pub fn save(&self, mut lesson: Lesson) -> Result<LessonSave> {
        keys::check_lesson_id(&lesson.id)?;
        if lesson.title.trim().is_empty() {
            return Err(LessonNoteError::Validation("lesson title is required".to_string()));
        }

        lesson.updated_at = Some(Utc::now());
        self.store.put(&keys::lesson_key(&lesson.id), &lesson)?;

        let sync = sync_lesson_notes(self.store, &lesson.id, &lesson);
        Ok(LessonSave { lesson, sync })
    }

    /// Re-run sync for a stored lesson
    pub fn resync(&self, lesson_id: &str) -> Result<SyncOutcome> {
        let lesson = self.get(lesson_id)?;
        Ok(sync_lesson_notes(self.store, lesson_id, &lesson))
    }

    /// Remove a lesson. Notes keep their last copied class info and vocabulary.
    pub fn delete(&self, lesson_id: &str) -> Result<()> {
        if !self.store.remove(&keys::lesson_key(lesson_id))? {
            return Err(LessonNoteError::LessonNotFound(lesson_id.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::NewNote;
    use crate::notes::NoteRepo;
    use crate::storage::LoroStore;
    use serde_json::json;

    fn lesson(title: &str) -> Lesson {
        serde_json::from_value(json!({
            "id": "l1",
            "title": title,
            "level": "A2",
            "pages": [
                {"id": "p1", "type": "vocabulary", "title": "Words",
                 "content": {"words": [{"dutch": "fiets", "english": "bicycle"}]}}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_save_and_get() {
        let store = LoroStore::in_memory();
        let repo = LessonRepo::new(&store);

        let saved = repo.save(lesson("Transport")).unwrap();
        assert!(saved.lesson.updated_at.is_some());
        assert!(saved.sync.is_success());

        let loaded = repo.get("l1").unwrap();
        assert_eq!(loaded.title, "Transport");
        assert_eq!(repo.list().unwrap().len(), 1);
    }

    #[test]
    fn test_save_rejects_blank_title() {
        let store = LoroStore::in_memory();
        let result = LessonRepo::new(&store).save(lesson("  "));
        assert!(matches!(result, Err(LessonNoteError::Validation(_))));
    }

    #[test]
    fn test_save_propagates_to_notes() {
        let store = LoroStore::in_memory();
        let lessons = LessonRepo::new(&store);
        let notes = NoteRepo::new(&store);

        lessons.save(lesson("Transport")).unwrap();
        let note = notes
            .create(NewNote {
                user_id: "u1".to_string(),
                lesson_id: Some("l1".to_string()),
                content: Some("mine".to_string()),
                ..Default::default()
            })
            .unwrap();

        let saved = lessons.save(lesson("Transport, revised")).unwrap();
        assert_eq!(saved.sync.updated_count(), 1);

        let reloaded = notes.get("u1", &note.id).unwrap();
        assert_eq!(
            reloaded.class_info.unwrap().lesson_title,
            "Transport, revised"
        );
        assert_eq!(reloaded.content, "mine");
    }

    #[test]
    fn test_get_missing() {
        let store = LoroStore::in_memory();
        let err = LessonRepo::new(&store).get("nope").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_delete_keeps_notes() {
        let store = LoroStore::in_memory();
        let lessons = LessonRepo::new(&store);
        let notes = NoteRepo::new(&store);

        lessons.save(lesson("Transport")).unwrap();
        let note = notes
            .create(NewNote {
                user_id: "u1".to_string(),
                lesson_id: Some("l1".to_string()),
                ..Default::default()
            })
            .unwrap();

        lessons.delete("l1").unwrap();
        assert!(lessons.find("l1").unwrap().is_none());
        assert!(notes.get("u1", &note.id).unwrap().class_info.is_some());
        assert!(lessons.delete("l1").is_err());
    }

    #[test]
    fn test_resync() {
        let store = LoroStore::in_memory();
        let lessons = LessonRepo::new(&store);
        lessons.save(lesson("Transport")).unwrap();
        assert!(lessons.resync("l1").unwrap().is_success());
        assert!(lessons.resync("missing").is_err());
    }
}
