use tracing::{debug, warn};
use uuid::Uuid;

use super::index;
use crate::entity::{NewNote, Note};
use crate::error::{LessonNoteError, Result};
use crate::lesson::LessonRepo;
use crate::storage::{keys, KvStore};
use crate::sync::{extract_class_info, extract_vocabulary};
use crate::template::{generate_note_template, TemplateParams};

const UNTITLED: &str = "Untitled note";

/// Update payload for a note's user-owned fields
#[derive(Debug, Default, Clone)]
pub struct NoteUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub topic_id: Option<Option<String>>, // Some(None) to clear
    pub add_tags: Vec<String>,
    pub remove_tags: Vec<String>,
}

impl NoteUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.topic_id.is_none()
            && self.add_tags.is_empty()
            && self.remove_tags.is_empty()
    }
}

pub struct NoteRepo<'a, S: KvStore> {
    store: &'a S,
}

impl<'a, S: KvStore> NoteRepo<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Create a note, prefilled from its lesson when the lesson is known.
    ///
    /// Without explicit content the note starts from the lesson template.
    pub fn create(&self, new: NewNote) -> Result<Note> {
        keys::check_user_id(&new.user_id)?;

        let lesson = match new.lesson_id.as_deref() {
            Some(lesson_id) => {
                keys::check_lesson_id(lesson_id)?;
                let found = LessonRepo::new(self.store).find(lesson_id)?;
                if found.is_none() {
                    warn!(lesson_id = %lesson_id, "creating note for unknown lesson; it fills in on the next lesson save");
                }
                found
            }
            None => None,
        };

        let title = new
            .title
            .filter(|t| !t.trim().is_empty())
            .or_else(|| lesson.as_ref().map(|l| l.title.clone()))
            .unwrap_or_else(|| UNTITLED.to_string());

        let mut note = Note::new(new.user_id, title);
        note.lesson_id = new.lesson_id;
        note.topic_id = new
            .topic_id
            .or_else(|| lesson.as_ref().and_then(|l| l.topic_id.clone()));
        note.tags = dedup(new.tags);

        let params = match &lesson {
            Some(lesson) => {
                let info = extract_class_info(lesson);
                let vocabulary = extract_vocabulary(lesson);
                let params = TemplateParams::from_class_info(&info, &vocabulary);
                note.class_info = Some(info);
                note.vocabulary = vocabulary;
                params
            }
            None => TemplateParams::default(),
        };
        note.content = match new.content {
            Some(content) => content,
            None => generate_note_template(&params),
        };

        self.store.put(&keys::note_key(&note.user_id, &note.id), &note)?;
        if let Some(lesson_id) = &note.lesson_id {
            index::add_to_index(self.store, &note.user_id, lesson_id, &note.id)?;
        }
        debug!(note_id = %note.id, user_id = %note.user_id, "created note");

        Ok(note)
    }

    pub fn find(&self, user_id: &str, note_id: &Uuid) -> Result<Option<Note>> {
        self.store.get(&keys::note_key(user_id, note_id))
    }

    pub fn get(&self, user_id: &str, note_id: &Uuid) -> Result<Note> {
        self.find(user_id, note_id)?
            .ok_or_else(|| LessonNoteError::NoteNotFound(note_id.to_string()))
    }

    /// A user's notes, most recently updated first
    pub fn list_for_user(&self, user_id: &str) -> Result<Vec<Note>> {
        keys::check_user_id(user_id)?;
        let mut notes: Vec<Note> = self
            .store
            .scan::<Note>(&keys::user_notes_prefix(user_id))?
            .into_iter()
            .map(|(_, note)| note)
            .collect();
        notes.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(notes)
    }

    /// Look up a note by full UUID or unique UUID prefix
    pub fn resolve(&self, user_id: &str, id: &str) -> Result<Note> {
        if let Ok(uuid) = id.parse::<Uuid>() {
            return self.get(user_id, &uuid);
        }

        let needle = id.to_lowercase();
        let mut matches = self
            .list_for_user(user_id)?
            .into_iter()
            .filter(|n| n.id.to_string().starts_with(&needle));

        match (matches.next(), matches.next()) {
            (Some(note), None) => Ok(note),
            (Some(_), Some(_)) => Err(LessonNoteError::AmbiguousId(id.to_string())),
            (None, _) => Err(LessonNoteError::NoteNotFound(id.to_string())),
        }
    }

    /// Apply a user edit. Lesson-owned fields are never touched here.
    pub fn update(&self, user_id: &str, note_id: &Uuid, update: NoteUpdate) -> Result<Note> {
        let mut note = self.get(user_id, note_id)?;
        if update.is_empty() {
            return Ok(note);
        }

        if let Some(title) = update.title {
            if title.trim().is_empty() {
                return Err(LessonNoteError::Validation("note title cannot be empty".to_string()));
            }
            note.title = title;
        }

        if let Some(content) = update.content {
            note.content = content;
        }

        if let Some(topic_id) = update.topic_id {
            note.topic_id = topic_id;
        }

        if !update.add_tags.is_empty() || !update.remove_tags.is_empty() {
            let mut tags: Vec<String> = note
                .tags
                .into_iter()
                .filter(|t| !update.remove_tags.contains(t))
                .collect();
            for tag in update.add_tags {
                if !tags.contains(&tag) {
                    tags.push(tag);
                }
            }
            note.tags = tags;
        }

        note.touch_edited();
        self.store.put(&keys::note_key(user_id, note_id), &note)?;
        Ok(note)
    }

    /// Delete a note and its lesson index entry
    pub fn delete(&self, user_id: &str, note_id: &Uuid) -> Result<Note> {
        let note = self.get(user_id, note_id)?;
        self.store.remove(&keys::note_key(user_id, note_id))?;
        if let Some(lesson_id) = &note.lesson_id {
            index::remove_from_index(self.store, user_id, lesson_id, note_id)?;
        }
        Ok(note)
    }
}

fn dedup(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        if !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}
