//! Key conventions for records in the store.
//!
//! - `lessons:{lessonId}` -> Lesson
//! - `notes:{userId}:{noteId}` -> Note
//! - `note-index:{userId}:by-lesson:{lessonId}` -> note IDs
//! - `tags:{userId}:{tagId}` -> NoteTag
//!
//! User IDs may not contain `:`; lesson IDs may.

use uuid::Uuid;

use crate::error::{LessonNoteError, Result};

pub const LESSONS_PREFIX: &str = "lessons:";
pub const NOTES_PREFIX: &str = "notes:";
pub const NOTE_INDEX_PREFIX: &str = "note-index:";
pub const TAGS_PREFIX: &str = "tags:";

const BY_LESSON: &str = "by-lesson:";

/// Reject user IDs that would make keys ambiguous
pub fn check_user_id(user_id: &str) -> Result<()> {
    if user_id.trim().is_empty() {
        return Err(LessonNoteError::InvalidKey("user ID is empty".to_string()));
    }
    if user_id.contains(':') {
        return Err(LessonNoteError::InvalidKey(format!(
            "user ID '{}' may not contain ':'",
            user_id
        )));
    }
    Ok(())
}

pub fn check_lesson_id(lesson_id: &str) -> Result<()> {
    if lesson_id.trim().is_empty() {
        return Err(LessonNoteError::InvalidKey("lesson ID is empty".to_string()));
    }
    Ok(())
}

pub fn lesson_key(lesson_id: &str) -> String {
    format!("{}{}", LESSONS_PREFIX, lesson_id)
}

pub fn note_key(user_id: &str, note_id: &Uuid) -> String {
    format!("{}{}:{}", NOTES_PREFIX, user_id, note_id)
}

pub fn user_notes_prefix(user_id: &str) -> String {
    format!("{}{}:", NOTES_PREFIX, user_id)
}

pub fn note_index_key(user_id: &str, lesson_id: &str) -> String {
    format!("{}{}:{}{}", NOTE_INDEX_PREFIX, user_id, BY_LESSON, lesson_id)
}

pub fn tag_key(user_id: &str, tag_id: &Uuid) -> String {
    format!("{}{}:{}", TAGS_PREFIX, user_id, tag_id)
}

pub fn user_tags_prefix(user_id: &str) -> String {
    format!("{}{}:", TAGS_PREFIX, user_id)
}

/// Split a note-index key into `(user_id, lesson_id)`
pub fn parse_note_index_key(key: &str) -> Option<(&str, &str)> {
    let rest = key.strip_prefix(NOTE_INDEX_PREFIX)?;
    let (user_id, rest) = rest.split_once(':')?;
    let lesson_id = rest.strip_prefix(BY_LESSON)?;
    if user_id.is_empty() || lesson_id.is_empty() {
        return None;
    }
    Some((user_id, lesson_id))
}

/// Split a note key into `(user_id, note_id)`
pub fn parse_note_key(key: &str) -> Option<(&str, Uuid)> {
    let rest = key.strip_prefix(NOTES_PREFIX)?;
    let (user_id, note_id) = rest.split_once(':')?;
    Some((user_id, note_id.parse().ok()?))
}
