// src/entity/note.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Point-in-time copy of a lesson's metadata held on a note
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassInfo {
    pub lesson_title: String,
    #[serde(default)]
    pub lesson_date: String,
    #[serde(default)]
    pub topic_name: String,
    #[serde(default)]
    pub level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series_info: Option<String>,
}

/// A vocabulary entry copied from a lesson's vocabulary pages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyItem {
    pub word: String,
    pub translation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example_sentence: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
}

impl VocabularyItem {
    pub fn new(word: impl Into<String>, translation: impl Into<String>) -> Self {
        Self {
            word: word.into(),
            translation: translation.into(),
            example_sentence: None,
            audio_url: None,
        }
    }
}

/// A student's note.
///
/// `title`, `content` and `tags` belong to the user. `class_info` and
/// `vocabulary` belong to the sync job and are replaced wholesale whenever
/// the source lesson is saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: Uuid,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lesson_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub content: String,
    /// Tag IDs
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_info: Option<ClassInfo>,
    #[serde(default)]
    pub vocabulary: Vec<VocabularyItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_edited_at: DateTime<Utc>,
}

impl Note {
    pub fn new(user_id: impl Into<String>, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            lesson_id: None,
            topic_id: None,
            title: title.into(),
            content: String::new(),
            tags: Vec::new(),
            class_info: None,
            vocabulary: Vec::new(),
            created_at: now,
            updated_at: now,
            last_edited_at: now,
        }
    }

    /// Record a user edit
    pub fn touch_edited(&mut self) {
        let now = Utc::now();
        self.updated_at = now;
        self.last_edited_at = now;
    }

    pub fn has_any_tag(&self, tag_ids: &[String]) -> bool {
        self.tags.iter().any(|t| tag_ids.contains(t))
    }
}

/// Payload for creating a note
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNote {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub lesson_id: Option<String>,
    #[serde(default)]
    pub topic_id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    /// Initial content; the lesson template is used when absent
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_note_timestamps_match() {
        let note = Note::new("u1", "Week 1");
        assert_eq!(note.created_at, note.updated_at);
        assert_eq!(note.updated_at, note.last_edited_at);
        assert!(note.content.is_empty());
        assert!(note.class_info.is_none());
    }

    #[test]
    fn test_vocabulary_item_omits_missing_optionals() {
        let item = VocabularyItem::new("hond", "dog");
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json, serde_json::json!({"word": "hond", "translation": "dog"}));
    }

    #[test]
    fn test_note_serializes_camel_case() {
        let mut note = Note::new("u1", "Week 1");
        note.lesson_id = Some("lesson-1".to_string());
        let json = serde_json::to_value(&note).unwrap();
        assert_eq!(json["userId"], "u1");
        assert_eq!(json["lessonId"], "lesson-1");
        assert!(json.get("lastEditedAt").is_some());
        assert!(json.get("classInfo").is_none());
    }

    #[test]
    fn test_has_any_tag() {
        let mut note = Note::new("u1", "n");
        note.tags = vec!["a".to_string(), "b".to_string()];
        assert!(note.has_any_tag(&["x".to_string(), "b".to_string()]));
        assert!(!note.has_any_tag(&["x".to_string()]));
        assert!(!note.has_any_tag(&[]));
    }
}
