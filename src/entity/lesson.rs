// src/entity/lesson.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::page::{Page, PageType};

/// A teacher-authored lesson: metadata plus ordered pages.
///
/// Lessons are owned by the authoring side. Notes only ever hold a copy
/// of the fields below, refreshed by the sync job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Lesson date as authored, usually `YYYY-MM-DD`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "topic")]
    pub topic_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series_info: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_id: Option<String>,
    #[serde(default)]
    pub pages: Vec<Page>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Lesson {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            date: None,
            topic_id: None,
            topic_name: None,
            level: None,
            series_info: None,
            day_id: None,
            pages: Vec::new(),
            updated_at: None,
        }
    }

    /// Pages of the given type, in lesson order
    pub fn pages_of_type(&self, page_type: PageType) -> impl Iterator<Item = &Page> {
        self.pages.iter().filter(move |p| p.page_type == page_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_with_topic_alias() {
        let lesson: Lesson = serde_json::from_value(json!({
            "id": "l1",
            "title": "X",
            "topic": "Y",
            "level": "A1",
            "pages": []
        }))
        .unwrap();

        assert_eq!(lesson.topic_name.as_deref(), Some("Y"));
        assert_eq!(lesson.level.as_deref(), Some("A1"));
        assert!(lesson.date.is_none());
    }

    #[test]
    fn test_pages_of_type_keeps_order() {
        let lesson: Lesson = serde_json::from_value(json!({
            "id": "l1",
            "title": "X",
            "pages": [
                {"id": "a", "type": "vocabulary", "title": "A", "content": {"words": []}},
                {"id": "b", "type": "intro", "title": "B", "content": {"text": "hi"}},
                {"id": "c", "type": "vocabulary", "title": "C", "content": {"words": []}}
            ]
        }))
        .unwrap();

        let ids: Vec<&str> = lesson
            .pages_of_type(PageType::Vocabulary)
            .map(|p| p.id.as_str())
            .collect();
        assert_eq!(ids, vec!["a", "c"]);
    }
}
