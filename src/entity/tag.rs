// src/entity/tag.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_TAG_COLOR: &str = "#3b82f6";

/// A user-scoped, color-coded label. Notes reference tags by `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteTag {
    pub id: Uuid,
    pub name: String,
    pub color: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

impl NoteTag {
    pub fn new(user_id: impl Into<String>, name: impl Into<String>, color: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            color: color.unwrap_or_else(|| DEFAULT_TAG_COLOR.to_string()),
            user_id: user_id.into(),
            created_at: Utc::now(),
        }
    }

    /// `#rrggbb` (or short `#rgb`) hex colors only
    pub fn is_valid_color(color: &str) -> bool {
        match color.strip_prefix('#') {
            Some(hex) => {
                (hex.len() == 6 || hex.len() == 3) && hex.chars().all(|c| c.is_ascii_hexdigit())
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_color() {
        let tag = NoteTag::new("u1", "grammar", None);
        assert_eq!(tag.color, DEFAULT_TAG_COLOR);
    }

    #[test]
    fn test_color_validation() {
        assert!(NoteTag::is_valid_color("#ff0000"));
        assert!(NoteTag::is_valid_color("#ABC"));
        assert!(!NoteTag::is_valid_color("ff0000"));
        assert!(!NoteTag::is_valid_color("#gg0000"));
        assert!(!NoteTag::is_valid_color("#ff00"));
    }
}
