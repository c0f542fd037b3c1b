use uuid::Uuid;

use crate::entity::{Note, NoteTag};
use crate::error::{LessonNoteError, Result};
use crate::storage::{keys, KvStore};

const MAX_TAG_NAME: usize = 50;

pub struct TagRepo<'a, S: KvStore> {
    store: &'a S,
}

impl<'a, S: KvStore> TagRepo<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Create a tag. Names are unique per user, ignoring case.
    pub fn create(&self, user_id: &str, name: &str, color: Option<String>) -> Result<NoteTag> {
        keys::check_user_id(user_id)?;
        let name = self.validate_name(user_id, name, None)?;
        if let Some(color) = &color {
            validate_color(color)?;
        }

        let tag = NoteTag::new(user_id, name, color);
        self.store.put(&keys::tag_key(user_id, &tag.id), &tag)?;
        Ok(tag)
    }

    pub fn get(&self, user_id: &str, tag_id: &Uuid) -> Result<NoteTag> {
        self.store
            .get(&keys::tag_key(user_id, tag_id))?
            .ok_or_else(|| LessonNoteError::TagNotFound(tag_id.to_string()))
    }

    /// A user's tags, sorted by name
    pub fn list(&self, user_id: &str) -> Result<Vec<NoteTag>> {
        keys::check_user_id(user_id)?;
        let mut tags: Vec<NoteTag> = self
            .store
            .scan::<NoteTag>(&keys::user_tags_prefix(user_id))?
            .into_iter()
            .map(|(_, tag)| tag)
            .collect();
        tags.sort_by_key(|t| t.name.to_lowercase());
        Ok(tags)
    }

    /// Find a tag by ID, ID prefix, or exact name (case-insensitive)
    pub fn resolve(&self, user_id: &str, id_or_name: &str) -> Result<NoteTag> {
        if let Ok(uuid) = id_or_name.parse::<Uuid>() {
            return self.get(user_id, &uuid);
        }

        let tags = self.list(user_id)?;
        if let Some(tag) = tags.iter().find(|t| same_name(&t.name, id_or_name)) {
            return Ok(tag.clone());
        }

        let needle = id_or_name.to_lowercase();
        let mut matches = tags
            .into_iter()
            .filter(|t| t.id.to_string().starts_with(&needle));
        match (matches.next(), matches.next()) {
            (Some(tag), None) => Ok(tag),
            (Some(_), Some(_)) => Err(LessonNoteError::AmbiguousId(id_or_name.to_string())),
            (None, _) => Err(LessonNoteError::TagNotFound(id_or_name.to_string())),
        }
    }

    pub fn update(
        &self,
        user_id: &str,
        tag_id: &Uuid,
        name: Option<&str>,
        color: Option<String>,
    ) -> Result<NoteTag> {
        let mut tag = self.get(user_id, tag_id)?;
        if let Some(name) = name {
            tag.name = self.validate_name(user_id, name, Some(tag_id))?;
        }
        if let Some(color) = color {
            validate_color(&color)?;
            tag.color = color;
        }
        self.store.put(&keys::tag_key(user_id, tag_id), &tag)?;
        Ok(tag)
    }

    /// Delete a tag. Notes that reference it are left untouched.
    pub fn delete(&self, user_id: &str, tag_id: &Uuid) -> Result<NoteTag> {
        let tag = self.get(user_id, tag_id)?;
        self.store.remove(&keys::tag_key(user_id, tag_id))?;
        Ok(tag)
    }

    fn validate_name(&self, user_id: &str, name: &str, except: Option<&Uuid>) -> Result<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LessonNoteError::Validation("tag name is required".to_string()));
        }
        if name.chars().count() > MAX_TAG_NAME {
            return Err(LessonNoteError::Validation(format!(
                "tag name longer than {} characters",
                MAX_TAG_NAME
            )));
        }

        let taken = self
            .list(user_id)?
            .iter()
            .any(|t| Some(&t.id) != except && same_name(&t.name, name));
        if taken {
            return Err(LessonNoteError::Validation(format!(
                "tag '{}' already exists",
                name
            )));
        }

        Ok(name.to_string())
    }
}

fn validate_color(color: &str) -> Result<()> {
    if NoteTag::is_valid_color(color) {
        Ok(())
    } else {
        Err(LessonNoteError::Validation(format!(
            "invalid tag color '{}', expected #rrggbb",
            color
        )))
    }
}

/// The tags a note references that still exist, in the note's order.
///
/// IDs of deleted tags resolve to nothing.
pub fn resolve_tags<'t>(note: &Note, tags: &'t [NoteTag]) -> Vec<&'t NoteTag> {
    note.tags
        .iter()
        .filter_map(|id| tags.iter().find(|t| t.id.to_string() == *id))
        .collect()
}

/// Tag names compare with Unicode lowercasing, so "Één" and "één" are one tag
fn same_name(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::NewNote;
    use crate::notes::NoteRepo;
    use crate::storage::LoroStore;

    #[test]
    fn test_create_and_list_sorted() {
        let store = LoroStore::in_memory();
        let repo = TagRepo::new(&store);
        repo.create("u1", "vocab", None).unwrap();
        repo.create("u1", "Grammar", Some("#ff0000".to_string())).unwrap();
        repo.create("u2", "other", None).unwrap();

        let names: Vec<String> = repo.list("u1").unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["Grammar".to_string(), "vocab".to_string()]);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let store = LoroStore::in_memory();
        let repo = TagRepo::new(&store);
        repo.create("u1", "Grammar", None).unwrap();
        assert!(repo.create("u1", "grammar", None).is_err());
        assert!(repo.create("u2", "grammar", None).is_ok());
    }

    #[test]
    fn test_invalid_input_rejected() {
        let store = LoroStore::in_memory();
        let repo = TagRepo::new(&store);
        assert!(repo.create("u1", "  ", None).is_err());
        assert!(repo.create("u1", "red", Some("red".to_string())).is_err());
        assert!(repo.create("u1", &"x".repeat(51), None).is_err());
    }

    #[test]
    fn test_update_keeps_own_name() {
        let store = LoroStore::in_memory();
        let repo = TagRepo::new(&store);
        let tag = repo.create("u1", "Grammar", None).unwrap();

        let updated = repo
            .update("u1", &tag.id, Some("Grammar"), Some("#00ff00".to_string()))
            .unwrap();
        assert_eq!(updated.color, "#00ff00");
    }

    #[test]
    fn test_resolve_by_name_and_prefix() {
        let store = LoroStore::in_memory();
        let repo = TagRepo::new(&store);
        let tag = repo.create("u1", "Grammar", None).unwrap();

        assert_eq!(repo.resolve("u1", "grammar").unwrap().id, tag.id);
        assert_eq!(repo.resolve("u1", &tag.id.to_string()[..8]).unwrap().id, tag.id);
        assert!(repo.resolve("u1", "nothing").is_err());
    }

    #[test]
    fn test_non_ascii_names_match_case_insensitively() {
        let store = LoroStore::in_memory();
        let repo = TagRepo::new(&store);
        let tag = repo.create("u1", "Één", None).unwrap();

        assert_eq!(repo.resolve("u1", "één").unwrap().id, tag.id);
        assert_eq!(repo.resolve("u1", "ÉÉN").unwrap().id, tag.id);
        assert!(repo.create("u1", "één", None).is_err());
    }

    #[test]
    fn test_delete_tag_keeps_notes() {
        let store = LoroStore::in_memory();
        let tags = TagRepo::new(&store);
        let notes = NoteRepo::new(&store);

        let grammar = tags.create("u1", "Grammar", None).unwrap();
        let vocab = tags.create("u1", "Vocab", None).unwrap();
        let note = notes
            .create(NewNote {
                user_id: "u1".to_string(),
                tags: vec![grammar.id.to_string(), vocab.id.to_string()],
                ..Default::default()
            })
            .unwrap();

        tags.delete("u1", &grammar.id).unwrap();

        let reloaded = notes.get("u1", &note.id).unwrap();
        assert_eq!(reloaded.tags.len(), 2);

        let remaining = tags.list("u1").unwrap();
        let badges = resolve_tags(&reloaded, &remaining);
        assert_eq!(badges.len(), 1);
        assert_eq!(badges[0].name, "Vocab");
    }
}
