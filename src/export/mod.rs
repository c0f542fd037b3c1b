// src/export/mod.rs
//! Note export
//!
//! Writes a user's notes either as one markdown file per note (YAML
//! frontmatter followed by the note body) or as a single JSON document.

pub mod utils;

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::entity::{Note, NoteTag};
use crate::error::LessonNoteError;
use crate::notes::resolve_tags;
use crate::Result;

use self::utils::{ensure_dir, format_date, short_uuid, slugify, unique_filename};

/// What an export run produced
#[derive(Debug, Default, Serialize)]
pub struct ExportStats {
    pub notes: usize,
    pub files_written: Vec<String>,
}

#[derive(Serialize)]
struct NoteFrontmatter {
    id: String,
    title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    lesson: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    lesson_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    level: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tags: Vec<String>,
    created: String,
    updated: String,
}

impl NoteFrontmatter {
    fn from_note(note: &Note, tags: &[NoteTag]) -> Self {
        let info = note.class_info.as_ref();
        let non_empty = |s: &String| Some(s.clone()).filter(|s| !s.is_empty());

        Self {
            id: note.id.to_string(),
            title: note.title.clone(),
            lesson: info
                .and_then(|i| non_empty(&i.lesson_title))
                .or_else(|| note.lesson_id.clone()),
            lesson_date: info.and_then(|i| non_empty(&i.lesson_date)),
            topic: info
                .and_then(|i| non_empty(&i.topic_name))
                .or_else(|| note.topic_id.clone()),
            level: info.and_then(|i| non_empty(&i.level)),
            tags: resolve_tags(note, tags).iter().map(|t| t.name.clone()).collect(),
            created: format_date(&note.created_at),
            updated: format_date(&note.updated_at),
        }
    }
}

/// Generate YAML frontmatter block
pub fn yaml_frontmatter<T: Serialize>(data: &T) -> Result<String> {
    let yaml = serde_yaml::to_string(data)
        .map_err(|e| LessonNoteError::Storage(format!("YAML serialization failed: {}", e)))?;
    Ok(format!("---\n{}---\n", yaml))
}

/// Write one markdown file per note into `dir`.
///
/// Only the `{slug}.md` files for these notes are written or overwritten;
/// anything else already in `dir` stays.
pub fn export_markdown(notes: &[Note], tags: &[NoteTag], dir: &Path) -> Result<ExportStats> {
    ensure_dir(dir)?;

    let mut stats = ExportStats::default();
    let mut used = HashSet::new();

    let mut sorted: Vec<&Note> = notes.iter().collect();
    sorted.sort_by_key(|n| n.created_at);

    for note in sorted {
        let frontmatter = yaml_frontmatter(&NoteFrontmatter::from_note(note, tags))?;
        let body = format!("{}\n{}", frontmatter, note.content);

        let filename = unique_filename(&slugify(&note.title), &short_uuid(&note.id), &mut used);
        fs::write(dir.join(&filename), body)?;

        stats.notes += 1;
        stats.files_written.push(filename);
    }

    Ok(stats)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportedNote<'a> {
    #[serde(flatten)]
    note: &'a Note,
    tag_names: Vec<String>,
}

/// Write all notes to a single pretty-printed JSON array at `path`
pub fn export_json(notes: &[Note], tags: &[NoteTag], path: &Path) -> Result<ExportStats> {
    let exported: Vec<ExportedNote> = notes
        .iter()
        .map(|note| ExportedNote {
            note,
            tag_names: resolve_tags(note, tags).iter().map(|t| t.name.clone()).collect(),
        })
        .collect();

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(&exported)?)?;

    Ok(ExportStats {
        notes: exported.len(),
        files_written: vec![path.display().to_string()],
    })
}
