// src/export/utils.rs
//! Filename and formatting helpers for note export

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::Result;

/// Lowercase, hyphen-separated, ASCII-only file stem for a note title.
/// Falls back to `note` when nothing usable is left.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_hyphen = false;

    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            slug.push(c.to_ascii_lowercase());
            pending_hyphen = false;
        } else {
            pending_hyphen = true;
        }
    }

    if slug.is_empty() {
        slug.push_str("note");
    }
    slug
}

/// `{slug}.md`, or `{slug}-{short id}.md` when the slug is already taken
pub fn unique_filename(slug: &str, short_id: &str, used: &mut HashSet<String>) -> String {
    let stem = if used.insert(slug.to_string()) {
        slug.to_string()
    } else {
        let fallback = format!("{}-{}", slug, short_id);
        used.insert(fallback.clone());
        fallback
    };
    format!("{}.md", stem)
}

/// Create the export directory if needed. Existing contents are left alone.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)?;
    Ok(())
}

pub fn format_date(dt: &chrono::DateTime<chrono::Utc>) -> String {
    dt.format("%Y-%m-%d").to_string()
}

/// First 8 characters of a UUID
pub fn short_uuid(id: &uuid::Uuid) -> String {
    id.to_string()[..8].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Week 1 Notes"), "week-1-notes");
        assert_eq!(slugify("De kat, de hond!"), "de-kat-de-hond");
    }

    #[test]
    fn test_slugify_trims_separators() {
        assert_eq!(slugify("  --Hallo--  "), "hallo");
    }

    #[test]
    fn test_slugify_non_ascii() {
        assert_eq!(slugify("Café"), "caf");
        assert_eq!(slugify("日本語"), "note");
        assert_eq!(slugify(""), "note");
    }

    #[test]
    fn test_unique_filename_collision() {
        let mut used = HashSet::new();
        assert_eq!(unique_filename("week-1", "abcd1234", &mut used), "week-1.md");
        assert_eq!(unique_filename("week-1", "ef567890", &mut used), "week-1-ef567890.md");
    }
}
