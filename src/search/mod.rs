//! Note search: query parsing and in-memory filtering.
//!
//! A note matches when its title or content contains the query text
//! (case-insensitive), its topic equals the topic filter if one is set, and
//! it carries at least one of the selected tags if any are selected.

use crate::entity::Note;

/// Topic and tag constraints on a search.
///
/// Filters can also be given inline in the query string:
/// - `topic:<id>` - notes for this topic
/// - `tag:<id>` - notes with this tag (repeatable, any one suffices)
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SearchFilter {
    pub topic_id: Option<String>,
    pub tag_ids: Vec<String>,
}

impl SearchFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.topic_id.is_none() && self.tag_ids.is_empty()
    }

    /// Fold another filter into this one; `other`'s topic wins when both are set
    pub fn merge(mut self, other: SearchFilter) -> Self {
        if other.topic_id.is_some() {
            self.topic_id = other.topic_id;
        }
        for tag in other.tag_ids {
            if !self.tag_ids.contains(&tag) {
                self.tag_ids.push(tag);
            }
        }
        self
    }

    pub fn accepts(&self, note: &Note) -> bool {
        if let Some(topic) = &self.topic_id {
            if note.topic_id.as_deref() != Some(topic.as_str()) {
                return false;
            }
        }
        self.tag_ids.is_empty() || note.has_any_tag(&self.tag_ids)
    }
}

/// Parse a raw query string into (remaining query text, filters).
///
/// ```ignore
/// let (query, filter) = parse_query("topic:food tag:t1 groente");
/// assert_eq!(query, "groente");
/// assert_eq!(filter.topic_id, Some("food".to_string()));
/// ```
pub fn parse_query(raw: &str) -> (String, SearchFilter) {
    let mut filter = SearchFilter::default();
    let mut remaining = Vec::new();

    for token in raw.split_whitespace() {
        if let Some(value) = token.strip_prefix("topic:").filter(|v| !v.is_empty()) {
            filter.topic_id = Some(value.to_string());
        } else if let Some(value) = token.strip_prefix("tag:").filter(|v| !v.is_empty()) {
            if !filter.tag_ids.iter().any(|t| t == value) {
                filter.tag_ids.push(value.to_string());
            }
        } else {
            remaining.push(token);
        }
    }

    (remaining.join(" "), filter)
}

/// True if title or content contains `query`, ignoring case.
/// A blank query matches every note.
pub fn matches_text(note: &Note, query: &str) -> bool {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    note.title.to_lowercase().contains(&needle) || note.content.to_lowercase().contains(&needle)
}

/// Notes matching `query` and `filter`, in input order
pub fn search_notes<'a>(notes: &'a [Note], query: &str, filter: &SearchFilter) -> Vec<&'a Note> {
    notes
        .iter()
        .filter(|n| filter.accepts(n) && matches_text(n, query))
        .collect()
}
