//! Starter markdown for new notes.
//!
//! Pure functions: the same input always yields the same document.

use chrono::{DateTime, NaiveDate};

use crate::entity::{ClassInfo, VocabularyItem};

const NOT_AVAILABLE: &str = "N/A";
const DEFAULT_HEADING: &str = "Lesson Notes";
const EMPTY_CELL: &str = "-";

/// Inputs for [`generate_note_template`]. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateParams {
    pub lesson_title: Option<String>,
    pub lesson_date: Option<String>,
    pub topic_name: Option<String>,
    pub level: Option<String>,
    pub series_info: Option<String>,
    pub vocabulary: Vec<VocabularyItem>,
}

impl TemplateParams {
    pub fn from_class_info(info: &ClassInfo, vocabulary: &[VocabularyItem]) -> Self {
        Self {
            lesson_title: Some(info.lesson_title.clone()),
            lesson_date: Some(info.lesson_date.clone()),
            topic_name: Some(info.topic_name.clone()),
            level: Some(info.level.clone()),
            series_info: info.series_info.clone(),
            vocabulary: vocabulary.to_vec(),
        }
    }
}

/// Build the starter document for a note.
///
/// Section order is fixed: title, Class Information, Vocabulary, My Notes,
/// Key Concepts, Questions.
pub fn generate_note_template(params: &TemplateParams) -> String {
    let heading = non_blank(&params.lesson_title).unwrap_or(DEFAULT_HEADING);
    let date = non_blank(&params.lesson_date).map(format_lesson_date);

    let mut out = String::new();
    out.push_str(&format!("# {}\n\n", heading));

    out.push_str("## Class Information\n\n");
    out.push_str(&info_line("Lesson", non_blank(&params.lesson_title)));
    out.push_str(&info_line("Date", date.as_deref()));
    out.push_str(&info_line("Topic", non_blank(&params.topic_name)));
    out.push_str(&info_line("Level", non_blank(&params.level)));
    out.push_str(&info_line("Series", non_blank(&params.series_info)));
    out.push('\n');

    out.push_str("## Vocabulary\n\n");
    out.push_str(&generate_vocabulary_table(&params.vocabulary));
    out.push('\n');

    out.push_str("## My Notes\n\n");
    out.push_str("_Write your notes from this lesson here._\n\n");

    out.push_str("## Key Concepts\n\n");
    out.push_str("- _Add the key grammar points and ideas to remember._\n\n");

    out.push_str("## Questions\n\n");
    out.push_str("- _Write down anything you want to ask your teacher._\n");

    out
}

/// Render vocabulary as a three-column markdown table.
///
/// An empty list still yields the header plus a single placeholder row.
pub fn generate_vocabulary_table(items: &[VocabularyItem]) -> String {
    let mut out = String::from("| Word | Translation | Example |\n|------|-------------|---------|\n");

    if items.is_empty() {
        out.push_str(&format!("| {0} | {0} | {0} |\n", EMPTY_CELL));
        return out;
    }

    for item in items {
        let example = item
            .example_sentence
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(EMPTY_CELL);
        out.push_str(&format!(
            "| {} | {} | {} |\n",
            escape_cell(&item.word),
            escape_cell(&item.translation),
            escape_cell(example)
        ));
    }

    out
}

fn info_line(label: &str, value: Option<&str>) -> String {
    format!("- **{}:** {}\n", label, value.unwrap_or(NOT_AVAILABLE))
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// `2025-03-05` or an RFC 3339 timestamp becomes `March 5, 2025`;
/// anything else is shown as written.
fn format_lesson_date(raw: &str) -> String {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.format("%B %-d, %Y").to_string();
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.date_naive().format("%B %-d, %Y").to_string();
    }
    raw.to_string()
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}
