//! JSON lesson import.
//!
//! The authoring UI accepts lessons as
//! `{title, description, dayId?, pages: [{id, type, title, content}]}` where
//! the shape of `content` depends on `type`. This module decodes that
//! document and checks every page before it becomes a [`Lesson`].

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entity::{ChoiceQuestion, Lesson, Page, PageContent, BLANK_MARKER};
use crate::error::{LessonNoteError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonImport {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_id: Option<String>,
    #[serde(default)]
    pub pages: Vec<Page>,
}

/// Lesson metadata that is not part of the import document
#[derive(Debug, Clone, Default)]
pub struct LessonMeta {
    pub date: Option<String>,
    pub topic_id: Option<String>,
    pub topic_name: Option<String>,
    pub level: Option<String>,
    pub series_info: Option<String>,
}

/// A problem found while validating an import
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportIssue {
    /// Page ID, or `None` for lesson-level problems
    pub page: Option<String>,
    pub message: String,
}

impl ImportIssue {
    fn lesson(message: impl Into<String>) -> Self {
        Self {
            page: None,
            message: message.into(),
        }
    }

    fn page(page: &Page, message: impl Into<String>) -> Self {
        Self {
            page: Some(page.id.clone()),
            message: message.into(),
        }
    }
}

impl fmt::Display for ImportIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.page {
            Some(page) => write!(f, "page {}: {}", page, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Decode an import document without validating it
pub fn parse_lesson_import(json: &str) -> Result<LessonImport> {
    serde_json::from_str(json).map_err(|e| {
        LessonNoteError::Validation(format!("lesson import is not valid JSON: {}", e))
    })
}

/// Decode and validate an import document, then build the lesson
pub fn import_lesson(json: &str, lesson_id: &str, meta: LessonMeta) -> Result<Lesson> {
    let import = parse_lesson_import(json)?;
    let issues = import.validate();
    if !issues.is_empty() {
        let joined = issues
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        return Err(LessonNoteError::Validation(joined));
    }
    Ok(import.into_lesson(lesson_id, meta))
}

impl LessonImport {
    /// Every problem in the document; empty when it is importable
    pub fn validate(&self) -> Vec<ImportIssue> {
        let mut issues = Vec::new();

        if self.title.trim().is_empty() {
            issues.push(ImportIssue::lesson("lesson title is required"));
        }
        if self.pages.is_empty() {
            issues.push(ImportIssue::lesson("lesson has no pages"));
        }

        let mut seen = HashSet::new();
        for page in &self.pages {
            if !seen.insert(page.id.as_str()) {
                issues.push(ImportIssue::page(page, "duplicate page ID"));
            }
            match page.parse_content() {
                Ok(content) => validate_content(page, &content, &mut issues),
                Err(e) => issues.push(ImportIssue::page(page, e.to_string())),
            }
        }

        issues
    }

    pub fn into_lesson(self, lesson_id: &str, meta: LessonMeta) -> Lesson {
        let mut lesson = Lesson::new(lesson_id, self.title);
        lesson.description = Some(self.description).filter(|d| !d.is_empty());
        lesson.day_id = self.day_id;
        lesson.pages = self.pages;
        lesson.date = meta.date;
        lesson.topic_id = meta.topic_id;
        lesson.topic_name = meta.topic_name;
        lesson.level = meta.level;
        lesson.series_info = meta.series_info;
        lesson
    }
}

fn validate_content(page: &Page, content: &PageContent, issues: &mut Vec<ImportIssue>) {
    let mut problem = |message: String| issues.push(ImportIssue::page(page, message));

    match content {
        PageContent::Intro(intro) => {
            if intro.text.trim().is_empty() {
                problem("intro text is empty".to_string());
            }
        }
        PageContent::Vocabulary(vocab) => {
            if vocab.words.is_empty() {
                problem("vocabulary page has no words".to_string());
            }
            for (i, word) in vocab.words.iter().enumerate() {
                if word.dutch.trim().is_empty() || word.english.trim().is_empty() {
                    problem(format!("word {} needs both dutch and english", i + 1));
                }
            }
        }
        PageContent::Flashcards(cards) => {
            if cards.cards.is_empty() {
                problem("flashcards page has no cards".to_string());
            }
        }
        PageContent::MultipleChoice(mc) => {
            if mc.questions.is_empty() {
                problem("multiple choice page has no questions".to_string());
            }
            check_questions(&mc.questions, &mut problem);
        }
        PageContent::FillInBlank(fib) => {
            if fib.sentences.is_empty() {
                problem("fill-in-blank page has no sentences".to_string());
            }
            for (i, sentence) in fib.sentences.iter().enumerate() {
                if !sentence.text.contains(BLANK_MARKER) {
                    problem(format!("sentence {} has no {} blank", i + 1, BLANK_MARKER));
                }
                if sentence.answer.trim().is_empty() {
                    problem(format!("sentence {} has no answer", i + 1));
                }
            }
        }
        PageContent::Matching(matching) => {
            if matching.pairs.len() < 2 {
                problem("matching needs at least two pairs".to_string());
            }
        }
        PageContent::WordScramble(scramble) => {
            if scramble.words.is_empty() {
                problem("word scramble page has no words".to_string());
            }
            for (i, word) in scramble.words.iter().enumerate() {
                if word.word.chars().count() < 2 {
                    problem(format!("scramble word {} is too short", i + 1));
                }
            }
        }
        PageContent::Listening(listening) => {
            if listening.audio_url.trim().is_empty() {
                problem("listening page has no audio".to_string());
            }
            check_questions(&listening.questions, &mut problem);
        }
        PageContent::DragDrop(dd) => {
            if dd.categories.is_empty() {
                problem("drag and drop page has no categories".to_string());
            }
            for item in &dd.items {
                if !dd.categories.contains(&item.category) {
                    problem(format!(
                        "item '{}' uses unknown category '{}'",
                        item.text, item.category
                    ));
                }
            }
        }
        PageContent::SpeedRound(speed) => {
            if speed.time_limit == 0 {
                problem("speed round time limit must be positive".to_string());
            }
            if speed.questions.is_empty() {
                problem("speed round has no questions".to_string());
            }
        }
    }
}

fn check_questions(questions: &[ChoiceQuestion], problem: &mut impl FnMut(String)) {
    for (i, q) in questions.iter().enumerate() {
        if q.options.len() < 2 {
            problem(format!("question {} needs at least two options", i + 1));
        } else if q.correct_answer >= q.options.len() {
            problem(format!(
                "question {} answer index {} is out of range",
                i + 1,
                q.correct_answer
            ));
        }
    }
}
