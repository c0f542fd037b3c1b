// src/entity/page.rs
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use crate::error::{LessonNoteError, Result};

/// Placeholder a fill-in-blank sentence must contain.
pub const BLANK_MARKER: &str = "___";

/// Page types supported by the lesson editor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PageType {
    Intro,
    Vocabulary,
    Flashcards,
    MultipleChoice,
    FillInBlank,
    Matching,
    WordScramble,
    Listening,
    DragDrop,
    SpeedRound,
}

impl PageType {
    pub const ALL: [PageType; 10] = [
        PageType::Intro,
        PageType::Vocabulary,
        PageType::Flashcards,
        PageType::MultipleChoice,
        PageType::FillInBlank,
        PageType::Matching,
        PageType::WordScramble,
        PageType::Listening,
        PageType::DragDrop,
        PageType::SpeedRound,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PageType::Intro => "intro",
            PageType::Vocabulary => "vocabulary",
            PageType::Flashcards => "flashcards",
            PageType::MultipleChoice => "multipleChoice",
            PageType::FillInBlank => "fillInBlank",
            PageType::Matching => "matching",
            PageType::WordScramble => "wordScramble",
            PageType::Listening => "listening",
            PageType::DragDrop => "dragDrop",
            PageType::SpeedRound => "speedRound",
        }
    }
}

impl std::fmt::Display for PageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PageType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        PageType::ALL
            .iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| format!("Unknown page type: {}", s))
    }
}

/// One page of a lesson.
///
/// `content` is kept as raw JSON so that lessons round-trip through the
/// store untouched; [`Page::parse_content`] decodes it per page type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(rename = "type")]
    pub page_type: PageType,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: serde_json::Value,
}

impl Page {
    /// Decode `content` into the shape its page type expects
    pub fn parse_content(&self) -> Result<PageContent> {
        let raw = self.content.clone();
        let decoded = match self.page_type {
            PageType::Intro => serde_json::from_value(raw).map(PageContent::Intro),
            PageType::Vocabulary => serde_json::from_value(raw).map(PageContent::Vocabulary),
            PageType::Flashcards => serde_json::from_value(raw).map(PageContent::Flashcards),
            PageType::MultipleChoice => {
                serde_json::from_value(raw).map(PageContent::MultipleChoice)
            }
            PageType::FillInBlank => serde_json::from_value(raw).map(PageContent::FillInBlank),
            PageType::Matching => serde_json::from_value(raw).map(PageContent::Matching),
            PageType::WordScramble => serde_json::from_value(raw).map(PageContent::WordScramble),
            PageType::Listening => serde_json::from_value(raw).map(PageContent::Listening),
            PageType::DragDrop => serde_json::from_value(raw).map(PageContent::DragDrop),
            PageType::SpeedRound => serde_json::from_value(raw).map(PageContent::SpeedRound),
        };

        decoded.map_err(|e| {
            LessonNoteError::Validation(format!(
                "page '{}' has malformed {} content: {}",
                self.id, self.page_type, e
            ))
        })
    }

    /// Vocabulary words on this page, empty for any other page type.
    ///
    /// Words are decoded one at a time; a malformed word is logged and
    /// left out without dropping the rest of the page.
    pub fn vocabulary_words(&self) -> Vec<VocabularyWord> {
        if self.page_type != PageType::Vocabulary {
            return Vec::new();
        }

        let words = match self.content.get("words") {
            Some(serde_json::Value::Array(words)) => words,
            None | Some(serde_json::Value::Null) => return Vec::new(),
            Some(_) => {
                warn!(page_id = %self.id, "vocabulary page 'words' is not a list");
                return Vec::new();
            }
        };

        words
            .iter()
            .enumerate()
            .filter_map(|(i, raw)| match VocabularyWord::deserialize(raw) {
                Ok(word) => Some(word),
                Err(e) => {
                    warn!(page_id = %self.id, index = i, error = %e, "skipping malformed vocabulary word");
                    None
                }
            })
            .collect()
    }
}

/// Typed page content, one variant per [`PageType`]
#[derive(Debug, Clone, PartialEq)]
pub enum PageContent {
    Intro(IntroContent),
    Vocabulary(VocabularyContent),
    Flashcards(FlashcardsContent),
    MultipleChoice(MultipleChoiceContent),
    FillInBlank(FillInBlankContent),
    Matching(MatchingContent),
    WordScramble(WordScrambleContent),
    Listening(ListeningContent),
    DragDrop(DragDropContent),
    SpeedRound(SpeedRoundContent),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntroContent {
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabularyContent {
    #[serde(default)]
    pub words: Vec<VocabularyWord>,
}

/// A word as authored on a vocabulary page (Dutch to English)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyWord {
    #[serde(default)]
    pub dutch: String,
    #[serde(default)]
    pub english: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlashcardsContent {
    #[serde(default)]
    pub cards: Vec<Flashcard>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flashcard {
    pub front: String,
    pub back: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultipleChoiceContent {
    #[serde(default)]
    pub questions: Vec<ChoiceQuestion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceQuestion {
    pub question: String,
    pub options: Vec<String>,
    /// Index into `options`
    pub correct_answer: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillInBlankContent {
    #[serde(default)]
    pub sentences: Vec<BlankSentence>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlankSentence {
    /// Sentence text containing [`BLANK_MARKER`]
    pub text: String,
    pub answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchingContent {
    #[serde(default)]
    pub pairs: Vec<MatchPair>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchPair {
    pub left: String,
    pub right: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordScrambleContent {
    #[serde(default)]
    pub words: Vec<ScrambleWord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrambleWord {
    pub word: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListeningContent {
    pub audio_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
    #[serde(default)]
    pub questions: Vec<ChoiceQuestion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DragDropContent {
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub items: Vec<DragItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DragItem {
    pub text: String,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeedRoundContent {
    /// Seconds for the whole round
    pub time_limit: u32,
    #[serde(default)]
    pub questions: Vec<SpeedQuestion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeedQuestion {
    pub question: String,
    pub answer: String,
}

/// Page IDs come from the editor as either strings or numbers
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Str(String),
        Int(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Str(s) => s,
        RawId::Int(n) => n.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_page_type_from_str() {
        assert_eq!("vocabulary".parse::<PageType>(), Ok(PageType::Vocabulary));
        assert_eq!("multiplechoice".parse::<PageType>(), Ok(PageType::MultipleChoice));
        assert!("crossword".parse::<PageType>().is_err());
    }

    #[test]
    fn test_page_type_serializes_camel_case() {
        let json = serde_json::to_string(&PageType::FillInBlank).unwrap();
        assert_eq!(json, "\"fillInBlank\"");
    }

    #[test]
    fn test_numeric_page_id() {
        let page: Page = serde_json::from_value(json!({
            "id": 7,
            "type": "intro",
            "title": "Welcome",
            "content": {"text": "Hallo"}
        }))
        .unwrap();
        assert_eq!(page.id, "7");
    }

    #[test]
    fn test_vocabulary_words() {
        let page: Page = serde_json::from_value(json!({
            "id": "p1",
            "type": "vocabulary",
            "title": "Animals",
            "content": {"words": [
                {"dutch": "hond", "english": "dog"},
                {"dutch": "kat", "english": "cat", "example": "De kat slaapt.", "audioUrl": "kat.mp3"}
            ]}
        }))
        .unwrap();

        let words = page.vocabulary_words();
        assert_eq!(words.len(), 2);
        assert_eq!(words[0].dutch, "hond");
        assert_eq!(words[1].example.as_deref(), Some("De kat slaapt."));
        assert_eq!(words[1].audio_url.as_deref(), Some("kat.mp3"));
    }

    #[test]
    fn test_vocabulary_words_skips_only_malformed_word() {
        let page: Page = serde_json::from_value(json!({
            "id": "p1",
            "type": "vocabulary",
            "title": "Animals",
            "content": {"words": [
                {"dutch": "hond", "english": "dog"},
                {"dutch": "kat", "english": null},
                "not a word",
                {"dutch": "vis", "english": "fish"}
            ]}
        }))
        .unwrap();

        let dutch: Vec<String> = page.vocabulary_words().into_iter().map(|w| w.dutch).collect();
        assert_eq!(dutch, vec!["hond", "vis"]);
    }

    #[test]
    fn test_vocabulary_words_without_list() {
        let page: Page = serde_json::from_value(json!({
            "id": "p1",
            "type": "vocabulary",
            "title": "Animals",
            "content": {"words": "hond"}
        }))
        .unwrap();
        assert!(page.vocabulary_words().is_empty());
    }

    #[test]
    fn test_vocabulary_words_ignores_other_types() {
        let page: Page = serde_json::from_value(json!({
            "id": "p1",
            "type": "flashcards",
            "title": "Cards",
            "content": {"cards": [{"front": "hond", "back": "dog"}]}
        }))
        .unwrap();
        assert!(page.vocabulary_words().is_empty());
    }

    #[test]
    fn test_parse_content_malformed() {
        let page: Page = serde_json::from_value(json!({
            "id": "q",
            "type": "multipleChoice",
            "title": "Quiz",
            "content": {"questions": [{"question": "?"}]}
        }))
        .unwrap();

        let err = page.parse_content().unwrap_err();
        assert!(err.to_string().contains("multipleChoice"));
    }
}
