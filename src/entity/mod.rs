mod lesson;
mod note;
mod page;
mod tag;

pub use lesson::Lesson;
pub use note::{ClassInfo, NewNote, Note, VocabularyItem};
pub use page::{
    ChoiceQuestion, DragDropContent, DragItem, FillInBlankContent, Flashcard, FlashcardsContent,
    IntroContent, ListeningContent, MatchPair, MatchingContent, MultipleChoiceContent, Page,
    PageContent, PageType, ScrambleWord, SpeedQuestion, SpeedRoundContent, BlankSentence,
    VocabularyContent, VocabularyWord, WordScrambleContent, BLANK_MARKER,
};
pub use tag::{NoteTag, DEFAULT_TAG_COLOR};
