use thiserror::Error;

#[derive(Error, Debug)]
pub enum LessonNoteError {
    #[error("Not in a lessonnote workspace. Run 'lessonnote init' first.")]
    NotInitialized,

    #[error("Already initialized. Remove .lessonnote/ to reinitialize.")]
    AlreadyInitialized,

    #[error("Note not found: {0}")]
    NoteNotFound(String),

    #[error("Lesson not found: {0}")]
    LessonNotFound(String),

    #[error("Tag not found: {0}")]
    TagNotFound(String),

    #[error("Ambiguous ID prefix '{0}' matches more than one record")]
    AmbiguousId(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Loro error: {0}")]
    Loro(#[from] loro::LoroError),

    #[error("Loro encode error: {0}")]
    LoroEncode(#[from] loro::LoroEncodeError),
}

impl LessonNoteError {
    /// True for errors caused by a missing record.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            LessonNoteError::NoteNotFound(_)
                | LessonNoteError::LessonNotFound(_)
                | LessonNoteError::TagNotFound(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, LessonNoteError>;
