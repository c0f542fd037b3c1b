pub mod cache;
pub mod cli;
pub mod config;
pub mod entity;
pub mod error;
pub mod export;
pub mod import;
pub mod lesson;
pub mod notes;
pub mod search;
pub mod server;
pub mod storage;
pub mod sync;
pub mod template;

pub use cache::SqliteCache;
pub use config::Config;
pub use error::{LessonNoteError, Result};
pub use storage::{KvStore, LoroStore};
pub use sync::{sync_lesson_notes, SyncOutcome};
pub use template::{generate_note_template, generate_vocabulary_table, TemplateParams};
