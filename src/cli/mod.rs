mod commands;
mod handlers;

pub use commands::{
    Cli, Commands, ExportFormat, LessonAction, LessonCommand, NoteAction, NoteCommand, TagAction,
    TagCommand,
};
pub use handlers::{
    handle_export, handle_init, handle_lesson, handle_note, handle_search, handle_serve,
    handle_tag, handle_template,
};
