//! Notes, their lesson index, and user tags.

pub mod index;
mod repo;
mod tags;

pub use repo::{NoteRepo, NoteUpdate};
pub use tags::{resolve_tags, TagRepo};
