/// SQLite-backed note store
pub mod sqlite;

pub use sqlite::{NoteStore, StorageError};
