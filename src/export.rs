use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::note::now_millis;
use crate::store::NoteStore;

/// Serialize the full note list to a pretty-printed JSON document and write
/// it to a timestamp-named file under `dir`
///
/// Sanitization happened at save time, so the stored field values are
/// exported as-is with no re-escaping. There is no import path for this
/// format.
///
/// # Errors
/// Returns an error if the listing, directory creation, or file write fails.
pub fn export_notes(store: &NoteStore, dir: &Path) -> Result<PathBuf> {
    let notes = store.list().context("failed to list notes for export")?;
    let json = serde_json::to_string_pretty(&notes).context("failed to serialize notes")?;

    std::fs::create_dir_all(dir).context("failed to create export directory")?;
    let path = dir.join(format!("notes-export-{}.json", now_millis()));
    std::fs::write(&path, json).context("failed to write export file")?;

    info!(count = notes.len(), path = %path.display(), "notes exported");
    Ok(path)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::note::{Language, Note};

    #[test]
    fn test_export_round_trip_preserves_fields() {
        let store = NoteStore::open_in_memory().unwrap();
        let mut note = Note::new(Language::EsEs);
        note.title = "lista <de> compras".to_owned();
        note.text = "pan & leche".to_owned();
        store.save(&mut note).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = export_notes(&store, dir.path()).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let parsed: Vec<Note> = serde_json::from_str(&raw).unwrap();
        // The export must match the stored records exactly: escaped once at
        // save time, never re-escaped on the way out.
        assert_eq!(parsed, store.list().unwrap());
        assert_eq!(parsed[0].title, "lista &lt;de&gt; compras");
        assert_eq!(parsed[0].text, "pan &amp; leche");
        assert_eq!(parsed[0].language, Language::EsEs);
        assert!(parsed[0].tags.is_empty());
    }

    #[test]
    fn test_export_empty_store_writes_empty_array() {
        let store = NoteStore::open_in_memory().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = export_notes(&store, dir.path()).unwrap();
        let parsed: Vec<Note> =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert!(parsed.is_empty());
    }

    #[test]
    fn test_export_filename_is_timestamped() {
        let store = NoteStore::open_in_memory().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = export_notes(&store, dir.path()).unwrap();
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("notes-export-"));
        assert!(name.ends_with(".json"));
    }
}
