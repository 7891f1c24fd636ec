//! Flat-file note storage: one JSON object mapping note names to values.

use crate::core::storage::{timestamp_header, NoteStorage};
use crate::{Note, RenameResult, Result};
use regex::Regex;
use serde::de;
use std::cell::Cell;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Note storage backed by a single JSON document on disk.
///
/// Every mutation is a full streaming rewrite: the existing document is
/// parsed field by field and each field is passed through, transformed, or
/// dropped into a temporary file in the same directory, which then atomically
/// replaces the original. A crash at any point leaves the original document
/// intact; readers never observe a half-written file. The document is never
/// held in memory as a whole, so the store stays memory-bounded regardless
/// of note count.
///
/// `search`/`enumerate` order is document order, which is insertion order
/// (new notes are appended at the end of the object).
///
/// Known limitations, accepted rather than fixed:
///
/// - `rename` cannot detect collisions (see [`JsonStorage::rename`]).
/// - Two concurrent writers are not isolated: each rewrites the whole
///   document, so the last writer wins and a well-timed race can lose an
///   update. Atomic replacement only protects readers from torn writes.
pub struct JsonStorage {
    path: PathBuf,
}

impl JsonStorage {
    /// Opens (creating if absent) a note document at `path`. An absent or
    /// zero-length file is seeded with an empty object.
    ///
    /// # Errors
    ///
    /// Returns [`crate::NotetakerError::Io`] if the file cannot be inspected
    /// or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let needs_seed = match fs::metadata(&path) {
            Ok(meta) => meta.len() == 0,
            Err(e) if e.kind() == io::ErrorKind::NotFound => true,
            Err(e) => return Err(e.into()),
        };
        if needs_seed {
            fs::write(&path, "{}")?;
        }
        Ok(Self { path })
    }

    /// Runs one rewrite pass: `edit` decides per existing field whether to
    /// keep, transform, or drop it (`None`); `fallback` supplies a trailing
    /// entry after the pass, for the insert-if-new case. The original file
    /// is untouched until the final atomic rename over it.
    fn rewrite<F, G>(&mut self, mut edit: F, fallback: G) -> Result<()>
    where
        F: FnMut(String, String) -> Option<(String, String)>,
        G: FnOnce() -> Option<(String, String)>,
    {
        let input = File::open(&self.path)?;
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let temp = NamedTempFile::new_in(dir)?;
        let mut writer = MapWriter::new(BufWriter::new(temp))?;

        scan_fields(input, |name, value| {
            if let Some((name, value)) = edit(name, value) {
                writer.entry(&name, &value)?;
            }
            Ok(())
        })?;

        if let Some((name, value)) = fallback() {
            writer.entry(&name, &value)?;
        }

        let temp = writer
            .finish()?
            .into_inner()
            .map_err(|e| e.into_error())?;
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

impl NoteStorage for JsonStorage {
    fn write(&mut self, name: &str, value: &str) -> Result<()> {
        let replaced = Cell::new(false);
        self.rewrite(
            |field, stored| {
                if field == name {
                    replaced.set(true);
                    Some((field, value.to_string()))
                } else {
                    Some((field, stored))
                }
            },
            || (!replaced.get()).then(|| (name.to_string(), value.to_string())),
        )
    }

    fn append(&mut self, name: &str, value: &str) -> Result<()> {
        let appended = Cell::new(false);
        self.rewrite(
            |field, stored| {
                if field == name {
                    appended.set(true);
                    Some((field, format!("{stored}\n{value}")))
                } else {
                    Some((field, stored))
                }
            },
            || (!appended.get()).then(|| (name.to_string(), value.to_string())),
        )
    }

    fn append_timestamped(&mut self, name: &str, value: &str) -> Result<()> {
        let header = timestamp_header();
        let appended = Cell::new(false);
        self.rewrite(
            |field, stored| {
                if field == name {
                    appended.set(true);
                    Some((field, format!("{stored}\n\n{header}\n{value}")))
                } else {
                    Some((field, stored))
                }
            },
            || (!appended.get()).then(|| (name.to_string(), format!("{header}\n{value}"))),
        )
    }

    fn delete(&mut self, name: &str) -> Result<bool> {
        let removed = Cell::new(false);
        self.rewrite(
            |field, stored| {
                if field == name {
                    removed.set(true);
                    None
                } else {
                    Some((field, stored))
                }
            },
            || None,
        )?;
        Ok(removed.get())
    }

    fn delete_matching(&mut self, pattern: &Regex) -> Result<usize> {
        let removed = Cell::new(0usize);
        self.rewrite(
            |field, stored| {
                if pattern.is_match(&field) {
                    removed.set(removed.get() + 1);
                    None
                } else {
                    Some((field, stored))
                }
            },
            || None,
        )?;
        Ok(removed.get())
    }

    /// No compaction is defined for a flat JSON document; this is a no-op.
    fn optimize(&mut self) {}

    /// Renames a note, preserving its value.
    ///
    /// WARNING: this backend has no collision protection. The single
    /// streaming pass cannot know whether the new name already exists
    /// further along the document, so renaming onto an existing name
    /// succeeds and leaves two fields with that name in the output. Scans
    /// yield both entries and subsequent mutations target every duplicate;
    /// a map-building reader keeps whichever it parses last. The return
    /// value is therefore restricted to [`RenameResult::Success`] and
    /// [`RenameResult::OldNameDoesNotExist`].
    fn rename(&mut self, old_name: &str, new_name: &str) -> Result<RenameResult> {
        let renamed = Cell::new(false);
        self.rewrite(
            |field, stored| {
                if field == old_name {
                    renamed.set(true);
                    Some((new_name.to_string(), stored))
                } else {
                    Some((field, stored))
                }
            },
            || None,
        )?;
        if renamed.get() {
            Ok(RenameResult::Success)
        } else {
            Ok(RenameResult::OldNameDoesNotExist)
        }
    }

    fn search(&self, pattern: &Regex) -> Result<Vec<Note>> {
        let mut notes = Vec::new();
        scan_fields(File::open(&self.path)?, |name, value| {
            if pattern.is_match(&name) {
                notes.push(Note { name, value });
            }
            Ok(())
        })?;
        Ok(notes)
    }

    fn enumerate(&self) -> Result<Vec<Note>> {
        let mut notes = Vec::new();
        scan_fields(File::open(&self.path)?, |name, value| {
            notes.push(Note { name, value });
            Ok(())
        })?;
        Ok(notes)
    }
}

/// Streams the document's fields to `each` in document order without
/// materialising the whole object. A document that is not a JSON object of
/// string values fails with [`crate::NotetakerError::Json`].
fn scan_fields<R, F>(input: R, each: F) -> Result<()>
where
    R: io::Read,
    F: FnMut(String, String) -> Result<()>,
{
    let mut deserializer = serde_json::Deserializer::from_reader(BufReader::new(input));
    serde::Deserializer::deserialize_map(&mut deserializer, FieldPass(each))?;
    deserializer.end()?;
    Ok(())
}

struct FieldPass<F>(F);

impl<'de, F> de::Visitor<'de> for FieldPass<F>
where
    F: FnMut(String, String) -> Result<()>,
{
    type Value = ();

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("a JSON object mapping note names to string values")
    }

    fn visit_map<A>(mut self, mut access: A) -> std::result::Result<(), A::Error>
    where
        A: de::MapAccess<'de>,
    {
        while let Some((name, value)) = access.next_entry::<String, String>()? {
            (self.0)(name, value).map_err(de::Error::custom)?;
        }
        Ok(())
    }
}

/// Writes a JSON object one entry at a time. Keys and values go through
/// `serde_json` for escaping; the object framing is emitted directly so no
/// in-memory map is ever built.
struct MapWriter<W: Write> {
    out: W,
    first: bool,
}

impl<W: Write> MapWriter<W> {
    fn new(mut out: W) -> Result<Self> {
        out.write_all(b"{")?;
        Ok(Self { out, first: true })
    }

    fn entry(&mut self, name: &str, value: &str) -> Result<()> {
        if !self.first {
            self.out.write_all(b",")?;
        }
        self.first = false;
        serde_json::to_writer(&mut self.out, name)?;
        self.out.write_all(b":")?;
        serde_json::to_writer(&mut self.out, value)?;
        Ok(())
    }

    fn finish(mut self) -> Result<W> {
        self.out.write_all(b"}")?;
        self.out.flush()?;
        Ok(self.out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_temp() -> (JsonStorage, TempDir) {
        let dir = TempDir::new().unwrap();
        let storage = JsonStorage::open(dir.path().join("notes.json")).unwrap();
        (storage, dir)
    }

    fn get(storage: &JsonStorage, name: &str) -> Option<String> {
        storage
            .enumerate()
            .unwrap()
            .into_iter()
            .find(|n| n.name == name)
            .map(|n| n.value)
    }

    #[test]
    fn test_open_seeds_empty_object() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.json");
        JsonStorage::open(&path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "{}");
    }

    #[test]
    fn test_open_reseeds_zero_length_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.json");
        fs::write(&path, "").unwrap();
        let storage = JsonStorage::open(&path).unwrap();
        assert!(storage.enumerate().unwrap().is_empty());
    }

    #[test]
    fn test_write_round_trip() {
        let (mut storage, _dir) = open_temp();
        storage.write("greeting", "hello there").unwrap();
        assert_eq!(get(&storage, "greeting").as_deref(), Some("hello there"));
    }

    #[test]
    fn test_write_escapes_special_characters() {
        let (mut storage, _dir) = open_temp();
        storage.write("has \"quotes\"", "line one\nline \\two\t!").unwrap();
        assert_eq!(
            get(&storage, "has \"quotes\"").as_deref(),
            Some("line one\nline \\two\t!")
        );
    }

    #[test]
    fn test_overwrite_keeps_single_note() {
        let (mut storage, _dir) = open_temp();
        storage.write("n", "v1").unwrap();
        storage.write("n", "v2").unwrap();
        let all = storage.enumerate().unwrap();
        assert_eq!(all, vec![Note::new("n", "v2")]);
    }

    #[test]
    fn test_append_joins_with_newline() {
        let (mut storage, _dir) = open_temp();
        storage.write("n", "a").unwrap();
        storage.append("n", "b").unwrap();
        assert_eq!(get(&storage, "n").as_deref(), Some("a\nb"));
    }

    #[test]
    fn test_append_on_absent_name_writes() {
        let (mut storage, _dir) = open_temp();
        storage.append("n", "first").unwrap();
        assert_eq!(get(&storage, "n").as_deref(), Some("first"));
    }

    #[test]
    fn test_append_timestamped_new_note() {
        let (mut storage, _dir) = open_temp();
        storage.append_timestamped("log", "entry").unwrap();
        let value = get(&storage, "log").unwrap();
        assert!(value.starts_with('['), "should start with header: {value}");
        assert!(value.ends_with("]\nentry"));
    }

    #[test]
    fn test_append_timestamped_existing_note() {
        let (mut storage, _dir) = open_temp();
        storage.write("log", "old").unwrap();
        storage.append_timestamped("log", "entry").unwrap();
        let value = get(&storage, "log").unwrap();
        assert!(value.starts_with("old\n\n["), "blank line then header: {value}");
        assert!(value.ends_with("]\nentry"));
    }

    #[test]
    fn test_delete_exact() {
        let (mut storage, _dir) = open_temp();
        storage.write("keep", "k").unwrap();
        storage.write("drop", "d").unwrap();
        assert!(storage.delete("drop").unwrap());
        assert!(!storage.delete("drop").unwrap());
        assert_eq!(storage.enumerate().unwrap(), vec![Note::new("keep", "k")]);
    }

    #[test]
    fn test_delete_matching_counts() {
        let (mut storage, _dir) = open_temp();
        storage.write("todo-work", "w").unwrap();
        storage.write("todo-home", "h").unwrap();
        storage.write("journal", "j").unwrap();
        let pattern = Regex::new("^todo-").unwrap();
        assert_eq!(storage.delete_matching(&pattern).unwrap(), 2);
        assert_eq!(storage.enumerate().unwrap(), vec![Note::new("journal", "j")]);
    }

    #[test]
    fn test_rename_success() {
        let (mut storage, _dir) = open_temp();
        storage.write("old", "v").unwrap();
        assert_eq!(storage.rename("old", "new").unwrap(), RenameResult::Success);
        assert_eq!(get(&storage, "old"), None);
        assert_eq!(get(&storage, "new").as_deref(), Some("v"));
    }

    #[test]
    fn test_rename_missing_old_name() {
        let (mut storage, _dir) = open_temp();
        storage.write("other", "v").unwrap();
        assert_eq!(
            storage.rename("ghost", "new").unwrap(),
            RenameResult::OldNameDoesNotExist
        );
        assert_eq!(storage.enumerate().unwrap(), vec![Note::new("other", "v")]);
    }

    #[test]
    fn test_rename_collision_is_not_detected() {
        // Documented divergence from the SQLite backend: the rename goes
        // through and the document ends up with two fields named "b".
        let (mut storage, _dir) = open_temp();
        storage.write("a", "value-a").unwrap();
        storage.write("b", "value-b").unwrap();
        assert_eq!(storage.rename("a", "b").unwrap(), RenameResult::Success);
        let all = storage.enumerate().unwrap();
        assert_eq!(
            all,
            vec![Note::new("b", "value-a"), Note::new("b", "value-b")]
        );
    }

    #[test]
    fn test_enumerate_insertion_order() {
        let (mut storage, _dir) = open_temp();
        storage.write("first", "1").unwrap();
        storage.write("second", "2").unwrap();
        storage.write("third", "3").unwrap();
        let names: Vec<String> = storage
            .enumerate()
            .unwrap()
            .into_iter()
            .map(|n| n.name)
            .collect();
        assert_eq!(names, vec!["first", "second", "third"]);
        let again: Vec<String> = storage
            .enumerate()
            .unwrap()
            .into_iter()
            .map(|n| n.name)
            .collect();
        assert_eq!(names, again);
    }

    #[test]
    fn test_overwrite_keeps_original_position() {
        let (mut storage, _dir) = open_temp();
        storage.write("first", "1").unwrap();
        storage.write("second", "2").unwrap();
        storage.write("first", "updated").unwrap();
        let names: Vec<String> = storage
            .enumerate()
            .unwrap()
            .into_iter()
            .map(|n| n.name)
            .collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[test]
    fn test_search_linear_scan() {
        let (mut storage, _dir) = open_temp();
        storage.write("alpha", "1").unwrap();
        storage.write("beta", "2").unwrap();
        storage.write("alphabet", "3").unwrap();
        let pattern = Regex::new("^alpha").unwrap();
        let names: Vec<String> = storage
            .search(&pattern)
            .unwrap()
            .into_iter()
            .map(|n| n.name)
            .collect();
        assert_eq!(names, vec!["alpha", "alphabet"]);
    }

    #[test]
    fn test_enumerate_completeness() {
        let (mut storage, _dir) = open_temp();
        for i in 0..10 {
            storage.write(&format!("note-{i}"), &format!("v{i}")).unwrap();
        }
        let all = storage.enumerate().unwrap();
        assert_eq!(all.len(), 10);
        for i in 0..10 {
            assert!(all.contains(&Note::new(format!("note-{i}"), format!("v{i}"))));
        }
    }

    #[test]
    fn test_reopen_preserves_notes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.json");
        {
            let mut storage = JsonStorage::open(&path).unwrap();
            storage.write("persisted", "still here").unwrap();
        }
        let storage = JsonStorage::open(&path).unwrap();
        assert_eq!(get(&storage, "persisted").as_deref(), Some("still here"));
    }

    #[test]
    fn test_malformed_document_fails_and_leaves_original_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.json");
        fs::write(&path, "{\"a\": \"ok\", garbage").unwrap();
        let mut storage = JsonStorage::open(&path).unwrap();
        assert!(storage.write("b", "new").unwrap_err().to_string().contains("JSON"));
        // The failed rewrite only ever touched the temp file.
        assert_eq!(fs::read_to_string(&path).unwrap(), "{\"a\": \"ok\", garbage");
    }

    #[test]
    fn test_non_string_value_is_fatal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.json");
        fs::write(&path, "{\"a\": 5}").unwrap();
        let storage = JsonStorage::open(&path).unwrap();
        assert!(storage.enumerate().is_err());
    }

    #[test]
    fn test_optimize_is_a_noop() {
        let (mut storage, _dir) = open_temp();
        storage.write("n", "v").unwrap();
        storage.optimize();
        assert_eq!(get(&storage, "n").as_deref(), Some("v"));
    }
}
