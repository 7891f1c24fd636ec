//! The storage contract shared by every note backend.

use crate::{Note, RenameResult, Result};
use regex::Regex;

/// Backing storage for named notes.
///
/// Implemented by [`SqliteStorage`](super::sqlite::SqliteStorage) and
/// [`JsonStorage`](super::json::JsonStorage); callers should depend on
/// `dyn NoteStorage` so backends can be swapped without touching call sites.
///
/// Shared semantics, uniform across implementations:
///
/// - At most one note exists per distinct name. Writes and renames never
///   silently produce duplicates (see the JSON backend's documented rename
///   exception).
/// - Every mutating method has persisted durably to the backing medium by
///   the time it returns. There is no write-behind.
/// - Absent names are reported through return values, never through errors;
///   errors are reserved for engine, I/O, and parse failures, which are
///   fatal to the operation.
/// - `search` and `enumerate` yield an implementation-defined order that is
///   stable across calls with no intervening mutation. Each implementation
///   documents its order.
pub trait NoteStorage {
    /// Writes a note, overwriting any existing note with the same name.
    fn write(&mut self, name: &str, value: &str) -> Result<()>;

    /// Appends `value` to an existing note (separated by a newline), or
    /// behaves as [`write`](Self::write) if no such note exists.
    fn append(&mut self, name: &str, value: &str) -> Result<()>;

    /// Like [`append`](Self::append), but prefixes the appended text with a
    /// `[<local date+time>]` header line. On an existing note the header is
    /// preceded by a blank line; on a new note the stored value starts with
    /// the header directly.
    fn append_timestamped(&mut self, name: &str, value: &str) -> Result<()>;

    /// Deletes the note with exactly this name. Returns whether a note was
    /// removed.
    fn delete(&mut self, name: &str) -> Result<bool>;

    /// Deletes every note whose name matches `pattern`. Returns the number
    /// of notes removed.
    fn delete_matching(&mut self, pattern: &Regex) -> Result<usize>;

    /// Performs best-effort compaction of the backing store. Never fails the
    /// caller; a no-op is a valid implementation.
    fn optimize(&mut self);

    /// Renames a note, preserving its value. See [`RenameResult`] for the
    /// possible outcomes and the backend divergence on collision detection.
    fn rename(&mut self, old_name: &str, new_name: &str) -> Result<RenameResult>;

    /// Returns every note whose name matches `pattern`.
    fn search(&self, pattern: &Regex) -> Result<Vec<Note>>;

    /// Returns every note in the store.
    fn enumerate(&self) -> Result<Vec<Note>>;
}

/// Renders the current local time as the bracketed header used by
/// `append_timestamped`, e.g. `[Friday, August 28, 2026 3:05 PM]`.
pub(crate) fn timestamp_header() -> String {
    format!("[{}]", chrono::Local::now().format("%A, %B %-d, %Y %-I:%M %p"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_header_shape() {
        let header = timestamp_header();
        assert!(header.starts_with('['));
        assert!(header.ends_with(']'));
        // Full rendering carries a weekday name and a year.
        let year = chrono::Local::now().format("%Y").to_string();
        assert!(header.contains(&year));
        assert!(header.contains(','));
    }
}
