//! The outcome type for rename operations.
//!
//! Renaming is the one mutation in the storage contract with more than two
//! outcomes, so it gets its own result enum rather than a `bool` or an
//! error: both "old name missing" and "new name taken" are expected
//! conditions the caller branches on, not failures.
//!
//! ## Backend divergence
//!
//! [`SqliteStorage`](super::sqlite::SqliteStorage) can produce all three
//! variants — the table's uniqueness constraint detects collisions.
//! [`JsonStorage`](super::json::JsonStorage) cannot detect collisions during
//! its single streaming pass and never returns
//! [`RenameResult::NewNameAlreadyExists`]; see its `rename` documentation
//! for the consequences.
//!
//! ## Examples
//!
//! ```rust
//! use notetaker_core::RenameResult;
//!
//! let outcome = RenameResult::Success;
//! assert_eq!(outcome, RenameResult::Success);
//! assert_ne!(outcome, RenameResult::OldNameDoesNotExist);
//! ```

/// The result of renaming a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameResult {
    /// The note was renamed; its value is unchanged and it is now reachable
    /// only under the new name.
    Success,

    /// No note with the old name exists; the store is unchanged.
    OldNameDoesNotExist,

    /// A note with the new name already exists; both notes are left in their
    /// pre-call state. Only the SQLite backend reports this.
    NewNameAlreadyExists,
}
