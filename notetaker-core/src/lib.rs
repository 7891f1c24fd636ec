//! Core library for NoteTaker — a command-line tool for named text notes.
//!
//! The primary entry point is the [`NoteStorage`] trait, the contract both
//! backends implement identically:
//!
//! - [`SqliteStorage`] — rows in a SQLite table, with regex matching pushed
//!   into the engine and rename collisions caught by a uniqueness constraint.
//! - [`JsonStorage`] — one flat JSON document, rewritten field by field
//!   through a temp file and swapped into place atomically.
//!
//! Callers should hold a `dyn NoteStorage` (or be generic over it) so the
//! backend can be swapped without touching call sites.
//!
//! Types are re-exported from their respective sub-modules for convenience;
//! consumers should import from the crate root rather than the `core` module.

pub mod core;

// Re-export commonly used types.
#[doc(inline)]
pub use core::{
    error::{NotetakerError, Result},
    json::JsonStorage,
    note::Note,
    rename::RenameResult,
    sqlite::SqliteStorage,
    storage::NoteStorage,
};
