//! Internal domain modules for the NoteTaker core library.
//!
//! All public types from these modules are re-exported at the crate root
//! with `#[doc(inline)]`; import from there in preference to this module.

pub mod error;
pub mod json;
pub mod note;
pub mod rename;
pub mod sqlite;
pub mod storage;

#[doc(inline)]
pub use error::{NotetakerError, Result};
#[doc(inline)]
pub use json::JsonStorage;
#[doc(inline)]
pub use note::Note;
#[doc(inline)]
pub use rename::RenameResult;
#[doc(inline)]
pub use sqlite::SqliteStorage;
#[doc(inline)]
pub use storage::NoteStorage;
