//! Error types for the NoteTaker core library.

use thiserror::Error;

/// All errors that can occur within the NoteTaker core library.
///
/// Not-found conditions and rename collisions are *not* errors — they are
/// ordinary return values (`bool`, counts, [`crate::RenameResult`]). This
/// enum covers only the unexpected failures that should halt the caller:
/// engine faults, I/O faults, and a malformed persisted document.
#[derive(Debug, Error)]
pub enum NotetakerError {
    /// A SQLite operation failed.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// An I/O operation on the filesystem failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The stored JSON document could not be parsed, or a value inside it
    /// was not a string.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A search or delete pattern was not a valid regular expression.
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Convenience alias that pins the error type to [`NotetakerError`].
pub type Result<T> = std::result::Result<T, NotetakerError>;

impl NotetakerError {
    /// Returns a short, human-readable message suitable for display to the end user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Database(e) => format!("Note database error: {e}"),
            Self::Io(e) => format!("File error: {e}"),
            Self::Json(e) => format!("Note file is corrupt or not a note file: {e}"),
            Self::Pattern(e) => format!("Bad search pattern: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_error_from_regex() {
        let bad = regex::Regex::new("(").unwrap_err();
        let e = NotetakerError::from(bad);
        assert!(e.to_string().contains("Invalid pattern"));
    }

    #[test]
    fn test_user_message_mentions_file_for_io() {
        let e = NotetakerError::Io(std::io::Error::new(std::io::ErrorKind::Other, "boom"));
        assert!(e.user_message().contains("File error"));
    }
}
