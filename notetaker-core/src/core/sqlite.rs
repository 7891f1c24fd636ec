//! SQLite-backed note storage.

use crate::core::storage::{timestamp_header, NoteStorage};
use crate::{Note, RenameResult, Result};
use regex::Regex;
use rusqlite::functions::FunctionFlags;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::path::Path;
use std::sync::Arc;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Note storage backed by a single SQLite table
/// `notes (name TEXT UNIQUE, value TEXT NOT NULL)`.
///
/// Regex matching is pushed into the engine: a `regexp(pattern, text)`
/// scalar function is registered at open time, so `search` and
/// `delete_matching` filter with `WHERE name REGEXP ?` instead of fetching
/// every row and filtering in the caller.
///
/// `search`/`enumerate` order is most-recently-inserted-first (`rowid`
/// descending). An overwrite counts as a fresh insertion.
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens (creating if absent) a note database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::NotetakerError::Database`] if the file cannot be
    /// opened as a SQLite database or the schema cannot be created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        register_regexp(&conn)?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS notes (name TEXT UNIQUE, value TEXT NOT NULL)",
            [],
        )?;
        Ok(Self { conn })
    }

    /// Point lookup used by the append operations; `None` when no note has
    /// this name. Not part of the public contract.
    fn get_value(&self, name: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM notes WHERE name = ?1", [name], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }
}

/// Registers `regexp(pattern, text)` so `name REGEXP ?` works in SQL. The
/// compiled regex is cached as auxiliary data on the pattern argument, so a
/// query compiles its pattern once rather than once per row.
fn register_regexp(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        "regexp",
        2,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let pattern: Arc<Regex> =
                ctx.get_or_create_aux(0, |vr| -> std::result::Result<_, BoxError> {
                    Ok(Regex::new(vr.as_str()?)?)
                })?;
            let text = ctx
                .get_raw(1)
                .as_str()
                .map_err(|e| rusqlite::Error::UserFunctionError(e.into()))?;
            Ok(pattern.is_match(text))
        },
    )
}

impl NoteStorage for SqliteStorage {
    fn write(&mut self, name: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO notes (name, value) VALUES (?1, ?2)",
            params![name, value],
        )?;
        Ok(())
    }

    fn append(&mut self, name: &str, value: &str) -> Result<()> {
        match self.get_value(name)? {
            Some(old) => self.write(name, &format!("{old}\n{value}")),
            None => self.write(name, value),
        }
    }

    fn append_timestamped(&mut self, name: &str, value: &str) -> Result<()> {
        let header = timestamp_header();
        match self.get_value(name)? {
            Some(old) => self.write(name, &format!("{old}\n\n{header}\n{value}")),
            None => self.write(name, &format!("{header}\n{value}")),
        }
    }

    fn delete(&mut self, name: &str) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM notes WHERE name = ?1", [name])?;
        Ok(rows > 0)
    }

    fn delete_matching(&mut self, pattern: &Regex) -> Result<usize> {
        let rows = self
            .conn
            .execute("DELETE FROM notes WHERE name REGEXP ?1", [pattern.as_str()])?;
        Ok(rows)
    }

    fn optimize(&mut self) {
        // VACUUM failure (e.g. another connection holding a lock) is not
        // worth failing the whole invocation over.
        if let Err(e) = self.conn.execute_batch("VACUUM") {
            eprintln!("Note database compaction failed: {e}");
        }
    }

    fn rename(&mut self, old_name: &str, new_name: &str) -> Result<RenameResult> {
        let update = self.conn.execute(
            "UPDATE notes SET name = ?1 WHERE name = ?2",
            params![new_name, old_name],
        );
        match update {
            Ok(0) => Ok(RenameResult::OldNameDoesNotExist),
            Ok(_) => Ok(RenameResult::Success),
            // The UNIQUE constraint on name is the collision detector: the
            // engine rejects the update and both rows keep their old state.
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == ErrorCode::ConstraintViolation =>
            {
                Ok(RenameResult::NewNameAlreadyExists)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn search(&self, pattern: &Regex) -> Result<Vec<Note>> {
        let mut stmt = self.conn.prepare(
            "SELECT name, value FROM notes WHERE name REGEXP ?1 ORDER BY rowid DESC",
        )?;
        let notes = stmt
            .query_map([pattern.as_str()], |row| {
                Ok(Note {
                    name: row.get(0)?,
                    value: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(notes)
    }

    fn enumerate(&self) -> Result<Vec<Note>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, value FROM notes ORDER BY rowid DESC")?;
        let notes = stmt
            .query_map([], |row| {
                Ok(Note {
                    name: row.get(0)?,
                    value: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(notes)
    }
}
