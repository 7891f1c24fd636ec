//! The `note` command-line tool.
//!
//! Thin shell over [`notetaker_core`]: arguments are parsed into a
//! `(name, command, value)` triple and dispatched against a
//! `dyn NoteStorage`, so the CLI never depends on a concrete backend.
//! Note bodies go to stdout; status messages go to stderr.

use notetaker_core::{JsonStorage, NoteStorage, RenameResult, Result, SqliteStorage};
use regex::Regex;
use std::env;
use std::io::{self, BufRead, IsTerminal, Read};
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

/// Opens the backing store named by `NOTE_FILE` (default `notes.db`).
/// A `.json` extension selects the flat-document backend; anything else
/// gets SQLite.
fn open_store() -> Result<Box<dyn NoteStorage>> {
    let path = env::var("NOTE_FILE").unwrap_or_else(|_| "notes.db".to_string());
    if path.ends_with(".json") {
        Ok(Box::new(JsonStorage::open(path)?))
    } else {
        Ok(Box::new(SqliteStorage::open(path)?))
    }
}

fn run(args: &[String]) -> Result<()> {
    let mut notes = open_store()?;

    match args {
        [] => {
            show_usage();
            return Ok(());
        }
        [search] => {
            let name = resolve_name(search);
            print_search(notes.as_ref(), &name, &glob_to_regex(&name)?)?;
        }
        [name, command] => {
            if !process(notes.as_mut(), &resolve_name(name), command)? {
                return Ok(());
            }
        }
        [name, command, value @ ..] => {
            if !process_with_value(notes.as_mut(), &resolve_name(name), command, &value.join(" "))? {
                return Ok(());
            }
        }
    }

    notes.optimize();
    Ok(())
}

/// `@` by itself stands for today's date.
fn resolve_name(name: &str) -> String {
    if name == "@" {
        chrono::Local::now().format("%Y-%m-%d").to_string()
    } else {
        name.to_string()
    }
}

/// Handles the two-argument forms. Returns `false` when the command was
/// unknown and usage was shown instead.
fn process(notes: &mut dyn NoteStorage, name: &str, command: &str) -> Result<bool> {
    match command {
        "::" => notes.write(name, &read_stdin_note()?)?,
        "::+" => notes.append(name, &read_stdin_note()?)?,
        "::@" => notes.append_timestamped(name, &read_stdin_note()?)?,
        "-" => {
            if notes.delete(name)? {
                eprintln!("Note successfully deleted.");
            } else {
                eprintln!("Could not find note with name \"{name}\".");
            }
        }
        "--" => {
            let deleted = notes.delete_matching(&glob_to_regex(name)?)?;
            eprintln!("Deleted {deleted} notes.");
        }
        "--?" => {
            let deleted = notes.delete_matching(&Regex::new(name)?)?;
            eprintln!("Deleted {deleted} notes.");
        }
        "?" => print_search(notes, name, &Regex::new(name)?)?,
        _ => {
            eprintln!("Error: Unknown Command \"{command}\".");
            show_usage();
            return Ok(false);
        }
    }
    Ok(true)
}

/// Handles the three-argument forms. Returns `false` when the command was
/// unknown and usage was shown instead.
fn process_with_value(
    notes: &mut dyn NoteStorage,
    name: &str,
    command: &str,
    value: &str,
) -> Result<bool> {
    match command {
        ":" => notes.write(name, value)?,
        ":+" => notes.append(name, value)?,
        ":@" => notes.append_timestamped(name, value)?,
        "=" => match notes.rename(name, value)? {
            RenameResult::Success => eprintln!("Note successfully renamed."),
            RenameResult::OldNameDoesNotExist => {
                eprintln!("Could not find note with name \"{name}\".");
            }
            RenameResult::NewNameAlreadyExists => {
                eprintln!("A note with name \"{value}\" already exists.");
            }
        },
        _ => {
            eprintln!("Error: Unknown Command \"{command}\".");
            show_usage();
            return Ok(false);
        }
    }
    Ok(true)
}

fn print_search(notes: &dyn NoteStorage, search: &str, pattern: &Regex) -> Result<()> {
    let found = notes.search(pattern)?;
    if found.is_empty() {
        eprintln!("Could not find any notes with search pattern \"{search}\".");
        return Ok(());
    }
    for note in found {
        eprintln!("--{}--", note.name);
        println!("{}", note.value);
        println!();
    }
    Ok(())
}

/// Reads a note body from stdin. Redirected input is read to the end;
/// interactive input accepts lines until one ends with `::`, which is
/// stripped along with its newline.
fn read_stdin_note() -> io::Result<String> {
    let stdin = io::stdin();
    if !stdin.is_terminal() {
        let mut buffer = String::new();
        stdin.lock().read_to_string(&mut buffer)?;
        return Ok(buffer);
    }

    let mut buffer = String::new();
    for line in stdin.lock().lines() {
        let line = line?;
        let done = line.ends_with("::");
        buffer.push_str(&line);
        buffer.push('\n');
        if done {
            break;
        }
    }
    buffer.truncate(buffer.len().saturating_sub(3));
    Ok(buffer)
}

/// Translates a glob-style search (`*`, `?`) into an anchored regex.
fn glob_to_regex(search: &str) -> Result<Regex> {
    let mut pattern = String::with_capacity(search.len() + 2);
    pattern.push('^');
    for c in search.chars() {
        match c {
            '*' => pattern.push_str(".*?"),
            '?' => pattern.push('.'),
            _ => pattern.push_str(&regex::escape(&c.to_string())),
        }
    }
    pattern.push('$');
    Ok(Regex::new(&pattern)?)
}

fn show_usage() {
    println!("USAGE: note [name|search] [command] [contents]");
    println!("\nCOMMANDS:");
    println!(
        "  [search]                  --    Display all notes whose name matches [search]\n\
         \x20                                 Can use '?'/'*' for wildcard/s\n\
         \x20                                 Can use '@' (by itself) to mean the current date.\n\
         \x20 [regex] ?                 --    Display all notes whose name matches [regex]\n\
         \x20 [name] : [contents]       --    Write [contents] to [name]\n\
         \x20 [name] :+ [contents]      --    Append [contents] to [name]\n\
         \x20 [name] :@ [contents]      --    Append [contents] to [name] with timestamp\n\
         \x20 [name] ::                 --    Write standard input to [name]\n\
         \x20 [name] ::+                --    Append standard input to [name]\n\
         \x20 [name] ::@                --    Append standard input to [name] with timestamp\n\
         \x20                                 If not being redirected, standard input can\n\
         \x20                                 be ended by ending a line with \"::\"\n\
         \x20 [name] -                  --    Deletes note with [name]\n\
         \x20 [search] --               --    Deletes all notes whose name matches [search]\n\
         \x20 [regex] --?               --    Deletes all notes whose name matches [regex]\n\
         \x20 [old-name] = [new-name]   --    Renames note [old-name] to [new-name]"
    );
    println!("\nEXAMPLE:");
    println!(
        "  note MyNote : Some text.           -- Creates (or overwrites) a note named 'MyNote' with the contents 'Some text'.\n\
         \x20 note MyNote :+ Some more text.     -- Appends the text 'Some more text.' to the note named 'MyNote'.\n\
         \x20 note MyNote                        -- Displays the contents of the note named 'MyNote'.\n\
         \x20 note MyNote*                       -- Displays the contents of any note that starts with 'MyNote'.\n\
         \x20 note @ :@ Today's Date and Time.   -- Appends to (or creates) a note with the current date,\n\
         \x20                                       prepending the note contents with a timestamp.\n\
         \x20 note @                             -- Displays the contents of a note whose name is the current date.\n\
         \x20 note *                             -- Displays all notes."
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_star_matches_any_run() {
        let re = glob_to_regex("My*").unwrap();
        assert!(re.is_match("MyNote"));
        assert!(re.is_match("My"));
        assert!(!re.is_match("NotMyNote"));
    }

    #[test]
    fn test_glob_question_matches_single_char() {
        let re = glob_to_regex("note-?").unwrap();
        assert!(re.is_match("note-1"));
        assert!(!re.is_match("note-12"));
        assert!(!re.is_match("note-"));
    }

    #[test]
    fn test_glob_escapes_regex_metacharacters() {
        let re = glob_to_regex("a.b+c").unwrap();
        assert!(re.is_match("a.b+c"));
        assert!(!re.is_match("aXb+c"));
    }

    #[test]
    fn test_glob_is_anchored() {
        let re = glob_to_regex("exact").unwrap();
        assert!(re.is_match("exact"));
        assert!(!re.is_match("inexact"));
        assert!(!re.is_match("exactly"));
    }

    #[test]
    fn test_resolve_name_expands_at_to_date() {
        let today = chrono::Local::now().format("%Y-%m-%d").to_string();
        assert_eq!(resolve_name("@"), today);
        assert_eq!(resolve_name("plain"), "plain");
        assert_eq!(resolve_name("a@b"), "a@b");
    }
}
