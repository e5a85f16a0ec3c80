//! Inspection Shell
//!
//! Line-oriented commands for poking at a running cache from stdin.
//!
//! # Commands
//! - `add <key> <value>` - Store the rest of the line as the value
//! - `get <key>` - Print the stored value
//! - `delete <key>` - Remove a key
//! - `stats` - Print cache statistics as JSON
//! - `len` - Print the number of stored entries
//! - `help` - List commands
//! - `exit` - Stop the shell

use std::io::Write;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cache::ExpiringCache;
use crate::error::ShellError;

const HELP: &str = "\
Usage:
  add <key> <value>  Store a value
  get <key>          Print a stored value
  delete <key>       Remove a key
  stats              Print cache statistics
  len                Print the number of entries
  help               Show this message
  exit               Quit";

/// A parsed shell command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Add { key: String, value: String },
    Get { key: String },
    Delete { key: String },
    Stats,
    Len,
    Help,
    Exit,
}

impl Command {
    /// Parses one input line. Blank lines yield `Ok(None)`.
    ///
    /// The command word is case-insensitive; keys and values are kept as typed.
    pub fn parse(line: &str) -> Result<Option<Self>, ShellError> {
        let (word, rest) = split_word(line.trim());
        if word.is_empty() {
            return Ok(None);
        }

        let command = match word.to_ascii_lowercase().as_str() {
            "add" => {
                let (key, value) = split_word(rest);
                Command::Add {
                    key: required(key, "add", "a key")?,
                    value: value.to_string(),
                }
            }
            "get" => Command::Get {
                key: required(rest, "get", "a key")?,
            },
            "delete" => Command::Delete {
                key: required(rest, "delete", "a key")?,
            },
            "stats" => Command::Stats,
            "len" => Command::Len,
            "help" => Command::Help,
            "exit" => Command::Exit,
            _ => return Err(ShellError::UnknownCommand(word.to_string())),
        };
        Ok(Some(command))
    }
}

/// What the shell should do after running a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Print the message and read the next line
    Continue(String),
    /// Stop reading input
    Exit,
}

/// Runs `command` against `cache`.
pub fn execute(cache: &ExpiringCache, command: Command) -> Outcome {
    let message = match command {
        Command::Add { key, value } => {
            cache.add(key.as_str(), value.into_bytes());
            format!("stored {key}")
        }
        Command::Get { key } => match cache.get(&key) {
            Some(value) => String::from_utf8_lossy(&value).into_owned(),
            None => "(not found)".to_string(),
        },
        Command::Delete { key } => {
            cache.delete(&key);
            format!("deleted {key}")
        }
        Command::Stats => serde_json::to_string(&cache.stats())
            .unwrap_or_else(|err| format!("failed to encode stats: {err}")),
        Command::Len => cache.len().to_string(),
        Command::Help => HELP.to_string(),
        Command::Exit => return Outcome::Exit,
    };
    Outcome::Continue(message)
}

/// Executes lines from `lines` and writes replies to `out`.
///
/// Returns on `exit`, when the sender side closes, or when `shutdown` is
/// cancelled, whichever comes first.
pub async fn run<W: Write>(
    cache: &ExpiringCache,
    mut lines: mpsc::Receiver<String>,
    shutdown: CancellationToken,
    mut out: W,
) -> std::io::Result<()> {
    loop {
        let line = tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Shell interrupted by shutdown");
                break;
            }
            line = lines.recv() => match line {
                Some(line) => line,
                None => break,
            },
        };

        let command = match Command::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(err) => {
                warn!("Rejected command {:?}", line);
                writeln!(out, "{err}")?;
                continue;
            }
        };

        match execute(cache, command) {
            Outcome::Continue(message) => writeln!(out, "{message}")?,
            Outcome::Exit => break,
        }
    }
    out.flush()
}

fn split_word(input: &str) -> (&str, &str) {
    match input.find(char::is_whitespace) {
        Some(idx) => (&input[..idx], input[idx..].trim_start()),
        None => (input, ""),
    }
}

fn required(
    value: &str,
    command: &'static str,
    argument: &'static str,
) -> Result<String, ShellError> {
    let value = value.trim();
    if value.is_empty() {
        Err(ShellError::MissingArgument { command, argument })
    } else {
        Ok(value.to_string())
    }
}
