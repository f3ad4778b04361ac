//! Line-oriented console front end.
//!
//! Stdin lines become bus commands; published queue snapshots are rendered to
//! stdout. The shell keeps only the latest snapshot so `:select N` can resolve
//! a row number to the suggestion the user is looking at.

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use log::{debug, warn};
use tokio::sync::broadcast::{error::RecvError, Sender};

use crate::media_file_discovery::collect_audio_files_from_paths;
use crate::protocol::{Message, QueueMessage, QueueSnapshot, RenameMessage, SuggestionStatus};
use crate::suggestion::Suggestion;

const HELP_TEXT: &str = "Commands: <text> search for text | :select N | :skip | :retry | :clear | :add PATH... | :help | :quit";

/// One parsed line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Query(String),
    Select(usize),
    Skip,
    Retry,
    Add(Vec<PathBuf>),
    Help,
    Quit,
}

/// Parses one input line. Returns `Ok(None)` for blank lines.
pub fn parse_shell_command(line: &str) -> Result<Option<ShellCommand>, String> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return Ok(None);
    }
    let Some(command) = line.trim_start().strip_prefix(':') else {
        return Ok(Some(ShellCommand::Query(line.trim().to_string())));
    };

    let mut parts = command.split_whitespace();
    let name = parts.next().unwrap_or_default();
    let command = match name {
        "select" | "s" => {
            let index = parts
                .next()
                .ok_or_else(|| "usage: :select N".to_string())?
                .parse::<usize>()
                .map_err(|err| format!("invalid suggestion number: {err}"))?;
            if index == 0 {
                return Err("suggestions are numbered from 1".to_string());
            }
            ShellCommand::Select(index)
        }
        "skip" => ShellCommand::Skip,
        "retry" | "r" => ShellCommand::Retry,
        "clear" => ShellCommand::Query(String::new()),
        "add" => {
            let paths: Vec<PathBuf> = parts.map(PathBuf::from).collect();
            if paths.is_empty() {
                return Err("usage: :add PATH...".to_string());
            }
            ShellCommand::Add(paths)
        }
        "help" | "h" => ShellCommand::Help,
        "quit" | "q" => ShellCommand::Quit,
        other => return Err(format!("unknown command :{other}")),
    };
    Ok(Some(command))
}

fn render_suggestion(index: usize, suggestion: &Suggestion) -> String {
    format!(
        "  {:>2}. {} - {}  [bpm {} | camelot {} | key {}]",
        index + 1,
        suggestion.artist,
        suggestion.title,
        suggestion.bpm,
        suggestion.camelot,
        suggestion.key
    )
}

/// Renders a snapshot as the text block shown after each state change.
pub fn render_snapshot(snapshot: &QueueSnapshot) -> String {
    let Some(current) = snapshot.current.as_ref() else {
        return "Queue is empty. Add files with :add PATH... or :quit".to_string();
    };

    let mut lines = vec![
        format!(
            "File: {} ({} more queued)",
            current
                .path
                .file_name()
                .map(|name| name.to_string_lossy())
                .unwrap_or_default(),
            snapshot.remaining
        ),
        format!("Query: {}", snapshot.query),
    ];
    if snapshot.rename_pending {
        lines.push("Renaming...".to_string());
    }
    match &snapshot.status {
        SuggestionStatus::Loading => lines.push("Loading...".to_string()),
        SuggestionStatus::Error(error) => {
            lines.push(format!("Error while loading suggestions: {error}"));
            lines.push("Type :retry to search again".to_string());
        }
        SuggestionStatus::Idle(suggestions) if suggestions.is_empty() => {
            lines.push("No suggestions. Edit the query or :skip".to_string());
        }
        SuggestionStatus::Idle(suggestions) => {
            lines.extend(
                suggestions
                    .iter()
                    .enumerate()
                    .map(|(index, suggestion)| render_suggestion(index, suggestion)),
            );
        }
    }
    lines.join("\n")
}

/// Resolves a 1-based row number against the rendered suggestion list.
fn suggestion_at(snapshot: Option<&QueueSnapshot>, index: usize) -> Option<Suggestion> {
    let SuggestionStatus::Idle(suggestions) = &snapshot?.status else {
        return None;
    };
    suggestions.get(index.checked_sub(1)?).cloned()
}

/// Prints published snapshots and rename failures until the bus closes.
pub fn spawn_renderer(
    bus_sender: &Sender<Message>,
    latest_snapshot: Arc<Mutex<Option<QueueSnapshot>>>,
) -> JoinHandle<()> {
    let mut bus_consumer = bus_sender.subscribe();
    thread::spawn(move || loop {
        match bus_consumer.blocking_recv() {
            Ok(Message::Queue(QueueMessage::StateChanged(snapshot))) => {
                println!("\n{}", render_snapshot(&snapshot));
                if let Ok(mut latest) = latest_snapshot.lock() {
                    *latest = Some(snapshot);
                }
            }
            Ok(Message::Rename(RenameMessage::Completed {
                result: Err(error), ..
            })) => {
                println!("Rename failed: {error}. Select again to retry.");
            }
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => {
                debug!("Renderer skipped {skipped} bus messages");
            }
            Err(RecvError::Closed) => break,
        }
    })
}

fn command_to_message(
    command: ShellCommand,
    latest_snapshot: &Mutex<Option<QueueSnapshot>>,
) -> Option<Message> {
    match command {
        ShellCommand::Query(text) => Some(Message::Queue(QueueMessage::QueryChanged(text))),
        ShellCommand::Skip => Some(Message::Queue(QueueMessage::Skip)),
        ShellCommand::Retry => Some(Message::Queue(QueueMessage::Retry)),
        ShellCommand::Quit => Some(Message::Queue(QueueMessage::Shutdown)),
        ShellCommand::Help => {
            println!("{HELP_TEXT}");
            None
        }
        ShellCommand::Add(paths) => {
            let files = collect_audio_files_from_paths(&paths);
            if files.is_empty() {
                println!("No audio files found");
                return None;
            }
            Some(Message::Queue(QueueMessage::AddFiles(files)))
        }
        ShellCommand::Select(index) => {
            let selected = latest_snapshot
                .lock()
                .ok()
                .and_then(|snapshot| suggestion_at(snapshot.as_ref(), index));
            match selected {
                Some(suggestion) => {
                    Some(Message::Queue(QueueMessage::SelectSuggestion(suggestion)))
                }
                None => {
                    println!("No suggestion #{index} to select");
                    None
                }
            }
        }
    }
}

/// Reads commands from stdin until `:quit` or end of input.
pub fn run_stdin_commands(
    bus_sender: &Sender<Message>,
    latest_snapshot: &Mutex<Option<QueueSnapshot>>,
) {
    println!("{HELP_TEXT}");
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                warn!("Failed to read from stdin: {err}");
                break;
            }
        };
        let command = match parse_shell_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(message) => {
                println!("{message}");
                continue;
            }
        };
        let is_quit = command == ShellCommand::Quit;
        if let Some(message) = command_to_message(command, latest_snapshot) {
            let _ = bus_sender.send(message);
        }
        if is_quit {
            return;
        }
    }
    let _ = bus_sender.send(Message::Queue(QueueMessage::Shutdown));
}
