//! Event-bus protocol shared by all runtime components.
//!
//! This module defines all message payloads exchanged between the queue
//! controller, the suggestion and rename services, and the console shell.

use std::path::{Path, PathBuf};

use crate::rename_service::RenameError;
use crate::suggestion::{Suggestion, SuggestionError};

/// Top-level envelope for all bus traffic.
#[derive(Debug, Clone)]
pub enum Message {
    Queue(QueueMessage),
    Search(SearchMessage),
    Rename(RenameMessage),
}

/// One file waiting to be identified and renamed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueItem {
    /// File name without its extension; also the default search query.
    pub name: String,
    pub extension: String,
    pub path: PathBuf,
}

impl QueueItem {
    pub fn from_path(path: &Path) -> Self {
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_default();
        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_string())
            .unwrap_or_default();
        Self {
            name,
            extension,
            path: path.to_path_buf(),
        }
    }
}

/// Lookup state for the file at the head of the queue.
#[derive(Debug, Clone, PartialEq)]
pub enum SuggestionStatus {
    /// A query run is in flight, or there is nothing to search for.
    Loading,
    /// Candidates for the current debounced query, possibly empty.
    Idle(Vec<Suggestion>),
    /// The last query run failed; no candidates are shown.
    Error(SuggestionError),
}

/// Read-only view of the controller state for presentation layers.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueSnapshot {
    pub current: Option<QueueItem>,
    /// Items queued behind `current`.
    pub remaining: usize,
    pub query: String,
    pub status: SuggestionStatus,
    pub rename_pending: bool,
}

/// Queue-domain commands and notifications.
#[derive(Debug, Clone)]
pub enum QueueMessage {
    AddFiles(Vec<PathBuf>),
    /// Drop the current file without renaming it.
    Skip,
    /// Live (not yet debounced) query text edited by the user.
    QueryChanged(String),
    SelectSuggestion(Suggestion),
    Retry,
    Shutdown,
    StateChanged(QueueSnapshot),
}

/// Query-run requests and their results.
#[derive(Debug, Clone)]
pub enum SearchMessage {
    RunQuery {
        seq: u64,
        query: String,
    },
    QueryCompleted {
        seq: u64,
        query: String,
        outcome: Result<Vec<Suggestion>, SuggestionError>,
    },
}

/// File rename requests and their results.
#[derive(Debug, Clone)]
pub enum RenameMessage {
    Requested {
        from: PathBuf,
        to: PathBuf,
    },
    Completed {
        from: PathBuf,
        to: PathBuf,
        result: Result<(), RenameError>,
    },
}
