//! Work-queue runtime component.
//!
//! The controller owns the pending-file queue, the live and debounced query,
//! and the suggestion status for the file at the head of the queue. It reacts
//! to bus messages on a single task; query runs and renames are delegated to
//! the suggestion and rename services and come back as completion messages.
//! Every query run carries an increasing sequence number and only the
//! completion of the newest run may change the visible status.

use std::collections::{HashSet, VecDeque};
use std::path::PathBuf;
use std::time::Instant;

use log::{debug, info, warn};
use tokio::sync::broadcast::{error::RecvError, Receiver, Sender};

use crate::config::{Config, SkipQuerySource};
use crate::debouncer::Debouncer;
use crate::protocol::{
    Message, QueueItem, QueueMessage, QueueSnapshot, RenameMessage, SearchMessage,
    SuggestionStatus,
};
use crate::rename_formatter::renamed_path;
use crate::rename_service::RenameError;
use crate::suggestion::{Suggestion, SuggestionError};

/// Drives the identify-and-rename workflow for queued files.
pub struct QueueController {
    bus_consumer: Receiver<Message>,
    bus_producer: Sender<Message>,
    queue: VecDeque<QueueItem>,
    live_query: String,
    debounced_query: Debouncer<String>,
    status: SuggestionStatus,
    query_seq: u64,
    last_query: String,
    pending_rename: Option<PathBuf>,
    skip_query_source: SkipQuerySource,
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await,
        None => std::future::pending::<()>().await,
    }
}

impl QueueController {
    /// Creates a new controller bound to one bus receiver/sender pair.
    pub fn new(bus_consumer: Receiver<Message>, bus_producer: Sender<Message>, config: &Config) -> Self {
        Self {
            bus_consumer,
            bus_producer,
            queue: VecDeque::new(),
            live_query: String::new(),
            debounced_query: Debouncer::new(String::new(), config.search.debounce_period()),
            status: SuggestionStatus::Loading,
            query_seq: 0,
            last_query: String::new(),
            pending_rename: None,
            skip_query_source: config.queue.skip_query_source,
        }
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            current: self.queue.front().cloned(),
            remaining: self.queue.len().saturating_sub(1),
            query: self.live_query.clone(),
            status: self.status.clone(),
            rename_pending: self.pending_rename.is_some(),
        }
    }

    fn publish_state(&self) {
        let _ = self
            .bus_producer
            .send(Message::Queue(QueueMessage::StateChanged(self.snapshot())));
    }

    fn start_query_run(&mut self, query: String) {
        self.query_seq = self.query_seq.saturating_add(1);
        self.status = SuggestionStatus::Loading;
        self.last_query = query.clone();
        debug!("Query run {} requested for {:?}", self.query_seq, query);
        let _ = self.bus_producer.send(Message::Search(SearchMessage::RunQuery {
            seq: self.query_seq,
            query,
        }));
    }

    /// Enters the "nothing to search" state and orphans any in-flight run.
    fn rest_without_query(&mut self) {
        self.query_seq = self.query_seq.saturating_add(1);
        self.status = SuggestionStatus::Loading;
    }

    fn search_for(&mut self, query: String) {
        if query.is_empty() {
            self.rest_without_query();
        } else {
            self.start_query_run(query);
        }
    }

    /// Re-keys the query on a new head item and searches immediately.
    fn activate_head(&mut self, query_source: SkipQuerySource) {
        let Some((name, path)) = self
            .queue
            .front()
            .map(|head| (head.name.clone(), head.path.clone()))
        else {
            self.live_query.clear();
            self.debounced_query.reset(String::new());
            self.rest_without_query();
            info!("Queue is empty");
            return;
        };

        let query = match query_source {
            SkipQuerySource::FileName => name,
            SkipQuerySource::LiveQuery => self.live_query.clone(),
        };
        info!("Now identifying {}", path.display());
        self.live_query = query.clone();
        self.debounced_query.reset(query.clone());
        self.search_for(query);
    }

    fn add_files(&mut self, paths: Vec<PathBuf>) {
        let was_empty = self.queue.is_empty();
        let mut known: HashSet<PathBuf> = self.queue.iter().map(|item| item.path.clone()).collect();
        let mut added = 0usize;
        for path in paths {
            if !known.insert(path.clone()) {
                debug!("Skipping already queued file {}", path.display());
                continue;
            }
            self.queue.push_back(QueueItem::from_path(&path));
            added += 1;
        }
        info!("Queued {} files ({} total)", added, self.queue.len());

        if was_empty && !self.queue.is_empty() {
            self.activate_head(SkipQuerySource::FileName);
        }
        self.publish_state();
    }

    fn remove_current(&mut self) {
        if let Some(removed) = self.queue.pop_front() {
            debug!("Removed {} from queue", removed.path.display());
        }
        self.activate_head(self.skip_query_source);
    }

    fn skip(&mut self) {
        if self.queue.is_empty() {
            return;
        }
        if self.pending_rename.is_some() {
            debug!("Ignoring skip while a rename is in flight");
            return;
        }
        self.remove_current();
        self.publish_state();
    }

    fn query_changed(&mut self, text: String, now: Instant) {
        if self.queue.is_empty() {
            debug!("Ignoring query edit with an empty queue");
            return;
        }
        self.live_query = text.clone();
        self.debounced_query.update(text, now);
        self.publish_state();
    }

    /// Searches for the debounced query once it has settled.
    pub fn flush_debounced_query(&mut self, now: Instant) {
        let Some(query) = self.debounced_query.poll(now) else {
            return;
        };
        if self.queue.is_empty() {
            return;
        }
        self.search_for(query);
        self.publish_state();
    }

    fn query_completed(
        &mut self,
        seq: u64,
        query: String,
        outcome: Result<Vec<Suggestion>, SuggestionError>,
    ) {
        if seq != self.query_seq {
            debug!(
                "Discarding stale query run {} for {:?} (latest is {})",
                seq, query, self.query_seq
            );
            return;
        }
        self.status = match outcome {
            Ok(suggestions) => SuggestionStatus::Idle(suggestions),
            Err(error) => {
                warn!("Suggestions for {:?} unavailable: {}", query, error);
                SuggestionStatus::Error(error)
            }
        };
        self.publish_state();
    }

    fn retry(&mut self) {
        if !matches!(self.status, SuggestionStatus::Error(_)) || self.queue.is_empty() {
            debug!("Ignoring retry outside of the error state");
            return;
        }
        let query = self.last_query.clone();
        self.start_query_run(query);
        self.publish_state();
    }

    fn select_suggestion(&mut self, suggestion: Suggestion) {
        if self.pending_rename.is_some() {
            debug!("Ignoring selection while a rename is in flight");
            return;
        }
        let SuggestionStatus::Idle(suggestions) = &self.status else {
            debug!("Ignoring selection without an idle suggestion list");
            return;
        };
        if !suggestions.iter().any(|candidate| candidate.id == suggestion.id) {
            debug!("Ignoring selection of unknown suggestion {}", suggestion.id);
            return;
        }
        let Some(current) = self.queue.front() else {
            return;
        };

        let from = current.path.clone();
        let to = renamed_path(current, &suggestion);
        self.pending_rename = Some(from.clone());
        let _ = self
            .bus_producer
            .send(Message::Rename(RenameMessage::Requested { from, to }));
        self.publish_state();
    }

    fn rename_completed(&mut self, from: PathBuf, to: PathBuf, result: Result<(), RenameError>) {
        if self.pending_rename.as_ref() != Some(&from) {
            debug!("Ignoring unexpected rename completion for {}", from.display());
            return;
        }
        self.pending_rename = None;

        match result {
            Ok(()) => {
                info!("Renamed {} -> {}", from.display(), to.display());
                if self.queue.front().is_some_and(|head| head.path == from) {
                    self.remove_current();
                }
            }
            Err(error) => {
                warn!("Rename of {} failed, selection can be retried: {}", from.display(), error);
            }
        }
        self.publish_state();
    }

    /// Applies one bus message. Returns false when the controller should stop.
    pub fn handle_bus_message(&mut self, message: Message, now: Instant) -> bool {
        match message {
            Message::Queue(QueueMessage::AddFiles(paths)) => self.add_files(paths),
            Message::Queue(QueueMessage::Skip) => self.skip(),
            Message::Queue(QueueMessage::QueryChanged(text)) => self.query_changed(text, now),
            Message::Queue(QueueMessage::SelectSuggestion(suggestion)) => {
                self.select_suggestion(suggestion)
            }
            Message::Queue(QueueMessage::Retry) => self.retry(),
            Message::Queue(QueueMessage::Shutdown) => return false,
            Message::Search(SearchMessage::QueryCompleted {
                seq,
                query,
                outcome,
            }) => self.query_completed(seq, query, outcome),
            Message::Rename(RenameMessage::Completed { from, to, result }) => {
                self.rename_completed(from, to, result)
            }
            _ => {}
        }
        true
    }

    /// Cancels the pending debounce so nothing fires after teardown.
    pub fn teardown(&mut self) {
        self.debounced_query.cancel();
        self.query_seq = self.query_seq.saturating_add(1);
    }

    /// Runs the controller until shutdown or until the bus closes.
    pub async fn run(&mut self) {
        self.publish_state();
        loop {
            let deadline = self.debounced_query.deadline();
            tokio::select! {
                received = self.bus_consumer.recv() => match received {
                    Ok(message) => {
                        if !self.handle_bus_message(message, Instant::now()) {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Queue controller lagged behind the bus by {skipped} messages");
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = sleep_until_deadline(deadline) => self.flush_debounced_query(Instant::now()),
            }
        }
        self.teardown();
        info!("Queue controller stopped");
    }
}
