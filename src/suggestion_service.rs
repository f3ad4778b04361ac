//! Suggestion lookup runtime component.
//!
//! This service turns query-run requests into validated suggestion lists:
//! fetch the search page, extract the embedded payload, validate the batch and
//! project it. Results are tagged with the request sequence so the controller
//! can drop stale completions.

use log::{debug, error, info, warn};
use tokio::sync::broadcast::{
    error::{RecvError, TryRecvError},
    Receiver, Sender,
};

use crate::protocol::{Message, SearchMessage};
use crate::scrape_parser::parse_search_page;
use crate::scrape_transport::ScrapeTransport;
use crate::suggestion::{suggestions_from_items, Suggestion, SuggestionError};

/// Runs one query through transport, parser and validator.
pub fn run_query<T: ScrapeTransport + ?Sized>(
    transport: &T,
    query: &str,
) -> Result<Vec<Suggestion>, SuggestionError> {
    let body = transport
        .fetch_page(query)
        .map_err(SuggestionError::TransportFailure)?;
    let items = parse_search_page(&body)?;
    suggestions_from_items(&items)
}

/// Fetches suggestions for the newest pending query-run request.
pub struct SuggestionService<T: ScrapeTransport> {
    bus_consumer: Receiver<Message>,
    bus_producer: Sender<Message>,
    transport: T,
    pending: Option<(u64, String)>,
}

impl<T: ScrapeTransport> SuggestionService<T> {
    pub fn new(bus_consumer: Receiver<Message>, bus_producer: Sender<Message>, transport: T) -> Self {
        Self {
            bus_consumer,
            bus_producer,
            transport,
            pending: None,
        }
    }

    fn handle_bus_message(&mut self, message: Message) {
        if let Message::Search(SearchMessage::RunQuery { seq, query }) = message {
            if let Some((superseded, _)) = self.pending.replace((seq, query)) {
                debug!("Query run {superseded} superseded by {seq} before it started");
            }
        }
    }

    /// Returns false once the bus is closed.
    fn drain_bus_messages_nonblocking(&mut self) -> bool {
        loop {
            match self.bus_consumer.try_recv() {
                Ok(message) => self.handle_bus_message(message),
                Err(TryRecvError::Empty) => return true,
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!("Suggestion service lagged behind the bus by {skipped} messages");
                }
                Err(TryRecvError::Closed) => return false,
            }
        }
    }

    fn handle_query_run(&self, seq: u64, query: String) {
        debug!("Query run {seq} started for {query:?}");
        let outcome = run_query(&self.transport, &query);
        match &outcome {
            Ok(suggestions) => info!(
                "Query run {seq} for {query:?} returned {} suggestions",
                suggestions.len()
            ),
            Err(SuggestionError::TransportFailure(cause)) => {
                warn!("Query run {seq} for {query:?} failed: {cause}");
            }
            Err(cause) => error!("Query run {seq} for {query:?} failed: {cause}"),
        }
        let _ = self
            .bus_producer
            .send(Message::Search(SearchMessage::QueryCompleted {
                seq,
                query,
                outcome,
            }));
    }

    /// Starts the blocking event loop for query-run requests.
    pub fn run(&mut self) {
        loop {
            if !self.drain_bus_messages_nonblocking() {
                return;
            }

            if let Some((seq, query)) = self.pending.take() {
                self.handle_query_run(seq, query);
                continue;
            }

            match self.bus_consumer.blocking_recv() {
                Ok(message) => self.handle_bus_message(message),
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Suggestion service lagged behind the bus by {skipped} messages");
                }
                Err(RecvError::Closed) => break,
            }
        }
    }
}
