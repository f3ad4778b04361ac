//! File rename runtime component.
//!
//! Performs the destructive rename for a chosen suggestion off the controller
//! thread and reports the outcome back on the bus.

use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use tokio::sync::broadcast::{error::RecvError, Receiver, Sender};

use crate::protocol::{Message, RenameMessage};

/// Failure of one rename attempt; the queue is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenameError {
    #[error("target already exists: {}", .0.display())]
    TargetExists(PathBuf),
    #[error("rename failed: {0}")]
    Io(String),
}

/// Filesystem seam used by [`RenameService`].
pub trait FileRenamer: Send {
    fn rename(&self, from: &Path, to: &Path) -> Result<(), RenameError>;
}

/// Renames files on the local filesystem without overwriting existing ones.
pub struct FsRenamer;

impl FileRenamer for FsRenamer {
    fn rename(&self, from: &Path, to: &Path) -> Result<(), RenameError> {
        if from == to {
            return Ok(());
        }
        if to.exists() {
            return Err(RenameError::TargetExists(to.to_path_buf()));
        }
        std::fs::rename(from, to).map_err(|error| {
            RenameError::Io(format!(
                "{} -> {}: {}",
                from.display(),
                to.display(),
                error
            ))
        })
    }
}

/// Services rename requests published by the queue controller.
pub struct RenameService<R: FileRenamer> {
    bus_consumer: Receiver<Message>,
    bus_producer: Sender<Message>,
    renamer: R,
}

impl<R: FileRenamer> RenameService<R> {
    pub fn new(bus_consumer: Receiver<Message>, bus_producer: Sender<Message>, renamer: R) -> Self {
        Self {
            bus_consumer,
            bus_producer,
            renamer,
        }
    }

    fn handle_rename_request(&self, from: PathBuf, to: PathBuf) {
        debug!("Renaming {} -> {}", from.display(), to.display());
        let result = self.renamer.rename(&from, &to);
        match &result {
            Ok(()) => info!("Renamed {} -> {}", from.display(), to.display()),
            Err(error) => warn!("Rename of {} failed: {}", from.display(), error),
        }
        let _ = self
            .bus_producer
            .send(Message::Rename(RenameMessage::Completed { from, to, result }));
    }

    /// Starts the blocking event loop for rename requests.
    pub fn run(&mut self) {
        loop {
            match self.bus_consumer.blocking_recv() {
                Ok(Message::Rename(RenameMessage::Requested { from, to })) => {
                    self.handle_rename_request(from, to);
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Rename service lagged behind the bus by {skipped} messages");
                }
                Err(RecvError::Closed) => break,
            }
        }
    }
}
