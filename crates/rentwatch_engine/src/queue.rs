use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rentwatch_core::DiscoveryEvent;
use rentwatch_logging::{watch_debug, watch_warn};
use sha2::{Digest, Sha256};

use crate::persist::{ensure_state_dir, AtomicFileWriter, PersistError};

const PENDING_DIR: &str = "pending";
const IN_FLIGHT_DIR: &str = "in-flight";
const MESSAGE_EXT: &str = ".json";

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),
    #[error(transparent)]
    Persist(#[from] PersistError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Producer side of the discovery → enrichment queue.
#[async_trait::async_trait]
pub trait EventQueue: Send + Sync {
    async fn send(&self, event: &DiscoveryEvent) -> Result<(), QueueError>;
}

/// A message taken off the queue. It stays in the in-flight area until acked.
#[derive(Debug)]
pub struct ClaimedEvent {
    pub event: DiscoveryEvent,
    path: PathBuf,
}

/// Directory-backed queue with at-least-once delivery.
///
/// Messages are JSON files in `pending/`. Claiming renames a file into
/// `in-flight/`; acking deletes it. Anything still in flight when a worker
/// starts is moved back to `pending/` and delivered again.
pub struct SpoolQueue {
    pending: AtomicFileWriter,
    in_flight: PathBuf,
}

impl SpoolQueue {
    pub fn open(root: &Path) -> Result<Self, QueueError> {
        let pending = root.join(PENDING_DIR);
        let in_flight = root.join(IN_FLIGHT_DIR);
        ensure_state_dir(&pending)?;
        ensure_state_dir(&in_flight)?;
        Ok(Self {
            pending: AtomicFileWriter::new(pending),
            in_flight,
        })
    }

    /// Message file name: a short hash of `(search, listing)`. Re-sending an
    /// event that is still pending overwrites it instead of queueing a copy.
    pub fn message_name(event: &DiscoveryEvent) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!("{}:{}", event.search_id, event.listing.listing_id).as_bytes());
        let digest = hasher.finalize();
        let mut name = String::with_capacity(16 + MESSAGE_EXT.len());
        for byte in digest.iter().take(8) {
            use std::fmt::Write;
            let _ = write!(&mut name, "{byte:02x}");
        }
        name.push_str(MESSAGE_EXT);
        name
    }

    pub fn pending_len(&self) -> Result<usize, QueueError> {
        Ok(message_names(self.pending.dir())?.len())
    }

    /// Takes the next pending message, if any. Undecodable messages are logged
    /// and discarded.
    pub fn claim(&self) -> Result<Option<ClaimedEvent>, QueueError> {
        for name in message_names(self.pending.dir())? {
            let from = self.pending.dir().join(&name);
            let to = self.in_flight.join(&name);
            match fs::rename(&from, &to) {
                Ok(()) => {}
                // Claimed by another worker in the meantime.
                Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
                Err(err) => return Err(err.into()),
            }

            let raw = fs::read(&to)?;
            match serde_json::from_slice::<DiscoveryEvent>(&raw) {
                Ok(event) => return Ok(Some(ClaimedEvent { event, path: to })),
                Err(err) => {
                    watch_warn!("Discarding malformed queue message {}: {}", name, err);
                    fs::remove_file(&to)?;
                }
            }
        }
        Ok(None)
    }

    /// Marks a claimed message as processed.
    pub fn ack(&self, claimed: ClaimedEvent) -> Result<(), QueueError> {
        match fs::remove_file(&claimed.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Returns every in-flight message to pending. Call before a worker starts.
    pub fn recover_in_flight(&self) -> Result<usize, QueueError> {
        let mut recovered = 0;
        for name in message_names(&self.in_flight)? {
            fs::rename(self.in_flight.join(&name), self.pending.dir().join(&name))?;
            recovered += 1;
        }
        if recovered > 0 {
            watch_debug!("Returned {} in-flight messages to the queue", recovered);
        }
        Ok(recovered)
    }
}

#[async_trait::async_trait]
impl EventQueue for SpoolQueue {
    async fn send(&self, event: &DiscoveryEvent) -> Result<(), QueueError> {
        let body = serde_json::to_vec(event)?;
        self.pending.write(&Self::message_name(event), &body)?;
        Ok(())
    }
}

fn message_names(dir: &Path) -> Result<Vec<String>, QueueError> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if let Some(name) = entry.file_name().to_str() {
            if name.ends_with(MESSAGE_EXT) && !name.starts_with('.') {
                names.push(name.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}
