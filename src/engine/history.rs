//! Per-image generation history
//!
//! Each uploaded image (identified by name and byte size) owns a bucket of
//! prior outputs, most recent first, capped at `capacity` entries.

use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::domain::ImageIdentity;
use crate::storage::KeyValueStore;

pub const DEFAULT_HISTORY_CAPACITY: usize = 10;

/// Capped, most-recent-first history buckets over a key-value store
#[derive(Clone)]
pub struct HistoryStore {
    store: Arc<dyn KeyValueStore>,
    namespace: String,
    capacity: usize,
}

impl HistoryStore {
    pub fn new(store: Arc<dyn KeyValueStore>, namespace: impl Into<String>, capacity: usize) -> Self {
        HistoryStore {
            store,
            namespace: namespace.into(),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn key_for(&self, identity: &ImageIdentity) -> String {
        identity.history_key(&self.namespace)
    }

    /// Load a bucket; missing or corrupt data yields an empty history
    pub fn load(&self, identity: &ImageIdentity) -> Vec<String> {
        let key = self.key_for(identity);
        let Some(raw) = self.store.get(&key) else {
            return Vec::new();
        };

        match serde_json::from_str::<Vec<String>>(&raw) {
            Ok(mut entries) => {
                entries.truncate(self.capacity);
                entries
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to parse stored history, using empty history");
                Vec::new()
            }
        }
    }

    /// Prepend an entry, evict beyond capacity and persist
    pub fn record(&self, identity: &ImageIdentity, entry: String) -> Vec<String> {
        let mut entries = self.load(identity);
        entries.insert(0, entry);
        entries.truncate(self.capacity);

        let key = self.key_for(identity);
        match serde_json::to_string(&entries) {
            Ok(serialized) => {
                if let Err(e) = self.store.set(&key, serialized) {
                    warn!(key = %key, error = %e, "Failed to persist history");
                }
            }
            Err(e) => warn!(key = %key, error = %e, "Failed to serialize history"),
        }

        debug!(key = %key, entries = entries.len(), "Recorded history entry");
        entries
    }

    pub fn clear(&self, identity: &ImageIdentity) {
        let key = self.key_for(identity);
        if let Err(e) = self.store.remove(&key) {
            warn!(key = %key, error = %e, "Failed to clear history");
        }
    }
}

enum HistoryAction {
    Load,
    Record(String),
    Clear,
}

struct HistoryOp {
    identity: ImageIdentity,
    action: HistoryAction,
    reply: oneshot::Sender<Vec<String>>,
}

/// Resolves with the bucket contents once the queued operation has run
pub struct HistoryTicket(oneshot::Receiver<Vec<String>>);

impl HistoryTicket {
    pub async fn wait(self) -> Vec<String> {
        self.0.await.unwrap_or_default()
    }
}

/// Applies history operations one at a time, in submission order
///
/// Submitting never blocks, so callers can enqueue while holding a lock and
/// await the ticket after releasing it. Store I/O runs on the blocking pool.
#[derive(Clone)]
pub struct HistoryQueue {
    tx: mpsc::UnboundedSender<HistoryOp>,
    capacity: usize,
}

impl HistoryQueue {
    /// Start the writer task; must be called inside a Tokio runtime
    pub fn spawn(history: HistoryStore) -> Self {
        let capacity = history.capacity();
        let (tx, mut rx) = mpsc::unbounded_channel::<HistoryOp>();

        tokio::spawn(async move {
            while let Some(op) = rx.recv().await {
                let history = history.clone();
                let HistoryOp { identity, action, reply } = op;
                let applied = tokio::task::spawn_blocking(move || match action {
                    HistoryAction::Load => history.load(&identity),
                    HistoryAction::Record(entry) => history.record(&identity, entry),
                    HistoryAction::Clear => {
                        history.clear(&identity);
                        Vec::new()
                    }
                })
                .await;

                match applied {
                    // the submitter may not be waiting
                    Ok(entries) => {
                        let _ = reply.send(entries);
                    }
                    Err(e) => warn!(error = %e, "History operation panicked"),
                }
            }
            debug!("History queue closed");
        });

        HistoryQueue { tx, capacity }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn load(&self, identity: ImageIdentity) -> HistoryTicket {
        self.submit(identity, HistoryAction::Load)
    }

    pub fn record(&self, identity: ImageIdentity, entry: String) -> HistoryTicket {
        self.submit(identity, HistoryAction::Record(entry))
    }

    pub fn clear(&self, identity: ImageIdentity) -> HistoryTicket {
        self.submit(identity, HistoryAction::Clear)
    }

    fn submit(&self, identity: ImageIdentity, action: HistoryAction) -> HistoryTicket {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(HistoryOp { identity, action, reply }).is_err() {
            warn!("History queue is closed, operation dropped");
        }
        HistoryTicket(rx)
    }
}
