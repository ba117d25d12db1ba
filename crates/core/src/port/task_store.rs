// Task Store Port (Interface) + live change feed

use crate::domain::{Task, TaskId};
use crate::error::Result;
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

pub mod in_memory;

pub use in_memory::InMemoryTaskStore;

/// Live sequence of full task collections (insertion order).
///
/// The first item is the table as it is when the stream is first polled;
/// every committed write is followed by one more item. An `Err` item ends
/// the stream.
pub type TaskFeed = BoxStream<'static, Result<Vec<Task>>>;

/// Snapshots buffered per subscriber before it has to resynchronise
pub const DEFAULT_FEED_CAPACITY: usize = 64;

/// Repository interface for Task persistence
///
/// Every operation is atomic with respect to the table. Writes that change
/// the table must publish a snapshot to subscribers of `observe_all`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Insert a task, replacing any row with the same ID
    async fn insert_or_replace(&self, task: &Task) -> Result<()>;

    /// Insert a task only if no row has its ID. Returns true if inserted.
    async fn insert_if_absent(&self, task: &Task) -> Result<bool>;

    /// Overwrite an existing row. Returns false if the ID is absent.
    async fn update(&self, task: &Task) -> Result<bool>;

    /// Delete by ID. Returns false if nothing was deleted.
    async fn delete_by_id(&self, id: &TaskId) -> Result<bool>;

    /// Find task by ID
    async fn find_by_id(&self, id: &TaskId) -> Result<Option<Task>>;

    /// Subscribe to the full table contents
    fn observe_all(&self) -> TaskFeed;
}

/// Table contents tagged with the number of writes committed so far
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSnapshot {
    pub revision: u64,
    pub tasks: Vec<Task>,
}

/// Fan-out of committed table snapshots to live subscribers.
///
/// Stores call `publish` while still holding their write lock and read
/// `revision` under the same lock when loading, so a subscriber can drop
/// anything older than what it already delivered.
#[derive(Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<Arc<TableSnapshot>>,
    revision: Arc<AtomicU64>,
}

/// Read-only view of a feed's revision counter, for use inside loaders
/// (holding one does not keep the feed open)
#[derive(Clone)]
pub struct RevisionReader(Arc<AtomicU64>);

impl RevisionReader {
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(DEFAULT_FEED_CAPACITY)
    }
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            revision: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Revision of the last published write
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::SeqCst)
    }

    pub fn revision_reader(&self) -> RevisionReader {
        RevisionReader(Arc::clone(&self.revision))
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Publish the table contents after a committed write
    pub fn publish(&self, tasks: Vec<Task>) -> u64 {
        let revision = self.revision.fetch_add(1, Ordering::SeqCst) + 1;
        let receivers = self
            .tx
            .send(Arc::new(TableSnapshot { revision, tasks }))
            .unwrap_or(0);
        debug!(revision, receivers, "Published task table snapshot");
        revision
    }

    /// Build a feed that starts with `load()` and then follows published writes.
    ///
    /// `load` must read the table and `revision()` atomically with respect
    /// to writes. It is called again whenever the subscriber lags behind the
    /// broadcast buffer, so a slow subscriber skips straight to the latest
    /// state instead of seeing old snapshots.
    pub fn subscribe<F, Fut>(&self, load: F) -> TaskFeed
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<TableSnapshot>> + Send + 'static,
    {
        let subscription = Subscription {
            rx: self.tx.subscribe(),
            load,
            delivered: None,
            done: false,
        };

        stream::unfold(subscription, |mut sub| async move {
            if sub.done {
                return None;
            }

            loop {
                let fetched = match sub.delivered {
                    None => Fetch::Reload,
                    Some(_) => match sub.rx.recv().await {
                        Ok(snapshot) => Fetch::Published(snapshot),
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "Task feed subscriber lagged, reloading table");
                            sub.rx = sub.rx.resubscribe();
                            Fetch::Reload
                        }
                        Err(RecvError::Closed) => return None,
                    },
                };

                let snapshot = match fetched {
                    Fetch::Published(snapshot) => TableSnapshot::clone(&snapshot),
                    Fetch::Reload => match (sub.load)().await {
                        Ok(snapshot) => snapshot,
                        Err(e) => {
                            sub.done = true;
                            return Some((Err(e), sub));
                        }
                    },
                };

                let is_newer = sub.delivered.map_or(true, |last| snapshot.revision > last);
                if is_newer {
                    sub.delivered = Some(snapshot.revision);
                    return Some((Ok(snapshot.tasks), sub));
                }
            }
        })
        .boxed()
    }
}

struct Subscription<F> {
    rx: broadcast::Receiver<Arc<TableSnapshot>>,
    load: F,
    delivered: Option<u64>,
    done: bool,
}

enum Fetch {
    Published(Arc<TableSnapshot>),
    Reload,
}
