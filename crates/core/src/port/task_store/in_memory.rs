// In-memory TaskStore (tests, demos and the `memory` backend)

use super::{ChangeFeed, TableSnapshot, TaskFeed, TaskStore};
use crate::domain::{Task, TaskId};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Task table kept in insertion order behind an async mutex.
///
/// Replacing an existing ID removes the old row and appends the new one,
/// matching `INSERT OR REPLACE` on the SQLite backend.
#[derive(Default)]
pub struct InMemoryTaskStore {
    tasks: Arc<Mutex<Vec<Task>>>,
    feed: ChangeFeed,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `tasks` (no snapshot is published for them)
    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        Self {
            tasks: Arc::new(Mutex::new(tasks)),
            feed: ChangeFeed::default(),
        }
    }

    /// Store whose subscribers buffer at most `capacity` snapshots
    pub fn with_feed_capacity(capacity: usize) -> Self {
        Self {
            tasks: Arc::default(),
            feed: ChangeFeed::new(capacity),
        }
    }

    /// Current table contents
    pub async fn snapshot(&self) -> Vec<Task> {
        self.tasks.lock().await.clone()
    }

    /// Number of open `observe_all` streams
    pub fn subscriber_count(&self) -> usize {
        self.feed.subscriber_count()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn insert_or_replace(&self, task: &Task) -> Result<()> {
        let mut tasks = self.tasks.lock().await;
        tasks.retain(|t| t.id != task.id);
        tasks.push(task.clone());
        self.feed.publish(tasks.clone());
        Ok(())
    }

    async fn insert_if_absent(&self, task: &Task) -> Result<bool> {
        let mut tasks = self.tasks.lock().await;
        if tasks.iter().any(|t| t.id == task.id) {
            return Ok(false);
        }
        tasks.push(task.clone());
        self.feed.publish(tasks.clone());
        Ok(true)
    }

    async fn update(&self, task: &Task) -> Result<bool> {
        let mut tasks = self.tasks.lock().await;
        let Some(slot) = tasks.iter_mut().find(|t| t.id == task.id) else {
            return Ok(false);
        };
        *slot = task.clone();
        self.feed.publish(tasks.clone());
        Ok(true)
    }

    async fn delete_by_id(&self, id: &TaskId) -> Result<bool> {
        let mut tasks = self.tasks.lock().await;
        let before = tasks.len();
        tasks.retain(|t| &t.id != id);
        if tasks.len() == before {
            return Ok(false);
        }
        self.feed.publish(tasks.clone());
        Ok(true)
    }

    async fn find_by_id(&self, id: &TaskId) -> Result<Option<Task>> {
        let tasks = self.tasks.lock().await;
        Ok(tasks.iter().find(|t| &t.id == id).cloned())
    }

    fn observe_all(&self) -> TaskFeed {
        let tasks = Arc::clone(&self.tasks);
        let revisions = self.feed.revision_reader();
        self.feed.subscribe(move || {
            let tasks = Arc::clone(&tasks);
            let revisions = revisions.clone();
            async move {
                let tasks = tasks.lock().await;
                Ok(TableSnapshot {
                    revision: revisions.get(),
                    tasks: tasks.clone(),
                })
            }
        })
    }
}
