// Task Service - the unreliable-operation boundary in front of the store

use crate::domain::{DeletedTask, Task, TaskId};
use crate::error::{Result, TaskError};
use crate::port::{IdProvider, NetworkConditions, TaskFeed, TaskStore, TimeProvider};
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Task mutations as fallible async operations
///
/// Only creation goes through the simulated network; the other
/// operations hit the store directly.
pub struct TaskService {
    store: Arc<dyn TaskStore>,
    network: Arc<dyn NetworkConditions>,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
}

impl TaskService {
    pub fn new(
        store: Arc<dyn TaskStore>,
        network: Arc<dyn NetworkConditions>,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            store,
            network,
            id_provider,
            time_provider,
        }
    }

    /// The store's live sequence, untouched
    pub fn observe_tasks(&self) -> TaskFeed {
        self.store.observe_all()
    }

    /// Create a task through the simulated network.
    ///
    /// Sleeps for the network's latency (a cancellation point), then either
    /// fails with `TaskError::Network` without touching the store, or
    /// commits a fresh incomplete task and returns it.
    ///
    /// `title` and `description` are expected to be validated already.
    pub async fn add_task(&self, title: &str, description: &str) -> Result<Task> {
        let latency = self.network.latency();
        debug!(
            latency_ms = latency.as_millis() as u64,
            "Simulating network round trip"
        );
        sleep(latency).await;

        if !self.network.should_succeed() {
            warn!(
                latency_ms = latency.as_millis() as u64,
                "Simulated network failure, task not created"
            );
            return Err(TaskError::Network(
                "request failed before reaching the server".to_string(),
            ));
        }

        let task = Task::new(
            self.id_provider.generate_id(),
            title,
            description,
            self.time_provider.now_millis(),
        );
        self.store.insert_or_replace(&task).await?;

        info!(task_id = %task.id, "Task created");
        Ok(task)
    }

    /// Flip `is_completed`, leaving every other field unchanged
    pub async fn toggle_completed(&self, id: &TaskId) -> Result<Task> {
        let task = self
            .store
            .find_by_id(id)
            .await?
            .ok_or_else(|| TaskError::NotFound(id.clone()))?;

        let toggled = task.toggled();
        if !self.store.update(&toggled).await? {
            // Deleted between the read and the write
            return Err(TaskError::NotFound(id.clone()));
        }

        info!(
            task_id = %id,
            is_completed = toggled.is_completed,
            "Task completion toggled"
        );
        Ok(toggled)
    }

    /// Delete by ID; false when no such row existed (not an error)
    pub async fn delete_task(&self, id: &TaskId) -> Result<bool> {
        let removed = self.store.delete_by_id(id).await?;
        info!(task_id = %id, removed, "Task deleted");
        Ok(removed)
    }

    /// Put a deleted task back exactly as it was (ID and `created_at`
    /// included). No-op if a task with that ID exists.
    ///
    /// Takes a `DeletedTask` rather than a `Task`: this bypasses validation
    /// and ID generation, so it is only reachable from the undo flow.
    pub async fn restore_task(&self, deleted: &DeletedTask) -> Result<()> {
        let task = deleted.task();
        let inserted = self.store.insert_if_absent(task).await?;
        info!(task_id = %task.id, inserted, "Task restored");
        Ok(())
    }
}
