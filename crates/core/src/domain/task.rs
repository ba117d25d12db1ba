// Task Domain Model

/// Task ID (UUID v4 in production)
pub type TaskId = String;

/// Task Entity
///
/// `id` and `created_at` are assigned once at creation and never change.
/// `title` and `description` are validated only when a task is submitted;
/// existing rows are never re-validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: String,
    pub is_completed: bool,
    pub created_at: i64, // epoch ms
}

impl Task {
    /// Create a new, incomplete task
    ///
    /// # Arguments
    ///
    /// * `id` - Unique task ID (injected, not generated)
    /// * `title` - Already trimmed and validated title
    /// * `description` - Already trimmed and validated description
    /// * `created_at` - Creation timestamp in epoch ms (injected, not system time)
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        created_at: i64,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: description.into(),
            is_completed: false,
            created_at,
        }
    }

    /// Copy of this task with `is_completed` inverted
    pub fn toggled(&self) -> Self {
        Self {
            is_completed: !self.is_completed,
            ..self.clone()
        }
    }

    /// Create a test task with deterministic ID and timestamp.
    ///
    /// Uses a simple counter for IDs (test-1, test-2, ...).
    /// Timestamps start at 1000 and increment by 1000.
    ///
    /// **Note**: This method should only be used in tests. Production code
    /// goes through `TaskService::add_task`, which injects ID and time.
    pub fn new_test(title: impl Into<String>) -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static TEST_COUNTER: AtomicU64 = AtomicU64::new(1);

        let counter = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
        let title = title.into();
        let description = format!("{} (details)", title);

        Self::new(
            format!("test-{}", counter),
            title,
            description,
            (counter * 1000) as i64,
        )
    }
}

/// Snapshot of a task captured at the moment it was deleted.
///
/// Only the core crate can capture one, which keeps the privileged
/// restore path (`TaskService::restore_task`) tied to the undo flow:
/// outside callers cannot feed arbitrary tasks through it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletedTask(Task);

impl DeletedTask {
    pub(crate) fn capture(task: Task) -> Self {
        Self(task)
    }

    pub fn task(&self) -> &Task {
        &self.0
    }

    pub fn into_task(self) -> Task {
        self.0
    }
}
