// SQLite TaskStore Implementation

use crate::error::map_sqlx_error;
use async_trait::async_trait;
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::sync::Arc;
use taskpad_core::domain::{Task, TaskId};
use taskpad_core::error::{Result, TaskError};
use taskpad_core::port::{ChangeFeed, TableSnapshot, TaskFeed, TaskStore};
use tokio::sync::Mutex;
use tracing::debug;

const SELECT_ALL: &str =
    "SELECT id, title, description, is_completed, created_at FROM tasks ORDER BY rowid";

/// SQLite-backed task table with a live change feed
///
/// Writes are serialized through `write_lock` and publish the committed
/// table before releasing it; feed loads take the same lock, so every
/// subscriber sees writes in commit order. Each write runs on its own
/// tokio task, so dropping the caller never separates a commit from its
/// publish.
pub struct SqliteTaskStore {
    pool: SqlitePool,
    write_lock: Arc<Mutex<()>>,
    feed: ChangeFeed,
}

/// One row-level write
enum Write {
    Replace(Task),
    InsertIfAbsent(Task),
    Update(Task),
    Delete(TaskId),
}

impl Write {
    fn name(&self) -> &'static str {
        match self {
            Write::Replace(_) => "insert_or_replace",
            Write::InsertIfAbsent(_) => "insert_if_absent",
            Write::Update(_) => "update",
            Write::Delete(_) => "delete_by_id",
        }
    }

    /// Run inside `tx`; true when a row changed
    async fn execute(&self, tx: &mut Transaction<'_, Sqlite>) -> Result<bool> {
        let query = match self {
            Write::Replace(task) => sqlx::query(
                r#"
                INSERT OR REPLACE INTO tasks (id, title, description, is_completed, created_at)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(&task.id)
            .bind(&task.title)
            .bind(&task.description)
            .bind(if task.is_completed { 1 } else { 0 })
            .bind(task.created_at),
            Write::InsertIfAbsent(task) => sqlx::query(
                r#"
                INSERT OR IGNORE INTO tasks (id, title, description, is_completed, created_at)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(&task.id)
            .bind(&task.title)
            .bind(&task.description)
            .bind(if task.is_completed { 1 } else { 0 })
            .bind(task.created_at),
            Write::Update(task) => sqlx::query(
                r#"
                UPDATE tasks
                SET title = ?, description = ?, is_completed = ?, created_at = ?
                WHERE id = ?
                "#,
            )
            .bind(&task.title)
            .bind(&task.description)
            .bind(if task.is_completed { 1 } else { 0 })
            .bind(task.created_at)
            .bind(&task.id),
            Write::Delete(id) => sqlx::query("DELETE FROM tasks WHERE id = ?").bind(id),
        };

        let result = query.execute(&mut **tx).await.map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }
}

impl SqliteTaskStore {
    /// Expects a pool on which `run_migrations` has completed
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            write_lock: Arc::new(Mutex::new(())),
            feed: ChangeFeed::default(),
        }
    }

    /// Number of live `observe_all` streams
    pub fn subscriber_count(&self) -> usize {
        self.feed.subscriber_count()
    }

    /// Apply `write` on a detached task and wait for its outcome
    async fn write(&self, write: Write) -> Result<bool> {
        let pool = self.pool.clone();
        let write_lock = Arc::clone(&self.write_lock);
        let feed = self.feed.clone();
        let name = write.name();

        let handle = tokio::spawn(async move {
            let _guard = write_lock.lock().await;
            let mut tx = pool.begin().await.map_err(map_sqlx_error)?;
            let changed = write.execute(&mut tx).await?;
            commit_and_publish(tx, &feed, changed).await?;
            Ok::<_, TaskError>(changed)
        });

        handle
            .await
            .map_err(|e| TaskError::Storage(format!("{} task failed: {}", name, e)))?
    }
}

/// Commit `tx`; if the statement changed the table, publish its new
/// contents (read inside the same transaction)
async fn commit_and_publish(
    mut tx: Transaction<'_, Sqlite>,
    feed: &ChangeFeed,
    changed: bool,
) -> Result<()> {
    if !changed {
        tx.commit().await.map_err(map_sqlx_error)?;
        return Ok(());
    }

    let tasks = fetch_tasks(&mut *tx).await?;
    tx.commit().await.map_err(map_sqlx_error)?;
    let revision = feed.publish(tasks);
    debug!(revision, "Task table changed");
    Ok(())
}

async fn fetch_tasks(conn: &mut sqlx::SqliteConnection) -> Result<Vec<Task>> {
    let rows: Vec<TaskRow> = sqlx::query_as(SELECT_ALL)
        .fetch_all(conn)
        .await
        .map_err(map_sqlx_error)?;
    Ok(rows.into_iter().map(TaskRow::into_task).collect())
}

#[async_trait]
impl TaskStore for SqliteTaskStore {
    async fn insert_or_replace(&self, task: &Task) -> Result<()> {
        self.write(Write::Replace(task.clone())).await?;
        Ok(())
    }

    async fn insert_if_absent(&self, task: &Task) -> Result<bool> {
        self.write(Write::InsertIfAbsent(task.clone())).await
    }

    async fn update(&self, task: &Task) -> Result<bool> {
        self.write(Write::Update(task.clone())).await
    }

    async fn delete_by_id(&self, id: &TaskId) -> Result<bool> {
        self.write(Write::Delete(id.clone())).await
    }

    async fn find_by_id(&self, id: &TaskId) -> Result<Option<Task>> {
        let row = sqlx::query_as::<_, TaskRow>(
            "SELECT id, title, description, is_completed, created_at FROM tasks WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(TaskRow::into_task))
    }

    fn observe_all(&self) -> TaskFeed {
        let pool = self.pool.clone();
        let write_lock = Arc::clone(&self.write_lock);
        let revisions = self.feed.revision_reader();

        self.feed.subscribe(move || {
            let pool = pool.clone();
            let write_lock = Arc::clone(&write_lock);
            let revisions = revisions.clone();
            async move {
                let _guard = write_lock.lock().await;
                let mut conn = pool.acquire().await.map_err(map_sqlx_error)?;
                let tasks = fetch_tasks(&mut *conn).await?;
                Ok(TableSnapshot {
                    revision: revisions.get(),
                    tasks,
                })
            }
        })
    }
}

/// SQLite row representation
#[derive(Debug, sqlx::FromRow)]
struct TaskRow {
    id: String,
    title: String,
    description: String,
    is_completed: i32, // SQLite boolean as integer
    created_at: i64,
}

impl TaskRow {
    fn into_task(self) -> Task {
        Task {
            id: self.id,
            title: self.title,
            description: self.description,
            is_completed: self.is_completed != 0,
            created_at: self.created_at,
        }
    }
}
