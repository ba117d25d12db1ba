// Taskpad Infrastructure - SQLite Adapter
// Implements: TaskStore

mod connection;
mod error;
mod migration;
mod task_store;

pub use connection::{create_pool, database_url};
pub use migration::{current_version, run_migrations};
pub use task_store::SqliteTaskStore;
