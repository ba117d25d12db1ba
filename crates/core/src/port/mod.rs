// Port Layer - Interfaces for external dependencies

pub mod id_provider; // For deterministic testing
pub mod network; // Simulated unreliable remote calls
pub mod task_store;
pub mod time_provider;

// Re-exports
pub use id_provider::IdProvider;
pub use network::{NetworkConditions, NetworkProfile, RandomNetwork};
pub use task_store::{ChangeFeed, InMemoryTaskStore, RevisionReader, TableSnapshot, TaskFeed, TaskStore};
pub use time_provider::TimeProvider;
