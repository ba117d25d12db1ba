// Domain Layer - Pure business logic and entities

pub mod task;
pub mod validation;

// Re-exports
pub use task::{DeletedTask, Task, TaskId};
pub use validation::{FieldError, MAX_DESCRIPTION_CHARS, MAX_TITLE_CHARS};
