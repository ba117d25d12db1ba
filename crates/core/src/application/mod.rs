// Application Layer - Use Cases and Business Logic

pub mod constants;
pub mod events;
pub mod scope;
pub mod task_edit;
pub mod task_list;
pub mod task_service;

// Re-exports
pub use events::{event_channel, EventSender, EventStream};
pub use scope::{CancelToken, ControllerScope};
pub use task_edit::{SubmitOutcome, TaskEditController, TaskEditEvent, TaskEditState};
pub use task_list::{
    compare_tasks, sort_tasks, ListConfig, TaskListController, TaskListEvent, TaskListObserver,
    TaskListState,
};
pub use task_service::TaskService;
