// Task List Controller - presentation state and intents for the list screen

use crate::application::constants::DEFAULT_GRACE_PERIOD;
use crate::application::events::{event_channel, EventSender, EventStream};
use crate::application::scope::ControllerScope;
use crate::application::task_service::TaskService;
use crate::domain::{DeletedTask, Task, TaskId};
use crate::error::TaskError;
use crate::port::TaskFeed;
use futures::StreamExt;
use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// Presentation state of the task list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskListState {
    /// No data received yet
    Loading,
    /// The store holds no tasks
    Empty,
    /// Tasks in display order (see [`sort_tasks`])
    Content(Vec<Task>),
    /// The live sequence failed; nothing more is derived from it
    Error(TaskError),
}

impl TaskListState {
    /// Derive the state for one store snapshot
    pub fn from_tasks(mut tasks: Vec<Task>) -> Self {
        if tasks.is_empty() {
            return TaskListState::Empty;
        }
        sort_tasks(&mut tasks);
        TaskListState::Content(tasks)
    }

    /// Tasks currently shown (empty unless `Content`)
    pub fn tasks(&self) -> &[Task] {
        match self {
            TaskListState::Content(tasks) => tasks,
            _ => &[],
        }
    }
}

/// One-shot notifications from the list controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskListEvent {
    /// A delete went through; offer to undo it with this snapshot
    ShowUndo(DeletedTask),
    /// A delete failed; the list is unchanged
    ShowError(TaskError),
}

/// Display order: incomplete first, newest first, then ID for determinism
pub fn compare_tasks(a: &Task, b: &Task) -> Ordering {
    a.is_completed
        .cmp(&b.is_completed)
        .then_with(|| b.created_at.cmp(&a.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

pub fn sort_tasks(tasks: &mut [Task]) {
    tasks.sort_by(compare_tasks);
}

/// List controller configuration
#[derive(Debug, Clone)]
pub struct ListConfig {
    /// How long the store subscription outlives the last observer
    pub grace_period: Duration,
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            grace_period: DEFAULT_GRACE_PERIOD,
        }
    }
}

/// Derives the list screen's state from the service's live sequence and
/// turns toggle/delete/undo intents into service calls.
///
/// The store subscription is only kept while someone is watching: it starts
/// when the first [`TaskListObserver`] attaches and is torn down once the
/// last one has been gone for the configured grace period. The last derived
/// state survives the gap, so a quick detach/reattach sees no `Loading`
/// flicker.
pub struct TaskListController {
    service: Arc<TaskService>,
    state: Arc<watch::Sender<TaskListState>>,
    observers: Arc<watch::Sender<usize>>,
    events_tx: EventSender<TaskListEvent>,
    events: EventStream<TaskListEvent>,
    scope: ControllerScope,
}

impl TaskListController {
    /// Create the controller and its subscription supervisor.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(service: Arc<TaskService>, config: ListConfig) -> Self {
        let (state, _) = watch::channel(TaskListState::Loading);
        let (observers, observer_count) = watch::channel(0usize);
        let (events_tx, events) = event_channel();
        let state = Arc::new(state);
        let scope = ControllerScope::new();

        scope.spawn(
            "task_list_supervisor",
            supervise(
                Arc::clone(&service),
                Arc::clone(&state),
                observer_count,
                config.grace_period,
            ),
        );

        Self {
            service,
            state,
            observers: Arc::new(observers),
            events_tx,
            events,
            scope,
        }
    }

    /// Attach an observer. The store subscription runs while at least one
    /// observer is attached (plus the grace period after the last detach).
    pub fn observe(&self) -> TaskListObserver {
        self.observers.send_modify(|count| *count += 1);
        TaskListObserver {
            state: self.state.subscribe(),
            _attachment: Attachment {
                observers: Arc::clone(&self.observers),
            },
        }
    }

    /// Current state, without attaching
    pub fn state(&self) -> TaskListState {
        self.state.borrow().clone()
    }

    pub fn observer_count(&self) -> usize {
        *self.observers.borrow()
    }

    /// One-shot notifications (undo prompts, errors)
    pub fn events(&self) -> EventStream<TaskListEvent> {
        self.events.clone()
    }

    /// Toggle completion. Failures are logged, not surfaced.
    pub fn toggle_completed(&self, id: impl Into<TaskId>) -> JoinHandle<()> {
        let service = Arc::clone(&self.service);
        let id = id.into();
        self.scope.spawn("toggle_completed", async move {
            if let Err(e) = service.toggle_completed(&id).await {
                warn!(task_id = %id, error = %e, "Toggle failed");
            }
        })
    }

    /// Delete a task; when a row was removed, offer undo with the full
    /// snapshot. Deleting a task that is already gone notifies nothing.
    pub fn delete(&self, task: Task) -> JoinHandle<()> {
        let service = Arc::clone(&self.service);
        let events = self.events_tx.clone();
        self.scope.spawn("delete", async move {
            match service.delete_task(&task.id).await {
                Ok(true) => events.emit(TaskListEvent::ShowUndo(DeletedTask::capture(task))),
                Ok(false) => debug!(task_id = %task.id, "Nothing to delete"),
                Err(e) => {
                    error!(task_id = %task.id, error = %e, "Delete failed");
                    events.emit(TaskListEvent::ShowError(e));
                }
            }
        })
    }

    /// Restore a task captured by `delete`. Best effort: never notifies.
    pub fn undo_delete(&self, deleted: DeletedTask) -> JoinHandle<()> {
        let service = Arc::clone(&self.service);
        self.scope.spawn("undo_delete", async move {
            if let Err(e) = service.restore_task(&deleted).await {
                warn!(task_id = %deleted.task().id, error = %e, "Undo failed");
            }
        })
    }

    /// Cancel the subscription and every in-flight command
    pub fn shutdown(&self) {
        info!("Task list controller shutting down");
        self.scope.cancel();
    }
}

/// An attached view of the list state
pub struct TaskListObserver {
    state: watch::Receiver<TaskListState>,
    _attachment: Attachment,
}

impl TaskListObserver {
    pub fn current(&self) -> TaskListState {
        self.state.borrow().clone()
    }

    /// Wait for the next state change. `None` once the controller is gone.
    pub async fn changed(&mut self) -> Option<TaskListState> {
        self.state.changed().await.ok()?;
        Some(self.state.borrow_and_update().clone())
    }

    /// Wait until the state satisfies `predicate` (checks the current one first)
    pub async fn wait_for(
        &mut self,
        mut predicate: impl FnMut(&TaskListState) -> bool,
    ) -> Option<TaskListState> {
        let state = self.state.wait_for(|s| predicate(s)).await.ok()?;
        Some(state.clone())
    }
}

struct Attachment {
    observers: Arc<watch::Sender<usize>>,
}

impl Drop for Attachment {
    fn drop(&mut self) {
        self.observers
            .send_modify(|count| *count = count.saturating_sub(1));
    }
}

/// Aborts the collector task when dropped
struct Collector(JoinHandle<()>);

impl Drop for Collector {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Start/stop the store subscription as observers come and go
async fn supervise(
    service: Arc<TaskService>,
    state: Arc<watch::Sender<TaskListState>>,
    mut observers: watch::Receiver<usize>,
    grace_period: Duration,
) {
    let mut collector: Option<Collector> = None;

    loop {
        if !wait_for_count(&mut observers, |count| count > 0).await {
            return;
        }

        if collector.is_none() {
            debug!("First observer attached, subscribing to tasks");
            state.send_replace(TaskListState::Loading);
            let feed = service.observe_tasks();
            collector = Some(Collector(tokio::spawn(collect(feed, Arc::clone(&state)))));
        }

        if !wait_for_count(&mut observers, |count| count == 0).await {
            return;
        }

        tokio::select! {
            _ = sleep(grace_period) => {
                debug!(
                    grace_ms = grace_period.as_millis() as u64,
                    "No observers left, unsubscribing from tasks"
                );
                collector = None;
            }
            reattached = wait_for_count(&mut observers, |count| count > 0) => {
                if !reattached {
                    return;
                }
            }
        }
    }
}

/// False once the controller (and with it the count sender) is gone
async fn wait_for_count(observers: &mut watch::Receiver<usize>, predicate: fn(usize) -> bool) -> bool {
    observers.wait_for(|count| predicate(*count)).await.is_ok()
}

/// Derive one state per feed item, in emission order
async fn collect(mut feed: TaskFeed, state: Arc<watch::Sender<TaskListState>>) {
    while let Some(item) = feed.next().await {
        match item {
            Ok(tasks) => {
                let next = TaskListState::from_tasks(tasks);
                state.send_if_modified(|current| {
                    if *current == next {
                        return false;
                    }
                    *current = next;
                    true
                });
            }
            Err(e) => {
                error!(error = %e, "Task feed failed");
                state.send_replace(TaskListState::Error(e));
                return;
            }
        }
    }
    debug!("Task feed closed");
}
