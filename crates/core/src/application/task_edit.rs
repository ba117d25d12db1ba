// Task Edit Controller - new-task form state and submission

use crate::application::events::{event_channel, EventSender, EventStream};
use crate::application::scope::ControllerScope;
use crate::application::task_service::TaskService;
use crate::domain::validation::{require_non_blank, truncate_chars};
use crate::domain::{FieldError, MAX_DESCRIPTION_CHARS, MAX_TITLE_CHARS};
use crate::error::TaskError;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Form state of the new-task screen
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskEditState {
    pub title: String,
    pub description: String,
    pub is_saving: bool,
    pub title_error: Option<FieldError>,
    pub description_error: Option<FieldError>,
}

impl TaskEditState {
    pub fn has_errors(&self) -> bool {
        self.title_error.is_some() || self.description_error.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskEditEvent {
    /// The task was created; leave the form
    NavigateBack,
    /// Creation failed; the form keeps its input for a retry
    ShowError(TaskError),
}

/// What `submit` did
#[derive(Debug)]
pub enum SubmitOutcome {
    /// Creation is running; the handle resolves after the event is emitted
    Submitted(JoinHandle<()>),
    /// A field is blank; its error flag is set and nothing was sent
    Invalid,
    /// Another submission is still in flight; ignored
    AlreadySaving,
}

pub struct TaskEditController {
    service: Arc<TaskService>,
    state: Arc<watch::Sender<TaskEditState>>,
    events_tx: EventSender<TaskEditEvent>,
    events: EventStream<TaskEditEvent>,
    scope: ControllerScope,
}

impl TaskEditController {
    pub fn new(service: Arc<TaskService>) -> Self {
        let (state, _) = watch::channel(TaskEditState::default());
        let (events_tx, events) = event_channel();
        Self {
            service,
            state: Arc::new(state),
            events_tx,
            events,
            scope: ControllerScope::new(),
        }
    }

    pub fn state(&self) -> TaskEditState {
        self.state.borrow().clone()
    }

    pub fn watch_state(&self) -> watch::Receiver<TaskEditState> {
        self.state.subscribe()
    }

    pub fn events(&self) -> EventStream<TaskEditEvent> {
        self.events.clone()
    }

    pub fn change_title(&self, value: &str) {
        let title = truncate_chars(value, MAX_TITLE_CHARS);
        self.state.send_modify(|state| {
            state.title = title;
            state.title_error = None;
        });
    }

    pub fn change_description(&self, value: &str) {
        let description = truncate_chars(value, MAX_DESCRIPTION_CHARS);
        self.state.send_modify(|state| {
            state.description = description;
            state.description_error = None;
        });
    }

    /// Validate and start creating the task.
    ///
    /// Validation is local and synchronous. On success `is_saving` is set
    /// before this returns, so a second call is ignored until the first
    /// one settles.
    pub fn submit(&self) -> SubmitOutcome {
        let mut outcome = SubmitOutcome::AlreadySaving;
        let mut input = None;

        self.state.send_if_modified(|state| {
            if state.is_saving {
                return false;
            }

            let title = require_non_blank(&state.title).map(str::to_string);
            let description = require_non_blank(&state.description).map(str::to_string);
            match (title, description) {
                (Ok(title), Ok(description)) => {
                    state.is_saving = true;
                    input = Some((title, description));
                }
                (title, description) => {
                    state.title_error = title.err();
                    state.description_error = description.err();
                    outcome = SubmitOutcome::Invalid;
                }
            }
            true
        });

        let Some((title, description)) = input else {
            return outcome;
        };

        let service = Arc::clone(&self.service);
        let state = Arc::clone(&self.state);
        let events = self.events_tx.clone();
        SubmitOutcome::Submitted(self.scope.spawn("add_task", async move {
            let result = service.add_task(&title, &description).await;
            state.send_modify(|state| state.is_saving = false);

            match result {
                Ok(task) => {
                    info!(task_id = %task.id, "Task submitted");
                    events.emit(TaskEditEvent::NavigateBack);
                }
                Err(e) => {
                    warn!(error = %e, "Task submission failed");
                    events.emit(TaskEditEvent::ShowError(e));
                }
            }
        }))
    }

    /// Cancel an in-flight submission
    pub fn shutdown(&self) {
        self.scope.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::id_provider::mocks::SequentialIdProvider;
    use crate::port::network::mocks::ScriptedNetwork;
    use crate::port::time_provider::mocks::ManualClock;
    use crate::port::InMemoryTaskStore;
    use std::time::Duration;
    use tokio::time::sleep;

    fn controller(network: ScriptedNetwork) -> (Arc<InMemoryTaskStore>, Arc<ScriptedNetwork>, TaskEditController) {
        let store = Arc::new(InMemoryTaskStore::new());
        let network = Arc::new(network);
        let service = TaskService::new(
            store.clone(),
            network.clone(),
            Arc::new(SequentialIdProvider::new()),
            Arc::new(ManualClock::new(5_000)),
        );
        (store, network, TaskEditController::new(Arc::new(service)))
    }

    #[tokio::test]
    async fn test_inputs_are_truncated() {
        let (_, _, edit) = controller(ScriptedNetwork::succeed());

        edit.change_title(&"t".repeat(80));
        edit.change_description(&"é".repeat(250));

        let state = edit.state();
        assert_eq!(state.title.chars().count(), MAX_TITLE_CHARS);
        assert_eq!(state.description.chars().count(), MAX_DESCRIPTION_CHARS);
    }

    #[tokio::test]
    async fn test_blank_fields_are_flagged_without_calling_service() {
        let (store, network, edit) = controller(ScriptedNetwork::succeed());
        edit.change_title("   ");

        assert!(matches!(edit.submit(), SubmitOutcome::Invalid));

        let state = edit.state();
        assert_eq!(state.title_error, Some(FieldError::Required));
        assert_eq!(state.description_error, Some(FieldError::Required));
        assert!(!state.is_saving);
        assert_eq!(network.attempts(), 0);
        assert!(store.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_editing_clears_field_error() {
        let (_, _, edit) = controller(ScriptedNetwork::succeed());
        edit.change_description("only a description");
        assert!(matches!(edit.submit(), SubmitOutcome::Invalid));

        let state = edit.state();
        assert_eq!(state.title_error, Some(FieldError::Required));
        assert_eq!(state.description_error, None);

        edit.change_title("x");
        assert!(!edit.state().has_errors());
    }

    #[tokio::test]
    async fn test_successful_submit_trims_and_navigates_back() {
        let (store, _, edit) = controller(ScriptedNetwork::succeed());
        edit.change_title("  Buy milk ");
        edit.change_description("2%\n");

        let SubmitOutcome::Submitted(handle) = edit.submit() else {
            panic!("expected submission");
        };
        handle.await.unwrap();

        assert_eq!(edit.events().next().await, Some(TaskEditEvent::NavigateBack));
        let tasks = store.snapshot().await;
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "Buy milk");
        assert_eq!(tasks[0].description, "2%");
        assert!(!edit.state().is_saving);
    }

    #[tokio::test]
    async fn test_failed_submit_keeps_form_for_retry() {
        let (store, _, edit) = controller(ScriptedNetwork::new([false], true));
        edit.change_title("Buy milk");
        edit.change_description("2%");

        let SubmitOutcome::Submitted(handle) = edit.submit() else {
            panic!("expected submission");
        };
        handle.await.unwrap();

        let event = edit.events().next().await;
        assert!(matches!(event, Some(TaskEditEvent::ShowError(TaskError::Network(_)))));
        let state = edit.state();
        assert_eq!(state.title, "Buy milk");
        assert!(!state.is_saving);
        assert!(store.snapshot().await.is_empty());

        // Retry goes through
        let SubmitOutcome::Submitted(handle) = edit.submit() else {
            panic!("expected submission");
        };
        handle.await.unwrap();
        assert_eq!(edit.events().next().await, Some(TaskEditEvent::NavigateBack));
        assert_eq!(store.snapshot().await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_submit_while_saving_is_ignored() {
        let network = ScriptedNetwork::succeed().with_latency(Duration::from_secs(2));
        let (store, network, edit) = controller(network);
        edit.change_title("once");
        edit.change_description("only");

        let SubmitOutcome::Submitted(handle) = edit.submit() else {
            panic!("expected submission");
        };
        assert!(edit.state().is_saving);
        assert!(matches!(edit.submit(), SubmitOutcome::AlreadySaving));

        handle.await.unwrap();
        assert_eq!(network.attempts(), 1);
        assert_eq!(store.snapshot().await.len(), 1);
        assert!(edit.events().try_next().is_some());
        assert!(edit.events().try_next().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_controller_cancels_pending_creation() {
        let network = ScriptedNetwork::succeed().with_latency(Duration::from_secs(2));
        let (store, network, edit) = controller(network);
        edit.change_title("never");
        edit.change_description("saved");

        let SubmitOutcome::Submitted(handle) = edit.submit() else {
            panic!("expected submission");
        };
        sleep(Duration::from_millis(500)).await;
        drop(edit);
        handle.await.unwrap();

        sleep(Duration::from_secs(5)).await;
        assert_eq!(network.attempts(), 0);
        assert!(store.snapshot().await.is_empty());
    }
}
