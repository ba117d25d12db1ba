//! Line console driving the list and edit controllers from stdin

use anyhow::{anyhow, bail, Result};
use std::sync::Arc;
use taskpad_core::application::{
    SubmitOutcome, TaskEditController, TaskEditEvent, TaskListController, TaskListEvent,
    TaskListObserver, TaskListState, TaskService,
};
use taskpad_core::domain::{DeletedTask, Task};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::Mutex;
use tracing::debug;

pub const HELP: &str = "\
commands:
  list                         show tasks
  add <title> | <description>  create a task
  toggle <n>                   complete / reopen task n
  delete <n>                   delete task n
  undo                         restore the last deleted task
  help                         show this help
  quit                         exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List,
    Add { title: String, description: String },
    Toggle(usize),
    Delete(usize),
    Undo,
    Help,
    Quit,
}

impl std::str::FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self> {
        let line = line.trim();
        let (verb, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();

        match verb {
            "list" | "ls" => Ok(Command::List),
            "add" => {
                let (title, description) = rest.split_once('|').unwrap_or((rest, ""));
                Ok(Command::Add {
                    title: title.trim().to_string(),
                    description: description.trim().to_string(),
                })
            }
            "toggle" => Ok(Command::Toggle(parse_row(rest)?)),
            "delete" | "rm" => Ok(Command::Delete(parse_row(rest)?)),
            "undo" => Ok(Command::Undo),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            "" => bail!("empty command"),
            other => bail!("unknown command '{}' (try 'help')", other),
        }
    }
}

/// 1-based row number as typed by the user
fn parse_row(raw: &str) -> Result<usize> {
    match raw.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => bail!("expected a row number, got '{}'", raw),
    }
}

pub fn render_state(state: &TaskListState) -> String {
    match state {
        TaskListState::Loading => "loading...".to_string(),
        TaskListState::Empty => "no tasks yet".to_string(),
        TaskListState::Error(e) => format!("could not load tasks: {}", e),
        TaskListState::Content(tasks) => tasks
            .iter()
            .enumerate()
            .map(|(i, task)| render_row(i + 1, task))
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

fn render_row(row: usize, task: &Task) -> String {
    let mark = if task.is_completed { 'x' } else { ' ' };
    format!("{:>3}. [{}] {} - {}", row, mark, task.title, task.description)
}

/// Console session state shared with the notification printers
pub struct Console {
    service: Arc<TaskService>,
    list: Arc<TaskListController>,
    last_deleted: Arc<Mutex<Option<DeletedTask>>>,
}

impl Console {
    pub fn new(service: Arc<TaskService>, list: Arc<TaskListController>) -> Self {
        Self {
            service,
            list,
            last_deleted: Arc::new(Mutex::new(None)),
        }
    }

    /// Read commands until `quit` or end of input
    pub async fn run<R>(&self, input: R) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let observer = self.list.observe();
        let printer = tokio::spawn(print_states(observer));
        let notifier = tokio::spawn(print_list_events(
            Arc::clone(&self.list),
            Arc::clone(&self.last_deleted),
        ));

        println!("{}", HELP);
        let mut lines = input.lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            match line.parse::<Command>() {
                Ok(Command::Quit) => break,
                Ok(command) => {
                    if let Err(e) = self.execute(command).await {
                        println!("error: {}", e);
                    }
                }
                Err(e) => println!("error: {}", e),
            }
        }

        printer.abort();
        notifier.abort();
        debug!("Console input closed");
        Ok(())
    }

    pub async fn execute(&self, command: Command) -> Result<()> {
        match command {
            Command::List => println!("{}", render_state(&self.list.state())),
            Command::Add { title, description } => self.add(&title, &description),
            Command::Toggle(row) => {
                let task = self.task_at(row)?;
                self.list.toggle_completed(task.id);
            }
            Command::Delete(row) => {
                let task = self.task_at(row)?;
                self.list.delete(task);
            }
            Command::Undo => match self.last_deleted.lock().await.take() {
                Some(deleted) => {
                    self.list.undo_delete(deleted);
                }
                None => println!("nothing to undo"),
            },
            Command::Help => println!("{}", HELP),
            Command::Quit => {}
        }
        Ok(())
    }

    fn task_at(&self, row: usize) -> Result<Task> {
        let state = self.list.state();
        row.checked_sub(1)
            .and_then(|index| state.tasks().get(index))
            .cloned()
            .ok_or_else(|| anyhow!("no task at row {}", row))
    }

    /// One edit form per `add`, like opening the new-task screen
    fn add(&self, title: &str, description: &str) {
        let edit = TaskEditController::new(Arc::clone(&self.service));
        edit.change_title(title);
        edit.change_description(description);

        match edit.submit() {
            SubmitOutcome::Submitted(_) => {
                println!("saving...");
                tokio::spawn(async move {
                    let events = edit.events();
                    match events.next().await {
                        Some(TaskEditEvent::NavigateBack) => println!("saved"),
                        Some(TaskEditEvent::ShowError(e)) => {
                            println!("could not save: {} (try again)", e)
                        }
                        None => {}
                    }
                });
            }
            SubmitOutcome::Invalid => {
                let state = edit.state();
                if let Some(e) = state.title_error {
                    println!("title: {}", e);
                }
                if let Some(e) = state.description_error {
                    println!("description: {}", e);
                }
            }
            SubmitOutcome::AlreadySaving => println!("already saving"),
        }
    }
}

async fn print_states(mut observer: TaskListObserver) {
    println!("{}", render_state(&observer.current()));
    while let Some(state) = observer.changed().await {
        println!("{}", render_state(&state));
    }
}

async fn print_list_events(
    list: Arc<TaskListController>,
    last_deleted: Arc<Mutex<Option<DeletedTask>>>,
) {
    let events = list.events();
    while let Some(event) = events.next().await {
        match event {
            TaskListEvent::ShowUndo(deleted) => {
                println!("deleted '{}' (type 'undo' to restore)", deleted.task().title);
                *last_deleted.lock().await = Some(deleted);
            }
            TaskListEvent::ShowError(e) => println!("could not delete: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskpad_core::port::id_provider::mocks::SequentialIdProvider;
    use taskpad_core::port::network::mocks::ScriptedNetwork;
    use taskpad_core::port::time_provider::mocks::ManualClock;
    use taskpad_core::application::ListConfig;
    use taskpad_core::port::InMemoryTaskStore;

    #[test]
    fn test_parse_commands() {
        assert_eq!("list".parse::<Command>().unwrap(), Command::List);
        assert_eq!(
            "add Buy milk | 2%".parse::<Command>().unwrap(),
            Command::Add {
                title: "Buy milk".into(),
                description: "2%".into()
            }
        );
        assert_eq!(
            "add just a title".parse::<Command>().unwrap(),
            Command::Add {
                title: "just a title".into(),
                description: String::new()
            }
        );
        assert_eq!("toggle 2".parse::<Command>().unwrap(), Command::Toggle(2));
        assert_eq!("  delete 1 ".parse::<Command>().unwrap(), Command::Delete(1));
        assert_eq!("undo".parse::<Command>().unwrap(), Command::Undo);
        assert_eq!("quit".parse::<Command>().unwrap(), Command::Quit);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!("toggle".parse::<Command>().is_err());
        assert!("delete 0".parse::<Command>().is_err());
        assert!("delete two".parse::<Command>().is_err());
        assert!("frobnicate".parse::<Command>().is_err());
    }

    #[test]
    fn test_render_state() {
        assert_eq!(render_state(&TaskListState::Empty), "no tasks yet");

        let done = Task::new("b", "Walk", "the dog", 1).toggled();
        let open = Task::new("a", "Buy milk", "2%", 2);
        let rendered = render_state(&TaskListState::Content(vec![open, done]));
        assert_eq!(
            rendered,
            "  1. [ ] Buy milk - 2%\n  2. [x] Walk - the dog"
        );
    }

    #[tokio::test]
    async fn test_script_adds_and_deletes() {
        let store = Arc::new(InMemoryTaskStore::new());
        let service = Arc::new(TaskService::new(
            store.clone(),
            Arc::new(ScriptedNetwork::succeed()),
            Arc::new(SequentialIdProvider::new()),
            Arc::new(ManualClock::new(1_000)),
        ));
        let list = Arc::new(TaskListController::new(
            Arc::clone(&service),
            ListConfig::default(),
        ));
        let console = Console::new(service, Arc::clone(&list));

        console.run(&b"add Buy milk | 2%\nquit\n"[..]).await.unwrap();
        while store.snapshot().await.is_empty() {
            tokio::task::yield_now().await;
        }
        assert_eq!(store.snapshot().await[0].title, "Buy milk");

        // Out-of-range rows are reported, not panics
        tokio_test::assert_err!(console.execute(Command::Delete(9)).await);
        tokio_test::assert_err!(console.execute(Command::Delete(0)).await);
        tokio_test::assert_err!(console.execute(Command::Toggle(0)).await);
    }
}
