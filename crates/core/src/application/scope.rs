// Controller Scope - cancellation for work owned by a controller

use std::future::Future;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// Cancellation signal observed by work spawned on a scope
#[derive(Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    /// Check if cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait until the scope is cancelled or dropped
    pub async fn cancelled(&mut self) {
        let _ = self.rx.wait_for(|cancelled| *cancelled).await;
    }
}

/// Owner of a controller's background work
///
/// Every future spawned here races against the scope's cancellation.
/// Cancelling (or dropping) the scope stops that work at its next await
/// point; side effects it already committed stay committed.
pub struct ControllerScope {
    tx: watch::Sender<bool>,
}

impl Default for ControllerScope {
    fn default() -> Self {
        Self::new()
    }
}

impl ControllerScope {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    pub fn token(&self) -> CancelToken {
        CancelToken {
            rx: self.tx.subscribe(),
        }
    }

    /// Spawn `work` on the runtime, tied to this scope. Work spawned after
    /// cancellation is never polled.
    pub fn spawn<F>(&self, name: &'static str, work: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut token = self.token();
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => debug!(work = name, "Cancelled with its scope"),
                _ = work => {}
            }
        })
    }

    /// Cancel all work spawned on this scope
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_spawned_work_runs_to_completion() {
        let scope = ControllerScope::new();
        let done = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&done);

        scope
            .spawn("complete", async move { flag.store(true, Ordering::SeqCst) })
            .await
            .unwrap();

        assert!(done.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_pending_work() {
        let scope = ControllerScope::new();
        let done = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&done);

        let handle = scope.spawn("slow", async move {
            tokio::time::sleep(Duration::from_secs(10)).await;
            flag.store(true, Ordering::SeqCst);
        });

        scope.cancel();
        handle.await.unwrap();

        assert!(scope.is_cancelled());
        assert!(!done.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_scope_cancels_work() {
        let scope = ControllerScope::new();
        let mut token = scope.token();
        let handle = scope.spawn("slow", tokio::time::sleep(Duration::from_secs(10)));

        drop(scope);

        token.cancelled().await;
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_work_spawned_after_cancel_never_runs() {
        let scope = ControllerScope::new();
        scope.cancel();
        let token = scope.token();
        assert!(token.is_cancelled());

        let done = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&done);
        scope
            .spawn("late", async move {
                tokio::time::sleep(Duration::from_millis(1)).await;
                flag.store(true, Ordering::SeqCst);
            })
            .await
            .unwrap();

        assert!(!done.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_ready_work_spawned_after_cancel_never_runs() {
        let scope = ControllerScope::new();
        scope.cancel();

        let done = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&done);
        scope
            .spawn("late_ready", async move { flag.store(true, Ordering::SeqCst) })
            .await
            .unwrap();

        assert!(!done.load(Ordering::SeqCst));
    }
}
