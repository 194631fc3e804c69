//! Deadline-bounded execution on a detached worker task.

use std::future::Future;
use std::time::Duration;

/// Why a worker did not produce a value.
#[derive(Debug)]
pub enum WorkerFailure {
    /// The deadline passed; the worker keeps running detached.
    DeadlineElapsed,
    /// The worker panicked or was cancelled by the runtime.
    Crashed(String),
}

/// Run `future` on its own tokio task and wait for it until `deadline`.
///
/// On timeout the task is not aborted: dropping its `JoinHandle` detaches it,
/// and whatever it eventually produces is discarded.
pub async fn run_detached<T, F>(deadline: Duration, future: F) -> Result<T, WorkerFailure>
where
    F: Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let handle = tokio::spawn(future);
    match tokio::time::timeout(deadline, handle).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(join_error)) => Err(WorkerFailure::Crashed(join_error.to_string())),
        Err(_) => Err(WorkerFailure::DeadlineElapsed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn returns_value_before_deadline() {
        let value = run_detached(Duration::from_secs(1), async { 7 }).await;
        assert!(matches!(value, Ok(7)));
    }

    #[tokio::test(start_paused = true)]
    async fn detaches_worker_after_deadline() {
        let finished = Arc::new(AtomicBool::new(false));
        let flag = finished.clone();
        let result = run_detached(Duration::from_millis(10), async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            flag.store(true, Ordering::SeqCst);
        })
        .await;
        assert!(matches!(result, Err(WorkerFailure::DeadlineElapsed)));
        assert!(!finished.load(Ordering::SeqCst));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn reports_panicking_worker() {
        let result = run_detached(Duration::from_secs(1), async {
            panic!("boom");
        })
        .await;
        match result {
            Err(WorkerFailure::Crashed(message)) => assert!(message.contains("panic")),
            other => panic!("expected crash, got {other:?}"),
        }
    }
}
