//! Wall-clock-bounded call executor

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time;

#[derive(Error, Debug)]
pub enum TimedCallError {
    #[error("operation timed out after {0:?}")]
    TimedOut(Duration),

    #[error("operation panicked: {0}")]
    Panicked(String),

    #[error("operation was cancelled before completing")]
    Cancelled,
}

/// Runs an operation with a hard deadline.
///
/// Cancellation is a forced stop, not a transaction abort: side effects the
/// operation performed before the deadline (a request line already written
/// to a pipe, a process already spawned) are not rolled back. Operations
/// that are not cancellation-safe should not share state with their caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimedCall {
    join: bool,
}

impl TimedCall {
    pub fn new() -> Self {
        Self { join: false }
    }

    /// After aborting a timed-out spawned operation, also await the task's
    /// confirmed termination. Costs a bounded extra delay; guarantees the
    /// execution unit has actually stopped before the call returns.
    pub fn join_on_timeout(mut self, join: bool) -> Self {
        self.join = join;
        self
    }

    /// Run `operation` on its own task, aborting it if `limit` elapses
    /// first. Panics inside the operation are captured and surfaced as an
    /// error value, never as a crash of the caller.
    pub async fn spawn<T, F>(&self, limit: Duration, operation: F) -> Result<T, TimedCallError>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let mut handle = tokio::spawn(operation);

        match time::timeout(limit, &mut handle).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(join_error)) => {
                if join_error.is_panic() {
                    tracing::error!(error = %join_error, "timed operation panicked");
                    Err(TimedCallError::Panicked(join_error.to_string()))
                } else {
                    Err(TimedCallError::Cancelled)
                }
            }
            Err(_elapsed) => {
                handle.abort();
                if self.join {
                    let _ = handle.await;
                }
                Err(TimedCallError::TimedOut(limit))
            }
        }
    }

    /// Bound a borrowed future in place. On deadline the future is dropped,
    /// which cancels it at its next suspension point. This is the forced-stop
    /// primitive for operations that own no separate execution unit.
    pub async fn run<T, F>(&self, limit: Duration, operation: F) -> Result<T, TimedCallError>
    where
        F: Future<Output = T>,
    {
        time::timeout(limit, operation)
            .await
            .map_err(|_| TimedCallError::TimedOut(limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn spawn_returns_result_before_deadline() {
        let result = TimedCall::new()
            .spawn(Duration::from_secs(1), async { 41 + 1 })
            .await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn spawn_times_out_within_bounded_overshoot() {
        let started = Instant::now();
        let result: Result<(), _> = TimedCall::new()
            .join_on_timeout(true)
            .spawn(Duration::from_millis(50), async {
                time::sleep(Duration::from_secs(30)).await;
            })
            .await;

        assert!(matches!(result, Err(TimedCallError::TimedOut(_))));
        assert!(started.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test]
    async fn spawn_captures_panics() {
        let result: Result<(), _> = TimedCall::new()
            .spawn(Duration::from_secs(1), async {
                panic!("deliberate");
            })
            .await;

        match result {
            Err(TimedCallError::Panicked(message)) => assert!(message.contains("deliberate")),
            other => panic!("expected panic capture, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn run_bounds_a_borrowed_future() {
        let mut hits = 0u32;
        let result = TimedCall::new()
            .run(Duration::from_millis(50), async {
                hits += 1;
                time::sleep(Duration::from_secs(30)).await;
                hits += 1;
            })
            .await;

        assert!(matches!(result, Err(TimedCallError::TimedOut(_))));
        assert_eq!(hits, 1);
    }
}
