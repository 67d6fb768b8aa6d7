use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::watch;

use crate::error::{Result, WorkchatError};
use crate::models::Task;
use crate::transport::TaskApi;

/// Time source for the poll loop, injected so tests run without wall-clock
/// waits.
#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
    async fn sleep(&self, duration: Duration);
}

/// Wall-clock implementation used outside of tests.
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Constant-interval polling parameters. No jitter, no backoff.
#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            timeout: Duration::from_secs(300),
        }
    }
}

/// Create a linked cancellation pair. The handle side cancels, the token
/// side is handed to a poll loop.
pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle { tx }, CancelToken { rx })
}

pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

#[derive(Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the handle fires. Pends forever if the handle is
    /// dropped without cancelling.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow() {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Drives a submitted task to a terminal state by repeated status reads.
///
/// The poller only observes task state; all transitions happen server-side.
pub struct TaskPoller {
    api: Arc<dyn TaskApi>,
    clock: Arc<dyn Clock>,
    config: PollConfig,
}

impl TaskPoller {
    pub fn new(api: Arc<dyn TaskApi>, config: PollConfig) -> Self {
        Self {
            api,
            clock: Arc::new(TokioClock),
            config,
        }
    }

    pub fn with_clock(api: Arc<dyn TaskApi>, clock: Arc<dyn Clock>, config: PollConfig) -> Self {
        Self { api, clock, config }
    }

    /// Fetch task status at a constant interval until it turns terminal.
    ///
    /// Status checks for a task are strictly sequential. The first failing
    /// fetch ends the loop with that error - a status-read failure is not
    /// retried. The timeout is an elapsed-time check between attempts; an
    /// individual in-flight request is bounded by the HTTP client timeout
    /// instead.
    pub async fn poll_until_done(
        &self,
        task_id: &str,
        cancel: Option<&CancelToken>,
    ) -> Result<Task> {
        let started = self.clock.now();

        loop {
            if let Some(token) = cancel {
                if token.is_cancelled() {
                    return Err(WorkchatError::PollCancelled {
                        task_id: task_id.to_string(),
                    });
                }
            }

            let task = self.api.get_task(task_id).await?;
            if task.status.is_terminal() {
                tracing::debug!(task_id, status = %task.status, "task reached terminal state");
                return Ok(task);
            }

            if self.clock.now().duration_since(started) > self.config.timeout {
                tracing::warn!(task_id, "task polling timed out");
                return Err(WorkchatError::PollTimeout {
                    task_id: task_id.to_string(),
                    timeout_ms: self.config.timeout.as_millis() as u64,
                });
            }

            match cancel {
                Some(token) => {
                    tokio::select! {
                        _ = self.clock.sleep(self.config.interval) => {}
                        _ = token.cancelled() => {
                            return Err(WorkchatError::PollCancelled {
                                task_id: task_id.to_string(),
                            });
                        }
                    }
                }
                None => self.clock.sleep(self.config.interval).await,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SearchFilters, TaskAck, TaskPayload, TaskStatus};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn make_task(status: TaskStatus) -> Task {
        Task {
            task_id: "t-1".to_string(),
            service_name: "work-internal".to_string(),
            task_type: "search-and-answer".to_string(),
            payload: TaskPayload {
                query: "test".to_string(),
                filters: SearchFilters {
                    category: "policies".to_string(),
                },
                max_results: 5,
            },
            status,
            created_at: "2025-05-01T10:00:00Z".to_string(),
            updated_at: "2025-05-01T10:00:00Z".to_string(),
            result: None,
            error: None,
        }
    }

    /// TaskApi stub that replays a scripted status sequence, repeating the
    /// last entry once drained.
    struct ScriptedTaskApi {
        statuses: Mutex<Vec<TaskStatus>>,
        calls: AtomicUsize,
        fail_on_call: Option<usize>,
    }

    impl ScriptedTaskApi {
        fn new(statuses: Vec<TaskStatus>) -> Self {
            Self {
                statuses: Mutex::new(statuses),
                calls: AtomicUsize::new(0),
                fail_on_call: None,
            }
        }

        fn failing_on(call: usize, statuses: Vec<TaskStatus>) -> Self {
            Self {
                statuses: Mutex::new(statuses),
                calls: AtomicUsize::new(0),
                fail_on_call: Some(call),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TaskApi for ScriptedTaskApi {
        async fn create_search_task(&self, _query: &str, _service_id: &str) -> Result<TaskAck> {
            Err(WorkchatError::Internal("not used in this test".to_string()))
        }

        async fn get_task(&self, _task_id: &str) -> Result<Task> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail_on_call == Some(call) {
                return Err(WorkchatError::Api {
                    status: 502,
                    body: "bad gateway".to_string(),
                });
            }
            let mut statuses = self.statuses.lock().unwrap();
            let status = if statuses.len() > 1 {
                statuses.remove(0)
            } else {
                statuses[0].clone()
            };
            Ok(make_task(status))
        }

        async fn list_tasks(&self) -> Result<Vec<Task>> {
            Err(WorkchatError::Internal("not used in this test".to_string()))
        }
    }

    /// Deterministic clock: sleeping advances a virtual offset instantly.
    struct MockClock {
        base: Instant,
        offset: Mutex<Duration>,
        sleeps: Mutex<Vec<Duration>>,
    }

    impl MockClock {
        fn new() -> Self {
            Self {
                base: Instant::now(),
                offset: Mutex::new(Duration::ZERO),
                sleeps: Mutex::new(Vec::new()),
            }
        }

        fn total_slept(&self) -> Duration {
            self.sleeps.lock().unwrap().iter().sum()
        }

        fn sleep_count(&self) -> usize {
            self.sleeps.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Clock for MockClock {
        fn now(&self) -> Instant {
            self.base + *self.offset.lock().unwrap()
        }

        async fn sleep(&self, duration: Duration) {
            *self.offset.lock().unwrap() += duration;
            self.sleeps.lock().unwrap().push(duration);
        }
    }

    fn fast_config() -> PollConfig {
        PollConfig {
            interval: Duration::from_millis(10),
            timeout: Duration::from_millis(1000),
        }
    }

    #[tokio::test]
    async fn completed_task_returns_on_first_fetch_without_sleeping() {
        let api = Arc::new(ScriptedTaskApi::new(vec![TaskStatus::Completed]));
        let clock = Arc::new(MockClock::new());
        let poller = TaskPoller::with_clock(api.clone(), clock.clone(), fast_config());

        let task = poller.poll_until_done("t-1", None).await.unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(api.call_count(), 1);
        assert_eq!(clock.sleep_count(), 0);
    }

    #[tokio::test]
    async fn failed_status_is_terminal_too() {
        let api = Arc::new(ScriptedTaskApi::new(vec![
            TaskStatus::Pending,
            TaskStatus::Failed,
        ]));
        let clock = Arc::new(MockClock::new());
        let poller = TaskPoller::with_clock(api.clone(), clock.clone(), fast_config());

        let task = poller.poll_until_done("t-1", None).await.unwrap();
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(api.call_count(), 2);
    }

    #[tokio::test]
    async fn pending_three_times_then_completed_takes_four_fetches() {
        let api = Arc::new(ScriptedTaskApi::new(vec![
            TaskStatus::Pending,
            TaskStatus::Pending,
            TaskStatus::Pending,
            TaskStatus::Completed,
        ]));
        let clock = Arc::new(MockClock::new());
        let poller = TaskPoller::with_clock(api.clone(), clock.clone(), fast_config());

        let task = poller.poll_until_done("t-1", None).await.unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert_eq!(api.call_count(), 4);
        assert_eq!(clock.sleep_count(), 3);
        assert!(clock.total_slept() >= Duration::from_millis(30));
    }

    #[tokio::test]
    async fn never_terminal_status_times_out_after_enough_attempts() {
        let api = Arc::new(ScriptedTaskApi::new(vec![TaskStatus::Pending]));
        let clock = Arc::new(MockClock::new());
        let poller = TaskPoller::with_clock(api.clone(), clock.clone(), fast_config());

        let err = poller.poll_until_done("t-1", None).await.unwrap_err();
        assert!(matches!(err, WorkchatError::PollTimeout { .. }));
        // At least floor(timeout / interval) status checks before giving up.
        assert!(api.call_count() >= 100);
    }

    #[tokio::test]
    async fn single_fetch_failure_aborts_immediately() {
        let api = Arc::new(ScriptedTaskApi::failing_on(
            2,
            vec![TaskStatus::Pending, TaskStatus::Pending],
        ));
        let clock = Arc::new(MockClock::new());
        let poller = TaskPoller::with_clock(api.clone(), clock.clone(), fast_config());

        let err = poller.poll_until_done("t-1", None).await.unwrap_err();
        assert!(matches!(err, WorkchatError::Api { status: 502, .. }));
        // The failing call is the last one; nothing is retried after it.
        assert_eq!(api.call_count(), 2);
    }

    #[tokio::test]
    async fn pre_cancelled_token_stops_before_any_fetch() {
        let api = Arc::new(ScriptedTaskApi::new(vec![TaskStatus::Pending]));
        let clock = Arc::new(MockClock::new());
        let poller = TaskPoller::with_clock(api.clone(), clock.clone(), fast_config());

        let (handle, token) = cancel_pair();
        handle.cancel();

        let err = poller
            .poll_until_done("t-1", Some(&token))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkchatError::PollCancelled { .. }));
        assert_eq!(api.call_count(), 0);
    }

    #[tokio::test]
    async fn cancellation_interrupts_the_sleep() {
        // Real clock with a long interval; cancellation must cut it short.
        let api = Arc::new(ScriptedTaskApi::new(vec![TaskStatus::Pending]));
        let config = PollConfig {
            interval: Duration::from_secs(60),
            timeout: Duration::from_secs(300),
        };
        let poller = TaskPoller::new(api.clone(), config);

        let (handle, token) = cancel_pair();
        let started = Instant::now();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            handle.cancel();
        });

        let err = poller
            .poll_until_done("t-1", Some(&token))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkchatError::PollCancelled { .. }));
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(api.call_count(), 1);
    }

    #[tokio::test]
    async fn token_reports_cancellation_state() {
        let (handle, token) = cancel_pair();
        assert!(!token.is_cancelled());
        handle.cancel();
        assert!(token.is_cancelled());
        // Already-cancelled tokens resolve immediately.
        token.cancelled().await;
    }
}
