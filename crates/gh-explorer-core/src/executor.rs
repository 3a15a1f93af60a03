//! Retrying request executor
//!
//! Wraps any remote operation and turns its failure into an observable error
//! state plus a caller-supplied default value. `execute` never fails toward
//! the caller.

use gh_explorer_client::ApiError;
use log::{debug, warn};
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Default pause between two attempts
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1000);

/// Decides whether a failed attempt is worth repeating
pub type RetryPredicate = Arc<dyn Fn(&ApiError) -> bool + Send + Sync>;

/// Classification of a final failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Status ≥ 500
    Server,
    /// Everything else, including transport failures
    Client,
}

/// Error recorded after the last attempt failed
#[derive(Debug, Clone, PartialEq)]
pub struct RequestError {
    pub message: String,
    pub status: Option<u16>,
    pub kind: ErrorKind,
    pub original: ApiError,
}

impl RequestError {
    fn classify(original: ApiError, default_message: &str) -> Self {
        let kind = if original.is_server_error() {
            ErrorKind::Server
        } else {
            ErrorKind::Client
        };
        Self {
            message: original
                .server_message()
                .unwrap_or(default_message)
                .to_string(),
            status: original.status(),
            kind,
            original,
        }
    }
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Observable state of an executor
#[derive(Debug, Clone, Default)]
pub struct RequestState {
    pub loading: bool,
    pub error: Option<RequestError>,
    pub retries: u32,
    /// Value of the last call: the result on success, the default on failure
    data: Option<Arc<dyn Any + Send + Sync>>,
}

impl RequestState {
    /// The last value, if it was of type `T`
    pub fn data<T: Clone + 'static>(&self) -> Option<T> {
        self.data.as_ref()?.downcast_ref::<T>().cloned()
    }
}

/// Per-call options
pub struct ExecuteOptions<T> {
    default_error_message: String,
    default_value: T,
    max_retries: u32,
    retry_delay: Duration,
    should_retry: RetryPredicate,
}

impl<T> ExecuteOptions<T> {
    /// No retries, 1s delay, retry on server errors only
    pub fn new(default_error_message: impl Into<String>, default_value: T) -> Self {
        Self {
            default_error_message: default_error_message.into(),
            default_value,
            max_retries: 0,
            retry_delay: DEFAULT_RETRY_DELAY,
            should_retry: Arc::new(ApiError::is_server_error),
        }
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub fn should_retry(
        mut self,
        predicate: impl Fn(&ApiError) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.should_retry = Arc::new(predicate);
        self
    }
}

/// Generic retrying call wrapper
#[derive(Debug, Default)]
pub struct RequestExecutor {
    state: Mutex<RequestState>,
}

/// Clears `loading` however `execute` exits, cancellation included
struct LoadingGuard<'a> {
    state: &'a Mutex<RequestState>,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        lock(self.state).loading = false;
    }
}

fn lock(state: &Mutex<RequestState>) -> MutexGuard<'_, RequestState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl RequestExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current state
    pub fn state(&self) -> RequestState {
        lock(&self.state).clone()
    }

    pub fn is_loading(&self) -> bool {
        lock(&self.state).loading
    }

    pub fn error(&self) -> Option<RequestError> {
        lock(&self.state).error.clone()
    }

    pub fn retries(&self) -> u32 {
        lock(&self.state).retries
    }

    pub fn data<T: Clone + 'static>(&self) -> Option<T> {
        lock(&self.state).data::<T>()
    }

    pub fn clear_error(&self) {
        lock(&self.state).error = None;
    }

    fn store_data<T: Clone + Send + Sync + 'static>(&self, value: &T) {
        lock(&self.state).data = Some(Arc::new(value.clone()));
    }

    /// Run `operation`, retrying per `options`, and return its value or the default
    ///
    /// Total attempts are at most `max_retries + 1`. A failure that is not
    /// retryable, or the last failure, is classified and recorded as the
    /// error state and the default value is returned. The returned value is
    /// also kept as the state's data.
    pub async fn execute<T, F, Fut>(&self, mut operation: F, options: ExecuteOptions<T>) -> T
    where
        T: Clone + Send + Sync + 'static,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        {
            let mut state = lock(&self.state);
            state.loading = true;
            state.error = None;
            state.retries = 0;
            state.data = None;
        }
        let _loading = LoadingGuard { state: &self.state };

        loop {
            let err = match operation().await {
                Ok(value) => {
                    self.store_data(&value);
                    return value;
                }
                Err(err) => err,
            };

            let retries = self.retries();
            if retries < options.max_retries && (options.should_retry)(&err) {
                debug!(
                    "Attempt {} failed ({}), retrying in {:?}",
                    retries + 1,
                    err,
                    options.retry_delay
                );
                lock(&self.state).retries = retries + 1;
                tokio::time::sleep(options.retry_delay).await;
                continue;
            }

            let error = RequestError::classify(err, &options.default_error_message);
            warn!(
                "{} ({:?}, status {:?}): {}",
                options.default_error_message, error.kind, error.status, error.original
            );
            lock(&self.state).error = Some(error);
            self.store_data(&options.default_value);
            return options.default_value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn server_error() -> ApiError {
        ApiError::from_status(502, Some("Bad gateway".to_string()))
    }

    #[tokio::test]
    async fn test_success_returns_value_and_clears_loading() {
        let executor = RequestExecutor::new();
        let value = executor
            .execute(
                || async { Ok::<_, ApiError>(7) },
                ExecuteOptions::new("failed", 0),
            )
            .await;

        assert_eq!(value, 7);
        let state = executor.state();
        assert!(!state.loading);
        assert!(state.error.is_none());
        assert_eq!(state.retries, 0);
        assert_eq!(state.data::<i32>(), Some(7));
    }

    #[tokio::test]
    async fn test_result_is_kept_as_data() {
        let executor = RequestExecutor::new();
        executor
            .execute(
                || async { Ok::<_, ApiError>(vec!["main".to_string()]) },
                ExecuteOptions::new("failed", Vec::new()),
            )
            .await;
        assert_eq!(executor.data::<Vec<String>>(), Some(vec!["main".to_string()]));
        assert_eq!(executor.data::<u32>(), None);

        executor
            .execute(
                || async { Err::<Vec<String>, _>(server_error()) },
                ExecuteOptions::new("failed", vec!["fallback".to_string()]),
            )
            .await;
        assert_eq!(executor.data::<Vec<String>>(), Some(vec!["fallback".to_string()]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_failing_op_is_attempted_max_retries_plus_one() {
        let executor = RequestExecutor::new();
        let counter = AtomicU32::new(0);
        let attempts = &counter;

        let value = executor
            .execute(
                move || async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err::<u32, _>(ApiError::Transport("refused".into()))
                },
                ExecuteOptions::new("failed", 99)
                    .max_retries(2)
                    .should_retry(|_| true),
            )
            .await;

        assert_eq!(value, 99);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert_eq!(executor.retries(), 2);
        assert!(!executor.is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_waits_for_delay() {
        let executor = RequestExecutor::new();
        let start = tokio::time::Instant::now();

        executor
            .execute(
                || async { Err::<(), _>(server_error()) },
                ExecuteOptions::new("failed", ())
                    .max_retries(2)
                    .retry_delay(Duration::from_millis(250)),
            )
            .await;

        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(500));
        assert!(elapsed < Duration::from_millis(750));
    }

    #[tokio::test]
    async fn test_zero_retries_classifies_first_failure() {
        let executor = RequestExecutor::new();
        let counter = AtomicU32::new(0);
        let attempts = &counter;

        let value = executor
            .execute(
                move || async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err::<Vec<u8>, _>(server_error())
                },
                ExecuteOptions::new("Failed to load repositories", Vec::new()),
            )
            .await;

        assert!(value.is_empty());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        let error = executor.error().unwrap();
        assert_eq!(error.kind, ErrorKind::Server);
        assert_eq!(error.status, Some(502));
        assert_eq!(error.message, "Bad gateway");
        assert_eq!(error.original, server_error());
    }

    #[tokio::test(start_paused = true)]
    async fn test_client_error_is_not_retried_by_default() {
        let executor = RequestExecutor::new();
        let counter = AtomicU32::new(0);
        let attempts = &counter;

        executor
            .execute(
                move || async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(ApiError::from_status(404, None))
                },
                ExecuteOptions::new("Failed to load content", ()).max_retries(3),
            )
            .await;

        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        let error = executor.error().unwrap();
        assert_eq!(error.kind, ErrorKind::Client);
        assert_eq!(error.message, "Failed to load content");
        assert_eq!(executor.retries(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_when_a_retry_succeeds() {
        let executor = RequestExecutor::new();
        let counter = AtomicU32::new(0);
        let attempts = &counter;

        let value = executor
            .execute(
                move || async move {
                    if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(server_error())
                    } else {
                        Ok("ok")
                    }
                },
                ExecuteOptions::new("failed", "default").max_retries(2),
            )
            .await;

        assert_eq!(value, "ok");
        assert_eq!(executor.retries(), 1);
        assert!(executor.error().is_none());
    }

    #[tokio::test]
    async fn test_new_execute_resets_previous_state() {
        let executor = RequestExecutor::new();
        executor
            .execute(
                || async { Err::<(), _>(server_error()) },
                ExecuteOptions::new("failed", ()),
            )
            .await;
        assert!(executor.error().is_some());

        executor
            .execute(|| async { Ok(()) }, ExecuteOptions::new("failed", ()))
            .await;
        assert!(executor.error().is_none());
    }

    #[tokio::test]
    async fn test_transport_error_is_client_kind() {
        let executor = RequestExecutor::new();
        executor
            .execute(
                || async { Err::<(), _>(ApiError::Transport("dns".into())) },
                ExecuteOptions::new("Network down", ()),
            )
            .await;

        let error = executor.error().unwrap();
        assert_eq!(error.kind, ErrorKind::Client);
        assert_eq!(error.status, None);
        assert_eq!(error.to_string(), "Network down");
    }
}
