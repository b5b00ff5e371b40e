//! Bounded retry around a single logical remote call.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use conduit_core::{context, ConduitConfig, ConduitResult, ConfigError, TerminalError, TransientError};

/// Retry configuration for one caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total invocations allowed, counting the first one.
    pub max_attempts: u32,
    /// Delay between a failed attempt and the next one.
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> ConduitResult<Self> {
        if max_attempts == 0 {
            return Err(ConfigError::invalid("retry_count", max_attempts, "must be at least 1").into());
        }
        Ok(Self {
            max_attempts,
            backoff: Duration::ZERO,
        })
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn from_config(config: &ConduitConfig) -> ConduitResult<Self> {
        Ok(Self::new(config.retry_count)?.with_backoff(config.retry_backoff))
    }
}

/// Called after every failed attempt with its 1-based number and error.
pub type AttemptObserver = Arc<dyn Fn(u32, &TransientError) + Send + Sync>;

/// Per-invocation attempt state.
#[derive(Debug, Default)]
struct RetryAttempt {
    attempt_number: u32,
    last_error: Option<TransientError>,
}

/// Runs a remote call up to `max_attempts` times.
///
/// Failed attempts are logged and counted but never surfaced; the caller sees
/// either the first success or a [`TerminalError`] wrapping the last failure.
#[derive(Clone)]
pub struct RetryingCaller {
    policy: RetryPolicy,
    observer: Option<AttemptObserver>,
}

impl RetryingCaller {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: AttemptObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub async fn invoke<F, Fut, T>(&self, mut call: F) -> Result<T, TerminalError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, TransientError>>,
    {
        let mut state = RetryAttempt::default();

        loop {
            let error = match call().await {
                Ok(value) => {
                    if let Some(previous) = &state.last_error {
                        tracing::info!(
                            attempts = state.attempt_number + 1,
                            previous_error = %previous,
                            "Remote call recovered after retry"
                        );
                    }
                    return Ok(value);
                }
                Err(error) => error,
            };

            state.attempt_number += 1;
            let correlation_id = context::correlation_id();
            tracing::warn!(
                attempt = state.attempt_number,
                max_attempts = self.policy.max_attempts,
                endpoint = error.endpoint(),
                correlation_id = correlation_id.as_deref().unwrap_or("-"),
                error = %error,
                "Remote call attempt failed"
            );
            if let Some(observer) = &self.observer {
                observer(state.attempt_number, &error);
            }

            if state.attempt_number >= self.policy.max_attempts {
                tracing::error!(
                    attempts = state.attempt_number,
                    endpoint = error.endpoint(),
                    correlation_id = correlation_id.as_deref().unwrap_or("-"),
                    error = %error,
                    "Remote call exhausted retries"
                );
                return Err(TerminalError {
                    attempts: state.attempt_number,
                    last_error: error,
                });
            }
            state.last_error = Some(error);

            if !self.policy.backoff.is_zero() {
                tokio::time::sleep(self.policy.backoff).await;
            }
        }
    }
}

impl std::fmt::Debug for RetryingCaller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryingCaller")
            .field("policy", &self.policy)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}
