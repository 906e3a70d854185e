//! Retry Executor: re-runs a failed endpoint call under a [`RetryPolicy`].

use std::future::Future;
use std::time::Duration;

use comply_core::{ConsoleError, Result, RetryPolicy};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span};

/// Wraps command/action calls with bounded, cancellable retries.
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    policy: RetryPolicy,
    span: Span,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            span: tracing::info_span!("retry_executor"),
        }
    }

    /// Replaces the span events are emitted under.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Runs `operation` until it succeeds, fails with a non-retryable error,
    /// exhausts `max_retries` additional attempts, or `cancel` fires.
    ///
    /// `operation` receives the 0-based attempt number. The last error is
    /// returned when attempts run out; cancellation yields
    /// [`ConsoleError::Cancelled`].
    pub async fn execute<T, F, Fut>(&self, cancel: &CancellationToken, mut operation: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let policy = &self.policy;

        async move {
            let mut attempt = 0u32;
            loop {
                if cancel.is_cancelled() {
                    return Err(ConsoleError::Cancelled);
                }

                let result = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(ConsoleError::Cancelled),
                    result = operation(attempt) => result,
                };

                let err = match result {
                    Ok(value) => return Ok(value),
                    Err(err) => err,
                };

                let delay = match next_step(policy, &err, attempt) {
                    NextStep::Retry(delay) => delay,
                    NextStep::NotRetryable => {
                        tracing::debug!(error = %err, "not retryable");
                        return Err(err);
                    }
                    NextStep::Exhausted => {
                        tracing::warn!(attempts = attempt + 1, error = %err, "retries exhausted");
                        return Err(err);
                    }
                };

                tracing::debug!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "retrying after failure"
                );

                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(ConsoleError::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
                attempt += 1;
            }
        }
        .instrument(self.span.clone())
        .await
    }
}

/// What follows a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NextStep {
    Retry(Duration),
    NotRetryable,
    Exhausted,
}

/// Retryability is decided first so the log names why the executor stopped.
fn next_step(policy: &RetryPolicy, err: &ConsoleError, attempt: u32) -> NextStep {
    let Some(delay) = err
        .as_protocol()
        .and_then(|protocol| policy.delay_for(protocol, attempt))
    else {
        return NextStep::NotRetryable;
    };
    if attempt >= policy.max_retries {
        NextStep::Exhausted
    } else {
        NextStep::Retry(delay)
    }
}

impl Default for RetryExecutor {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}
