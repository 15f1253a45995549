//! Retry engine: exponential backoff with jitter, driven by the
//! [`Backoff`]/[`Jitter`]/[`Sleeper`] primitives and a `Retry-After`
//! override when the server names an explicit delay.

use std::sync::Arc;
use std::time::Duration;

use crate::backoff::Backoff;
use crate::clock::Clock;
use crate::jitter::Jitter;
use crate::sleeper::Sleeper;

/// Retry policy matching the fetch pipeline's defaults (§4.3).
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Backoff,
    pub jitter: Jitter,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Backoff::exponential(Duration::from_secs(1)),
            jitter: Jitter::percent(0.25),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Delay before the `attempt`th retry (0-indexed: `attempt` is the
    /// number of attempts already made). Matches
    /// `base_delay * exponential_base**attempt * (1 + U)`, capped at
    /// `max_delay`, by calling the 1-indexed [`Backoff::delay`] with
    /// `attempt + 1`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let raw = self.backoff.delay(attempt as usize + 1);
        let jittered = self.jitter.apply(raw);
        jittered.min(self.max_delay)
    }

    /// As [`Self::delay_for`] but honouring a server-provided
    /// `Retry-After` duration when present, bypassing backoff/jitter
    /// entirely.
    pub fn delay_for_with_retry_after(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        retry_after.unwrap_or_else(|| self.delay_for(attempt))
    }
}

/// Whether a failure is worth retrying, independent of any particular
/// transport crate's error type: the caller classifies its error into
/// one of these buckets first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryableKind {
    NetworkOrTimeout,
    HttpStatus(u16),
    Other,
}

pub fn should_retry(kind: RetryableKind) -> bool {
    match kind {
        RetryableKind::NetworkOrTimeout => true,
        RetryableKind::HttpStatus(status) => status >= 500 || status == 429,
        RetryableKind::Other => false,
    }
}

/// Outcome of a retry loop run through [`with_retry`].
pub enum RetryOutcome<T, E> {
    Succeeded(T),
    Exhausted(E),
}

/// Run `op` up to `policy.max_attempts` times, sleeping between attempts
/// per the backoff/jitter curve. `classify` maps an error to a
/// [`RetryableKind`] to decide whether another attempt is warranted;
/// `retry_after` lets the caller surface a `Retry-After` header value for
/// the next delay.
pub async fn with_retry<T, E, Fut>(
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    mut op: impl FnMut(u32) -> Fut,
    classify: impl Fn(&E) -> RetryableKind,
    mut retry_after: impl FnMut(&E) -> Option<Duration>,
) -> RetryOutcome<T, E>
where
    Fut: std::future::Future<Output = Result<T, E>>,
{
    let mut last_err = None;
    for attempt in 0..policy.max_attempts {
        match op(attempt).await {
            Ok(value) => return RetryOutcome::Succeeded(value),
            Err(err) => {
                let retryable = should_retry(classify(&err));
                let is_last = attempt + 1 >= policy.max_attempts;
                if !retryable || is_last {
                    return RetryOutcome::Exhausted(err);
                }
                let delay = policy.delay_for_with_retry_after(attempt, retry_after(&err));
                sleeper.sleep(delay).await;
                last_err = Some(err);
            }
        }
    }
    // unreachable when max_attempts >= 1, but keeps the function total.
    RetryOutcome::Exhausted(last_err.expect("with_retry: max_attempts must be >= 1"))
}

/// Elapsed-time helper used by callers that want to record attempt
/// durations alongside retry results (see [`crate::model::FetchAttempt`]).
pub fn elapsed_millis(clock: &Arc<dyn Clock>, start_millis: u64) -> u64 {
    clock.now_millis().saturating_sub(start_millis)
}
