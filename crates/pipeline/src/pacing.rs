//! Rate-limited external calls.
//!
//! A [`RateLimitedCaller`] lives for one pipeline run and spaces that run's
//! calls according to a [`Pacer`]. Runs for different engagements each have
//! their own caller and are not throttled against each other. Calls are
//! never retried.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::CollaboratorError;

/// Decides how long to wait before a call.
pub trait Pacer: Send + Sync {
    /// Delay before the call that follows `calls_made` earlier calls.
    fn delay_before(&self, calls_made: usize) -> Duration;
}

/// Waits a fixed delay before every call except the first.
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay(pub Duration);

impl Pacer for FixedDelay {
    fn delay_before(&self, calls_made: usize) -> Duration {
        if calls_made == 0 {
            Duration::ZERO
        } else {
            self.0
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CallError {
    #[error("cancelled")]
    Cancelled,

    #[error(transparent)]
    Failed(#[from] CollaboratorError),
}

pub struct RateLimitedCaller {
    pacer: Arc<dyn Pacer>,
    cancel: CancellationToken,
    calls_made: usize,
}

impl RateLimitedCaller {
    pub fn new(pacer: Arc<dyn Pacer>, cancel: CancellationToken) -> Self {
        Self {
            pacer,
            cancel,
            calls_made: 0,
        }
    }

    pub fn calls_made(&self) -> usize {
        self.calls_made
    }

    /// Wait out the pacing delay, then run `call`.
    ///
    /// Both the wait and the call are abandoned when the token is
    /// cancelled. A failed call still counts towards pacing.
    pub async fn call<T, F, Fut>(&mut self, call: F) -> Result<T, CallError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, CollaboratorError>>,
    {
        let delay = self.pacer.delay_before(self.calls_made);
        if !delay.is_zero() {
            tracing::debug!(delay_ms = delay.as_millis() as u64, "Pacing before external call");
            tokio::select! {
                _ = self.cancel.cancelled() => return Err(CallError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }

        self.calls_made += 1;
        tokio::select! {
            _ = self.cancel.cancelled() => Err(CallError::Cancelled),
            result = call() => result.map_err(CallError::Failed),
        }
    }
}
