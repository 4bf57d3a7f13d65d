//! State polling helper
//!
//! [`StateChangeConf`] waits for a remote object to report one of N target
//! state strings, re-reading it on a fixed interval. It is a single linear
//! polling loop bounded by the operation timeout: a refresh error is
//! terminal, a state that is neither pending nor target is terminal, and
//! there is no retry on "wrong state" — the loop simply keeps polling
//! pending states until the deadline.

use crate::context::Context;
use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Async closure re-reading the watched object; yields the object plus the
/// state string it currently reports.
pub type RefreshFn<T> =
    Box<dyn Fn() -> Pin<Box<dyn Future<Output = Result<(T, String), BoxError>> + Send>> + Send + Sync>;

pub struct StateChangeConf<T> {
    /// States that mean "keep waiting".
    pub pending: Vec<String>,
    /// States that mean "done".
    pub target: Vec<String>,
    pub refresh: RefreshFn<T>,
    pub timeout: Duration,
    /// Wait before the first refresh.
    pub delay: Duration,
    /// Wait between refreshes.
    pub poll_interval: Duration,
}

#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error("error refreshing state: {0}")]
    Refresh(String),

    #[error("unexpected state '{state}', wanted target '{target}'")]
    UnexpectedState { state: String, target: String },

    #[error("timeout while waiting for state to become '{target}' (last state: '{last_state}')")]
    Timeout { target: String, last_state: String },

    #[error("operation cancelled while waiting for state '{target}'")]
    Cancelled { target: String },
}

impl<T> StateChangeConf<T> {
    /// Polls until a target state is observed or the timeout (or the
    /// context deadline, whichever is sooner) expires.
    pub async fn wait_for_state(&self, ctx: &Context) -> Result<T, PollError> {
        let mut deadline = Instant::now() + self.timeout;
        if let Some(ctx_deadline) = ctx.deadline() {
            deadline = deadline.min(ctx_deadline);
        }

        let target = self.target.join(", ");
        let mut last_state = String::new();

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        loop {
            if ctx.is_cancelled() {
                return Err(PollError::Cancelled {
                    target: target.clone(),
                });
            }
            if Instant::now() >= deadline {
                return Err(PollError::Timeout {
                    target: target.clone(),
                    last_state,
                });
            }

            let (value, state) = (self.refresh)()
                .await
                .map_err(|e| PollError::Refresh(e.to_string()))?;

            tracing::debug!(state = %state, target = %target, "polled state");

            if self.target.iter().any(|t| t == &state) {
                return Ok(value);
            }

            if !self.pending.iter().any(|p| p == &state) {
                return Err(PollError::UnexpectedState {
                    state,
                    target: target.clone(),
                });
            }

            last_state = state;
            let remaining = deadline.saturating_duration_since(Instant::now());
            tokio::time::sleep(self.poll_interval.min(remaining)).await;
        }
    }
}
