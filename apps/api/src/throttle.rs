//! Call Throttle — sliding-window pacing for outbound inference calls.
//!
//! Never rejects a call. When the quota for the trailing window is used up,
//! `admit()` suspends until the oldest admission leaves the window, then
//! records the new one. Every admission consumes quota, whether or not the
//! call it guards later succeeds.

use std::collections::VecDeque;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Debug, Error, PartialEq)]
pub enum ThrottleConfigError {
    #[error("max_calls must be greater than zero")]
    ZeroMaxCalls,

    #[error("window must be longer than zero")]
    ZeroWindow,
}

/// Immutable quota: at most `max_calls` admissions in any trailing `window`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThrottleConfig {
    max_calls: usize,
    window: Duration,
}

impl ThrottleConfig {
    pub fn new(max_calls: usize, window: Duration) -> Result<Self, ThrottleConfigError> {
        if max_calls == 0 {
            return Err(ThrottleConfigError::ZeroMaxCalls);
        }
        if window.is_zero() {
            return Err(ThrottleConfigError::ZeroWindow);
        }
        Ok(Self { max_calls, window })
    }

    pub fn max_calls(&self) -> usize {
        self.max_calls
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

/// Returned by `admit_or_cancel` when the token fires during the wait.
#[derive(Debug, Error, PartialEq)]
#[error("throttle wait was cancelled")]
pub struct AdmissionCancelled;

/// Outbound-call pacing guard.
///
/// `turn` is held for a caller's whole admission, including any wait, so
/// concurrent callers are admitted one at a time in arrival order. The
/// admission log has its own lock, taken only for bookkeeping and never held
/// across a sleep, so readers such as `/health` never wait on a throttled
/// caller.
pub struct CallThrottle {
    config: ThrottleConfig,
    turn: Mutex<()>,
    admissions: Mutex<VecDeque<Instant>>,
}

impl CallThrottle {
    pub fn new(config: ThrottleConfig) -> Self {
        Self {
            config,
            turn: Mutex::new(()),
            admissions: Mutex::new(VecDeque::with_capacity(config.max_calls)),
        }
    }

    pub fn config(&self) -> ThrottleConfig {
        self.config
    }

    /// Waits until one more call fits the quota, then records it.
    pub async fn admit(&self) {
        // A token that is never cancelled cannot abort the wait.
        let never = CancellationToken::new();
        let _ = self.admit_or_cancel(&never).await;
    }

    /// Like `admit`, but gives up if `cancel` fires while waiting, either for
    /// the caller's turn or for the window. A cancelled wait records nothing.
    pub async fn admit_or_cancel(
        &self,
        cancel: &CancellationToken,
    ) -> Result<(), AdmissionCancelled> {
        let _turn = tokio::select! {
            turn = self.turn.lock() => turn,
            _ = cancel.cancelled() => return Err(AdmissionCancelled),
        };

        loop {
            let wait = match self.try_record().await {
                Some(wait) => wait,
                None => return Ok(()),
            };

            warn!(
                "Rate limit reached. Waiting {:.1} seconds...",
                wait.as_secs_f64()
            );

            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                _ = cancel.cancelled() => return Err(AdmissionCancelled),
            }
        }
    }

    /// Records an admission if the window has room. Otherwise returns how
    /// long until the oldest admission leaves it.
    async fn try_record(&self) -> Option<Duration> {
        let mut admissions = self.admissions.lock().await;
        let now = Instant::now();
        evict_expired(&mut admissions, now, self.config.window);

        if admissions.len() < self.config.max_calls {
            admissions.push_back(now);
            debug!(
                "Call admitted ({}/{} in window)",
                admissions.len(),
                self.config.max_calls
            );
            return None;
        }

        let wait = admissions
            .front()
            .map(|&oldest| (oldest + self.config.window).saturating_duration_since(now))
            .unwrap_or_default();
        Some(wait)
    }

    /// Number of admissions still inside the window at this instant.
    pub async fn admissions_in_window(&self) -> usize {
        let mut admissions = self.admissions.lock().await;
        evict_expired(&mut admissions, Instant::now(), self.config.window);
        admissions.len()
    }

    /// Copy of the recorded admission instants, oldest first.
    #[cfg(test)]
    pub async fn recorded_admissions(&self) -> Vec<Instant> {
        self.admissions.lock().await.iter().copied().collect()
    }
}

/// Drops admissions that have left the window ending at `now`.
/// An admission at `t` occupies the half-open interval `[t, t + window)`.
fn evict_expired(admissions: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(&oldest) = admissions.front() {
        if oldest + window > now {
            break;
        }
        admissions.pop_front();
    }
}
