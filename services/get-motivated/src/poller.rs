//! Poll loop state machine
//!
//! Pure state machine: receives events, returns (new_state, action).
//! `run` drives it: it performs one fetch per iteration, sleeps a random
//! interval after a success, retries immediately after a failure, and gives
//! up after `MAX_CONSECUTIVE_ERRORS` failures in a row.
//!
//! Shutdown is cooperative. The stop flag is checked before every iteration
//! and cuts the inter-post sleep short, but a fetch that has already started
//! always runs to completion.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use rand::RngExt;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};

/// Failures in a row that end the process.
pub const MAX_CONSECUTIVE_ERRORS: u32 = 3;

/// Default lower bound between posts (2 hours)
pub const DEFAULT_MIN_INTERVAL_SECS: u64 = 2 * 60 * 60;

/// Default upper bound between posts (4 hours)
pub const DEFAULT_MAX_INTERVAL_SECS: u64 = 4 * 60 * 60;

/// One poll iteration: fetch a post, show it, return its URL.
///
/// Uses `Pin<Box<dyn Future>>` so the loop can take `&dyn PostSource`.
pub trait PostSource: Send + Sync {
    fn next_post(&self) -> Pin<Box<dyn Future<Output = Result<String>> + Send + '_>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Polling { consecutive_errors: u32 },
    /// Terminal: stop was requested
    Stopped,
    /// Terminal: too many consecutive failures
    Failed { consecutive_errors: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollEvent {
    FetchSucceeded,
    FetchFailed,
    Interrupted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollAction {
    /// Wait a random interval before the next iteration
    Sleep,
    /// Start the next iteration immediately
    Retry,
    /// Leave the loop cleanly
    Stop,
    /// Leave the loop with `TooManyErrors`
    Abort,
    None,
}

/// Handle a state transition. Pure function: no I/O.
pub fn handle_event(state: PollState, event: PollEvent) -> (PollState, PollAction) {
    match (state, event) {
        (PollState::Polling { .. }, PollEvent::FetchSucceeded) => (
            PollState::Polling {
                consecutive_errors: 0,
            },
            PollAction::Sleep,
        ),

        (PollState::Polling { consecutive_errors }, PollEvent::FetchFailed) => {
            let consecutive_errors = consecutive_errors + 1;
            if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                (
                    PollState::Failed { consecutive_errors },
                    PollAction::Abort,
                )
            } else {
                (
                    PollState::Polling { consecutive_errors },
                    PollAction::Retry,
                )
            }
        }

        (PollState::Polling { .. }, PollEvent::Interrupted) => {
            (PollState::Stopped, PollAction::Stop)
        }

        // Terminal states absorb everything
        (state, _event) => (state, PollAction::None),
    }
}

/// Inclusive range the inter-post sleep is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollInterval {
    min_secs: u64,
    max_secs: u64,
}

impl PollInterval {
    pub fn new(min_secs: u64, max_secs: u64) -> Self {
        Self {
            min_secs: min_secs.min(max_secs),
            max_secs: min_secs.max(max_secs),
        }
    }

    pub fn min(&self) -> Duration {
        Duration::from_secs(self.min_secs)
    }

    pub fn max(&self) -> Duration {
        Duration::from_secs(self.max_secs)
    }

    /// Uniformly random whole-second duration in `[min, max]`.
    pub fn pick(&self) -> Duration {
        Duration::from_secs(rand::rng().random_range(self.min_secs..=self.max_secs))
    }
}

impl Default for PollInterval {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_INTERVAL_SECS, DEFAULT_MAX_INTERVAL_SECS)
    }
}

/// Run the poll loop until stop is requested or too many iterations fail.
///
/// Returns `Ok(())` on a requested stop and `Error::TooManyErrors` after
/// `MAX_CONSECUTIVE_ERRORS` failures in a row.
pub async fn run(
    source: &dyn PostSource,
    interval: PollInterval,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let mut state = PollState::Polling {
        consecutive_errors: 0,
    };

    loop {
        let event = if *shutdown.borrow() {
            PollEvent::Interrupted
        } else {
            match source.next_post().await {
                Ok(url) => {
                    debug!(url, "poll iteration succeeded");
                    PollEvent::FetchSucceeded
                }
                Err(e) => {
                    let kind = match &e {
                        Error::Auth(_) => "auth",
                        Error::Content(_) => "content",
                        Error::TooManyErrors { .. } => "fatal",
                    };
                    warn!(kind, error = %e, "poll iteration failed");
                    PollEvent::FetchFailed
                }
            }
        };

        let (next, action) = handle_event(state, event);
        state = next;

        match action {
            PollAction::Sleep => {
                let delay = interval.pick();
                info!(
                    delay_secs = delay.as_secs(),
                    "next post in {:.2} hours",
                    delay.as_secs_f64() / 3600.0
                );
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = stop_requested(&mut shutdown) => {}
                }
            }
            PollAction::Retry => {}
            PollAction::Stop => {
                info!("stop requested, leaving poll loop");
                return Ok(());
            }
            PollAction::Abort => {
                let consecutive = match state {
                    PollState::Failed { consecutive_errors } => consecutive_errors,
                    _ => MAX_CONSECUTIVE_ERRORS,
                };
                error!(
                    critical = true,
                    consecutive, "got {consecutive} consecutive errors, stopping"
                );
                return Err(Error::TooManyErrors { consecutive });
            }
            PollAction::None => {}
        }
    }
}

/// Resolves once stop has been requested.
async fn stop_requested(shutdown: &mut watch::Receiver<bool>) {
    if shutdown.wait_for(|stop| *stop).await.is_err() {
        // Sender dropped without ever asking to stop; nothing can interrupt now.
        std::future::pending::<()>().await;
    }
}
