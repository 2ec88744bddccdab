//! Bounded polling.
//!
//! Every convergence wait in the engine draws a [`PollBudget`] from a shared
//! [`Waiter`]. A budget allows at most `max_iterations` probes and, when set,
//! stops once `timeout` has elapsed. Exhaustion is fatal and never retried.

use std::fmt::Display;
use std::time::Duration;

use tierbed_core::config::WaitConfig;
use tierbed_core::metrics as m;
use tokio::time::Instant;
use tracing::{trace, warn};

use crate::error::LifecycleError;

/// Default pause between probes.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(2_500);

/// Default probe cap.
pub const DEFAULT_MAX_ITERATIONS: u32 = 480;

/// Shared limits for polling waits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Waiter {
    interval: Duration,
    max_iterations: u32,
    timeout: Option<Duration>,
}

impl Default for Waiter {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            timeout: None,
        }
    }
}

impl Waiter {
    pub fn new(interval: Duration, max_iterations: u32) -> Self {
        Self {
            interval,
            max_iterations: max_iterations.max(1),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn from_config(config: &WaitConfig) -> Self {
        let waiter = Self::new(config.interval(), config.max_iterations);
        match config.timeout() {
            Some(timeout) => waiter.with_timeout(timeout),
            None => waiter,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    /// Starts a new budget for one wait.
    pub fn budget(&self, what: &str, name: &str) -> PollBudget {
        PollBudget {
            waiter: *self,
            what: what.to_owned(),
            name: name.to_owned(),
            started: Instant::now(),
            iterations: 0,
        }
    }
}

/// Probe allowance for a single wait.
///
/// Callers probe first, then call [`tick`](Self::tick) when the condition is
/// not yet met:
///
/// ```ignore
/// let mut budget = waiter.budget("completion", name);
/// loop {
///     let state = backend.get_phase_state(name).await?;
///     if state.is_complete() {
///         break;
///     }
///     budget.tick(&state).await?;
/// }
/// ```
#[derive(Debug)]
pub struct PollBudget {
    waiter: Waiter,
    what: String,
    name: String,
    started: Instant,
    iterations: u32,
}

impl PollBudget {
    /// Records a failed probe and sleeps before the next one.
    ///
    /// # Errors
    ///
    /// `LifecycleError::WaitExceeded` once the probe cap or timeout is reached.
    pub async fn tick(&mut self, last_state: impl Display) -> Result<(), LifecycleError> {
        self.iterations += 1;
        let elapsed = self.started.elapsed();
        let timed_out = self.waiter.timeout.is_some_and(|t| elapsed >= t);
        if self.iterations >= self.waiter.max_iterations || timed_out {
            let last_state = last_state.to_string();
            warn!(
                what = self.what.as_str(),
                name = self.name.as_str(),
                iterations = self.iterations,
                elapsed_ms = elapsed.as_millis() as u64,
                last_state = last_state.as_str(),
                "wait bound exceeded"
            );
            metrics::counter!(m::WAITS_EXCEEDED_TOTAL).increment(1);
            return Err(LifecycleError::WaitExceeded {
                what: self.what.clone(),
                name: self.name.clone(),
                iterations: self.iterations,
                elapsed,
                last_state,
            });
        }
        trace!(
            what = self.what.as_str(),
            name = self.name.as_str(),
            iteration = self.iterations,
            %last_state,
            "condition not met yet"
        );
        tokio::time::sleep(self.waiter.interval).await;
        Ok(())
    }

    /// Failed probes so far.
    pub fn iterations(&self) -> u32 {
        self.iterations
    }
}
