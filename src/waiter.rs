//! Polling state machine for asynchronous control-plane operations.
//!
//! A [`Waiter`] sleeps an initial delay, then refreshes the resource every poll
//! interval until its state reaches a target, hits an error state, leaves the pending
//! set, or the total timeout elapses. A not-found refresh is the virtual state
//! [`NOT_FOUND`]; transport failures and 5xx responses are logged and polling continues.
//!
//! ```rust
//! use automq_reconciler::client::RequestContext;
//! use automq_reconciler::sleeper::InstantSleeper;
//! use automq_reconciler::waiter::Waiter;
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let waiter = Waiter::to_provision("kafka instance kf-1", Duration::from_secs(900))
//!     .with_sleeper(InstantSleeper);
//! let ctx = RequestContext::new();
//! let out = waiter
//!     .wait(&ctx, || async { Ok(("kf-1", "Available".to_string())) })
//!     .await
//!     .unwrap();
//! assert_eq!(out, Some("kf-1"));
//! # }
//! ```

use crate::client::RequestContext;
use crate::clock::{Clock, MonotonicClock};
use crate::error::{Error, Result};
use crate::sleeper::{InstantSleeper, Sleeper, TokioSleeper};
use crate::telemetry::{ReconcileEvent, Telemetry, WaitEvent};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

pub const CREATING: &str = "Creating";
pub const CHANGING: &str = "Changing";
pub const AVAILABLE: &str = "Available";
pub const DELETING: &str = "Deleting";
pub const ERROR: &str = "Error";
/// Virtual state reported when a refresh is not found.
pub const NOT_FOUND: &str = "NotFound";

pub const DEFAULT_DELAY: Duration = Duration::from_secs(20);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Timing and observability shared by every waiter a controller builds.
#[derive(Clone, Debug)]
pub struct WaitConfig {
    pub delay: Duration,
    pub poll_interval: Duration,
    pub sleeper: Arc<dyn Sleeper>,
    pub clock: Arc<dyn Clock>,
    pub telemetry: Telemetry,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            delay: DEFAULT_DELAY,
            poll_interval: DEFAULT_POLL_INTERVAL,
            sleeper: Arc::new(TokioSleeper),
            clock: Arc::new(MonotonicClock::default()),
            telemetry: Telemetry::default(),
        }
    }
}

impl WaitConfig {
    /// No delays at all. For tests and fakes.
    pub fn instant() -> Self {
        Self { sleeper: Arc::new(InstantSleeper), ..Self::default() }
    }

    pub fn with_sleeper<S: Sleeper + 'static>(mut self, sleeper: S) -> Self {
        self.sleeper = Arc::new(sleeper);
        self
    }

    pub fn with_clock<C: Clock + 'static>(mut self, clock: C) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn with_telemetry(mut self, telemetry: Telemetry) -> Self {
        self.telemetry = telemetry;
        self
    }
}

/// Pending/target state machine with injectable time.
#[derive(Clone)]
pub struct Waiter {
    resource: String,
    pending: Vec<String>,
    target: Vec<String>,
    error_states: Vec<String>,
    delay: Duration,
    poll_interval: Duration,
    timeout: Duration,
    sleeper: Arc<dyn Sleeper>,
    clock: Arc<dyn Clock>,
    telemetry: Telemetry,
}

impl fmt::Debug for Waiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Waiter")
            .field("resource", &self.resource)
            .field("pending", &self.pending)
            .field("target", &self.target)
            .field("error_states", &self.error_states)
            .field("delay", &self.delay)
            .field("poll_interval", &self.poll_interval)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl Waiter {
    /// `resource` names the waited-on object in errors and events.
    pub fn new<P, T>(resource: impl Into<String>, pending: P, target: T, timeout: Duration) -> Self
    where
        P: IntoIterator,
        P::Item: Into<String>,
        T: IntoIterator,
        T::Item: Into<String>,
    {
        Self {
            resource: resource.into(),
            pending: pending.into_iter().map(Into::into).collect(),
            target: target.into_iter().map(Into::into).collect(),
            error_states: vec![ERROR.to_string()],
            delay: DEFAULT_DELAY,
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout,
            sleeper: Arc::new(TokioSleeper),
            clock: Arc::new(MonotonicClock::default()),
            telemetry: Telemetry::default(),
        }
    }

    /// `Creating | Changing` until `Available`.
    pub fn to_provision(resource: impl Into<String>, timeout: Duration) -> Self {
        Self::new(resource, [CREATING, CHANGING], [AVAILABLE], timeout)
    }

    /// `Deleting` until the resource is gone.
    pub fn to_deleted(resource: impl Into<String>, timeout: Duration) -> Self {
        Self::new(resource, [DELETING], [NOT_FOUND], timeout)
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_error_states<I>(mut self, states: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.error_states = states.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_sleeper<S: Sleeper + 'static>(mut self, sleeper: S) -> Self {
        self.sleeper = Arc::new(sleeper);
        self
    }

    pub fn with_clock<C: Clock + 'static>(mut self, clock: C) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn with_telemetry(mut self, telemetry: Telemetry) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Take delay, cadence, time sources and telemetry from `config`.
    pub fn configured(mut self, config: &WaitConfig) -> Self {
        self.delay = config.delay;
        self.poll_interval = config.poll_interval;
        self.sleeper = config.sleeper.clone();
        self.clock = config.clock.clone();
        self.telemetry = config.telemetry.clone();
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Poll `refresh` until a target state is reached.
    ///
    /// Returns the last refreshed object, or `None` when the target is [`NOT_FOUND`].
    pub async fn wait<T, F, Fut>(&self, ctx: &RequestContext, mut refresh: F) -> Result<Option<T>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<(T, String)>>,
    {
        let timeout_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX);
        let deadline = self.clock.now_millis().saturating_add(timeout_ms);
        let mut last_state = String::from("<none>");
        let mut attempt = 0usize;

        self.pause(ctx, self.delay).await?;

        loop {
            attempt += 1;
            let (object, state) = match refresh().await {
                Ok((object, state)) => (Some(object), state),
                Err(err) if err.is_not_found() => (None, NOT_FOUND.to_string()),
                Err(err) if err.is_retryable() => {
                    tracing::warn!(resource = %self.resource, attempt, error = %err, "refresh failed, will retry");
                    self.check_deadline(deadline, &last_state).await?;
                    self.pause(ctx, self.poll_interval).await?;
                    continue;
                }
                Err(err) => return Err(err),
            };

            tracing::debug!(resource = %self.resource, state = %state, attempt, "polled");
            self.emit(WaitEvent::Polled {
                resource: self.resource.clone(),
                state: state.clone(),
                attempt,
            })
            .await;

            if self.target.contains(&state) {
                self.emit(WaitEvent::Reached {
                    resource: self.resource.clone(),
                    state: state.clone(),
                    polls: attempt,
                })
                .await;
                return Ok(object);
            }
            if self.error_states.contains(&state) {
                let err = Error::WaitFailed { resource: self.resource.clone(), state };
                return Err(self.fail(err).await);
            }
            if !self.pending.contains(&state) {
                let err = Error::UnexpectedState {
                    resource: self.resource.clone(),
                    state,
                    expected: self.expected(),
                };
                return Err(self.fail(err).await);
            }

            last_state = state;
            self.check_deadline(deadline, &last_state).await?;
            self.pause(ctx, self.poll_interval).await?;
        }
    }

    fn expected(&self) -> String {
        self.pending.iter().chain(self.target.iter()).cloned().collect::<Vec<_>>().join("|")
    }

    async fn check_deadline(&self, deadline: u64, last_state: &str) -> Result<()> {
        if self.clock.now_millis() >= deadline {
            let err = Error::WaitTimeout {
                resource: self.resource.clone(),
                timeout: self.timeout,
                last_state: last_state.to_string(),
            };
            return Err(self.fail(err).await);
        }
        Ok(())
    }

    /// Sleep unless the reconciliation is cancelled first.
    async fn pause(&self, ctx: &RequestContext, duration: Duration) -> Result<()> {
        if ctx.is_cancelled() {
            return Err(Error::Cancelled { operation: format!("waiting for {}", self.resource) });
        }
        tokio::select! {
            biased;
            _ = ctx.cancelled() => {
                Err(Error::Cancelled { operation: format!("waiting for {}", self.resource) })
            }
            _ = self.sleeper.sleep(duration) => Ok(()),
        }
    }

    async fn fail(&self, err: Error) -> Error {
        tracing::info!(resource = %self.resource, error = %err, "wait failed");
        self.emit(WaitEvent::Failed { resource: self.resource.clone(), reason: err.to_string() })
            .await;
        err
    }

    async fn emit(&self, event: WaitEvent) {
        self.telemetry.emit(ReconcileEvent::Wait(event)).await;
    }
}
