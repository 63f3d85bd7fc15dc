//! Abstraction for sleeping/waiting
//!
//! The waiter sleeps through a `Sleeper` so tests can run state machines without real delays.

use crate::clock::ManualClock;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Abstraction for sleeping/waiting
pub trait Sleeper: Send + Sync + std::fmt::Debug {
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send>>;
}

/// Production sleeper using tokio runtime
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// Test sleeper that doesn't actually sleep
#[derive(Debug, Default, Clone, Copy)]
pub struct InstantSleeper;

impl Sleeper for InstantSleeper {
    fn sleep(&self, _duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(async {})
    }
}

/// Test sleeper that records every requested delay and returns immediately.
///
/// When built with [`TrackingSleeper::advancing`], each sleep also moves a
/// [`ManualClock`] forward, so deadline logic sees time pass.
#[derive(Debug, Clone, Default)]
pub struct TrackingSleeper {
    calls: Arc<Mutex<Vec<Duration>>>,
    clock: Option<ManualClock>,
}

impl TrackingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advancing(clock: ManualClock) -> Self {
        Self { calls: Arc::default(), clock: Some(clock) }
    }

    pub fn calls(&self) -> Vec<Duration> {
        self.calls.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn total(&self) -> Duration {
        self.calls().iter().sum()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap_or_else(|p| p.into_inner()).clear();
    }
}

impl Sleeper for TrackingSleeper {
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        self.calls.lock().unwrap_or_else(|p| p.into_inner()).push(duration);
        if let Some(clock) = &self.clock {
            clock.advance(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX));
        }
        Box::pin(async {})
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::Clock;

    #[tokio::test]
    async fn instant_sleeper_doesnt_sleep() {
        let sleeper = InstantSleeper;
        let start = std::time::Instant::now();
        sleeper.sleep(Duration::from_secs(10)).await;
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn tracking_sleeper_records_calls() {
        let sleeper = TrackingSleeper::new();

        sleeper.sleep(Duration::from_secs(20)).await;
        sleeper.sleep(Duration::from_secs(10)).await;

        assert_eq!(sleeper.calls(), vec![Duration::from_secs(20), Duration::from_secs(10)]);
        assert_eq!(sleeper.total(), Duration::from_secs(30));

        sleeper.clear();
        assert!(sleeper.calls().is_empty());
    }

    #[tokio::test]
    async fn advancing_sleeper_moves_clock() {
        let clock = ManualClock::new();
        let sleeper = TrackingSleeper::advancing(clock.clone());
        sleeper.sleep(Duration::from_millis(250)).await;
        sleeper.sleep(Duration::from_millis(750)).await;
        assert_eq!(clock.now_millis(), 1_000);
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_sleeper_waits_on_runtime_clock() {
        let sleeper = TokioSleeper;
        let start = tokio::time::Instant::now();
        sleeper.sleep(Duration::from_secs(20)).await;
        assert!(start.elapsed() >= Duration::from_secs(20));
    }
}
