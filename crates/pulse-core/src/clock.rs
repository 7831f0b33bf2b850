//! Time sources for the engines.
//!
//! Both engines are driven by whole-second ticks and never read the clock
//! themselves. The host owns a [`Clock`] for timestamps, a [`Heartbeat`] for
//! the 1-second cadence, and a [`SuspendTracker`] to measure how long the
//! process was suspended.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Source of wall-clock timestamps.
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// The real wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Virtual clock for tests and simulations.
///
/// Clones share the same instant, so a test can keep one handle and give
/// another to the code under test.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Move the clock forward (or backward, for negative values).
    pub fn advance(&self, seconds: i64) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += chrono::Duration::seconds(seconds);
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = instant;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Measures suspension of the host (app backgrounded, laptop asleep).
///
/// Elapsed time is computed from wall-clock timestamps, not tick counts,
/// and is never negative even if the system clock moved backwards.
#[derive(Debug, Clone, Default)]
pub struct SuspendTracker {
    since: Option<DateTime<Utc>>,
}

impl SuspendTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the suspension start. Nothing is recorded when no countdown is
    /// running, since there would be nothing to reconcile on resume.
    pub fn enter_background(&mut self, now: DateTime<Utc>, anything_running: bool) -> bool {
        if !anything_running {
            return false;
        }
        self.since = Some(now);
        true
    }

    /// Whole seconds spent suspended, clamped at zero.
    ///
    /// Returns `None` when no suspension was recorded.
    pub fn enter_foreground(&mut self, now: DateTime<Utc>) -> Option<u64> {
        let since = self.since.take()?;
        let elapsed = now.signed_duration_since(since).num_seconds();
        if elapsed < 0 {
            tracing::warn!(elapsed, "clock moved backwards while suspended; treating as 0s");
        }
        Some(elapsed.max(0) as u64)
    }

    pub fn is_suspended(&self) -> bool {
        self.since.is_some()
    }
}

/// A cancellable 1-second heartbeat.
///
/// Ticks are delivered over a channel. Ticks missed while the receiver was
/// busy are skipped rather than replayed in a burst; suspension is handled
/// by [`SuspendTracker`] and bulk reconciliation instead.
#[derive(Debug)]
pub struct Heartbeat {
    handle: JoinHandle<()>,
}

impl Heartbeat {
    /// Spawn the heartbeat on the current tokio runtime.
    pub fn spawn(period: Duration) -> (Self, mpsc::Receiver<()>) {
        let (tx, rx) = mpsc::channel(1);
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if tx.send(()).await.is_err() {
                    break;
                }
            }
        });
        (Self { handle }, rx)
    }

    pub fn every_second() -> (Self, mpsc::Receiver<()>) {
        Self::spawn(Duration::from_secs(1))
    }

    pub fn cancel(&self) {
        self.handle.abort();
    }

    pub fn is_cancelled(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
    }

    #[test]
    fn manual_clock_handles_share_time() {
        let clock = ManualClock::new(t0());
        let other = clock.clone();
        clock.advance(90);
        assert_eq!(other.now(), t0() + chrono::Duration::seconds(90));
    }

    #[test]
    fn suspend_tracker_measures_elapsed() {
        let mut tracker = SuspendTracker::new();
        assert!(tracker.enter_background(t0(), true));
        assert!(tracker.is_suspended());
        let elapsed = tracker.enter_foreground(t0() + chrono::Duration::seconds(125));
        assert_eq!(elapsed, Some(125));
        assert!(!tracker.is_suspended());
    }

    #[test]
    fn suspend_tracker_clamps_backwards_clock() {
        let mut tracker = SuspendTracker::new();
        tracker.enter_background(t0(), true);
        let elapsed = tracker.enter_foreground(t0() - chrono::Duration::hours(2));
        assert_eq!(elapsed, Some(0));
    }

    #[test]
    fn suspend_tracker_ignores_idle_background() {
        let mut tracker = SuspendTracker::new();
        assert!(!tracker.enter_background(t0(), false));
        assert_eq!(tracker.enter_foreground(t0()), None);
    }

    #[tokio::test(start_paused = true)]
    async fn heartbeat_delivers_ticks_until_cancelled() {
        let (heartbeat, mut rx) = Heartbeat::every_second();
        for _ in 0..3 {
            assert_eq!(rx.recv().await, Some(()));
        }
        heartbeat.cancel();
        // At most one tick can still be buffered; after that the channel closes.
        let mut drained = 0;
        while rx.recv().await.is_some() {
            drained += 1;
        }
        assert!(drained <= 1);
        assert!(heartbeat.is_cancelled());
    }
}
