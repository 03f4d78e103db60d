//! Auto-refresh timer
//!
//! A single deadline, re-armed from "now" every time it fires. The owner
//! awaits [`RefreshScheduler::tick`] inside its own `select!` loop, so
//! cancellation is synchronous: once `stop()` returns, no tick can be
//! observed.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

/// Default ad change interval
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Convert a host-supplied interval in seconds
///
/// Negative, NaN and infinite values disable refresh.
pub fn interval_from_secs(secs: f64) -> Duration {
    match Duration::try_from_secs_f64(secs) {
        Ok(interval) => interval,
        Err(_) => {
            warn!("Ignoring invalid refresh interval {}s, refresh disabled", secs);
            Duration::ZERO
        }
    }
}

/// Repeating reload timer with one pending deadline at most
#[derive(Debug)]
pub struct RefreshScheduler {
    interval: Duration,
    deadline: Option<Instant>,
    running: bool,
}

impl RefreshScheduler {
    /// Create a stopped scheduler
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            deadline: None,
            running: false,
        }
    }

    /// Start ticking every `interval`; a zero interval arms nothing
    pub fn start(&mut self, interval: Duration) {
        self.interval = interval;
        self.running = true;
        self.arm();
    }

    /// Cancel any pending tick. Idempotent.
    pub fn stop(&mut self) {
        if self.running {
            debug!("Refresh scheduler stopped");
        }
        self.running = false;
        self.deadline = None;
    }

    /// Re-arm a running scheduler one full interval from now
    pub fn reset(&mut self) {
        if self.running {
            self.arm();
        }
    }

    /// Change the interval
    ///
    /// An already armed deadline is left alone; the new value applies the
    /// next time the scheduler arms. A running scheduler with nothing armed
    /// (after a zero interval) arms one new interval from now.
    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
        if self.running && self.deadline.is_none() {
            self.arm();
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Pending deadline, if armed
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Wait for the next tick
    ///
    /// Pending forever while nothing is armed. Cancel-safe: dropping the
    /// future leaves the deadline untouched.
    pub async fn tick(&mut self) {
        match self.deadline {
            Some(deadline) => {
                tokio::time::sleep_until(deadline).await;
                self.arm();
            }
            None => std::future::pending::<()>().await,
        }
    }

    fn arm(&mut self) {
        self.deadline = if self.interval.is_zero() {
            None
        } else {
            Some(Instant::now() + self.interval)
        };
    }
}

impl Default for RefreshScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_REFRESH_INTERVAL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_pending, assert_ready, task};

    #[tokio::test(start_paused = true)]
    async fn test_tick_fires_after_interval() {
        let mut scheduler = RefreshScheduler::default();
        scheduler.start(Duration::from_secs(30));

        {
            let mut tick = task::spawn(scheduler.tick());
            assert_pending!(tick.poll());

            tokio::time::advance(Duration::from_secs(29)).await;
            assert_pending!(tick.poll());

            tokio::time::advance(Duration::from_secs(1)).await;
            assert_ready!(tick.poll());
        }

        // Re-armed for another full interval
        let next = scheduler.deadline().unwrap();
        assert_eq!(next - Instant::now(), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_pending_tick() {
        let mut scheduler = RefreshScheduler::default();
        scheduler.start(Duration::from_secs(5));
        scheduler.stop();
        scheduler.stop();

        assert!(!scheduler.is_running());
        assert!(scheduler.deadline().is_none());

        let mut tick = task::spawn(scheduler.tick());
        tokio::time::advance(Duration::from_secs(60)).await;
        assert_pending!(tick.poll());
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_change_applies_on_next_arm() {
        let mut scheduler = RefreshScheduler::default();
        scheduler.start(Duration::from_secs(30));
        let armed = scheduler.deadline().unwrap();

        scheduler.set_interval(Duration::from_secs(10));
        assert_eq!(scheduler.deadline(), Some(armed));

        scheduler.tick().await;
        assert_eq!(
            scheduler.deadline().unwrap() - Instant::now(),
            Duration::from_secs(10)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_disables() {
        let mut scheduler = RefreshScheduler::default();
        scheduler.start(Duration::ZERO);

        assert!(scheduler.is_running());
        assert!(scheduler.deadline().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_nonzero_interval_rearms_idle_scheduler() {
        let mut scheduler = RefreshScheduler::default();
        scheduler.start(Duration::ZERO);

        scheduler.set_interval(Duration::from_secs(10));
        assert_eq!(
            scheduler.deadline().unwrap() - Instant::now(),
            Duration::from_secs(10)
        );

        // A stopped scheduler only records the value
        scheduler.stop();
        scheduler.set_interval(Duration::from_secs(5));
        assert!(scheduler.deadline().is_none());
    }

    #[test]
    fn test_reset_requires_running() {
        let mut scheduler = RefreshScheduler::default();
        scheduler.reset();
        assert!(scheduler.deadline().is_none());
    }

    #[test]
    fn test_invalid_interval_disables() {
        assert_eq!(interval_from_secs(-1.0), Duration::ZERO);
        assert_eq!(interval_from_secs(f64::NAN), Duration::ZERO);
        assert_eq!(interval_from_secs(1.5), Duration::from_millis(1500));
    }
}
