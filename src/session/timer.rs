//! Cancellable recurring timers owned by a session.

use std::future;
use std::time::Duration;

use tokio::time::{self, Instant, Interval, MissedTickBehavior};

/// A recurring timer that can be cancelled permanently.
///
/// The first fire happens one full period after arming. Once cancelled,
/// `tick` never completes again, so a `select!` branch on it goes quiet.
#[derive(Debug)]
pub struct RecurringTimer {
    name: &'static str,
    interval: Option<Interval>,
}

impl RecurringTimer {
    /// Arm a timer. `period` must be non-zero.
    pub fn armed(name: &'static str, period: Duration) -> Self {
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            name,
            interval: Some(interval),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_armed(&self) -> bool {
        self.interval.is_some()
    }

    /// Disarm the timer. Returns true if it was armed.
    pub fn cancel(&mut self) -> bool {
        self.interval.take().is_some()
    }

    /// Wait for the next fire. Cancel-safe.
    pub async fn tick(&mut self) {
        match self.interval.as_mut() {
            Some(interval) => {
                interval.tick().await;
            }
            None => future::pending::<()>().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn first_fire_after_one_period() {
        let start = Instant::now();
        let mut timer = RecurringTimer::armed("push", Duration::from_secs(1));

        timer.tick().await;
        assert_eq!(start.elapsed(), Duration::from_secs(1));
        timer.tick().await;
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timer_never_fires() {
        let mut timer = RecurringTimer::armed("heartbeat", Duration::from_secs(10));
        assert!(timer.cancel());
        assert!(!timer.cancel());
        assert!(!timer.is_armed());

        let fired = time::timeout(Duration::from_secs(60), timer.tick()).await;
        assert!(fired.is_err());
    }
}
