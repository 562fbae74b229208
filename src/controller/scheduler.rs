use std::time::Duration;
use tokio::time::{Instant, Interval, MissedTickBehavior};

pub const REFRESH_PERIOD: Duration = Duration::from_secs(1);

/// The single recurring refresh timer. Stopping drops the interval, so a
/// stopped scheduler never yields a tick.
pub struct RefreshScheduler {
    period: Duration,
    interval: Option<Interval>,
}

impl Default for RefreshScheduler {
    fn default() -> Self {
        Self::new(REFRESH_PERIOD)
    }
}

impl RefreshScheduler {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            interval: None,
        }
    }

    /// (Re)starts the timer. The first tick is one period from now; callers
    /// refresh immediately themselves.
    pub fn start(&mut self) {
        let mut interval = tokio::time::interval_at(Instant::now() + self.period, self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.interval = Some(interval);
    }

    pub fn stop(&mut self) {
        self.interval = None;
    }

    pub fn is_running(&self) -> bool {
        self.interval.is_some()
    }

    /// Resolves on the next tick; pending forever while stopped. Cancel safe.
    pub async fn tick(&mut self) {
        match self.interval.as_mut() {
            Some(interval) => {
                interval.tick().await;
            }
            None => std::future::pending::<()>().await,
        }
    }
}
