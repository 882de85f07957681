//! Fixed-interval throttle on submission starts

use std::time::Duration;
use tokio::time::{Interval, MissedTickBehavior, interval};

/// Spaces submission starts at least `period` apart
///
/// The first call returns immediately. An unset period disables throttling.
#[derive(Debug)]
pub struct SubmissionThrottle {
    interval: Option<Interval>,
}

impl SubmissionThrottle {
    pub fn new(period: Option<Duration>) -> Self {
        let interval = period.filter(|p| !p.is_zero()).map(|period| {
            let mut interval = interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });
        Self { interval }
    }

    /// Whether a period is in effect
    pub fn is_enabled(&self) -> bool {
        self.interval.is_some()
    }

    /// Wait until the next submission may start
    pub async fn ready(&mut self) {
        if let Some(interval) = self.interval.as_mut() {
            interval.tick().await;
        }
    }
}
