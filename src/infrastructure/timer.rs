use crate::types::RECONNECT_DELAY;
use std::time::Duration;
use tokio::time::sleep;

/// Delay schedule for reconnection attempts.
///
/// Holds a list of intervals in milliseconds; once past the end, the last
/// interval repeats. The default is the fixed reconnect delay, but a backoff
/// ramp can be supplied instead.
pub struct Timer {
    attempts: u32,
    intervals: Vec<u64>,
}

impl Timer {
    pub fn new(intervals: Vec<u64>) -> Self {
        Self {
            attempts: 0,
            intervals,
        }
    }

    /// Get the next delay duration
    pub fn next_delay(&mut self) -> Duration {
        let delay = if (self.attempts as usize) < self.intervals.len() {
            self.intervals[self.attempts as usize]
        } else {
            *self.intervals.last().unwrap_or(&RECONNECT_DELAY)
        };

        self.attempts += 1;
        Duration::from_millis(delay)
    }

    /// Reset the schedule to its first interval
    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    /// Sleep for the next scheduled delay
    pub async fn schedule_timeout(&mut self) {
        let delay = self.next_delay();
        sleep(delay).await;
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new(vec![RECONNECT_DELAY])
    }
}
