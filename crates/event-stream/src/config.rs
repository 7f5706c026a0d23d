use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Fixed pause between a failure and the next open attempt. Does not grow.
    pub reconnect_delay_ms: u64,
    /// Newest-first events kept in memory.
    pub buffer_capacity: usize,
    /// Slots in the notice broadcast channel; slow subscribers lag past this.
    pub notice_capacity: usize,
}

impl StreamConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay_ms = delay.as_millis() as u64;
        self
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            reconnect_delay_ms: 3_000,
            buffer_capacity: driftwatch_state_center::DEFAULT_CAPACITY,
            notice_capacity: 256,
        }
    }
}
