use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Runner settings; a session is otherwise configured by its scenario and alarm limits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionConfig {
    /// Tick period in milliseconds.
    pub tick_interval_ms: u64,
    /// Capacity of the alarm event channel per subscriber.
    pub event_buffer: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            event_buffer: 64,
        }
    }
}

impl SessionConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub(crate) fn event_capacity(&self) -> usize {
        self.event_buffer.max(1)
    }
}
