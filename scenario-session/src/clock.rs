use chrono::{DateTime, Utc};
use serde::Serialize;

/// Running time of one session. Elapsed time only accumulates while running.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionClock {
    started_at: DateTime<Utc>,
    elapsed_seconds: f64,
    running: bool,
    #[serde(skip)]
    last_update: DateTime<Utc>,
}

impl SessionClock {
    pub fn start(now: DateTime<Utc>) -> Self {
        Self {
            started_at: now,
            elapsed_seconds: 0.0,
            running: true,
            last_update: now,
        }
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed_seconds
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Accumulates time since the last update. A timestamp earlier than the
    /// last update adds nothing.
    pub fn advance(&mut self, now: DateTime<Utc>) -> f64 {
        if self.running && now > self.last_update {
            let delta = now.signed_duration_since(self.last_update);
            self.elapsed_seconds += delta.num_milliseconds() as f64 / 1000.0;
            self.last_update = now;
        }
        self.elapsed_seconds
    }

    pub fn pause(&mut self, now: DateTime<Utc>) {
        self.advance(now);
        self.running = false;
    }

    pub fn resume(&mut self, now: DateTime<Utc>) {
        if !self.running {
            self.running = true;
            self.last_update = now;
        }
    }
}
