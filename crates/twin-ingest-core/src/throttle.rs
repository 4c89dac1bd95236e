use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Per-instance rate limit for repeated warnings, keyed by message.
#[derive(Debug, Clone)]
pub struct LogThrottle {
    interval: Duration,
    last: HashMap<&'static str, Instant>,
}

impl LogThrottle {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

    pub fn new(interval: Duration) -> Self {
        Self { interval, last: HashMap::new() }
    }

    pub fn allow(&mut self, key: &'static str) -> bool {
        self.allow_at(key, Instant::now())
    }

    pub fn allow_at(&mut self, key: &'static str, now: Instant) -> bool {
        match self.last.get(key) {
            Some(prev) if now.saturating_duration_since(*prev) < self.interval => false,
            _ => {
                self.last.insert(key, now);
                true
            }
        }
    }
}

impl Default for LogThrottle {
    fn default() -> Self {
        Self::new(Self::DEFAULT_INTERVAL)
    }
}
