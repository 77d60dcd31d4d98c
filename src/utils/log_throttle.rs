use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug)]
struct WindowState {
    window_started_at: Instant,
    suppressed: u64,
}

/// Rate-limits repeated log lines per key, e.g. a node that stays down for
/// hours and fails on every scrape.
#[derive(Debug)]
pub struct LogThrottle {
    interval: Duration,
    windows: Mutex<HashMap<String, WindowState>>,
}

impl LogThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Returns `Some(suppressed_count)` when a log for `key` should be emitted,
    /// otherwise `None` and the event is counted as suppressed for the active window.
    pub fn should_emit(&self, key: &str) -> Option<u64> {
        let mut map = match self.windows.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let now = Instant::now();

        match map.get_mut(key) {
            Some(state) => {
                if now.duration_since(state.window_started_at) >= self.interval {
                    let suppressed = state.suppressed;
                    state.window_started_at = now;
                    state.suppressed = 0;
                    Some(suppressed)
                } else {
                    state.suppressed += 1;
                    None
                }
            }
            None => {
                map.insert(
                    key.to_string(),
                    WindowState {
                        window_started_at: now,
                        suppressed: 0,
                    },
                );
                Some(0)
            }
        }
    }

    /// Forgets `key`, so the next failure after a recovery is logged at once.
    pub fn reset(&self, key: &str) {
        let mut map = match self.windows.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        map.remove(key);
    }
}
