use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::auth::hash_key;

/// Window the login limit applies to.
pub const LOGIN_WINDOW: Duration = Duration::from_secs(15 * 60);

/// In-memory attempt counter keyed by the SHA-256 of the client IP.
pub struct LoginThrottle {
    max_attempts: u64,
    window: Duration,
    entries: Mutex<HashMap<String, Vec<Instant>>>,
}

impl LoginThrottle {
    pub fn new(max_attempts: u64, window: Duration) -> Self {
        LoginThrottle {
            max_attempts: max_attempts.max(1),
            window,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Record an attempt from `ip` and return true if it is under the limit.
    pub fn check_and_record(&self, ip: &str) -> bool {
        self.check_at(ip, Instant::now())
    }

    fn check_at(&self, ip: &str, now: Instant) -> bool {
        let mut map = match self.entries.lock() {
            Ok(m) => m,
            Err(poisoned) => poisoned.into_inner(),
        };
        let attempts = map.entry(hash_key(ip)).or_default();
        attempts.retain(|t| now.duration_since(*t) < self.window);

        if (attempts.len() as u64) < self.max_attempts {
            attempts.push(now);
            true
        } else {
            false
        }
    }

    /// Attempts left for `ip` without recording one.
    pub fn remaining(&self, ip: &str) -> u64 {
        let mut map = match self.entries.lock() {
            Ok(m) => m,
            Err(poisoned) => poisoned.into_inner(),
        };
        let now = Instant::now();
        let used = map
            .get_mut(&hash_key(ip))
            .map(|attempts| {
                attempts.retain(|t| now.duration_since(*t) < self.window);
                attempts.len() as u64
            })
            .unwrap_or(0);
        self.max_attempts.saturating_sub(used)
    }

    /// Forget a client after a successful login.
    pub fn reset(&self, ip: &str) {
        if let Ok(mut map) = self.entries.lock() {
            map.remove(&hash_key(ip));
        }
    }

    /// Drop entries with no attempts inside the window. Returns how many
    /// clients were forgotten.
    pub fn cleanup(&self) -> usize {
        let mut map = match self.entries.lock() {
            Ok(m) => m,
            Err(poisoned) => poisoned.into_inner(),
        };
        let now = Instant::now();
        let before = map.len();
        map.retain(|_, attempts| {
            attempts.retain(|t| now.duration_since(*t) < self.window);
            !attempts.is_empty()
        });
        before - map.len()
    }
}
