//! Poll gating.
//!
//! A [`RateLimitSource`] says how many polls are allowed per window; a
//! [`RateLimiter`] keeps the counters. The queue consults the limiter once per
//! `pop` and only talks to SQS when the attempt is granted.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;

/// Key under which every poll of the connector is counted.
pub const RATE_LIMIT_KEY: &str = "raw-sqs-connector";

/// Window after which a key's counter resets.
pub const RATE_LIMIT_DECAY: Duration = Duration::from_secs(60);

/// The maximum number of polls per [`RATE_LIMIT_DECAY`] window.
///
/// Either a fixed number or a function evaluated on every poll, so the limit
/// can follow runtime configuration.
#[derive(Clone)]
pub enum RateLimitSource {
    Fixed(u32),
    /// Returning `None` disables the limit for that poll.
    Computed(Arc<dyn Fn() -> Option<u32> + Send + Sync>),
}

impl RateLimitSource {
    pub fn computed<F>(f: F) -> Self
    where
        F: Fn() -> Option<u32> + Send + Sync + 'static,
    {
        RateLimitSource::Computed(Arc::new(f))
    }

    pub fn resolve(&self) -> Option<u32> {
        match self {
            RateLimitSource::Fixed(limit) => Some(*limit),
            RateLimitSource::Computed(f) => f(),
        }
    }
}

impl From<u32> for RateLimitSource {
    fn from(limit: u32) -> Self {
        RateLimitSource::Fixed(limit)
    }
}

impl fmt::Debug for RateLimitSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateLimitSource::Fixed(limit) => f.debug_tuple("Fixed").field(limit).finish(),
            RateLimitSource::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

/// Counts attempts per key within a decay window.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Records one attempt against `key` if fewer than `max_attempts` have been
    /// recorded in the current window.
    ///
    /// Returns `true` when the attempt was recorded; the caller then performs
    /// its action exactly once. On `false` nothing is recorded and the action
    /// must not run.
    async fn attempt(&self, key: &str, max_attempts: u32, decay: Duration) -> bool;
}

#[derive(Debug, Clone, Copy)]
struct Window {
    hits: u32,
    resets_at: Instant,
}

/// Process-local [`RateLimiter`].
///
/// A key's window opens on its first hit and closes `decay` later. Workers in
/// other processes are not counted.
#[derive(Debug, Default)]
pub struct InMemoryRateLimiter {
    windows: Mutex<HashMap<String, Window>>,
}

impl InMemoryRateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempts left for `key` in its current window.
    pub fn remaining(&self, key: &str, max_attempts: u32) -> u32 {
        let now = Instant::now();
        let windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);
        match windows.get(key) {
            Some(window) if window.resets_at > now => max_attempts.saturating_sub(window.hits),
            _ => max_attempts,
        }
    }

    /// Time until `key`'s window resets; zero when no window is open.
    pub fn available_in(&self, key: &str) -> Duration {
        let now = Instant::now();
        let windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);
        windows
            .get(key)
            .map(|window| window.resets_at.saturating_duration_since(now))
            .unwrap_or_default()
    }

    pub fn clear(&self, key: &str) {
        self.windows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }

    fn hit(&self, key: &str, max_attempts: u32, decay: Duration) -> bool {
        let now = Instant::now();
        let mut windows = self.windows.lock().unwrap_or_else(PoisonError::into_inner);
        let window = windows.entry(key.to_string()).or_insert(Window {
            hits: 0,
            resets_at: now + decay,
        });

        if window.resets_at <= now {
            window.hits = 0;
            window.resets_at = now + decay;
        }

        if window.hits >= max_attempts {
            return false;
        }
        window.hits += 1;
        true
    }
}

#[async_trait]
impl RateLimiter for InMemoryRateLimiter {
    async fn attempt(&self, key: &str, max_attempts: u32, decay: Duration) -> bool {
        self.hit(key, max_attempts, decay)
    }
}
