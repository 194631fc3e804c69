//! Exponential backoff with jitter.

use std::time::Duration;

/// Backoff schedule between retry attempts.
#[derive(Debug, Clone, PartialEq)]
pub struct Backoff {
    /// Delay before the first retry.
    pub initial: Duration,
    /// Upper bound for any single delay.
    pub max: Duration,
    /// Growth factor applied after every retry.
    pub multiplier: f64,
    /// Randomize each delay to 75%–125% of its nominal value.
    pub jitter: bool,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(1),
            max: Duration::from_secs(30),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl Backoff {
    /// Default schedule starting at `initial`.
    pub fn fixed_start(initial: Duration) -> Self {
        Self {
            initial,
            ..Self::default()
        }
    }

    /// Constant delay, no growth, no jitter.
    pub fn constant(delay: Duration) -> Self {
        Self {
            initial: delay,
            max: delay,
            multiplier: 1.0,
            jitter: false,
        }
    }

    /// Nominal delay before retry number `retry` (0-based), without jitter.
    pub fn nominal(&self, retry: u32) -> Duration {
        let factor = self.multiplier.max(1.0).powi(retry.min(i32::MAX as u32) as i32);
        let secs = (self.initial.as_secs_f64() * factor).min(self.max.as_secs_f64());
        Duration::from_secs_f64(secs)
    }

    /// Delay to sleep before retry number `retry` (0-based).
    pub fn delay(&self, retry: u32) -> Duration {
        let nominal = self.nominal(retry);
        if !self.jitter {
            return nominal;
        }
        let jitter_factor = 0.75 + (rand_factor() * 0.5);
        Duration::from_secs_f64(nominal.as_secs_f64() * jitter_factor)
    }
}

/// Simple pseudo-random factor [0, 1) without pulling in rand crate.
fn rand_factor() -> f64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos()
        .hash(&mut hasher);
    std::thread::current().id().hash(&mut hasher);

    let hash = hasher.finish();
    (hash % 10000) as f64 / 10000.0
}
