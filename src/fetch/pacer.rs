use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

use crate::config::PauseRange;

/// Uniform draw from `[min, max]`; `min` when the range is empty or inverted
pub fn pause_between<R: Rng + ?Sized>(rng: &mut R, min: u64, max: u64) -> u64 {
    if min >= max {
        return min;
    }
    rng.gen_range(min..=max)
}

/// Randomized delay between consecutive fetches
pub struct Pacer {
    range: PauseRange,
    rng: Mutex<StdRng>,
}

impl Pacer {
    pub fn new(range: PauseRange, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            range,
            rng: Mutex::new(rng),
        }
    }

    pub fn range(&self) -> PauseRange {
        self.range
    }

    /// Next pause in milliseconds
    pub fn draw(&self) -> u64 {
        if self.range.is_constant() {
            return self.range.min_ms;
        }
        pause_between(&mut *self.rng.lock(), self.range.min_ms, self.range.max_ms)
    }

    pub fn pause(&self) -> Duration {
        Duration::from_millis(self.draw())
    }
}
