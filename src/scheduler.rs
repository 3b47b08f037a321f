//! Duty cycle scheduling
//!
//! Each wake is delayed by a random jitter on top of the base interval so that
//! nodes sharing a channel drift apart instead of colliding every cycle.

use crate::config::duty_cycle;
use rand::{Rng, RngCore};

/// Transmission interval configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DutyCycleConfig {
    /// Interval between transmissions in milliseconds
    pub base_interval_ms: u32,
    /// Largest random extension of one interval in milliseconds
    pub max_jitter_ms: u32,
}

impl Default for DutyCycleConfig {
    fn default() -> Self {
        Self {
            base_interval_ms: duty_cycle::BASE_INTERVAL_MS,
            max_jitter_ms: duty_cycle::MAX_JITTER_MS,
        }
    }
}

/// Computes the delay until the next wake
pub struct DutyCycleScheduler<R: RngCore> {
    config: DutyCycleConfig,
    rng: R,
}

impl<R: RngCore> DutyCycleScheduler<R> {
    pub fn new(config: DutyCycleConfig, rng: R) -> Self {
        Self { config, rng }
    }

    /// Next interval in `[base, base + max_jitter]` milliseconds
    pub fn next_interval(&mut self) -> u32 {
        let jitter = self.rng.gen_range(0..=self.config.max_jitter_ms);
        self.config.base_interval_ms.saturating_add(jitter)
    }

    pub fn config(&self) -> &DutyCycleConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn scheduler(base: u32, jitter: u32, seed: u64) -> DutyCycleScheduler<SmallRng> {
        DutyCycleScheduler::new(
            DutyCycleConfig {
                base_interval_ms: base,
                max_jitter_ms: jitter,
            },
            SmallRng::seed_from_u64(seed),
        )
    }

    #[test]
    fn test_default_config() {
        let config = DutyCycleConfig::default();

        assert_eq!(config.base_interval_ms, 180_000);
        assert_eq!(config.max_jitter_ms, 1_000);
    }

    #[test]
    fn test_interval_within_bounds() {
        for (base, jitter) in [(180_000, 1_000), (1_000, 0), (0, 50), (60_000, 30_000)] {
            let mut scheduler = scheduler(base, jitter, 7);
            for _ in 0..1_000 {
                let interval = scheduler.next_interval();
                assert!(interval >= base);
                assert!(interval <= base + jitter);
            }
        }
    }

    #[test]
    fn test_zero_jitter_is_exact() {
        let mut scheduler = scheduler(180_000, 0, 1);

        for _ in 0..10 {
            assert_eq!(scheduler.next_interval(), 180_000);
        }
    }

    #[test]
    fn test_jitter_bounds_inclusive() {
        let mut scheduler = scheduler(100, 3, 42);

        let mut seen = [false; 4];
        for _ in 0..1_000 {
            seen[(scheduler.next_interval() - 100) as usize] = true;
        }
        assert_eq!(seen, [true; 4]);
    }

    #[test]
    fn test_nodes_desynchronise() {
        let mut a = scheduler(180_000, 1_000, 1);
        let mut b = scheduler(180_000, 1_000, 2);

        let a_intervals: [u32; 8] = core::array::from_fn(|_| a.next_interval());
        let b_intervals: [u32; 8] = core::array::from_fn(|_| b.next_interval());
        assert_ne!(a_intervals, b_intervals);
    }

    #[test]
    fn test_saturates_at_u32_max() {
        let mut scheduler = scheduler(u32::MAX - 1, 10, 3);

        assert!(scheduler.next_interval() >= u32::MAX - 1);
    }
}
