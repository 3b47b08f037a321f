//! Bounded busy-wait polling

use crate::sensors::traits::MicrosClock;
use embedded_hal::delay::DelayNs;

/// The condition did not hold before the deadline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollTimeout;

/// Spin until `condition` holds or `timeout_us` has passed
///
/// The condition is sampled every `step_us` microseconds. This blocks the
/// caller; it is meant for short hardware handshakes where yielding would
/// distort the timing. Returns the clock reading at which the condition was
/// first observed.
pub fn poll_until<C, D, F>(
    clock: &C,
    delay: &mut D,
    timeout_us: u32,
    step_us: u32,
    mut condition: F,
) -> Result<u64, PollTimeout>
where
    C: MicrosClock,
    D: DelayNs,
    F: FnMut() -> bool,
{
    let start = clock.now_us();

    loop {
        if condition() {
            return Ok(clock.now_us());
        }

        if clock.now_us().saturating_sub(start) > timeout_us as u64 {
            return Err(PollTimeout);
        }

        delay.delay_us(step_us);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::traits::mock::{SimClock, SimDelay};

    #[test]
    fn test_immediate_condition() {
        let clock = SimClock::new();
        let mut delay = SimDelay::new(&clock);

        let at = poll_until(&clock, &mut delay, 100, 1, || true);
        assert_eq!(at, Ok(0));
    }

    #[test]
    fn test_condition_becomes_true() {
        let clock = SimClock::new();
        let mut delay = SimDelay::new(&clock);

        let probe = clock.clone();
        let at = poll_until(&clock, &mut delay, 1_000, 1, || probe.now_us() >= 250);
        assert_eq!(at, Ok(250));
    }

    #[test]
    fn test_timeout_is_bounded() {
        let clock = SimClock::new();
        let mut delay = SimDelay::new(&clock);

        let result = poll_until(&clock, &mut delay, 30_000, 1, || false);
        assert_eq!(result, Err(PollTimeout));

        // Gives up one step past the deadline
        assert_eq!(clock.now_us(), 30_001);
    }

    #[test]
    fn test_step_granularity() {
        let clock = SimClock::new();
        let mut delay = SimDelay::new(&clock);

        let probe = clock.clone();
        let at = poll_until(&clock, &mut delay, 1_000, 10, || probe.now_us() >= 25);
        assert_eq!(at, Ok(30));
    }
}
