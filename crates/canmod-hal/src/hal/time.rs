// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use std::time::{Duration, Instant};

/// Time and delay abstraction for module platforms
///
/// Waits in the lifecycle (`hold_till_enabled`, address negotiation) go through
/// this trait so that bench and test drivers control how time passes.
pub trait TimeProvider {
    /// Get current time in microseconds since the provider started
    ///
    /// # Returns
    /// Monotonic timestamp in microseconds
    fn get_time_us(&self) -> u64;

    /// Block for the specified number of microseconds
    ///
    /// # Arguments
    /// * `us` - Microseconds to delay
    fn delay_us(&self, us: u32);

    /// Block for the specified number of milliseconds
    ///
    /// # Arguments
    /// * `ms` - Milliseconds to delay
    fn delay_ms(&self, ms: u32) {
        self.delay_us(ms.saturating_mul(1000));
    }

    /// Current time in milliseconds
    fn now_ms(&self) -> u64 {
        self.get_time_us() / 1000
    }
}

impl<T: TimeProvider + ?Sized> TimeProvider for &T {
    fn get_time_us(&self) -> u64 {
        (**self).get_time_us()
    }

    fn delay_us(&self, us: u32) {
        (**self).delay_us(us)
    }
}

/// Monotonic clock backed by `std::time::Instant` and `thread::sleep`
#[derive(Debug, Clone, Copy)]
pub struct StdClock {
    start: Instant,
}

impl StdClock {
    /// Start a new clock at zero
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeProvider for StdClock {
    fn get_time_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }

    fn delay_us(&self, us: u32) {
        std::thread::sleep(Duration::from_micros(u64::from(us)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_std_clock_is_monotonic() {
        let clock = StdClock::new();
        let before = clock.get_time_us();
        clock.delay_ms(2);
        assert!(clock.get_time_us() >= before + 2000);
        assert!(clock.now_ms() >= 2);
    }
}
