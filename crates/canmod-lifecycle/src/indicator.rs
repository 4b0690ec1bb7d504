// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Lifecycle state to indicator pattern mapping

use canmod_hal::IndicatorPattern;

use crate::state::LifecycleState;

/// Pattern shown for a lifecycle state
///
/// Steady while waiting for (or holding) an enable, blinking while running,
/// dark when faulted or not set up.
pub fn indicator_pattern(state: LifecycleState, blink_half_period_ms: u32) -> IndicatorPattern {
    match state {
        LifecycleState::WaitingForEnable | LifecycleState::Ready => IndicatorPattern::Steady,
        LifecycleState::Running => IndicatorPattern::Blink {
            half_period_ms: blink_half_period_ms,
        },
        LifecycleState::Faulted | LifecycleState::Uninitialized => IndicatorPattern::Off,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patterns_distinguish_waiting_running_faulted() {
        let waiting = indicator_pattern(LifecycleState::WaitingForEnable, 250);
        let running = indicator_pattern(LifecycleState::Running, 250);
        let faulted = indicator_pattern(LifecycleState::Faulted, 250);

        assert_eq!(waiting, IndicatorPattern::Steady);
        assert_eq!(running, IndicatorPattern::Blink { half_period_ms: 250 });
        assert_eq!(faulted, IndicatorPattern::Off);
    }
}
