// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/// General-purpose I/O abstractions for pins.
pub mod gpio;
/// Indicator-light output driven from lifecycle state.
pub mod indicator;
/// Timekeeping abstractions (monotonic timers, delays).
pub mod time;

// Re-export trait types
pub use gpio::GpioProvider;
pub use indicator::{GpioIndicator, IndicatorError, IndicatorLight, IndicatorPattern};
pub use time::{StdClock, TimeProvider};
