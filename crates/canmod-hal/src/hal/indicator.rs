// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Indicator-light output
//!
//! The lifecycle decides *which* pattern to show; implementations of
//! [`IndicatorLight`] own the physical drive.

use tracing::trace;

use crate::hal::gpio::GpioProvider;

/// Fixed set of indicator patterns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorPattern {
    /// Light off
    Off,
    /// Light steadily on
    Steady,
    /// Light toggling with the given half-period
    Blink {
        /// Milliseconds between toggles
        half_period_ms: u32,
    },
}

impl IndicatorPattern {
    /// Level the light should have at `now_ms` for this pattern
    pub fn level_at(&self, now_ms: u64) -> bool {
        match self {
            IndicatorPattern::Off => false,
            IndicatorPattern::Steady => true,
            IndicatorPattern::Blink { half_period_ms } => {
                let half = u64::from((*half_period_ms).max(1));
                (now_ms / half) % 2 == 0
            }
        }
    }
}

/// Errors reported by indicator drivers
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IndicatorError {
    /// The output could not be driven
    #[error("indicator output failed: {0}")]
    OutputFailed(String),
}

/// Physical indicator collaborator
pub trait IndicatorLight {
    /// Show `pattern`; called once per loop-tail while the module runs
    fn apply(&mut self, pattern: IndicatorPattern, now_ms: u64) -> Result<(), IndicatorError>;
}

impl<T: IndicatorLight + ?Sized> IndicatorLight for Box<T> {
    fn apply(&mut self, pattern: IndicatorPattern, now_ms: u64) -> Result<(), IndicatorError> {
        (**self).apply(pattern, now_ms)
    }
}

/// Indicator on a single GPIO pin
pub struct GpioIndicator<G: GpioProvider> {
    gpio: G,
    pin: G::Pin,
    active_high: bool,
    level: Option<bool>,
}

impl<G: GpioProvider> GpioIndicator<G> {
    /// Indicator lit when the pin is high
    pub fn new(gpio: G, pin: G::Pin) -> Self {
        Self {
            gpio,
            pin,
            active_high: true,
            level: None,
        }
    }

    /// Indicator lit when the pin is low (sinking LED)
    pub fn active_low(mut self) -> Self {
        self.active_high = false;
        self
    }

    /// Whether the light is currently lit, if it has been driven yet
    pub fn is_lit(&self) -> Option<bool> {
        self.level
    }

    /// Release the underlying GPIO provider
    pub fn into_inner(self) -> G {
        self.gpio
    }
}

impl<G: GpioProvider> IndicatorLight for GpioIndicator<G> {
    fn apply(&mut self, pattern: IndicatorPattern, now_ms: u64) -> Result<(), IndicatorError> {
        let lit = pattern.level_at(now_ms);
        if self.level == Some(lit) {
            return Ok(());
        }

        let pin_high = lit == self.active_high;
        self.gpio
            .write_level(self.pin, pin_high)
            .map_err(|e| IndicatorError::OutputFailed(format!("{:?}", e)))?;
        self.level = Some(lit);
        trace!(lit, ?pattern, "indicator updated");
        Ok(())
    }
}
