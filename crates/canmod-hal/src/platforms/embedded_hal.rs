// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! `embedded-hal` 1.0 adapters

use embedded_hal::digital::{OutputPin, PinState};

use crate::hal::GpioProvider;

/// Single `embedded-hal` output pin exposed as a [`GpioProvider`]
///
/// The last driven level is cached so `read_level` works on write-only pins.
pub struct OutputPinGpio<P: OutputPin> {
    pin: P,
    level: bool,
}

impl<P: OutputPin> OutputPinGpio<P> {
    /// Wrap an output pin; it is assumed low until first driven
    pub fn new(pin: P) -> Self {
        Self { pin, level: false }
    }

    /// Release the wrapped pin
    pub fn into_inner(self) -> P {
        self.pin
    }
}

impl<P: OutputPin> GpioProvider for OutputPinGpio<P> {
    type Pin = ();
    type Error = P::Error;

    fn write_level(&mut self, _pin: (), high: bool) -> Result<(), Self::Error> {
        self.pin.set_state(PinState::from(high))?;
        self.level = high;
        Ok(())
    }

    fn read_level(&self, _pin: ()) -> Result<bool, Self::Error> {
        Ok(self.level)
    }
}
