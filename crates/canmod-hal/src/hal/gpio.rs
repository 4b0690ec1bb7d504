// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/// Digital pins a module drives (indicator light) or samples (address strap)
pub trait GpioProvider {
    /// Pin identifier; copied freely between calls
    type Pin: Copy;

    type Error: core::fmt::Debug;

    /// Drive `pin` high (`true`) or low
    fn write_level(&mut self, pin: Self::Pin, high: bool) -> Result<(), Self::Error>;

    /// Sample `pin`; output-only platforms report the last level written
    fn read_level(&self, pin: Self::Pin) -> Result<bool, Self::Error>;
}
