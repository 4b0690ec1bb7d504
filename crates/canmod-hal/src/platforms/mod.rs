// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Platform implementations of the adapter and HAL traits
//!
//! Available platforms:
//! - Virtual segment (always available, see `crate::can::virtual_bus`)
//! - Linux SocketCAN (`socketcan` feature)
//! - Any `embedded-hal` 1.0 output pin as a GPIO provider (`embedded-hal` feature)

#[cfg(feature = "socketcan")]
pub mod socketcan;

#[cfg(feature = "embedded-hal")]
pub mod embedded_hal;

#[cfg(feature = "socketcan")]
pub use self::socketcan::SocketCanPeripheral;

#[cfg(feature = "embedded-hal")]
pub use self::embedded_hal::OutputPinGpio;
