// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

#![warn(missing_docs)]

//! # canmod HAL
//!
//! CAN transport and hardware abstraction for canmod field modules.
//!
//! This crate provides:
//! - **CAN adapter** (`can` module) - exclusive bus handles, tagged frames and a
//!   pure byte-framed transport over any [`CanPeripheral`]
//! - **HAL traits** (`hal` module) - time, GPIO and indicator-light abstractions
//! - **Platform implementations** (`platforms` module) - SocketCAN and
//!   `embedded-hal` backends behind feature flags
//!
//! The adapter performs no addressing or interpretation. Identity, routing and
//! message decoding belong to `canmod-net`.
//!
//! ## Usage
//!
//! ```rust
//! use canmod_hal::prelude::*;
//!
//! let bus = VirtualBus::new("bench");
//! let mut adapter = CanAdapter::open_bus(bus.attach_loopback("node-a"), ChipSelect::default())?;
//!
//! let frame = Frame::new(0x05, 0xFF, 0x01, &[1, 2, 3])?;
//! adapter.send(&frame)?;
//! assert_eq!(adapter.receive()?, Some(frame));
//! # Ok::<(), canmod_hal::CanError>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `socketcan` - Linux SocketCAN peripheral
//! - `embedded-hal` - `GpioProvider` over `embedded-hal` 1.0 output pins

/// CAN adapter: frames, bus handles, peripherals and the virtual bus segment.
pub mod can;

/// Hardware abstraction traits shared by all platforms.
pub mod hal;

/// Concrete platform implementations.
pub mod platforms;

pub use can::{
    BusHandle, CanAdapter, CanError, CanPeripheral, CanResult, ChipSelect, FaultInjector, Frame,
    VirtualBus, VirtualPeripheral, AdapterStats, DEFAULT_CAN_CS, FRAME_PAYLOAD_LEN,
};
pub use hal::{
    GpioIndicator, GpioProvider, IndicatorError, IndicatorLight, IndicatorPattern, StdClock,
    TimeProvider,
};

/// Prelude module for convenient imports
///
/// ```rust
/// use canmod_hal::prelude::*;
/// ```
pub mod prelude {
    pub use crate::can::*;
    pub use crate::hal::*;

    #[cfg(feature = "socketcan")]
    pub use crate::platforms::SocketCanPeripheral;

    #[cfg(feature = "embedded-hal")]
    pub use crate::platforms::OutputPinGpio;
}

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
