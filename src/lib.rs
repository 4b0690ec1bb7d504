// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # canmod - CAN bus field module facade
//!
//! Gives every module on a shared CAN bus the same startup sequence, an
//! enable gate that withholds operation until a controller authorises it,
//! and head/tail hooks around the application's own per-cycle logic.
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! canmod = "0.1"
//! ```
//!
//! ```rust
//! use canmod::prelude::*;
//!
//! let bus = VirtualBus::new("quick-start");
//! let config = ModuleConfig::from_toml_str(
//!     r#"
//!     [network]
//!     negotiation_rounds = 1
//!     negotiation_interval_ms = 1
//!
//!     [network.address]
//!     mode = "fixed"
//!     address = 0x21
//!     "#,
//! )?;
//!
//! let mut module = StandardModule::new(config, bus.attach("arm-joint"), StdClock::new());
//! module.setup()?;
//! bus.inject(ModuleMessage::Enable.to_frame(0xFE, BROADCAST_ADDRESS)?);
//! module.hold_till_enabled()?;
//!
//! loop {
//!     module.loop_head()?;
//!     // control logic for this cycle
//!     module.loop_tail()?;
//!     # break;
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Feature Flags
//!
//! - **`socketcan`**: Linux SocketCAN peripheral (`can{select}` interfaces)
//! - **`embedded-hal`**: drive indicator outputs through `embedded-hal` pins
//! - **`file-logging`**: JSON log files for the tools
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Lifecycle: canmod-lifecycle                            │
//! │  (setup, enable gate, loop head/tail, indicator)        │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Network: canmod-net                                    │
//! │  (addresses, message codec, routing, announcements)     │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Adapter: canmod-hal                                    │
//! │  (bus handle, frames, peripherals, time and GPIO)       │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! Configuration (`canmod-config`) and logging setup
//! (`canmod-observability`) sit beside the three layers.
//!
//! ## License
//!
//! Apache-2.0

pub use canmod_config as config;
pub use canmod_hal as hal;
pub use canmod_lifecycle as lifecycle;
pub use canmod_net as net;
pub use canmod_observability as observability;

/// Prelude - commonly used types and traits
pub mod prelude {
    pub use crate::config::{load_config, validate_config, ModuleConfig};
    pub use crate::hal::{
        CanAdapter, CanError, CanPeripheral, ChipSelect, Frame, GpioIndicator, GpioProvider,
        IndicatorLight, IndicatorPattern, StdClock, TimeProvider, VirtualBus, VirtualPeripheral,
        DEFAULT_CAN_CS,
    };
    pub use crate::lifecycle::{LifecycleState, ModuleError, ModuleResult, StandardModule};
    pub use crate::net::{
        FaultCode, ModuleAddress, ModuleMessage, Network, NetworkError, BROADCAST_ADDRESS,
    };

    #[cfg(feature = "socketcan")]
    pub use crate::hal::platforms::SocketCanPeripheral;
}

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
