// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # canmod Network
//!
//! Logical module identities and message routing on top of raw CAN frames.
//!
//! - [`ModuleAddress`] - the module's identity on a bus segment, resolved once
//! - [`ModuleMessage`] - decoded bus messages; unrecognised types decode to
//!   [`ModuleMessage::Unknown`] instead of failing
//! - [`Network`] - address resolution, inbound routing and outbound
//!   announcements with a bounded `BusBusy` retry
//!
//! ## Usage
//!
//! ```rust
//! use canmod_config::NetworkConfig;
//! use canmod_hal::prelude::*;
//! use canmod_net::{AddressPlan, ModuleAddress, ModuleMessage, Network};
//!
//! let bus = VirtualBus::new("doc-net");
//! let adapter = CanAdapter::open_bus(bus.attach_loopback("node"), ChipSelect::default())?;
//! let mut network = Network::new(adapter, 0xC0FFEE, &NetworkConfig::default());
//!
//! let plan = AddressPlan::Fixed(ModuleAddress::new(0x12).unwrap());
//! network.resolve_address(&plan, &StdClock::new())?;
//!
//! network.announce(&ModuleMessage::Disable)?;
//! assert_eq!(network.poll()?, Some(ModuleMessage::Disable));
//! # Ok::<(), canmod_net::NetworkError>(())
//! ```

pub mod address;
pub mod error;
pub mod message;
pub mod negotiation;
pub mod network;

pub use address::{generate_serial, ModuleAddress, BROADCAST_ADDRESS, UNASSIGNED_ADDRESS};
pub use error::{NetworkError, NetworkResult};
pub use message::{FaultCode, MessageType, ModuleMessage, Payload, APPLICATION_KIND_START};
pub use negotiation::{AddressPlan, AddressStrap, GpioStrap};
pub use network::{Network, NetworkStats};

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
