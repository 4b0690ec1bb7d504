// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! CAN adapter layer
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Network / addressing (canmod-net)      │
//! └─────────────────┬───────────────────────┘
//!                   │ Frame (tagged, 8-byte payload)
//! ┌─────────────────▼───────────────────────┐
//! │  CanAdapter (THIS MODULE)               │
//! │  - owns the BusHandle                   │
//! │  - send / non-blocking receive          │
//! └─────────────────┬───────────────────────┘
//!                   │ CanPeripheral
//! ┌─────────────────▼───────────────────────┐
//! │  Driver (VirtualBus, SocketCAN, MCP2515)│
//! └─────────────────────────────────────────┘
//! ```

pub mod adapter;
pub mod error;
pub mod frame;
pub mod handle;
pub mod virtual_bus;

pub use adapter::{AdapterStats, CanAdapter, CanPeripheral};
pub use error::{CanError, CanResult};
pub use frame::{Frame, FRAME_PAYLOAD_LEN, MAX_EXTENDED_ID};
pub use handle::{BusHandle, ChipSelect, DEFAULT_CAN_CS};
pub use virtual_bus::{FaultInjector, VirtualBus, VirtualPeripheral};
