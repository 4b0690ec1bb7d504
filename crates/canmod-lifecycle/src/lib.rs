// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # canmod Lifecycle
//!
//! The module lifecycle state machine driving the CAN network layer.
//!
//! ```text
//! UNINITIALIZED --setup--> WAITING_FOR_ENABLE --enable--> READY --loop_head--> RUNNING
//!                                 ^                                               |
//!                                 +---------- disable / remote fault -------------+
//! any state --BusError / address conflict / raise_fault--> FAULTED
//! ```
//!
//! The enclosing application owns the loop:
//!
//! ```rust
//! use canmod_config::ModuleConfig;
//! use canmod_hal::prelude::*;
//! use canmod_lifecycle::StandardModule;
//! use canmod_net::ModuleMessage;
//!
//! let bus = VirtualBus::new("doc-lifecycle");
//! let mut config = ModuleConfig::default();
//! config.network.negotiation_rounds = 1;
//! config.network.negotiation_interval_ms = 1;
//!
//! let mut module = StandardModule::new(config, bus.attach("module"), StdClock::new());
//! module.setup()?;
//!
//! // A controller enables the segment
//! bus.inject(ModuleMessage::Enable.to_frame(0xFE, 0xFF)?);
//! module.hold_till_enabled()?;
//!
//! for _ in 0..3 {
//!     module.loop_head()?;
//!     // application logic
//!     module.loop_tail()?;
//! }
//! assert!(module.ready());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod error;
pub mod indicator;
pub mod module;
pub mod state;

pub use error::{ModuleError, ModuleResult};
pub use indicator::indicator_pattern;
pub use module::{ModuleStats, StandardModule};
pub use state::LifecycleState;

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
