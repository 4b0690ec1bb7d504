// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! This module defines all configuration structs that map to sections in
//! `canmod.toml`.

use serde::{Deserialize, Serialize};

/// Chip-select line used when the configuration does not name one
pub const DEFAULT_CHIP_SELECT: u8 = 10;

/// Lowest address a module may hold (`0x00` means "unassigned")
pub const FIRST_MODULE_ADDRESS: u8 = 0x01;

/// Highest address a module may hold (`0xFF` is broadcast)
pub const LAST_MODULE_ADDRESS: u8 = 0xFE;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ModuleConfig {
    pub module: ModuleSection,
    pub bus: BusConfig,
    pub network: NetworkConfig,
    pub lifecycle: LifecycleConfig,
    pub features: FeatureFlags,
    pub indicator: IndicatorConfig,
    pub logging: LoggingConfig,
}

/// Module identity
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ModuleSection {
    /// Human-readable module name used in logs
    pub name: String,
    /// Unique serial distinguishing this module from others claiming the
    /// same address. `None` derives one at setup.
    pub serial: Option<u32>,
}

impl Default for ModuleSection {
    fn default() -> Self {
        Self {
            name: "canmod-module".to_string(),
            serial: None,
        }
    }
}

/// CAN bus binding
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BusConfig {
    /// Chip-select / peripheral instance to bind
    pub chip_select: u8,
    /// Interface name prefix for SocketCAN peripherals (`can` -> `can0`)
    pub interface_prefix: String,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            chip_select: DEFAULT_CHIP_SELECT,
            interface_prefix: "can".to_string(),
        }
    }
}

/// How the module obtains its bus address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressMode {
    /// `address` from configuration
    Fixed,
    /// `strap_base` plus the value read from hardware strap pins
    Strap,
    /// Lowest free address in `dynamic_first..=dynamic_last`
    Dynamic,
}

/// Address resolution settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AddressConfig {
    pub mode: AddressMode,
    pub address: u8,
    pub strap_base: u8,
    pub dynamic_first: u8,
    pub dynamic_last: u8,
}

impl Default for AddressConfig {
    fn default() -> Self {
        Self {
            mode: AddressMode::Fixed,
            address: 0x01,
            strap_base: 0x10,
            dynamic_first: 0x20,
            dynamic_last: 0x7F,
        }
    }
}

/// Network / addressing layer settings
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub address: AddressConfig,
    /// Transmit attempts per announcement before `SendFailed`
    pub send_attempts: u8,
    /// Listening polls after an address claim
    pub negotiation_rounds: u32,
    /// Delay between negotiation polls
    pub negotiation_interval_ms: u32,
    /// Addresses tried in dynamic mode before giving up
    pub max_claim_attempts: u32,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            address: AddressConfig::default(),
            send_attempts: 3,
            negotiation_rounds: 5,
            negotiation_interval_ms: 20,
            max_claim_attempts: 4,
        }
    }
}

/// Lifecycle timing and policy
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LifecycleConfig {
    /// Re-poll interval of `hold_till_enabled`
    pub poll_interval_ms: u32,
    /// Announce status every N cycles in loop-tail
    pub status_period_cycles: u32,
    /// Announce status every N polls while holding for enable
    pub waiting_status_period_polls: u32,
    /// Inbound frames processed per loop-head
    pub max_frames_per_cycle: usize,
    /// Enter graceful hold when another module announces a fault
    pub hold_on_remote_fault: bool,
    /// Capacity of the application inbox
    pub inbox_capacity: usize,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 10,
            status_period_cycles: 1,
            waiting_status_period_polls: 50,
            max_frames_per_cycle: 32,
            hold_on_remote_fault: true,
            inbox_capacity: 64,
        }
    }
}

/// Capability set fixed before setup
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct FeatureFlags {
    /// Module carries a status indicator light
    pub indicator_light: bool,
}

/// Indicator timing
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct IndicatorConfig {
    pub blink_half_period_ms: u32,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            blink_half_period_ms: 500,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
