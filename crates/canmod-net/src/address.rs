// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Module addresses

use std::fmt;

use canmod_config::{FIRST_MODULE_ADDRESS, LAST_MODULE_ADDRESS};

/// Destination tag reaching every module on the segment
pub const BROADCAST_ADDRESS: u8 = 0xFF;

/// Source tag of a module that has not resolved its address yet
pub const UNASSIGNED_ADDRESS: u8 = 0x00;

/// Logical identity of a module on one bus segment
///
/// Always within `0x01..=0xFE`; broadcast and unassigned are not addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleAddress(u8);

impl ModuleAddress {
    /// Validate a raw address
    pub fn new(raw: u8) -> Option<Self> {
        (FIRST_MODULE_ADDRESS..=LAST_MODULE_ADDRESS)
            .contains(&raw)
            .then_some(Self(raw))
    }

    /// Raw address byte
    pub fn value(self) -> u8 {
        self.0
    }
}

impl fmt::Display for ModuleAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#04x}", self.0)
    }
}

impl From<ModuleAddress> for u8 {
    fn from(address: ModuleAddress) -> Self {
        address.0
    }
}

/// Derive a module serial when the configuration does not provide one
pub fn generate_serial() -> u32 {
    let id = uuid::Uuid::new_v4();
    let bytes = id.as_bytes();
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}
