// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Exclusive bus handles
//!
//! At most one [`BusHandle`] exists per physical peripheral for the process
//! lifetime. Handles are registered in a process-wide table keyed by the
//! peripheral identifier and the chip-select parameter; dropping the handle
//! releases the slot.

use std::fmt;

use parking_lot::Mutex;
use tracing::debug;

use crate::can::error::{CanError, CanResult};

/// Chip-select / address-select parameter choosing the peripheral instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChipSelect(pub u8);

/// Default chip-select line of the CAN controller
pub const DEFAULT_CAN_CS: ChipSelect = ChipSelect(10);

impl Default for ChipSelect {
    fn default() -> Self {
        DEFAULT_CAN_CS
    }
}

impl fmt::Display for ChipSelect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CS{}", self.0)
    }
}

impl From<u8> for ChipSelect {
    fn from(value: u8) -> Self {
        ChipSelect(value)
    }
}

static OPEN_HANDLES: Mutex<Vec<(String, ChipSelect)>> = parking_lot::const_mutex(Vec::new());

/// Open connection to a CAN peripheral
///
/// Obtained through [`crate::CanAdapter::open_bus`]; never cloned.
#[derive(Debug)]
pub struct BusHandle {
    peripheral_id: String,
    select: ChipSelect,
}

impl BusHandle {
    /// Claim the slot for `(peripheral_id, select)`
    pub(crate) fn acquire(peripheral_id: &str, select: ChipSelect) -> CanResult<Self> {
        let mut open = OPEN_HANDLES.lock();
        if open
            .iter()
            .any(|(id, cs)| id == peripheral_id && *cs == select)
        {
            return Err(CanError::BusUnavailable(format!(
                "{} on {} is already open",
                peripheral_id, select
            )));
        }

        open.push((peripheral_id.to_string(), select));
        debug!(peripheral = peripheral_id, select = %select, "bus handle acquired");

        Ok(Self {
            peripheral_id: peripheral_id.to_string(),
            select,
        })
    }

    /// Chip-select parameter this handle is bound to
    pub fn select(&self) -> ChipSelect {
        self.select
    }

    /// Identifier of the owning peripheral
    pub fn peripheral_id(&self) -> &str {
        &self.peripheral_id
    }

    /// Check whether a handle is currently open for the peripheral
    pub fn is_open(peripheral_id: &str, select: ChipSelect) -> bool {
        OPEN_HANDLES
            .lock()
            .iter()
            .any(|(id, cs)| id == peripheral_id && *cs == select)
    }
}

impl Drop for BusHandle {
    fn drop(&mut self) {
        let mut open = OPEN_HANDLES.lock();
        open.retain(|(id, cs)| !(id == &self.peripheral_id && *cs == self.select));
        debug!(peripheral = %self.peripheral_id, select = %self.select, "bus handle released");
    }
}
