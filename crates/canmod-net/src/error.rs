// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Error types for the network layer

use canmod_hal::CanError;

/// Result type alias for network operations
pub type NetworkResult<T> = Result<T, NetworkError>;

/// Errors raised by addressing, routing and announcements
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NetworkError {
    /// Another module holds (or claims) the same address
    #[error("address {address:#04x} is claimed by module with serial {other_serial:#010x}")]
    AddressConflict { address: u8, other_serial: u32 },

    /// Not usable as a module address (`0x00` and `0xFF` are reserved)
    #[error("{0:#04x} is not a module address")]
    InvalidAddress(u8),

    /// Every address in the dynamic range is taken
    #[error("no free address in {first:#04x}..={last:#04x}")]
    NoFreeAddress { first: u8, last: u8 },

    /// Retries exhausted while the bus stayed busy
    #[error("send failed after {attempts} attempts: bus busy")]
    SendFailed { attempts: u8 },

    /// The hardware address strap could not be read or is out of range
    #[error("address strap unavailable: {0}")]
    Strap(String),

    /// Adapter-level failure
    #[error(transparent)]
    Can(#[from] CanError),
}

impl NetworkError {
    /// Unrecoverable transport fault (`BusError`)
    pub fn is_fatal(&self) -> bool {
        matches!(self, NetworkError::Can(e) if e.is_fatal())
    }

    /// Identity could not be established
    pub fn is_address_failure(&self) -> bool {
        matches!(
            self,
            NetworkError::AddressConflict { .. }
                | NetworkError::InvalidAddress(_)
                | NetworkError::NoFreeAddress { .. }
                | NetworkError::Strap(_)
        )
    }
}
