// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Error types for CAN adapter operations

/// Result type alias for CAN adapter operations
pub type CanResult<T> = Result<T, CanError>;

/// Errors raised by the CAN adapter and its peripherals
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CanError {
    /// The peripheral could not be claimed (already open, not present, invalid select)
    #[error("CAN bus unavailable: {0}")]
    BusUnavailable(String),

    /// The transport cannot accept a frame right now; the caller must retry
    #[error("CAN bus busy")]
    BusBusy,

    /// Transport or hardware fault
    #[error("CAN bus error: {0}")]
    BusError(String),

    /// Frame does not fit the wire format
    #[error("Invalid CAN frame: {0}")]
    InvalidFrame(String),
}

impl CanError {
    /// Transient condition that goes away on retry
    pub fn is_retryable(&self) -> bool {
        matches!(self, CanError::BusBusy)
    }

    /// Unrecoverable transport condition
    pub fn is_fatal(&self) -> bool {
        matches!(self, CanError::BusError(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(CanError::BusBusy.is_retryable());
        assert!(!CanError::BusBusy.is_fatal());
        assert!(CanError::BusError("bus-off".into()).is_fatal());
        assert!(!CanError::BusUnavailable("cs 3".into()).is_retryable());
    }

    #[test]
    fn test_display() {
        let err = CanError::BusUnavailable("already open".to_string());
        assert_eq!(err.to_string(), "CAN bus unavailable: already open");
    }
}
