// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Error types for the lifecycle core

use canmod_config::ConfigError;
use canmod_hal::CanError;
use canmod_net::{FaultCode, NetworkError};

use crate::state::LifecycleState;

/// Result type alias for lifecycle operations
pub type ModuleResult<T> = Result<T, ModuleError>;

#[derive(Debug, thiserror::Error)]
pub enum ModuleError {
    #[error("invalid module configuration: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Can(#[from] CanError),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error("module is not set up")]
    NotSetUp,

    #[error("module is already set up (state {0})")]
    AlreadySetUp(LifecycleState),

    /// A fault is latched; only teardown and setup clear it
    #[error("module is faulted: {0:?}")]
    Faulted(FaultCode),

    #[error("module is not enabled (state {0})")]
    NotEnabled(LifecycleState),

    /// Hooks called out of head/tail order
    #[error("hook order violated: {0}")]
    HookOrder(&'static str),

    /// A failed bus open consumed the peripheral
    #[error("CAN peripheral is no longer available")]
    PeripheralUnavailable,

    #[error("application message kind {kind:#04x} with {len} bytes cannot be sent")]
    InvalidApplicationMessage { kind: u8, len: usize },
}

impl ModuleError {
    /// Setup failed because the address is taken
    pub fn is_address_conflict(&self) -> bool {
        matches!(
            self,
            ModuleError::Network(NetworkError::AddressConflict { .. })
        )
    }

    /// Setup failed because the bus could not be opened
    pub fn is_bus_unavailable(&self) -> bool {
        matches!(
            self,
            ModuleError::Can(CanError::BusUnavailable(_))
                | ModuleError::Network(NetworkError::Can(CanError::BusUnavailable(_)))
        )
    }
}
