// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Lifecycle states

use std::fmt;

/// Module lifecycle state
///
/// The discriminant is the state code carried in status announcements.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum LifecycleState {
    #[default]
    Uninitialized = 0,
    WaitingForEnable = 1,
    Ready = 2,
    Running = 3,
    Faulted = 4,
}

impl LifecycleState {
    /// Move `current` to `next`, returning `(before, after)` if it changed
    pub fn change_state_and_return_before_and_after(
        current: &mut LifecycleState,
        next: LifecycleState,
    ) -> Option<(LifecycleState, LifecycleState)> {
        if *current == next {
            return None;
        }
        let prior = *current;
        *current = next;
        Some((prior, next))
    }

    /// READY or RUNNING
    pub fn is_enabled(&self) -> bool {
        matches!(self, LifecycleState::Ready | LifecycleState::Running)
    }

    /// Wire code for status announcements
    pub fn code(&self) -> u8 {
        *self as u8
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleState::Uninitialized => "UNINITIALIZED",
            LifecycleState::WaitingForEnable => "WAITING_FOR_ENABLE",
            LifecycleState::Ready => "READY",
            LifecycleState::Running => "RUNNING",
            LifecycleState::Faulted => "FAULTED",
        }
    }
}

impl TryFrom<u8> for LifecycleState {
    type Error = u8;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(LifecycleState::Uninitialized),
            1 => Ok(LifecycleState::WaitingForEnable),
            2 => Ok(LifecycleState::Ready),
            3 => Ok(LifecycleState::Running),
            4 => Ok(LifecycleState::Faulted),
            other => Err(other),
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
