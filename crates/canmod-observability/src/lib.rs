// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # canmod-observability
//!
//! Logging setup shared by canmod binaries, with per-crate debug flags.
//!
//! ## Features
//! - `file-logging`: JSON log files in a timestamped run folder (desktop only)

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod init;

pub use cli::*;
pub use init::*;

/// Known canmod crate names for debug flags
pub const KNOWN_CRATES: &[&str] = &[
    "canmod",
    "canmod-hal",
    "canmod-net",
    "canmod-lifecycle",
    "canmod-config",
    "module-sim",
];
