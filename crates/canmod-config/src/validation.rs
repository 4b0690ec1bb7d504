// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation
//!
//! Collects every violation instead of stopping at the first one.

use crate::types::{AddressMode, FIRST_MODULE_ADDRESS, LAST_MODULE_ADDRESS};
use crate::{ConfigError, ConfigResult, ModuleConfig};

/// Validation errors that can occur during config validation
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    AddressOutOfRange { field: String, address: u8 },
    InvalidRange { field: String, first: u8, last: u8 },
    InvalidValue { field: String, reason: String },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AddressOutOfRange { field, address } => write!(
                f,
                "{} = {:#04x} is outside the module address range ({:#04x}-{:#04x})",
                field, address, FIRST_MODULE_ADDRESS, LAST_MODULE_ADDRESS
            ),
            Self::InvalidRange { field, first, last } => {
                write!(f, "{}: range {:#04x}..={:#04x} is empty", field, first, last)
            }
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
        }
    }
}

/// Validate the complete configuration
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` listing every violation
pub fn validate_config(config: &ModuleConfig) -> ConfigResult<()> {
    let mut errors = Vec::new();

    validate_addresses(config, &mut errors);
    validate_value_ranges(config, &mut errors);

    if !errors.is_empty() {
        let error_messages = errors
            .iter()
            .map(|e| format!("  - {}", e))
            .collect::<Vec<_>>()
            .join("\n");

        return Err(ConfigError::ValidationError(format!(
            "Configuration validation failed:\n{}",
            error_messages
        )));
    }

    Ok(())
}

fn in_module_range(address: u8) -> bool {
    (FIRST_MODULE_ADDRESS..=LAST_MODULE_ADDRESS).contains(&address)
}

fn validate_addresses(config: &ModuleConfig, errors: &mut Vec<ConfigValidationError>) {
    let address = &config.network.address;
    match address.mode {
        AddressMode::Fixed => {
            if !in_module_range(address.address) {
                errors.push(ConfigValidationError::AddressOutOfRange {
                    field: "network.address.address".to_string(),
                    address: address.address,
                });
            }
        }
        AddressMode::Strap => {
            if !in_module_range(address.strap_base) {
                errors.push(ConfigValidationError::AddressOutOfRange {
                    field: "network.address.strap_base".to_string(),
                    address: address.strap_base,
                });
            }
        }
        AddressMode::Dynamic => {
            for (field, value) in [
                ("network.address.dynamic_first", address.dynamic_first),
                ("network.address.dynamic_last", address.dynamic_last),
            ] {
                if !in_module_range(value) {
                    errors.push(ConfigValidationError::AddressOutOfRange {
                        field: field.to_string(),
                        address: value,
                    });
                }
            }
            if address.dynamic_first > address.dynamic_last {
                errors.push(ConfigValidationError::InvalidRange {
                    field: "network.address".to_string(),
                    first: address.dynamic_first,
                    last: address.dynamic_last,
                });
            }
        }
    }
}

fn validate_value_ranges(config: &ModuleConfig, errors: &mut Vec<ConfigValidationError>) {
    let mut positive = |field: &str, value: u64| {
        if value == 0 {
            errors.push(ConfigValidationError::InvalidValue {
                field: field.to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }
    };

    positive("network.send_attempts", u64::from(config.network.send_attempts));
    positive("network.max_claim_attempts", u64::from(config.network.max_claim_attempts));
    positive("lifecycle.poll_interval_ms", u64::from(config.lifecycle.poll_interval_ms));
    positive("lifecycle.status_period_cycles", u64::from(config.lifecycle.status_period_cycles));
    positive(
        "lifecycle.waiting_status_period_polls",
        u64::from(config.lifecycle.waiting_status_period_polls),
    );
    positive("lifecycle.max_frames_per_cycle", config.lifecycle.max_frames_per_cycle as u64);
    positive("lifecycle.inbox_capacity", config.lifecycle.inbox_capacity as u64);

    // Announce retries are a small fixed bound
    if config.network.send_attempts > 16 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "network.send_attempts".to_string(),
            reason: format!("{} exceeds the maximum of 16", config.network.send_attempts),
        });
    }

    if config.features.indicator_light && config.indicator.blink_half_period_ms == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "indicator.blink_half_period_ms".to_string(),
            reason: "must be greater than 0 when the indicator is enabled".to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcast_address_rejected() {
        let mut config = ModuleConfig::default();
        config.network.address.address = 0xFF;
        let err = validate_config(&config).unwrap_err().to_string();
        assert!(err.contains("network.address.address"));
    }

    #[test]
    fn test_unassigned_address_rejected() {
        let mut config = ModuleConfig::default();
        config.network.address.address = 0x00;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_dynamic_range_must_be_ordered() {
        let mut config = ModuleConfig::default();
        config.network.address.mode = AddressMode::Dynamic;
        config.network.address.dynamic_first = 0x40;
        config.network.address.dynamic_last = 0x30;
        let err = validate_config(&config).unwrap_err().to_string();
        assert!(err.contains("is empty"));
    }

    #[test]
    fn test_all_violations_reported() {
        let mut config = ModuleConfig::default();
        config.network.send_attempts = 0;
        config.lifecycle.poll_interval_ms = 0;
        config.lifecycle.max_frames_per_cycle = 0;
        let err = validate_config(&config).unwrap_err().to_string();
        assert!(err.contains("network.send_attempts"));
        assert!(err.contains("lifecycle.poll_interval_ms"));
        assert!(err.contains("lifecycle.max_frames_per_cycle"));
    }

    #[test]
    fn test_excessive_send_attempts_rejected() {
        let mut config = ModuleConfig::default();
        config.network.send_attempts = 100;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_strap_mode_ignores_fixed_address() {
        let mut config = ModuleConfig::default();
        config.network.address.mode = AddressMode::Strap;
        config.network.address.address = 0xFF;
        assert!(validate_config(&config).is_ok());
    }
}
