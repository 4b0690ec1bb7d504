// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! This module implements the 3-tier configuration loading system:
//! 1. TOML file (base values, or TOML embedded in the firmware image)
//! 2. Environment variables (bench overrides)
//! 3. CLI arguments (explicit user overrides)

use crate::types::AddressMode;
use crate::{ConfigError, ConfigResult, ModuleConfig};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Default configuration file name
pub const CONFIG_FILE_NAME: &str = "canmod.toml";

/// Environment variable naming an explicit configuration file
pub const CONFIG_PATH_ENV: &str = "CANMOD_CONFIG_PATH";

impl ModuleConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(content)?)
    }
}

/// Find the module configuration file
///
/// Search order:
/// 1. `CANMOD_CONFIG_PATH` environment variable
/// 2. Current working directory: `./canmod.toml`
/// 3. Up to 5 parent directories
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found in any location
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        return Err(ConfigError::FileNotFound(format!(
            "Config file specified by {} not found: {}",
            CONFIG_PATH_ENV,
            path.display()
        )));
    }

    let mut search_paths = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));

        let mut current = cwd;
        for _ in 0..5 {
            match current.parent() {
                Some(parent) => {
                    search_paths.push(parent.join(CONFIG_FILE_NAME));
                    current = parent.to_path_buf();
                }
                None => break,
            }
        }
    }

    if let Some(found) = search_paths.iter().find(|p| p.exists()) {
        return Ok(found.clone());
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::FileNotFound(format!(
        "'{}' not found in any of these locations:\n{}\n\nSet {} to specify a custom location.",
        CONFIG_FILE_NAME, search_list, CONFIG_PATH_ENV
    )))
}

/// Load configuration from a TOML file
///
/// # Arguments
///
/// * `config_path` - Optional path to config file. If `None`, will search for config file.
/// * `cli_args` - Optional CLI argument overrides
///
/// # Errors
///
/// Returns error if config file is not found, contains invalid TOML, or an
/// override value cannot be parsed
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<ModuleConfig> {
    let config_file = match config_path {
        Some(path) => path.to_path_buf(),
        None => find_config_file()?,
    };

    let content = fs::read_to_string(&config_file)?;
    let mut config = ModuleConfig::from_toml_str(&content)?;

    apply_environment_overrides(&mut config)?;

    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli)?;
    }

    Ok(config)
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `CANMOD_CHIP_SELECT` -> `bus.chip_select`
/// - `CANMOD_ADDRESS` -> `network.address.address` (forces fixed mode)
/// - `CANMOD_SERIAL` -> `module.serial`
/// - `CANMOD_LOG_LEVEL` -> `logging.level`
/// - `CANMOD_INDICATOR_LIGHT` -> `features.indicator_light`
pub fn apply_environment_overrides(config: &mut ModuleConfig) -> ConfigResult<()> {
    apply_overrides_from(config, |name| env::var(name).ok())
}

/// Apply overrides from any `CANMOD_*` variable source
pub fn apply_overrides_from<F>(config: &mut ModuleConfig, lookup: F) -> ConfigResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup("CANMOD_CHIP_SELECT") {
        config.bus.chip_select = parse_number(&value, "CANMOD_CHIP_SELECT")?;
    }
    if let Some(value) = lookup("CANMOD_ADDRESS") {
        config.network.address.address = parse_number(&value, "CANMOD_ADDRESS")?;
        config.network.address.mode = AddressMode::Fixed;
    }
    if let Some(value) = lookup("CANMOD_SERIAL") {
        config.module.serial = Some(parse_number(&value, "CANMOD_SERIAL")?);
    }
    if let Some(value) = lookup("CANMOD_LOG_LEVEL") {
        config.logging.level = value;
    }
    if let Some(value) = lookup("CANMOD_INDICATOR_LIGHT") {
        config.features.indicator_light = parse_bool(&value);
    }
    Ok(())
}

/// Apply CLI argument overrides to configuration
///
/// Keys use the dotted TOML path: `bus.chip_select`, `network.address`,
/// `module.serial`, `module.name`, `logging.level`, `features.indicator_light`.
/// Unknown keys are ignored.
pub fn apply_cli_overrides(
    config: &mut ModuleConfig,
    cli_args: &HashMap<String, String>,
) -> ConfigResult<()> {
    for (key, value) in cli_args {
        match key.as_str() {
            "bus.chip_select" => config.bus.chip_select = parse_number(value, key)?,
            "network.address" => {
                config.network.address.address = parse_number(value, key)?;
                config.network.address.mode = AddressMode::Fixed;
            }
            "module.serial" => config.module.serial = Some(parse_number(value, key)?),
            "module.name" => config.module.name = value.clone(),
            "logging.level" => config.logging.level = value.clone(),
            "features.indicator_light" => config.features.indicator_light = parse_bool(value),
            _ => {}
        }
    }
    Ok(())
}

/// Parse decimal or `0x`-prefixed hexadecimal numbers
fn parse_number<T>(value: &str, field: &str) -> ConfigResult<T>
where
    T: TryFrom<u64>,
{
    let trimmed = value.trim();
    let parsed = match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => trimmed.parse::<u64>(),
    }
    .map_err(|e| ConfigError::InvalidValue(format!("{} = {:?}: {}", field, value, e)))?;

    T::try_from(parsed)
        .map_err(|_| ConfigError::InvalidValue(format!("{} = {:?}: out of range", field, value)))
}

fn parse_bool(value: &str) -> bool {
    let lower = value.to_lowercase();
    lower == "true" || lower == "1" || lower == "yes"
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
[module]
name = "steering"
serial = 4242

[bus]
chip_select = 9

[network]
send_attempts = 4

[network.address]
mode = "dynamic"
dynamic_first = 0x30
dynamic_last = 0x3F

[features]
indicator_light = true
"#;

    #[test]
    fn test_from_toml_str_fills_defaults() {
        let config = ModuleConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.module.name, "steering");
        assert_eq!(config.module.serial, Some(4242));
        assert_eq!(config.bus.chip_select, 9);
        assert_eq!(config.bus.interface_prefix, "can");
        assert_eq!(config.network.send_attempts, 4);
        assert_eq!(config.network.address.mode, AddressMode::Dynamic);
        assert_eq!(config.network.address.dynamic_first, 0x30);
        assert!(config.features.indicator_light);
        assert_eq!(config.lifecycle.poll_interval_ms, 10);
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config = ModuleConfig::from_toml_str("").unwrap();
        assert_eq!(config, ModuleConfig::default());
    }

    #[test]
    fn test_invalid_toml_reports_parse_error() {
        let result = ModuleConfig::from_toml_str("[bus\nchip_select = ");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let mut cli = HashMap::new();
        cli.insert("bus.chip_select".to_string(), "3".to_string());

        let config = load_config(Some(file.path()), Some(&cli)).unwrap();
        assert_eq!(config.bus.chip_select, 3);
        assert_eq!(config.module.name, "steering");
    }

    #[test]
    fn test_overrides_from_lookup() {
        let mut config = ModuleConfig::default();
        config.network.address.mode = AddressMode::Dynamic;

        let vars: HashMap<&str, &str> = [
            ("CANMOD_CHIP_SELECT", "0x0B"),
            ("CANMOD_ADDRESS", "0x21"),
            ("CANMOD_SERIAL", "77"),
            ("CANMOD_INDICATOR_LIGHT", "yes"),
        ]
        .into_iter()
        .collect();

        apply_overrides_from(&mut config, |name| vars.get(name).map(|v| v.to_string())).unwrap();

        assert_eq!(config.bus.chip_select, 11);
        assert_eq!(config.network.address.address, 0x21);
        assert_eq!(config.network.address.mode, AddressMode::Fixed);
        assert_eq!(config.module.serial, Some(77));
        assert!(config.features.indicator_light);
    }

    #[test]
    fn test_out_of_range_override_rejected() {
        let mut config = ModuleConfig::default();
        let mut cli = HashMap::new();
        cli.insert("bus.chip_select".to_string(), "300".to_string());
        assert!(matches!(
            apply_cli_overrides(&mut config, &cli),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_config_serializes_to_json() {
        let json = serde_json::to_value(ModuleConfig::default()).unwrap();
        assert_eq!(json["bus"]["chip_select"], 10);
        assert_eq!(json["network"]["address"]["mode"], "fixed");
    }
}
