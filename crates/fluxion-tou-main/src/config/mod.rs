// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of FluxION.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

mod validation;
mod watch;

pub use validation::ValidationResult;
pub use watch::ConfigWatcher;

use anyhow::{Context, Result};
use fluxion_tou_core::{DEFAULT_TOTAL_PATH, SensorConfig, VoltageClass, tariff};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// HA add-on options written by the Supervisor
pub const ADDON_OPTIONS_PATH: &str = "/data/options.json";

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Source/holiday entities and tariff parameters
    pub sensor: SensorConfig,

    #[serde(default)]
    pub system: SystemConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemConfig {
    /// How often the source sensor is polled (seconds)
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Home Assistant base URL (optional, defaults to supervisor)
    #[serde(default)]
    pub ha_base_url: Option<String>,

    /// Home Assistant token (optional, uses SUPERVISOR_TOKEN if not set)
    #[serde(default)]
    pub ha_token: Option<String>,

    /// IANA time zone override; fetched from Home Assistant when unset
    #[serde(default)]
    pub timezone: Option<String>,

    /// Local copy of the accumulated total
    #[serde(default = "default_state_file")]
    pub state_file: String,
}

fn default_poll_interval() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_owned()
}

fn default_state_file() -> String {
    DEFAULT_TOTAL_PATH.to_owned()
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            log_level: default_log_level(),
            ha_base_url: None,
            ha_token: None,
            timezone: None,
            state_file: default_state_file(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            sensor: SensorConfig::new(""),
            system: SystemConfig::default(),
        }
    }
}

/// Where the active configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File { path: PathBuf, format: ConfigFormat },
    Environment,
}

impl ConfigSource {
    /// File to watch for hot-swapping, if any
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::File { path, .. } => Some(path),
            Self::Environment => None,
        }
    }

    pub fn format(&self) -> Option<ConfigFormat> {
        match self {
            Self::File { format, .. } => Some(*format),
            Self::Environment => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
}

impl ConfigFormat {
    pub fn parse(self, contents: &str) -> Result<AppConfig> {
        match self {
            Self::Json => serde_json::from_str(contents).context("Failed to parse JSON configuration"),
            Self::Toml => toml::from_str(contents).context("Failed to parse TOML configuration"),
        }
    }
}

impl AppConfig {
    /// Load configuration from HA add-on options, config.toml, config.json or the environment
    pub fn load() -> Result<(Self, ConfigSource)> {
        let candidates = [
            (PathBuf::from(ADDON_OPTIONS_PATH), ConfigFormat::Json),
            (PathBuf::from("config.toml"), ConfigFormat::Toml),
            (PathBuf::from("config.json"), ConfigFormat::Json),
        ];

        if let Some(loaded) = Self::load_first(&candidates)? {
            return Ok(loaded);
        }

        warn!("No configuration file found, using defaults with environment overrides");
        let config = Self::from_env();
        config.validate()?;
        Ok((config, ConfigSource::Environment))
    }

    /// Load the first candidate file that exists. A file that exists but is invalid is an error.
    pub fn load_first(candidates: &[(PathBuf, ConfigFormat)]) -> Result<Option<(Self, ConfigSource)>> {
        for (path, format) in candidates {
            let Ok(contents) = std::fs::read_to_string(path) else {
                continue;
            };
            let config = format
                .parse(&contents)
                .with_context(|| format!("Invalid configuration in {}", path.display()))?;
            info!("Loaded configuration from {}", path.display());
            config.validate()?;
            return Ok(Some((
                config,
                ConfigSource::File {
                    path: path.clone(),
                    format: *format,
                },
            )));
        }
        Ok(None)
    }

    /// Defaults with environment variable overrides (development/testing)
    fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Apply `SOURCE_SENSOR`, `HOLIDAY_SENSOR`, `VOLTAGE_TYPE`, `BILLING_DATE`, `HA_BASE_URL`
    /// and `HA_TOKEN` overrides from `lookup`
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(entity) = lookup("SOURCE_SENSOR") {
            self.sensor.source_sensor = entity;
        }
        if let Some(entity) = lookup("HOLIDAY_SENSOR") {
            self.sensor.holiday_sensor = Some(entity).filter(|e| !e.is_empty());
        }

        if let Some(voltage) = lookup("VOLTAGE_TYPE") {
            match voltage.parse::<VoltageClass>() {
                Ok(class) => self.sensor.rates.voltage_class = class,
                Err(e) => warn!("Ignoring VOLTAGE_TYPE: {}", e),
            }
        }

        if let Some(day) = lookup("BILLING_DATE") {
            match day.parse::<u32>() {
                Ok(day) => self.sensor.rates.billing_day = day,
                Err(_) => warn!("Ignoring BILLING_DATE '{}': not a day of month", day),
            }
        }

        if let Some(url) = lookup("HA_BASE_URL") {
            self.system.ha_base_url = Some(url);
        }
        if let Some(token) = lookup("HA_TOKEN") {
            self.system.ha_token = Some(token);
        }
    }

    /// Validate configuration with detailed error reporting
    pub fn validate_detailed(&self) -> ValidationResult {
        let mut result = ValidationResult::default();
        let sensor = &self.sensor;

        if sensor.source_sensor.trim().is_empty() {
            result.add_error("sensor.source_sensor", "Source energy sensor must be set");
        } else if !sensor.source_sensor.starts_with("sensor.") {
            result.add_warning(
                "sensor.source_sensor",
                format!(
                    "'{}' is not in the sensor domain; expected a cumulative kWh sensor",
                    sensor.source_sensor
                ),
            );
        }

        if sensor.cost_entity.trim().is_empty() {
            result.add_error("sensor.cost_entity", "Cost entity id must not be empty");
        } else if sensor.cost_entity == sensor.source_sensor {
            result.add_error(
                "sensor.cost_entity",
                "Cost entity must differ from the source sensor",
            );
        }

        if let Some(holiday) = &sensor.holiday_sensor {
            if holiday.trim().is_empty() {
                result.add_error("sensor.holiday_sensor", "Holiday sensor id must not be empty");
            } else if sensor.holiday_polarity.is_none() {
                result.add_warning(
                    "sensor.holiday_polarity",
                    "Polarity not set; it will be inferred from the entity id",
                );
            }
        }

        if let Err(e) = tariff::validate(&sensor.rates) {
            result.add_error("sensor.rates", e.to_string());
        }

        if self.system.state_file.trim().is_empty() {
            result.add_error("system.state_file", "State file path must not be empty");
        }

        if self.system.poll_interval_secs == 0 {
            result.add_error("system.poll_interval_secs", "Poll interval must be at least 1 second");
        } else if self.system.poll_interval_secs > 300 {
            result.add_warning(
                "system.poll_interval_secs",
                "Poll intervals above 5 minutes delay cost updates across tariff blocks",
            );
        }

        result
    }

    /// Validate configuration, failing on the first error
    pub fn validate(&self) -> Result<()> {
        let result = self.validate_detailed();
        result.log_warnings();
        if let Some(issue) = result.first_error() {
            anyhow::bail!("Invalid configuration ({})", issue);
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.system.poll_interval_secs)
    }
}
