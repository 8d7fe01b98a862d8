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

//! KEPCO time-of-use tariff vocabulary
//!
//! Voltage classes, seasons and load levels, plus the built-in unit price tables
//! (KRW/kWh) used whenever a price is not overridden in the configuration.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Contracted supply voltage, selects the default price table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum VoltageClass {
    #[default]
    #[serde(rename = "low_voltage")]
    Low,
    #[serde(rename = "high_voltage")]
    High,
}

impl VoltageClass {
    /// Config string value as stored in HA options
    pub fn to_config_value(&self) -> &'static str {
        match self {
            Self::Low => "low_voltage",
            Self::High => "high_voltage",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Low => "Low Voltage",
            Self::High => "High Voltage",
        }
    }

    pub fn all() -> &'static [VoltageClass] {
        &[Self::Low, Self::High]
    }

    /// Built-in price table for this voltage class
    pub fn default_rates(&self) -> &'static DefaultRates {
        match self {
            Self::Low => &LOW_VOLTAGE_RATES,
            Self::High => &HIGH_VOLTAGE_RATES,
        }
    }
}

impl fmt::Display for VoltageClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_config_value())
    }
}

impl FromStr for VoltageClass {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "low_voltage" | "low" => Ok(Self::Low),
            "high_voltage" | "high" => Ok(Self::High),
            _ => Err(anyhow::anyhow!(
                "Unknown voltage type: '{}'. Supported types: {}",
                s,
                Self::all()
                    .iter()
                    .map(|v| v.to_config_value())
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
        }
    }
}

/// Tariff season. The month mapping is fixed by the utility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Season {
    Summer,
    SpringFall,
    Winter,
}

impl Season {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Summer => "summer",
            Self::SpringFall => "spring_fall",
            Self::Winter => "winter",
        }
    }

    pub fn all() -> &'static [Season] {
        &[Self::Summer, Self::SpringFall, Self::Winter]
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Season {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "summer" => Ok(Self::Summer),
            "spring_fall" => Ok(Self::SpringFall),
            "winter" => Ok(Self::Winter),
            _ => Err(anyhow::anyhow!("Unknown season: '{s}'")),
        }
    }
}

/// Grid demand tier that determines the unit price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadLevel {
    Light,
    Mid,
    Max,
}

impl LoadLevel {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Mid => "mid",
            Self::Max => "max",
        }
    }

    pub fn all() -> &'static [LoadLevel] {
        &[Self::Light, Self::Mid, Self::Max]
    }
}

impl fmt::Display for LoadLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for LoadLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "light" => Ok(Self::Light),
            "mid" => Ok(Self::Mid),
            "max" => Ok(Self::Max),
            _ => Err(anyhow::anyhow!("Unknown load level: '{s}'")),
        }
    }
}

/// Unit prices for one season (KRW/kWh)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeasonRates {
    pub light: f64,
    pub mid: f64,
    pub max: f64,
}

impl SeasonRates {
    pub fn get(&self, level: LoadLevel) -> f64 {
        match level {
            LoadLevel::Light => self.light,
            LoadLevel::Mid => self.mid,
            LoadLevel::Max => self.max,
        }
    }
}

/// Built-in tariff for one voltage class
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DefaultRates {
    /// Monthly base charge (KRW)
    pub base: f64,
    pub summer: SeasonRates,
    pub spring_fall: SeasonRates,
    pub winter: SeasonRates,
}

impl DefaultRates {
    pub fn season(&self, season: Season) -> &SeasonRates {
        match season {
            Season::Summer => &self.summer,
            Season::SpringFall => &self.spring_fall,
            Season::Winter => &self.winter,
        }
    }

    pub fn price(&self, season: Season, level: LoadLevel) -> f64 {
        self.season(season).get(level)
    }
}

pub const LOW_VOLTAGE_RATES: DefaultRates = DefaultRates {
    base: 2390.0,
    summer: SeasonRates {
        light: 84.3,
        mid: 172.0,
        max: 259.2,
    },
    spring_fall: SeasonRates {
        light: 85.4,
        mid: 97.2,
        max: 102.1,
    },
    winter: SeasonRates {
        light: 107.4,
        mid: 154.9,
        max: 217.5,
    },
};

pub const HIGH_VOLTAGE_RATES: DefaultRates = DefaultRates {
    base: 2580.0,
    summer: SeasonRates {
        light: 79.2,
        mid: 137.4,
        max: 190.4,
    },
    spring_fall: SeasonRates {
        light: 80.2,
        mid: 91.0,
        max: 94.9,
    },
    winter: SeasonRates {
        light: 96.6,
        mid: 127.7,
        max: 165.5,
    },
};

// 2025 surcharge and tax defaults
pub const DEFAULT_CLIMATE_FEE: f64 = 9.0;
pub const DEFAULT_FUEL_FEE: f64 = 5.0;
pub const DEFAULT_VAT_RATE: f64 = 10.0;
pub const DEFAULT_FUND_RATE: f64 = 3.7;
