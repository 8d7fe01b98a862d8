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

use serde::{Deserialize, Serialize};

use crate::tariff::{
    DEFAULT_CLIMATE_FEE, DEFAULT_FUEL_FEE, DEFAULT_FUND_RATE, DEFAULT_VAT_RATE, DefaultRates,
    LoadLevel, Season, VoltageClass,
};

// ============= Rate Configuration =============

/// Rate parameters for one cost sensor.
///
/// Field names follow the HA options keys so an options payload deserializes directly.
/// Every field has a default, so an empty object is a valid low-voltage configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateConfiguration {
    #[serde(rename = "voltage_type", default)]
    pub voltage_class: VoltageClass,

    /// Day of month on which the monthly base charge is applied (1-31)
    #[serde(rename = "billing_date", default = "default_billing_day")]
    pub billing_day: u32,

    #[serde(default)]
    pub base_charge_policy: BaseChargePolicy,

    /// Apply VAT and fund levy to the base charge as well
    #[serde(default)]
    pub tax_base_charge: bool,

    /// Monthly base charge override (KRW). Defaults to the voltage class table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_charge: Option<f64>,

    /// Climate & environment charge (KRW/kWh)
    #[serde(default = "default_climate_fee")]
    pub climate_fee: f64,

    /// Fuel cost adjustment (KRW/kWh)
    #[serde(default = "default_fuel_fee")]
    pub fuel_fee: f64,

    /// VAT (%)
    #[serde(default = "default_vat_rate")]
    pub vat_rate: f64,

    /// Electric power industry fund levy (%)
    #[serde(default = "default_fund_rate")]
    pub fund_rate: f64,

    #[serde(flatten)]
    pub overrides: RateOverrides,
}

fn default_billing_day() -> u32 {
    1
}
fn default_climate_fee() -> f64 {
    DEFAULT_CLIMATE_FEE
}
fn default_fuel_fee() -> f64 {
    DEFAULT_FUEL_FEE
}
fn default_vat_rate() -> f64 {
    DEFAULT_VAT_RATE
}
fn default_fund_rate() -> f64 {
    DEFAULT_FUND_RATE
}

impl Default for RateConfiguration {
    fn default() -> Self {
        Self {
            voltage_class: VoltageClass::default(),
            billing_day: default_billing_day(),
            base_charge_policy: BaseChargePolicy::default(),
            tax_base_charge: false,
            base_charge: None,
            climate_fee: DEFAULT_CLIMATE_FEE,
            fuel_fee: DEFAULT_FUEL_FEE,
            vat_rate: DEFAULT_VAT_RATE,
            fund_rate: DEFAULT_FUND_RATE,
            overrides: RateOverrides::default(),
        }
    }
}

impl RateConfiguration {
    /// Energy price only: no surcharges, no tax, no overrides
    pub fn energy_only(voltage_class: VoltageClass) -> Self {
        Self {
            voltage_class,
            climate_fee: 0.0,
            fuel_fee: 0.0,
            vat_rate: 0.0,
            fund_rate: 0.0,
            ..Self::default()
        }
    }

    pub fn default_rates(&self) -> &'static DefaultRates {
        self.voltage_class.default_rates()
    }
}

/// Per season/load-level price overrides (KRW/kWh). `None` falls back to the default table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RateOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summer_light: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summer_mid: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summer_max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sf_light: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sf_mid: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sf_max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winter_light: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winter_mid: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winter_max: Option<f64>,
}

impl RateOverrides {
    pub fn get(&self, season: Season, level: LoadLevel) -> Option<f64> {
        match (season, level) {
            (Season::Summer, LoadLevel::Light) => self.summer_light,
            (Season::Summer, LoadLevel::Mid) => self.summer_mid,
            (Season::Summer, LoadLevel::Max) => self.summer_max,
            (Season::SpringFall, LoadLevel::Light) => self.sf_light,
            (Season::SpringFall, LoadLevel::Mid) => self.sf_mid,
            (Season::SpringFall, LoadLevel::Max) => self.sf_max,
            (Season::Winter, LoadLevel::Light) => self.winter_light,
            (Season::Winter, LoadLevel::Mid) => self.winter_mid,
            (Season::Winter, LoadLevel::Max) => self.winter_max,
        }
    }

    pub fn set(&mut self, season: Season, level: LoadLevel, price: Option<f64>) {
        let slot = match (season, level) {
            (Season::Summer, LoadLevel::Light) => &mut self.summer_light,
            (Season::Summer, LoadLevel::Mid) => &mut self.summer_mid,
            (Season::Summer, LoadLevel::Max) => &mut self.summer_max,
            (Season::SpringFall, LoadLevel::Light) => &mut self.sf_light,
            (Season::SpringFall, LoadLevel::Mid) => &mut self.sf_mid,
            (Season::SpringFall, LoadLevel::Max) => &mut self.sf_max,
            (Season::Winter, LoadLevel::Light) => &mut self.winter_light,
            (Season::Winter, LoadLevel::Mid) => &mut self.winter_mid,
            (Season::Winter, LoadLevel::Max) => &mut self.winter_max,
        };
        *slot = price;
    }

    /// Option key for a season/load-level pair (e.g. "sf_max")
    pub fn key(season: Season, level: LoadLevel) -> String {
        let prefix = match season {
            Season::Summer => "summer",
            Season::SpringFall => "sf",
            Season::Winter => "winter",
        };
        format!("{prefix}_{}", level.label())
    }
}

/// How the recurring base charge is added to the running total
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BaseChargePolicy {
    /// Full base charge once a month on the billing day
    #[default]
    MonthlyLump,
    /// base_charge / days_in_month every day, billing day ignored
    DailyProration,
}

/// Which binary state of the holiday indicator means "holiday"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HolidaySignalPolarity {
    /// Holiday-style sensor: `on` means holiday
    ActiveHigh,
    /// Workday-style sensor: `off` means holiday
    ActiveLow,
}

// ============= Sensor Configuration =============

/// Entity bindings plus rates for one cost sensor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorConfig {
    /// Cumulative energy sensor (kWh), e.g. "sensor.ev_charger_energy"
    pub source_sensor: String,

    /// Entity id the accumulated cost is published under
    #[serde(default = "default_cost_entity")]
    pub cost_entity: String,

    #[serde(default = "default_friendly_name")]
    pub friendly_name: String,

    /// Optional holiday / workday binary sensor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub holiday_sensor: Option<String>,

    /// Explicit polarity for `holiday_sensor`. Inferred from the entity id when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub holiday_polarity: Option<HolidaySignalPolarity>,

    #[serde(default)]
    pub rates: RateConfiguration,
}

fn default_cost_entity() -> String {
    "sensor.ev_charging_cost".to_owned()
}

fn default_friendly_name() -> String {
    "EV Charging Cost".to_owned()
}

impl SensorConfig {
    pub fn new(source_sensor: impl Into<String>) -> Self {
        Self {
            source_sensor: source_sensor.into(),
            cost_entity: default_cost_entity(),
            friendly_name: default_friendly_name(),
            holiday_sensor: None,
            holiday_polarity: None,
            rates: RateConfiguration::default(),
        }
    }
}
