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

//! Korean TOU tariff engine and cost accumulator

pub mod accumulator;
pub mod billing;
pub mod error;
pub mod host;
pub mod persistence;
pub mod sensor;
pub mod tariff;

pub use accumulator::{
    AccumulatorState, BilledEnergy, CostAccumulator, Diagnostics, EnergyUpdate,
    NOISE_THRESHOLD_KWH, PriceSnapshot, round_currency,
};
pub use billing::{BILLING_TICK_TIME, days_in_month, next_billing_tick};
pub use error::TariffError;
pub use host::{HostRuntime, SharedSensorConfig};
pub use persistence::{DEFAULT_TOTAL_PATH, PersistedTotal, TotalPersistence};
pub use sensor::{CostSensor, parse_energy_state};
pub use tariff::Classification;

// Re-export the data model so downstream crates need a single dependency
pub use fluxion_tou_types::{
    BaseChargePolicy, HolidaySignalPolarity, LoadLevel, RateConfiguration, RateOverrides, Season,
    SensorConfig, VoltageClass,
};
