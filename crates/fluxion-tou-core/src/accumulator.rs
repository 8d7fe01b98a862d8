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

//! Running cost total for one energy sensor.
//!
//! The accumulator owns the last seen cumulative reading and the monetary total. Each
//! observation either primes the baseline, re-baselines after a counter reset, is dropped as
//! noise, or is billed at the price for the local time of the observation.

use chrono::{NaiveDate, NaiveDateTime};
use fluxion_tou_types::{LoadLevel, RateConfiguration, Season, SensorConfig};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::billing;
use crate::error::Result;
use crate::tariff::{self, Classification};

/// Deltas below this (kWh) are treated as sensor jitter
pub const NOISE_THRESHOLD_KWH: f64 = 0.001;

/// Last price applied, kept for diagnostics only
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    pub unit_price: f64,
    pub season: Option<Season>,
    pub load_level: Option<LoadLevel>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccumulatorState {
    pub total_cost: f64,
    pub last_energy_reading: Option<f64>,
    #[serde(skip)]
    pub snapshot: PriceSnapshot,
}

/// What an energy observation did to the state
#[derive(Debug, Clone, PartialEq)]
pub enum EnergyUpdate {
    /// First reading since startup, baseline stored
    Primed { reading: f64 },
    /// Reading went backwards (meter replaced or rebooted), baseline moved
    CounterReset { previous: f64, reading: f64 },
    /// Delta below the noise threshold, baseline moved
    Noise { delta: f64 },
    /// NaN or infinite reading, state unchanged
    NonFinite { reading: f64 },
    Billed(BilledEnergy),
}

impl EnergyUpdate {
    pub fn cost(&self) -> f64 {
        match self {
            Self::Billed(billed) => billed.cost,
            Self::Primed { .. }
            | Self::CounterReset { .. }
            | Self::Noise { .. }
            | Self::NonFinite { .. } => 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BilledEnergy {
    pub delta_kwh: f64,
    pub classification: Classification,
    /// Price before surcharges and tax
    pub unit_price: f64,
    pub effective_unit_price: f64,
    pub cost: f64,
}

/// Attributes published next to the total
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub current_price_per_kwh: f64,
    pub load_level: String,
    pub season: String,
    pub source_sensor: String,
    pub base_rate_type: String,
    pub billing_date: u32,
}

#[derive(Debug, Clone, Default)]
pub struct CostAccumulator {
    state: AccumulatorState,
}

impl CostAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_total(total_cost: f64) -> Self {
        Self {
            state: AccumulatorState {
                total_cost,
                ..AccumulatorState::default()
            },
        }
    }

    /// Restore the total from the host's last known state.
    ///
    /// Missing, `unknown`/`unavailable` or unparsable values start from zero.
    pub fn restore(&mut self, last_state: Option<&str>) -> f64 {
        let parsed = last_state
            .filter(|s| !matches!(*s, "unknown" | "unavailable"))
            .and_then(|s| s.trim().parse::<f64>().ok());

        let restored = self.restore_total(parsed.unwrap_or(0.0));
        info!(
            "Restored accumulated cost: {:.2} (last state: {:?})",
            restored, last_state
        );
        restored
    }

    /// Restore a numeric total. Negative or non-finite totals start from zero.
    pub fn restore_total(&mut self, total: f64) -> f64 {
        let restored = if total.is_finite() && total >= 0.0 {
            total
        } else {
            0.0
        };
        self.state.total_cost = restored;
        restored
    }

    /// Apply a cumulative energy reading observed at `local_time`.
    ///
    /// On error (invalid configuration) the state is left untouched.
    pub fn observe_energy(
        &mut self,
        reading: f64,
        local_time: NaiveDateTime,
        is_holiday: bool,
        config: &RateConfiguration,
    ) -> Result<EnergyUpdate> {
        if !reading.is_finite() {
            trace!("Ignoring non-finite energy reading {}", reading);
            return Ok(EnergyUpdate::NonFinite { reading });
        }

        let Some(previous) = self.state.last_energy_reading else {
            self.state.last_energy_reading = Some(reading);
            debug!("Energy baseline primed at {:.3} kWh", reading);
            return Ok(EnergyUpdate::Primed { reading });
        };

        let delta = reading - previous;
        if delta < 0.0 {
            self.state.last_energy_reading = Some(reading);
            info!(
                "Energy counter went backwards ({:.3} -> {:.3} kWh), re-baselining",
                previous, reading
            );
            return Ok(EnergyUpdate::CounterReset { previous, reading });
        }
        if delta < NOISE_THRESHOLD_KWH {
            self.state.last_energy_reading = Some(reading);
            trace!("Ignoring energy delta {:.6} kWh below noise threshold", delta);
            return Ok(EnergyUpdate::Noise { delta });
        }

        tariff::validate(config)?;
        let classification = tariff::classify_at(local_time, is_holiday)?;
        let unit_price =
            tariff::resolve_price(classification.season, classification.load_level, config);
        let effective_unit_price = tariff::effective_unit_price(unit_price, config);
        let cost = delta * effective_unit_price;

        self.state.total_cost += cost;
        self.state.last_energy_reading = Some(reading);
        self.state.snapshot = PriceSnapshot {
            unit_price: effective_unit_price,
            season: Some(classification.season),
            load_level: Some(classification.load_level),
        };

        debug!(
            "Billed {:.3} kWh at {:.2}/kWh ({} {}): +{:.2}, total {:.2}",
            delta,
            effective_unit_price,
            classification.season,
            classification.load_level,
            cost,
            self.state.total_cost
        );

        Ok(EnergyUpdate::Billed(BilledEnergy {
            delta_kwh: delta,
            classification,
            unit_price,
            effective_unit_price,
            cost,
        }))
    }

    /// Apply the daily billing tick for `date`. Returns the amount added, if any.
    pub fn billing_tick(&mut self, date: NaiveDate, config: &RateConfiguration) -> Result<Option<f64>> {
        tariff::validate(config)?;

        let share = billing::base_charge_share(date, config.base_charge_policy, config.billing_day);
        if share <= 0.0 {
            trace!("No base charge due on {}", date);
            return Ok(None);
        }

        let charge = tariff::billed_base_charge(config) * share;
        self.state.total_cost += charge;
        info!(
            "Base charge added on {} ({:?}): +{:.2}, total {:.2}",
            date, config.base_charge_policy, charge, self.state.total_cost
        );
        Ok(Some(charge))
    }

    /// Total at full precision
    pub fn total_cost(&self) -> f64 {
        self.state.total_cost
    }

    /// Total as exposed to the host, rounded to 2 decimals
    pub fn display_total(&self) -> f64 {
        round_currency(self.state.total_cost)
    }

    pub fn last_energy_reading(&self) -> Option<f64> {
        self.state.last_energy_reading
    }

    pub fn snapshot(&self) -> &PriceSnapshot {
        &self.state.snapshot
    }

    pub fn state(&self) -> &AccumulatorState {
        &self.state
    }

    pub fn diagnostics(&self, config: &SensorConfig) -> Diagnostics {
        let snapshot = &self.state.snapshot;
        Diagnostics {
            current_price_per_kwh: round_currency(snapshot.unit_price),
            load_level: snapshot
                .load_level
                .map_or_else(|| "Unknown".to_owned(), |l| l.label().to_owned()),
            season: snapshot
                .season
                .map_or_else(|| "Unknown".to_owned(), |s| s.label().to_owned()),
            source_sensor: config.source_sensor.clone(),
            base_rate_type: config.rates.voltage_class.to_config_value().to_owned(),
            billing_date: config.rates.billing_day,
        }
    }
}

pub fn round_currency(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
