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

//! Cost sensor driver
//!
//! Glue between host events and the accumulator: parses raw sensor states, resolves the holiday
//! indicator, re-reads configuration for every event and publishes the new total.

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use fluxion_tou_types::SensorConfig;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

use crate::accumulator::{CostAccumulator, EnergyUpdate};
use crate::host::HostRuntime;
use crate::tariff::{is_holiday_state, resolve_polarity};

/// Parse a cumulative energy state. Non-numeric and unavailable states yield `None`.
pub fn parse_energy_state(raw: &str) -> Option<f64> {
    match raw.trim() {
        "" | "unknown" | "unavailable" => None,
        value => value.parse::<f64>().ok().filter(|v| v.is_finite()),
    }
}

#[derive(Debug)]
pub struct CostSensor<H> {
    host: Arc<H>,
    accumulator: CostAccumulator,
    /// Nothing is published until the previous total has been read back
    restored: bool,
    /// Holiday entity we already warned about polarity inference for
    inferred_polarity_reported: Option<String>,
}

impl<H: HostRuntime> CostSensor<H> {
    pub fn new(host: Arc<H>) -> Self {
        Self {
            host,
            accumulator: CostAccumulator::new(),
            restored: false,
            inferred_polarity_reported: None,
        }
    }

    pub fn host(&self) -> &Arc<H> {
        &self.host
    }

    pub fn accumulator(&self) -> &CostAccumulator {
        &self.accumulator
    }

    pub fn is_restored(&self) -> bool {
        self.restored
    }

    /// Restore the running total.
    ///
    /// The host's own saved total wins; otherwise the last published state of the cost entity
    /// is used, starting from zero when the entity is missing or not numeric. A failure to reach
    /// the host is an error and leaves the sensor unrestored.
    pub async fn restore(&mut self) -> Result<f64> {
        match self.host.saved_total() {
            Ok(Some(total)) => {
                let restored = self.accumulator.restore_total(total);
                info!("Restored accumulated cost {:.2} from {}", restored, self.host.name());
                self.restored = true;
                return Ok(restored);
            }
            Ok(None) => {}
            Err(e) => warn!(
                "Saved total unreadable ({:#}), falling back to the published state",
                e
            ),
        }

        let config = self.host.configuration();
        let last_state = self
            .host
            .sensor_state(&config.cost_entity)
            .await
            .with_context(|| {
                format!(
                    "Could not read last state of {} from {}",
                    config.cost_entity,
                    self.host.name()
                )
            })?;

        let restored = self.accumulator.restore(last_state.as_deref());
        self.restored = true;
        Ok(restored)
    }

    async fn ensure_restored(&mut self) -> Result<()> {
        if !self.restored {
            self.restore().await?;
        }
        Ok(())
    }

    /// Handle a new state of the source energy sensor.
    ///
    /// Returns `Ok(None)` when the state is not a usable reading.
    pub async fn handle_energy_state(&mut self, raw_state: &str) -> Result<Option<EnergyUpdate>> {
        let Some(reading) = parse_energy_state(raw_state) else {
            trace!("Ignoring non-numeric energy state '{}'", raw_state);
            return Ok(None);
        };
        self.ensure_restored().await?;

        let config = self.host.configuration();
        let now = self.host.current_time();
        let is_holiday = self.is_holiday(&config).await;

        let update = self
            .accumulator
            .observe_energy(reading, now, is_holiday, &config.rates)?;

        if let EnergyUpdate::Billed(_) = update {
            self.publish(&config).await?;
        }
        Ok(Some(update))
    }

    /// Handle the daily 00:00:01 tick
    pub async fn handle_billing_tick(&mut self) -> Result<Option<f64>> {
        let today = self.host.current_time().date();
        self.handle_billing_tick_on(today).await
    }

    /// Handle the billing tick for `date`, e.g. a tick deferred while the host was unreachable
    pub async fn handle_billing_tick_on(&mut self, date: NaiveDate) -> Result<Option<f64>> {
        self.ensure_restored().await?;
        let config = self.host.configuration();

        let added = self.accumulator.billing_tick(date, &config.rates)?;
        if added.is_some() {
            self.publish(&config).await?;
        } else {
            debug!("Billing tick on day {}: nothing due", date.day());
        }
        Ok(added)
    }

    async fn publish(&self, config: &SensorConfig) -> Result<()> {
        let diagnostics = self.accumulator.diagnostics(config);
        self.host
            .persist(self.accumulator.display_total(), &diagnostics)
            .await
    }

    async fn is_holiday(&mut self, config: &SensorConfig) -> bool {
        let Some(entity_id) = config.holiday_sensor.as_deref() else {
            return false;
        };

        let (polarity, inferred) = resolve_polarity(entity_id, config.holiday_polarity);
        if inferred && self.inferred_polarity_reported.as_deref() != Some(entity_id) {
            warn!(
                "holiday_polarity not configured for {}, assuming {:?} from the entity id. \
                 Set holiday_polarity explicitly to avoid surprises when the entity is renamed.",
                entity_id, polarity
            );
            self.inferred_polarity_reported = Some(entity_id.to_owned());
        }

        match self.host.sensor_state(entity_id).await {
            Ok(Some(state)) => is_holiday_state(&state, polarity),
            Ok(None) => {
                debug!("Holiday sensor {} not found, treating as workday", entity_id);
                false
            }
            Err(e) => {
                warn!(
                    "Failed to read holiday sensor {}: {}, treating as workday",
                    entity_id, e
                );
                false
            }
        }
    }
}
