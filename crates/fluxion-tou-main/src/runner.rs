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

//! Event loop driving one cost sensor against Home Assistant

use anyhow::Result;
use chrono::NaiveDate;
use fluxion_tou_core::{CostSensor, EnergyUpdate, HostRuntime, next_billing_tick};
use fluxion_tou_ha::HaHost;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::ConfigWatcher;

#[derive(Debug)]
pub struct Runner {
    host: Arc<HaHost>,
    sensor: CostSensor<HaHost>,
    watcher: Option<ConfigWatcher>,
    poll_interval: Duration,
    /// `last_updated` of the last source state fed to the sensor
    last_source_update: Option<String>,
    last_billed: Option<NaiveDate>,
    /// Billing tick that could not run because the total was not restored yet
    deferred_billing: Option<NaiveDate>,
}

impl Runner {
    pub async fn start(
        host: Arc<HaHost>,
        watcher: Option<ConfigWatcher>,
        poll_interval: Duration,
    ) -> Self {
        let mut sensor = CostSensor::new(Arc::clone(&host));
        restore(&mut sensor).await;

        Self {
            host,
            sensor,
            watcher,
            poll_interval,
            last_source_update: None,
            last_billed: None,
            deferred_billing: None,
        }
    }

    pub async fn run(mut self) -> Result<()> {
        let mut poll = self.new_interval();

        loop {
            let now = self.host.current_time();
            let until_tick = (next_billing_tick(now) - now)
                .to_std()
                .unwrap_or(Duration::ZERO);

            tokio::select! {
                _ = poll.tick() => {
                    if self.reload_options().await {
                        poll = self.new_interval();
                    }
                    if let Some(date) = self.deferred_billing.take() {
                        self.run_billing(date).await;
                    }
                    self.poll_source().await;
                }
                () = tokio::time::sleep(until_tick) => {
                    self.billing_tick().await;
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutting down");
                    return Ok(());
                }
            }
        }
    }

    fn new_interval(&self) -> Interval {
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    }

    async fn poll_source(&mut self) {
        let source = self.host.configuration().source_sensor;
        let state = match self.host.client().get_state(&source).await {
            Ok(state) => state,
            Err(e) => {
                warn!("Failed to read {}: {}", source, e);
                return;
            }
        };

        if self.last_source_update.as_deref() == Some(state.last_updated.as_str()) {
            return;
        }
        self.last_source_update = Some(state.last_updated);

        match self.sensor.handle_energy_state(&state.state).await {
            Ok(Some(EnergyUpdate::Billed(billed))) => debug!(
                "{:.3} kWh at {:.2} KRW/kWh, total {:.2} KRW",
                billed.delta_kwh,
                billed.effective_unit_price,
                self.sensor.accumulator().display_total()
            ),
            Ok(Some(EnergyUpdate::CounterReset { previous, reading })) => {
                info!("Energy counter reset ({} -> {}), re-baselined", previous, reading);
            }
            Ok(_) => {}
            Err(e) => error!("Failed to process {} state: {:#}", source, e),
        }
    }

    async fn billing_tick(&mut self) {
        let today = self.host.current_time().date();
        if self.last_billed == Some(today) {
            return;
        }
        self.last_billed = Some(today);
        self.run_billing(today).await;
    }

    async fn run_billing(&mut self, date: NaiveDate) {
        match self.sensor.handle_billing_tick_on(date).await {
            Ok(Some(charge)) => info!(
                "Base charge {:.2} KRW applied, total {:.2} KRW",
                charge,
                self.sensor.accumulator().display_total()
            ),
            Ok(None) => {}
            Err(e) if !self.sensor.is_restored() => {
                warn!("Billing tick for {} deferred: {:#}", date, e);
                self.deferred_billing = Some(date);
            }
            Err(e) => error!("Billing tick failed: {:#}", e),
        }
    }

    /// Apply a changed options file. Returns true if the poll interval changed.
    async fn reload_options(&mut self) -> bool {
        let Some(watcher) = self.watcher.as_mut() else {
            return false;
        };
        let config = match watcher.poll() {
            Ok(Some(config)) => config,
            Ok(None) => return false,
            Err(e) => {
                error!("Ignoring configuration update: {:#}", e);
                return false;
            }
        };

        let previous_source = self.host.configuration().source_sensor;
        *self.host.shared_config().write() = config.sensor;
        info!("Configuration reloaded from {}", watcher.path().display());

        if self.host.configuration().source_sensor != previous_source {
            info!("Source sensor changed, restarting accumulation from the published total");
            self.sensor = CostSensor::new(Arc::clone(&self.host));
            restore(&mut self.sensor).await;
            self.last_source_update = None;
        }

        let interval = config.system.poll_interval_secs;
        if Duration::from_secs(interval) == self.poll_interval {
            return false;
        }
        self.poll_interval = Duration::from_secs(interval);
        true
    }
}

async fn restore(sensor: &mut CostSensor<HaHost>) {
    match sensor.restore().await {
        Ok(total) => info!("Restored accumulated cost: {:.2} KRW", total),
        Err(e) => warn!(
            "Accumulated cost not restored yet, publishing is held until it is: {:#}",
            e
        ),
    }
}
