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

//! Integration tests for the cost sensor driver
//!
//! Drives `CostSensor` through an in-memory host: energy updates, holiday sensors, billing ticks
//! and option changes between events.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use fluxion_tou_core::{
    BaseChargePolicy, CostSensor, Diagnostics, EnergyUpdate, HolidaySignalPolarity, HostRuntime,
    LoadLevel, RateConfiguration, Season, SensorConfig, SharedSensorConfig, VoltageClass,
};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug)]
struct InMemoryHost {
    now: Mutex<NaiveDateTime>,
    states: Mutex<HashMap<String, String>>,
    config: SharedSensorConfig,
    published: Mutex<Vec<(f64, Diagnostics)>>,
    saved_total: Mutex<Option<f64>>,
    unreachable: Mutex<bool>,
}

impl InMemoryHost {
    fn new(config: SensorConfig, now: NaiveDateTime) -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(now),
            states: Mutex::new(HashMap::new()),
            config: Arc::new(RwLock::new(config)),
            published: Mutex::new(Vec::new()),
            saved_total: Mutex::new(None),
            unreachable: Mutex::new(false),
        })
    }

    fn set_time(&self, now: NaiveDateTime) {
        *self.now.lock() = now;
    }

    fn set_state(&self, entity_id: &str, state: &str) {
        self.states
            .lock()
            .insert(entity_id.to_owned(), state.to_owned());
    }

    fn set_unreachable(&self, unreachable: bool) {
        *self.unreachable.lock() = unreachable;
    }

    fn last_published(&self) -> Option<(f64, Diagnostics)> {
        self.published.lock().last().cloned()
    }
}

#[async_trait]
impl HostRuntime for InMemoryHost {
    fn current_time(&self) -> NaiveDateTime {
        *self.now.lock()
    }

    async fn sensor_state(&self, entity_id: &str) -> Result<Option<String>> {
        if *self.unreachable.lock() {
            anyhow::bail!("connection refused");
        }
        Ok(self.states.lock().get(entity_id).cloned())
    }

    fn configuration(&self) -> SensorConfig {
        self.config.read().clone()
    }

    fn saved_total(&self) -> Result<Option<f64>> {
        Ok(*self.saved_total.lock())
    }

    async fn persist(&self, total: f64, diagnostics: &Diagnostics) -> Result<()> {
        *self.saved_total.lock() = Some(total);
        self.published.lock().push((total, diagnostics.clone()));
        Ok(())
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}

fn local(year: i32, month: u32, day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

fn energy_only_config() -> SensorConfig {
    let mut config = SensorConfig::new("sensor.ev_energy");
    config.rates = RateConfiguration::energy_only(VoltageClass::Low);
    config
}

#[tokio::test]
async fn test_energy_updates_accumulate() {
    // Wednesday 2025-07-16 14:00, summer max
    let host = InMemoryHost::new(energy_only_config(), local(2025, 7, 16, 14));
    let mut sensor = CostSensor::new(host.clone());

    assert_eq!(sensor.restore().await.unwrap(), 0.0);

    let first = sensor.handle_energy_state("100.0").await.unwrap();
    assert!(matches!(first, Some(EnergyUpdate::Primed { .. })));
    assert!(host.last_published().is_none());

    sensor.handle_energy_state("102.0").await.unwrap();
    let (total, diagnostics) = host.last_published().unwrap();
    assert_eq!(total, 518.4);
    assert_eq!(diagnostics.load_level, "max");
    assert_eq!(diagnostics.season, "summer");
    assert_eq!(diagnostics.current_price_per_kwh, 259.2);
    assert_eq!(diagnostics.source_sensor, "sensor.ev_energy");
}

#[tokio::test]
async fn test_unavailable_states_are_ignored() {
    let host = InMemoryHost::new(energy_only_config(), local(2025, 7, 16, 14));
    let mut sensor = CostSensor::new(host.clone());

    sensor.handle_energy_state("100.0").await.unwrap();
    assert_eq!(sensor.handle_energy_state("unavailable").await.unwrap(), None);
    assert_eq!(sensor.handle_energy_state("unknown").await.unwrap(), None);
    assert_eq!(sensor.accumulator().last_energy_reading(), Some(100.0));
    assert_eq!(sensor.accumulator().total_cost(), 0.0);
}

#[tokio::test]
async fn test_restore_from_last_published_state() {
    let host = InMemoryHost::new(energy_only_config(), local(2025, 7, 16, 14));
    host.set_state("sensor.ev_charging_cost", "15234.57");

    let mut sensor = CostSensor::new(host.clone());
    assert_eq!(sensor.restore().await.unwrap(), 15234.57);

    host.set_state("sensor.ev_charging_cost", "unavailable");
    let mut sensor = CostSensor::new(host.clone());
    assert_eq!(sensor.restore().await.unwrap(), 0.0);
}

#[tokio::test]
async fn test_saved_total_preferred_over_published_state() {
    let host = InMemoryHost::new(energy_only_config(), local(2025, 7, 16, 14));
    host.set_state("sensor.ev_charging_cost", "100.0");
    *host.saved_total.lock() = Some(15234.57);

    let mut sensor = CostSensor::new(host.clone());
    assert_eq!(sensor.restore().await.unwrap(), 15234.57);
}

#[tokio::test]
async fn test_unreachable_host_never_overwrites_total() {
    let host = InMemoryHost::new(energy_only_config(), local(2025, 7, 16, 14));
    host.set_state("sensor.ev_charging_cost", "15234.57");
    host.set_unreachable(true);

    let mut sensor = CostSensor::new(host.clone());
    assert!(sensor.restore().await.is_err());
    assert!(!sensor.is_restored());

    assert!(sensor.handle_energy_state("100.0").await.is_err());
    assert!(sensor.handle_energy_state("101.0").await.is_err());
    assert!(sensor.handle_billing_tick().await.is_err());
    assert!(host.published.lock().is_empty());
    assert_eq!(sensor.accumulator().last_energy_reading(), None);

    // HA comes back: the old total is read before anything is published
    host.set_unreachable(false);
    sensor.handle_energy_state("101.0").await.unwrap();
    assert!(sensor.is_restored());
    sensor.handle_energy_state("102.0").await.unwrap();

    let (total, _) = host.last_published().unwrap();
    assert_eq!(total, 15493.77);
}

#[tokio::test]
async fn test_deferred_billing_tick_after_outage() {
    let mut config = energy_only_config();
    config.rates.billing_day = 10;
    let host = InMemoryHost::new(config, local(2025, 9, 10, 0));
    host.set_state("sensor.ev_charging_cost", "1000.0");
    host.set_unreachable(true);

    let mut sensor = CostSensor::new(host.clone());
    let billing_date = NaiveDate::from_ymd_opt(2025, 9, 10).unwrap();
    assert!(sensor.handle_billing_tick_on(billing_date).await.is_err());

    host.set_unreachable(false);
    host.set_time(local(2025, 9, 10, 3));
    let added = sensor.handle_billing_tick_on(billing_date).await.unwrap();
    assert_eq!(added, Some(2390.0));
    assert_eq!(host.last_published().unwrap().0, 3390.0);
}

#[tokio::test]
async fn test_workday_sensor_marks_holiday() {
    let mut config = energy_only_config();
    config.holiday_sensor = Some("binary_sensor.workday_sensor".to_owned());
    let host = InMemoryHost::new(config, local(2025, 7, 16, 14));
    // Workday sensor off on a Wednesday: public holiday
    host.set_state("binary_sensor.workday_sensor", "off");

    let mut sensor = CostSensor::new(host.clone());
    sensor.handle_energy_state("10.0").await.unwrap();
    let update = sensor.handle_energy_state("11.0").await.unwrap();

    let Some(EnergyUpdate::Billed(billed)) = update else {
        panic!("expected billed update");
    };
    assert_eq!(billed.classification.load_level, LoadLevel::Light);
    assert_eq!(billed.unit_price, 84.3);
}

#[tokio::test]
async fn test_explicit_polarity_overrides_entity_name() {
    let mut config = energy_only_config();
    config.holiday_sensor = Some("binary_sensor.workday_sensor".to_owned());
    config.holiday_polarity = Some(HolidaySignalPolarity::ActiveHigh);
    let host = InMemoryHost::new(config, local(2025, 7, 16, 14));
    host.set_state("binary_sensor.workday_sensor", "off");

    let mut sensor = CostSensor::new(host.clone());
    sensor.handle_energy_state("10.0").await.unwrap();
    let update = sensor.handle_energy_state("11.0").await.unwrap();

    let Some(EnergyUpdate::Billed(billed)) = update else {
        panic!("expected billed update");
    };
    assert_eq!(billed.classification.load_level, LoadLevel::Max);
}

#[tokio::test]
async fn test_missing_holiday_sensor_is_workday() {
    let mut config = energy_only_config();
    config.holiday_sensor = Some("binary_sensor.korean_holiday".to_owned());
    let host = InMemoryHost::new(config, local(2025, 7, 16, 14));

    let mut sensor = CostSensor::new(host.clone());
    sensor.handle_energy_state("10.0").await.unwrap();
    let update = sensor.handle_energy_state("11.0").await.unwrap().unwrap();
    assert_eq!(update.cost(), 259.2);
}

#[tokio::test]
async fn test_configuration_hot_swap_applies_to_next_event() {
    let host = InMemoryHost::new(energy_only_config(), local(2025, 7, 16, 14));
    let mut sensor = CostSensor::new(host.clone());

    sensor.handle_energy_state("10.0").await.unwrap();
    sensor.handle_energy_state("11.0").await.unwrap();
    assert_eq!(sensor.accumulator().total_cost(), 259.2);

    host.config.write().rates.overrides.summer_max = Some(300.0);

    sensor.handle_energy_state("12.0").await.unwrap();
    assert!((sensor.accumulator().total_cost() - 559.2).abs() < 1e-9);
}

#[tokio::test]
async fn test_invalid_configuration_is_reported() {
    let host = InMemoryHost::new(energy_only_config(), local(2025, 7, 16, 14));
    let mut sensor = CostSensor::new(host.clone());
    sensor.handle_energy_state("10.0").await.unwrap();

    host.config.write().rates.fuel_fee = -1.0;
    let result = sensor.handle_energy_state("11.0").await;
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("fuel_fee"));
    assert_eq!(sensor.accumulator().total_cost(), 0.0);
    assert_eq!(sensor.accumulator().last_energy_reading(), Some(10.0));
}

#[tokio::test]
async fn test_billing_ticks_over_a_month() {
    let mut config = energy_only_config();
    config.rates.billing_day = 10;
    let host = InMemoryHost::new(config, local(2025, 9, 1, 0));
    let mut sensor = CostSensor::new(host.clone());

    for day in 1..=30 {
        host.set_time(
            NaiveDate::from_ymd_opt(2025, 9, day)
                .unwrap()
                .and_time(fluxion_tou_core::BILLING_TICK_TIME),
        );
        let added = sensor.handle_billing_tick().await.unwrap();
        assert_eq!(added.is_some(), day == 10, "day {day}");
    }

    assert_eq!(sensor.accumulator().total_cost(), 2390.0);
    assert_eq!(host.published.lock().len(), 1);
}

#[tokio::test]
async fn test_daily_proration_policy() {
    let mut config = energy_only_config();
    config.rates.base_charge_policy = BaseChargePolicy::DailyProration;
    config.rates.voltage_class = VoltageClass::High;
    let host = InMemoryHost::new(config, local(2025, 2, 1, 0));
    let mut sensor = CostSensor::new(host.clone());

    for day in 1..=28 {
        host.set_time(local(2025, 2, day, 0));
        sensor.handle_billing_tick().await.unwrap();
    }

    assert!((sensor.accumulator().total_cost() - 2580.0).abs() < 1e-6);
    let (total, diagnostics) = host.last_published().unwrap();
    assert_eq!(total, 2580.0);
    assert_eq!(diagnostics.base_rate_type, "high_voltage");
}

#[tokio::test]
async fn test_winter_weekday_morning() {
    // Monday 2025-01-13 09:00
    let host = InMemoryHost::new(energy_only_config(), local(2025, 1, 13, 9));
    let mut sensor = CostSensor::new(host.clone());

    sensor.handle_energy_state("1.0").await.unwrap();
    let update = sensor.handle_energy_state("2.0").await.unwrap();
    let Some(EnergyUpdate::Billed(billed)) = update else {
        panic!("expected billed update");
    };
    assert_eq!(billed.classification.season, Season::Winter);
    assert_eq!(billed.classification.load_level, LoadLevel::Max);
    assert_eq!(billed.unit_price, 217.5);
}
