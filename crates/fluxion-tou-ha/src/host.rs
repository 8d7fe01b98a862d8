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

//! `HostRuntime` backed by the Home Assistant REST API

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use chrono_tz::Tz;
use fluxion_tou_core::{
    Diagnostics, HostRuntime, PersistedTotal, SensorConfig, SharedSensorConfig, TotalPersistence,
};
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::client::HomeAssistantClient;
use crate::errors::HaError;
use crate::types::HaStateUpdate;

/// Used when HA does not report a usable time zone
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Asia::Seoul;

pub const CURRENCY_UNIT: &str = "KRW";

#[derive(Debug)]
pub struct HaHost {
    client: HomeAssistantClient,
    timezone: Tz,
    config: SharedSensorConfig,
    /// Local copy of the total, read back before the published entity on restore
    persistence: Option<TotalPersistence>,
}

impl HaHost {
    pub fn new(client: HomeAssistantClient, timezone: Tz, config: SharedSensorConfig) -> Self {
        Self {
            client,
            timezone,
            config,
            persistence: None,
        }
    }

    pub fn with_persistence(mut self, persistence: TotalPersistence) -> Self {
        self.persistence = Some(persistence);
        self
    }

    /// Build a host using the time zone configured in Home Assistant
    pub async fn connect(client: HomeAssistantClient, config: SharedSensorConfig) -> Self {
        let timezone = match client.get_timezone().await {
            Ok(name) => parse_timezone(&name),
            Err(e) => {
                warn!(
                    "Could not fetch HA timezone ({}), using {}",
                    e, DEFAULT_TIMEZONE
                );
                DEFAULT_TIMEZONE
            }
        };
        info!("Tariff hours evaluated in {}", timezone);
        Self::new(client, timezone, config)
    }

    pub fn client(&self) -> &HomeAssistantClient {
        &self.client
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn shared_config(&self) -> &SharedSensorConfig {
        &self.config
    }
}

/// Parse an IANA time zone name, falling back to Asia/Seoul
pub fn parse_timezone(name: &str) -> Tz {
    name.parse::<Tz>().unwrap_or_else(|_| {
        warn!("Unknown timezone '{}', using {}", name, DEFAULT_TIMEZONE);
        DEFAULT_TIMEZONE
    })
}

/// State payload for the cost entity: total plus HA sensor metadata and diagnostics
pub fn build_state_update(
    total: f64,
    diagnostics: &Diagnostics,
    config: &SensorConfig,
) -> Result<HaStateUpdate> {
    let mut attributes = match serde_json::to_value(diagnostics)? {
        Value::Object(map) => map,
        other => anyhow::bail!("diagnostics serialized to non-object: {other}"),
    };
    attributes.insert("unit_of_measurement".to_owned(), json!(CURRENCY_UNIT));
    attributes.insert("device_class".to_owned(), json!("monetary"));
    attributes.insert("state_class".to_owned(), json!("total"));
    attributes.insert("friendly_name".to_owned(), json!(config.friendly_name));

    Ok(HaStateUpdate {
        state: format!("{total:.2}"),
        attributes,
    })
}

#[async_trait]
impl HostRuntime for HaHost {
    fn current_time(&self) -> NaiveDateTime {
        Utc::now().with_timezone(&self.timezone).naive_local()
    }

    async fn sensor_state(&self, entity_id: &str) -> Result<Option<String>> {
        match self.client.get_state(entity_id).await {
            Ok(state) => Ok(Some(state.state)),
            Err(HaError::EntityNotFound(_)) => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {entity_id}")),
        }
    }

    fn configuration(&self) -> SensorConfig {
        self.config.read().clone()
    }

    fn saved_total(&self) -> Result<Option<f64>> {
        let Some(persistence) = &self.persistence else {
            return Ok(None);
        };
        Ok(persistence.load()?.map(|saved| saved.total_cost))
    }

    async fn persist(&self, total: f64, diagnostics: &Diagnostics) -> Result<()> {
        let config = self.configuration();
        if let Some(persistence) = &self.persistence {
            let saved = PersistedTotal {
                total_cost: total,
                source_sensor: config.source_sensor.clone(),
            };
            if let Err(e) = persistence.save(&saved) {
                warn!("Failed to save total locally: {:#}", e);
            }
        }

        let update = build_state_update(total, diagnostics, &config)?;
        self.client
            .set_state(&config.cost_entity, &update)
            .await
            .with_context(|| format!("Failed to publish {}", config.cost_entity))
    }

    fn name(&self) -> &str {
        "Home Assistant"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use parking_lot::RwLock;
    use std::sync::Arc;

    fn shared(config: SensorConfig) -> SharedSensorConfig {
        Arc::new(RwLock::new(config))
    }

    #[test]
    fn test_parse_timezone() {
        assert_eq!(parse_timezone("Asia/Seoul"), chrono_tz::Asia::Seoul);
        assert_eq!(parse_timezone("Europe/Prague"), chrono_tz::Europe::Prague);
        assert_eq!(parse_timezone("Mars/Olympus"), DEFAULT_TIMEZONE);
    }

    #[test]
    fn test_build_state_update() {
        let config = SensorConfig::new("sensor.ev_energy");
        let diagnostics = Diagnostics {
            current_price_per_kwh: 211.48,
            load_level: "mid".to_owned(),
            season: "summer".to_owned(),
            source_sensor: "sensor.ev_energy".to_owned(),
            base_rate_type: "low_voltage".to_owned(),
            billing_date: 1,
        };

        let update = build_state_update(1234.5, &diagnostics, &config).unwrap();
        assert_eq!(update.state, "1234.50");
        assert_eq!(update.attributes["unit_of_measurement"], "KRW");
        assert_eq!(update.attributes["device_class"], "monetary");
        assert_eq!(update.attributes["state_class"], "total");
        assert_eq!(update.attributes["friendly_name"], "EV Charging Cost");
        assert_eq!(update.attributes["load_level"], "mid");
        assert_eq!(update.attributes["billing_date"], 1);
    }

    #[tokio::test]
    async fn test_missing_entity_is_none() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/states/binary_sensor.workday_sensor")
            .with_status(404)
            .create_async()
            .await;

        let client = HomeAssistantClient::new(server.url(), "token").unwrap();
        let host = HaHost::new(
            client,
            DEFAULT_TIMEZONE,
            shared(SensorConfig::new("sensor.ev_energy")),
        );

        let state = host
            .sensor_state("binary_sensor.workday_sensor")
            .await
            .unwrap();
        assert!(state.is_none());
    }

    #[tokio::test]
    async fn test_persist_saves_locally_and_publishes() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/states/sensor.ev_charging_cost")
            .match_body(Matcher::PartialJson(json!({"state": "15493.77"})))
            .with_status(200)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let client = HomeAssistantClient::new(server.url(), "token").unwrap();
        let host = HaHost::new(
            client,
            DEFAULT_TIMEZONE,
            shared(SensorConfig::new("sensor.ev_energy")),
        )
        .with_persistence(TotalPersistence::new(dir.path().join("total.json")));

        assert_eq!(host.saved_total().unwrap(), None);

        let config = host.configuration();
        let diagnostics = fluxion_tou_core::CostAccumulator::new().diagnostics(&config);
        host.persist(15493.77, &diagnostics).await.unwrap();

        mock.assert_async().await;
        assert_eq!(host.saved_total().unwrap(), Some(15493.77));
    }

    #[tokio::test]
    async fn test_saved_total_survives_ha_outage() {
        let dir = tempfile::tempdir().unwrap();
        let persistence = TotalPersistence::new(dir.path().join("total.json"));
        persistence
            .save(&PersistedTotal {
                total_cost: 15234.57,
                source_sensor: "sensor.ev_energy".to_owned(),
            })
            .unwrap();

        // Nothing listens here
        let client = HomeAssistantClient::new("http://127.0.0.1:9", "token").unwrap();
        let host = HaHost::new(
            client,
            DEFAULT_TIMEZONE,
            shared(SensorConfig::new("sensor.ev_energy")),
        )
        .with_persistence(persistence);

        assert_eq!(host.saved_total().unwrap(), Some(15234.57));
    }

    #[tokio::test]
    async fn test_connect_falls_back_to_seoul() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/config")
            .with_status(500)
            .create_async()
            .await;

        let client = HomeAssistantClient::new(server.url(), "token").unwrap();
        let host = HaHost::connect(client, shared(SensorConfig::new("sensor.ev_energy"))).await;
        assert_eq!(host.timezone(), DEFAULT_TIMEZONE);
    }
}
