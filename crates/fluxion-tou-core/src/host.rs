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

//! Host runtime abstraction
//!
//! Everything the cost sensor needs from its host (Home Assistant, or a test double) goes
//! through this trait, so the pricing logic never knows about HTTP or entity registries.

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use fluxion_tou_types::SensorConfig;
use parking_lot::RwLock;
use std::sync::Arc;

use crate::accumulator::Diagnostics;

/// Sensor configuration shared between the host and whoever applies option updates
pub type SharedSensorConfig = Arc<RwLock<SensorConfig>>;

#[async_trait]
pub trait HostRuntime: Send + Sync {
    /// Current local wall-clock time in the host's time zone
    fn current_time(&self) -> NaiveDateTime;

    /// Raw state string of an entity, `None` if the entity does not exist
    async fn sensor_state(&self, entity_id: &str) -> Result<Option<String>>;

    /// Current configuration. Called per event, never cached by callers.
    fn configuration(&self) -> SensorConfig;

    /// Total saved by the host itself, preferred over the published entity state on restore.
    /// `Ok(None)` when the host keeps no local copy.
    fn saved_total(&self) -> Result<Option<f64>> {
        Ok(None)
    }

    /// Publish the rounded total and its diagnostics
    async fn persist(&self, total: f64, diagnostics: &Diagnostics) -> Result<()>;

    /// Human-readable name of this host
    fn name(&self) -> &str;
}
