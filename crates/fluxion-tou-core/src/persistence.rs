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

//! Local persistence of the accumulated total.
//!
//! The published HA entity is only a fallback: it can be unreachable at startup, and a total
//! restored as zero would overwrite it on the first publish.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Relative to the working directory, which is `/` inside the HA add-on
pub const DEFAULT_TOTAL_PATH: &str = "./data/ev_charging_cost.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedTotal {
    pub total_cost: f64,
    pub source_sensor: String,
}

#[derive(Debug, Clone)]
pub struct TotalPersistence {
    state_path: PathBuf,
}

impl TotalPersistence {
    pub fn new(state_path: impl Into<PathBuf>) -> Self {
        Self {
            state_path: state_path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.state_path
    }

    /// Load the saved total. `Ok(None)` when nothing was saved yet.
    pub fn load(&self) -> Result<Option<PersistedTotal>> {
        if !self.state_path.exists() {
            info!(
                "No saved total at {}, falling back to the published state",
                self.state_path.display()
            );
            return Ok(None);
        }

        let contents = fs::read_to_string(&self.state_path)
            .with_context(|| format!("Failed to read saved total from {}", self.state_path.display()))?;
        let saved: PersistedTotal = serde_json::from_str(&contents).with_context(|| {
            format!("Failed to parse saved total from {}", self.state_path.display())
        })?;

        info!(
            "Loaded saved total {:.2} for {} from {}",
            saved.total_cost,
            saved.source_sensor,
            self.state_path.display()
        );
        Ok(Some(saved))
    }

    /// Save the total (temp file + rename)
    pub fn save(&self, saved: &PersistedTotal) -> Result<()> {
        if let Some(parent) = self.state_path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let json = serde_json::to_string_pretty(saved).context("Failed to serialize total")?;
        let temp_path = self.state_path.with_extension("tmp");
        fs::write(&temp_path, &json)
            .with_context(|| format!("Failed to write temp file {}", temp_path.display()))?;
        fs::rename(&temp_path, &self.state_path).with_context(|| {
            format!("Failed to rename temp file to {}", self.state_path.display())
        })?;

        debug!(
            "Saved total {:.2} to {}",
            saved.total_cost,
            self.state_path.display()
        );
        Ok(())
    }
}

impl Default for TotalPersistence {
    fn default() -> Self {
        Self::new(DEFAULT_TOTAL_PATH)
    }
}
