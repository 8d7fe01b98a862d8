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

//! Options hot-swap: re-read the configuration file when its modification time changes

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;

use super::{AppConfig, ConfigFormat};

#[derive(Debug)]
pub struct ConfigWatcher {
    path: PathBuf,
    format: ConfigFormat,
    last_modified: Option<SystemTime>,
}

impl ConfigWatcher {
    /// Start watching `path`. The current contents count as already seen.
    pub fn new(path: impl Into<PathBuf>, format: ConfigFormat) -> Self {
        let path = path.into();
        let last_modified = modified(&path).ok();
        Self {
            path,
            format,
            last_modified,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the new configuration if the file changed since the last poll.
    ///
    /// A changed but invalid file is reported once as an error; the next poll
    /// returns `Ok(None)` until the file changes again.
    pub fn poll(&mut self) -> Result<Option<AppConfig>> {
        let current = modified(&self.path)?;
        if self.last_modified == Some(current) {
            return Ok(None);
        }
        self.last_modified = Some(current);
        debug!("{} changed, reloading", self.path.display());

        let contents = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        let config = self
            .format
            .parse(&contents)
            .with_context(|| format!("Invalid configuration in {}", self.path.display()))?;
        config.validate()?;
        Ok(Some(config))
    }
}

fn modified(path: &Path) -> Result<SystemTime> {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .with_context(|| format!("Failed to stat {}", path.display()))
}
