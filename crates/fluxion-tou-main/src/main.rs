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

mod config;
mod runner;

use anyhow::{Context, Result};
use fluxion_tou_core::TotalPersistence;
use fluxion_tou_ha::{HaHost, HomeAssistantClient, parse_timezone};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::FmtSubscriber;

use crate::config::{AppConfig, ConfigWatcher};
use crate::runner::Runner;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() > 1 {
        match args[1].as_str() {
            "--help" | "-h" => {
                println!("FluxION TOU - EV charging cost on the KEPCO time-of-use tariff");
                println!("Version: {VERSION}");
                println!();
                println!("Usage: fluxion-tou [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -h, --help    Print this help message");
                println!("  -v, --version Print version");
                return Ok(());
            }
            "--version" | "-v" => {
                println!("{VERSION}");
                return Ok(());
            }
            _ => {}
        }
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to create tokio runtime")?;

    runtime.block_on(initialize_and_run())
}

async fn initialize_and_run() -> Result<()> {
    // Installed before loading configuration so load and validation warnings are not lost.
    // RUST_LOG wins over the configured level.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().ok();
    let from_env = env_filter.is_some();
    let builder = FmtSubscriber::builder()
        .with_env_filter(env_filter.unwrap_or_else(|| tracing_subscriber::EnvFilter::new("info")))
        .with_filter_reloading();
    let filter_handle = builder.reload_handle();
    tracing::subscriber::set_global_default(builder.finish())
        .context("Failed to set tracing subscriber")?;

    let (config, source) = AppConfig::load()?;
    if !from_env {
        filter_handle
            .reload(tracing_subscriber::EnvFilter::new(&config.system.log_level))
            .context("Failed to apply configured log level")?;
    }

    info!("Starting FluxION TOU {}", VERSION);
    info!("Configuration Summary:");
    info!("   Source sensor: {}", config.sensor.source_sensor);
    info!("   Cost entity: {}", config.sensor.cost_entity);
    info!(
        "   Holiday sensor: {}",
        config.sensor.holiday_sensor.as_deref().unwrap_or("none")
    );
    info!(
        "   Rates: {} ({}), billing day {}, {:?}",
        config.sensor.rates.voltage_class,
        config.sensor.rates.voltage_class.to_config_value(),
        config.sensor.rates.billing_day,
        config.sensor.rates.base_charge_policy
    );
    info!("   Poll interval: {}s", config.system.poll_interval_secs);
    info!("   State file: {}", config.system.state_file);

    let client = if std::env::var("SUPERVISOR_TOKEN").is_ok() {
        info!("Initializing HA client using Supervisor API...");
        HomeAssistantClient::from_supervisor()?
    } else {
        info!("Initializing HA client from configuration...");
        HomeAssistantClient::from_config(
            config.system.ha_base_url.clone(),
            config.system.ha_token.clone(),
        )?
    };

    if !client.ping().await? {
        warn!("Home Assistant API is not reachable yet, will keep polling");
    }

    let shared = Arc::new(RwLock::new(config.sensor.clone()));
    let host = match config.system.timezone.as_deref() {
        Some(name) => HaHost::new(client, parse_timezone(name), shared),
        None => HaHost::connect(client, shared).await,
    }
    .with_persistence(TotalPersistence::new(&config.system.state_file));

    let watcher = match (source.path(), source.format()) {
        (Some(path), Some(format)) => Some(ConfigWatcher::new(path, format)),
        _ => None,
    };

    Runner::start(Arc::new(host), watcher, config.poll_interval())
        .await
        .run()
        .await
}
