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

//! Season / load-level classification and unit price resolution
//!
//! ## Time blocks
//!
//! Summer and spring/fall share one hour table, winter has its own. Sundays and holidays are
//! light-load all day, and Saturday never reaches max load (downgraded to mid).
//!
//! ## Effective Price
//!
//! `(unit_price + climate_fee + fuel_fee) × (1 + vat_rate/100 + fund_rate/100)`.
//! With fees and rates set to zero this is the plain energy price.

use chrono::{Datelike, NaiveDateTime, Timelike, Weekday};
use fluxion_tou_types::{LoadLevel, RateConfiguration, RateOverrides, Season};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TariffError};

// ============================================================================
// Time Block Tables
// ============================================================================

/// Partition of the 24 hours into load levels
#[derive(Debug, Clone, Copy)]
pub struct TimeBlockTable {
    pub light: &'static [u32],
    pub mid: &'static [u32],
    pub max: &'static [u32],
}

impl TimeBlockTable {
    /// Load level for an hour. Hours missing from all sets fall back to mid.
    pub fn load_level(&self, hour: u32) -> LoadLevel {
        if self.light.contains(&hour) {
            LoadLevel::Light
        } else if self.max.contains(&hour) {
            LoadLevel::Max
        } else {
            LoadLevel::Mid
        }
    }
}

pub const SUMMER_SPRING_FALL_BLOCKS: TimeBlockTable = TimeBlockTable {
    light: &[22, 23, 0, 1, 2, 3, 4, 5, 6, 7],
    mid: &[8, 9, 10, 12, 18, 19, 20, 21],
    max: &[11, 13, 14, 15, 16, 17],
};

pub const WINTER_BLOCKS: TimeBlockTable = TimeBlockTable {
    light: &[22, 23, 0, 1, 2, 3, 4, 5, 6, 7],
    mid: &[8, 12, 13, 14, 15, 19, 20, 21],
    max: &[9, 10, 11, 16, 17, 18],
};

/// Season for a calendar month (1-12)
pub fn season_for_month(month: u32) -> Result<Season> {
    match month {
        6..=8 => Ok(Season::Summer),
        11 | 12 | 1 | 2 => Ok(Season::Winter),
        3..=5 | 9 | 10 => Ok(Season::SpringFall),
        _ => Err(TariffError::InvalidMonth(month)),
    }
}

pub fn time_blocks(season: Season) -> &'static TimeBlockTable {
    match season {
        Season::Summer | Season::SpringFall => &SUMMER_SPRING_FALL_BLOCKS,
        Season::Winter => &WINTER_BLOCKS,
    }
}

// ============================================================================
// Classification
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub season: Season,
    pub load_level: LoadLevel,
}

/// Classify a local hour into season and load level.
///
/// `is_holiday` is the external holiday indicator, already resolved for polarity.
/// Sunday is always treated as a holiday.
pub fn classify(month: u32, hour: u32, weekday: Weekday, is_holiday: bool) -> Result<Classification> {
    let season = season_for_month(month)?;
    if hour > 23 {
        return Err(TariffError::InvalidHour(hour));
    }

    if weekday == Weekday::Sun || is_holiday {
        return Ok(Classification {
            season,
            load_level: LoadLevel::Light,
        });
    }

    let mut load_level = time_blocks(season).load_level(hour);
    if weekday == Weekday::Sat && load_level == LoadLevel::Max {
        load_level = LoadLevel::Mid;
    }

    Ok(Classification { season, load_level })
}

/// Classify a local wall-clock time
pub fn classify_at(local_time: NaiveDateTime, is_holiday: bool) -> Result<Classification> {
    classify(
        local_time.month(),
        local_time.hour(),
        local_time.weekday(),
        is_holiday,
    )
}

// ============================================================================
// Price Resolution
// ============================================================================

/// Check every amount in the configuration before it is used for pricing
pub fn validate(config: &RateConfiguration) -> Result<()> {
    if !(1..=31).contains(&config.billing_day) {
        return Err(TariffError::InvalidBillingDay(config.billing_day));
    }

    let mut amounts = vec![
        ("climate_fee".to_owned(), Some(config.climate_fee)),
        ("fuel_fee".to_owned(), Some(config.fuel_fee)),
        ("vat_rate".to_owned(), Some(config.vat_rate)),
        ("fund_rate".to_owned(), Some(config.fund_rate)),
        ("base_charge".to_owned(), config.base_charge),
    ];
    for season in Season::all() {
        for level in LoadLevel::all() {
            amounts.push((
                RateOverrides::key(*season, *level),
                config.overrides.get(*season, *level),
            ));
        }
    }

    for (field, value) in amounts {
        if let Some(value) = value
            && !(value.is_finite() && value >= 0.0)
        {
            return Err(TariffError::InvalidAmount { field, value });
        }
    }

    Ok(())
}

/// Unit energy price before surcharges and tax
pub fn resolve_price(season: Season, load_level: LoadLevel, config: &RateConfiguration) -> f64 {
    config
        .overrides
        .get(season, load_level)
        .unwrap_or_else(|| config.default_rates().price(season, load_level))
}

/// Multiplier applied by VAT and the fund levy
pub fn tax_multiplier(config: &RateConfiguration) -> f64 {
    1.0 + config.vat_rate / 100.0 + config.fund_rate / 100.0
}

/// Price actually charged per kWh: surcharges added, then taxed
pub fn effective_unit_price(unit_price: f64, config: &RateConfiguration) -> f64 {
    (unit_price + config.climate_fee + config.fuel_fee) * tax_multiplier(config)
}

/// Monthly base charge, override or voltage class default
pub fn base_charge(config: &RateConfiguration) -> f64 {
    config
        .base_charge
        .unwrap_or_else(|| config.default_rates().base)
}

/// Base charge as billed, taxed when `tax_base_charge` is set
pub fn billed_base_charge(config: &RateConfiguration) -> f64 {
    if config.tax_base_charge {
        base_charge(config) * tax_multiplier(config)
    } else {
        base_charge(config)
    }
}

// ============================================================================
// Tests
// ============================================================================
