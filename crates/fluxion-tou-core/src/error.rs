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

//! Error types for tariff evaluation

use thiserror::Error;

/// Contract violations detected while pricing energy.
///
/// These are never substituted with defaults: a wrong price is worse than no price.
#[derive(Debug, Error, PartialEq)]
pub enum TariffError {
    #[error("month out of range: {0} (expected 1-12)")]
    InvalidMonth(u32),

    #[error("hour out of range: {0} (expected 0-23)")]
    InvalidHour(u32),

    #[error("billing day out of range: {0} (expected 1-31)")]
    InvalidBillingDay(u32),

    #[error("{field} must be a non-negative number, got {value}")]
    InvalidAmount { field: String, value: f64 },
}

pub type Result<T> = std::result::Result<T, TariffError>;
