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

pub mod holiday;
pub mod rate_table;

pub use holiday::{infer_polarity, is_holiday_state, resolve_polarity};
pub use rate_table::{
    Classification, TimeBlockTable, base_charge, billed_base_charge, classify, classify_at,
    effective_unit_price, resolve_price, season_for_month, tax_multiplier, time_blocks, validate,
};
