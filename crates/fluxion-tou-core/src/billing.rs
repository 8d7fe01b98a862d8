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

//! Daily billing tick schedule
//!
//! The tick runs at 00:00:01 local time. Utility meters that reset at midnight have rolled over
//! by then, so a base charge lands in the new billing period rather than the old one.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use fluxion_tou_types::BaseChargePolicy;

/// Local time of the daily billing tick
pub const BILLING_TICK_TIME: NaiveTime = match NaiveTime::from_hms_opt(0, 0, 1) {
    Some(time) => time,
    None => panic!("invalid billing tick time"),
};

/// Next tick strictly after `now`
pub fn next_billing_tick(now: NaiveDateTime) -> NaiveDateTime {
    let today = now.date().and_time(BILLING_TICK_TIME);
    if today > now {
        today
    } else {
        today + Duration::days(1)
    }
}

/// Number of days in the month containing `date`
pub fn days_in_month(date: NaiveDate) -> u32 {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };

    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first_of_next| first_of_next.pred_opt())
        .map_or(31, |last| last.day())
}

/// Whether the lump base charge is due on `date`.
///
/// A billing day beyond the month's length (31 in April) falls on the last day of the month.
pub fn is_billing_day(date: NaiveDate, billing_day: u32) -> bool {
    date.day() == billing_day.min(days_in_month(date))
}

/// Share of the monthly base charge due on `date` under `policy` (0.0 when nothing is due)
pub fn base_charge_share(date: NaiveDate, policy: BaseChargePolicy, billing_day: u32) -> f64 {
    match policy {
        BaseChargePolicy::MonthlyLump => {
            if is_billing_day(date, billing_day) {
                1.0
            } else {
                0.0
            }
        }
        BaseChargePolicy::DailyProration => 1.0 / f64::from(days_in_month(date)),
    }
}
