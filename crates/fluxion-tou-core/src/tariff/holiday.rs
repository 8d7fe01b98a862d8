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

//! Holiday indicator resolution
//!
//! Two sensor conventions exist in Home Assistant setups:
//! - workday sensors (`binary_sensor.workday_sensor`): `off` means holiday
//! - holiday sensors: `on` means holiday
//!
//! The polarity should be configured explicitly. Older configurations only carry the entity id,
//! in which case the polarity is guessed from the id containing "workday". That guess is
//! fragile (a renamed entity silently flips the meaning) and is reported when used.

use fluxion_tou_types::HolidaySignalPolarity;

const WORKDAY_HINT: &str = "workday";

/// Guess polarity from the entity id
pub fn infer_polarity(entity_id: &str) -> HolidaySignalPolarity {
    if entity_id.contains(WORKDAY_HINT) {
        HolidaySignalPolarity::ActiveLow
    } else {
        HolidaySignalPolarity::ActiveHigh
    }
}

/// Configured polarity, or the inferred one. The flag is true when it was inferred.
pub fn resolve_polarity(
    entity_id: &str,
    configured: Option<HolidaySignalPolarity>,
) -> (HolidaySignalPolarity, bool) {
    match configured {
        Some(polarity) => (polarity, false),
        None => (infer_polarity(entity_id), true),
    }
}

/// Whether a binary sensor state means "holiday today".
///
/// Anything other than `on`/`off` (unknown, unavailable) is not a holiday.
pub fn is_holiday_state(state: &str, polarity: HolidaySignalPolarity) -> bool {
    match polarity {
        HolidaySignalPolarity::ActiveHigh => state == "on",
        HolidaySignalPolarity::ActiveLow => state == "off",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_polarity() {
        assert_eq!(
            infer_polarity("binary_sensor.workday_sensor"),
            HolidaySignalPolarity::ActiveLow
        );
        assert_eq!(
            infer_polarity("binary_sensor.korean_holiday"),
            HolidaySignalPolarity::ActiveHigh
        );
    }

    #[test]
    fn test_configured_polarity_wins() {
        let (polarity, inferred) = resolve_polarity(
            "binary_sensor.workday_sensor",
            Some(HolidaySignalPolarity::ActiveHigh),
        );
        assert_eq!(polarity, HolidaySignalPolarity::ActiveHigh);
        assert!(!inferred);

        let (polarity, inferred) = resolve_polarity("binary_sensor.workday_sensor", None);
        assert_eq!(polarity, HolidaySignalPolarity::ActiveLow);
        assert!(inferred);
    }

    #[test]
    fn test_is_holiday_state() {
        use HolidaySignalPolarity::*;

        assert!(is_holiday_state("on", ActiveHigh));
        assert!(!is_holiday_state("off", ActiveHigh));
        assert!(is_holiday_state("off", ActiveLow));
        assert!(!is_holiday_state("on", ActiveLow));

        assert!(!is_holiday_state("unavailable", ActiveHigh));
        assert!(!is_holiday_state("unavailable", ActiveLow));
    }
}
