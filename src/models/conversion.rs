// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Meters-to-feet conversion records.
//!
//! Values are fixed-precision decimals with six places and at most ten digits
//! in total, so everything stored is strictly below 10 000. The feet value is
//! computed once at write time and rounded half-to-even.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Feet per meter.
pub const FEET_PER_METER: Decimal = Decimal::from_parts(328_084, 0, 0, false, 5);

/// Human-readable formula returned with every conversion.
pub const FORMULA: &str = "feet = meters × 3.28084";

/// Digits after the decimal point for stored values.
pub const DECIMAL_PLACES: u32 = 6;

/// Exclusive upper bound implied by 10 total digits at 6 decimal places.
const VALUE_LIMIT: Decimal = Decimal::from_parts(10_000, 0, 0, false, 0);

/// Why a conversion input was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConversionError {
    #[error("Meters value must be greater than or equal to 0")]
    Negative,

    #[error("Ensure that there are no more than 6 decimal places")]
    TooManyDecimalPlaces,

    #[error("Ensure that there are no more than 10 digits in total")]
    OutOfRange,
}

/// Round to the stored precision and pin the scale so "5" prints as "5.000000".
pub fn to_stored_precision(value: Decimal) -> Decimal {
    let mut rounded =
        value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointNearestEven);
    rounded.rescale(DECIMAL_PLACES);
    rounded
}

/// Validate `meters` and return `(meters, feet)` at stored precision.
pub fn meters_to_feet(meters: Decimal) -> Result<(Decimal, Decimal), ConversionError> {
    if meters < Decimal::ZERO {
        return Err(ConversionError::Negative);
    }
    if meters.normalize().scale() > DECIMAL_PLACES {
        return Err(ConversionError::TooManyDecimalPlaces);
    }
    if meters >= VALUE_LIMIT {
        return Err(ConversionError::OutOfRange);
    }

    let feet = meters
        .checked_mul(FEET_PER_METER)
        .map(to_stored_precision)
        .ok_or(ConversionError::OutOfRange)?;
    if feet >= VALUE_LIMIT {
        return Err(ConversionError::OutOfRange);
    }

    Ok((to_stored_precision(meters), feet))
}

/// One stored conversion event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionRecord {
    /// Document ID
    pub id: Uuid,
    /// Owner
    pub user_id: Uuid,
    /// Input in meters
    pub meters_value: Decimal,
    /// Output in feet
    pub feet_value: Decimal,
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub timestamp: DateTime<Utc>,
    /// Client IP as seen by the server, when known
    #[serde(default)]
    pub ip_address: Option<String>,
}

impl ConversionRecord {
    /// Build a record for `user_id`, timestamped now.
    pub fn new(
        user_id: Uuid,
        meters: Decimal,
        ip_address: Option<String>,
    ) -> Result<Self, ConversionError> {
        let (meters_value, feet_value) = meters_to_feet(meters)?;
        Ok(Self {
            id: Uuid::new_v4(),
            user_id,
            meters_value,
            feet_value,
            timestamp: Utc::now(),
            ip_address,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn five_meters() {
        let (m, ft) = meters_to_feet(dec("5.0")).unwrap();
        assert_eq!(m.to_string(), "5.000000");
        assert_eq!(ft.to_string(), "16.404200");
    }

    #[test]
    fn zero_is_allowed() {
        let (m, ft) = meters_to_feet(Decimal::ZERO).unwrap();
        assert_eq!(m.to_string(), "0.000000");
        assert_eq!(ft.to_string(), "0.000000");
    }

    #[test]
    fn rounds_half_even_to_six_places() {
        // 0.000001 m = 0.00000328084 ft
        let (_, ft) = meters_to_feet(dec("0.000001")).unwrap();
        assert_eq!(ft.to_string(), "0.000003");
        let (_, ft) = meters_to_feet(dec("1.234567")).unwrap();
        assert_eq!(ft.to_string(), "4.050417");
        assert_eq!(to_stored_precision(dec("0.0000025")).to_string(), "0.000002");
        assert_eq!(to_stored_precision(dec("0.0000035")).to_string(), "0.000004");
    }

    #[test]
    fn rejects_negative() {
        assert_eq!(meters_to_feet(dec("-0.5")), Err(ConversionError::Negative));
    }

    #[test]
    fn rejects_excess_precision_but_not_trailing_zeros() {
        assert_eq!(
            meters_to_feet(dec("1.0000001")),
            Err(ConversionError::TooManyDecimalPlaces)
        );
        assert!(meters_to_feet(dec("1.00000000")).is_ok());
    }

    #[test]
    fn rejects_values_that_do_not_fit_ten_digits() {
        assert_eq!(
            meters_to_feet(dec("10000")),
            Err(ConversionError::OutOfRange)
        );
        // Fits as meters, but feet would need five integer digits.
        assert_eq!(
            meters_to_feet(dec("3048")),
            Err(ConversionError::OutOfRange)
        );
        assert!(meters_to_feet(dec("3047.999")).is_ok());
    }

    #[test]
    fn record_uses_computed_values() {
        let user_id = Uuid::new_v4();
        let record = ConversionRecord::new(user_id, dec("2.5"), Some("10.0.0.1".into())).unwrap();
        assert_eq!(record.user_id, user_id);
        assert_eq!(record.meters_value.to_string(), "2.500000");
        assert_eq!(record.feet_value.to_string(), "8.202100");
        assert_eq!(record.ip_address.as_deref(), Some("10.0.0.1"));
    }
}
