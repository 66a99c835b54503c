//! Aggregate statistics over a user's conversion history.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::conversion::to_stored_precision;
use crate::models::ConversionRecord;

/// Summary of one user's conversions.
///
/// Sums can exceed the per-record 10-digit bound; only the average is rounded.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ConversionStats {
    pub total_conversions: u64,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub total_meters: Decimal,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub total_feet: Decimal,
    /// `None` when there are no conversions
    #[cfg_attr(feature = "binding-generation", ts(type = "string | null"))]
    pub average_meters: Option<Decimal>,
    #[cfg_attr(feature = "binding-generation", ts(type = "string | null"))]
    pub largest_meters: Option<Decimal>,
    #[cfg_attr(feature = "binding-generation", ts(type = "string | null"))]
    pub latest_conversion_at: Option<DateTime<Utc>>,
}

impl ConversionStats {
    pub fn from_records(records: &[ConversionRecord]) -> Self {
        let total_meters = to_stored_precision(records.iter().map(|r| r.meters_value).sum());
        let total_feet = to_stored_precision(records.iter().map(|r| r.feet_value).sum());
        let count = records.len() as u64;

        let average_meters =
            (count > 0).then(|| to_stored_precision(total_meters / Decimal::from(count)));

        Self {
            total_conversions: count,
            total_meters,
            total_feet,
            average_meters,
            largest_meters: records.iter().map(|r| r.meters_value).max(),
            latest_conversion_at: records.iter().map(|r| r.timestamp).max(),
        }
    }
}
