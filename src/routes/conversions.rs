// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Conversion routes: convert, history and statistics for the caller.

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::middleware::client_ip::ClientIp;
use crate::models::conversion::{ConversionError, FORMULA};
use crate::models::{ConversionRecord, ConversionStats};
use crate::AppState;

/// Conversion routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/conversions/convert/", post(convert))
        .route("/conversions/history/", get(history))
        .route("/conversions/stats/", get(stats))
}

#[derive(Deserialize)]
pub struct ConvertRequest {
    /// Number or numeric string
    meters: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ConversionResponse {
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub id: Uuid,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub meters: Decimal,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub feet: Decimal,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub timestamp: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub formula_used: String,
}

impl From<ConversionRecord> for ConversionResponse {
    fn from(record: ConversionRecord) -> Self {
        Self {
            id: record.id,
            meters: record.meters_value,
            feet: record.feet_value,
            timestamp: record.timestamp,
            ip_address: record.ip_address,
            formula_used: FORMULA.to_string(),
        }
    }
}

/// Parse the `meters` field.
///
/// Strings keep exactly the digits the client sent, and anything past what a
/// `Decimal` can hold is rejected rather than rounded. JSON numbers have
/// already been through `f64` by the time they get here.
fn parse_meters(value: Option<serde_json::Value>) -> Result<Decimal> {
    let text = match value {
        Some(serde_json::Value::Number(n)) => n.to_string(),
        Some(serde_json::Value::String(s)) => s.trim().to_string(),
        Some(_) => return Err(AppError::BadRequest("A valid number is required.".to_string())),
        None => return Err(AppError::BadRequest("meters: This field is required.".to_string())),
    };

    match Decimal::from_str_exact(&text) {
        Ok(meters) => Ok(meters),
        Err(rust_decimal::Error::Underflow) => Err(AppError::BadRequest(
            ConversionError::TooManyDecimalPlaces.to_string(),
        )),
        Err(_) => Decimal::from_scientific(&text)
            .map_err(|_| AppError::BadRequest("A valid number is required.".to_string())),
    }
}

async fn convert(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    ClientIp(ip): ClientIp,
    body: std::result::Result<Json<ConvertRequest>, JsonRejection>,
) -> Result<Json<ConversionResponse>> {
    let Json(request) = body.map_err(|e| AppError::MalformedRequestBody(e.body_text()))?;
    let meters = parse_meters(request.meters)?;

    let record = ConversionRecord::new(user.user_id, meters, ip.map(|ip| ip.to_string()))
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    state.db.insert_conversion(&record).await?;

    tracing::info!(
        user_id = %user.user_id,
        conversion_id = %record.id,
        meters = %record.meters_value,
        feet = %record.feet_value,
        "Conversion recorded"
    );

    Ok(Json(record.into()))
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub conversions: Vec<ConversionResponse>,
    pub count: usize,
}

async fn history(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<HistoryResponse>> {
    let records = state.db.list_conversions_for_user(user.user_id).await?;
    let conversions: Vec<ConversionResponse> = records.into_iter().map(Into::into).collect();

    Ok(Json(HistoryResponse {
        count: conversions.len(),
        conversions,
    }))
}

async fn stats(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ConversionStats>> {
    let records = state.db.list_conversions_for_user(user.user_id).await?;
    Ok(Json(ConversionStats::from_records(&records)))
}
