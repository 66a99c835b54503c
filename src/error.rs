// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::db::StoreError;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // ─── Google login flow ───────────────────────────────────────
    #[error("Google access token is required")]
    MissingInputToken,

    #[error("Invalid or expired Google access token")]
    InvalidOrExpiredToken,

    #[error("Google account did not provide an email address")]
    MissingEmailClaim,

    #[error("Authorization code exchange failed: {0}")]
    TokenExchangeFailed(String),

    #[error("Failed to create or retrieve user")]
    ProvisioningFailed,

    #[error("Invalid JSON format: {0}")]
    MalformedRequestBody(String),

    // ─── Session / general ───────────────────────────────────────
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Reason code used in `?error=` when the browser redirect flow fails.
    pub fn callback_error_code(&self) -> &'static str {
        match self {
            AppError::TokenExchangeFailed(_) => "token_exchange_failed",
            AppError::InvalidOrExpiredToken | AppError::MissingEmailClaim => "user_info_failed",
            AppError::ProvisioningFailed => "user_creation_failed",
            _ => "authentication_failed",
        }
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::MissingInputToken => (
                StatusCode::BAD_REQUEST,
                "missing_token",
                Some(self.to_string()),
            ),
            AppError::MalformedRequestBody(_) => (
                StatusCode::BAD_REQUEST,
                "malformed_request",
                Some(self.to_string()),
            ),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::InvalidOrExpiredToken => (
                StatusCode::UNAUTHORIZED,
                "invalid_google_token",
                Some(self.to_string()),
            ),
            AppError::MissingEmailClaim => (
                StatusCode::UNAUTHORIZED,
                "missing_email_claim",
                Some(self.to_string()),
            ),
            AppError::TokenExchangeFailed(msg) => {
                tracing::warn!(error = %msg, "Google code exchange failed");
                (StatusCode::UNAUTHORIZED, "token_exchange_failed", None)
            }
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token", None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::ProvisioningFailed => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "provisioning_failed",
                Some(self.to_string()),
            ),
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UsernameTaken(_) => {
                AppError::BadRequest("A user with that username already exists.".to_string())
            }
            StoreError::EmailTaken(_) => {
                AppError::BadRequest("A user with that email already exists.".to_string())
            }
            StoreError::Backend(msg) => AppError::Database(msg),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::BadRequest(errors.to_string())
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
