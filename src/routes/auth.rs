// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google OAuth and session routes.

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::UserProfile;
use crate::services::google::{self, GoogleClaims};
use crate::services::RevokeOutcome;
use crate::AppState;

/// Routes that need no session.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/debug/", get(oauth_debug))
        .route("/auth/google/login/", get(google_login))
        .route("/auth/google/callback/", get(google_callback))
        .route("/auth/google/", post(google_token_login))
        .route("/auth/token/refresh/", post(refresh_token))
}

/// Routes that require a valid access token.
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/profile/", get(profile))
        .route("/auth/logout/", post(logout))
}

/// Host header value, or `""` when absent.
pub(crate) fn request_host(headers: &HeaderMap) -> &str {
    headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("")
}

/// Whether the request reached us over TLS, as reported by the proxy in front.
pub(crate) fn is_secure(headers: &HeaderMap) -> bool {
    headers
        .get("x-forwarded-proto")
        .and_then(|h| h.to_str().ok())
        .is_some_and(|p| p.eq_ignore_ascii_case("https"))
}

// ─── Debug ───────────────────────────────────────────────────

/// Echo OAuth configuration so a deployment's Google console setup can be checked.
async fn oauth_debug(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Json<serde_json::Value> {
    let config = &state.config;
    let client_id = if config.google_client_id.is_empty() {
        "NOT SET".to_string()
    } else {
        let prefix: String = config.google_client_id.chars().take(20).collect();
        format!("{prefix}...")
    };
    let secret = if config.google_client_secret.is_empty() {
        "NOT SET"
    } else {
        "SET"
    };

    let host = request_host(&headers);
    let protocol = if is_secure(&headers) { "https" } else { "http" };

    Json(json!({
        "google_client_id": client_id,
        "google_client_secret": secret,
        "redirect_uri": config.google_redirect_uri,
        "frontend_url": config.frontend_url,
        "current_host": host,
        "protocol": protocol,
        "full_callback_url": format!("{protocol}://{host}/auth/google/callback/"),
        "instructions": {
            "1": "Add this redirect URI to Google Cloud Console:",
            "redirect_uri_for_google": config.google_redirect_uri,
            "2": "Make sure your .env file has these variables set",
            "3": "Frontend should redirect to: /auth/google/login/",
        },
    }))
}

// ─── Browser code flow ───────────────────────────────────────

/// `302 Found` to `location`.
fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

/// Start the code flow by redirecting to Google's consent screen.
async fn google_login(State(state): State<Arc<AppState>>) -> Response {
    let config = &state.config;
    if config.google_client_id.is_empty() {
        tracing::error!("Google login requested but GOOGLE_OAUTH_CLIENT_ID is not set");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "error": "Google OAuth not configured. Please set GOOGLE_OAUTH_CLIENT_ID in environment."
            })),
        )
            .into_response();
    }

    let auth_url = google::authorize_url(&config.google_client_id, &config.google_redirect_uri);
    tracing::info!(redirect_uri = %config.google_redirect_uri, "Redirecting to Google consent");
    found(&auth_url)
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Google redirects here with `code` (or `error`). Always answers with a
/// redirect to the frontend carrying either an access token or an error code.
async fn google_callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> Response {
    let frontend = &state.config.frontend_url;

    let Some(code) = params.code.filter(|c| !c.is_empty()) else {
        let error = params.error.unwrap_or_else(|| "Unknown error".to_string());
        tracing::warn!(error = %error, "Google callback without authorization code");
        return found(&format!(
            "{frontend}/auth/callback?error={}",
            urlencoding::encode(&error)
        ));
    };

    match complete_code_flow(&state, &code).await {
        Ok(access_token) => {
            found(&format!("{frontend}/auth/callback?access_token={access_token}"))
        }
        Err(e) => {
            let reason = e.callback_error_code();
            tracing::warn!(reason, error = %e, "Google callback failed");
            found(&format!("{frontend}/auth/callback?error={reason}"))
        }
    }
}

async fn complete_code_flow(state: &AppState, code: &str) -> Result<String> {
    let token = state
        .google
        .exchange_code(code, &state.config.google_redirect_uri)
        .await?;
    let claims = state.google.fetch_userinfo(&token.access_token).await?;
    let user = state.provisioner.provision(&claims).await?;

    tracing::info!(user_id = %user.id, "Google code flow login");
    Ok(state.tokens.issue(user.id)?.access_token)
}

// ─── Token login ─────────────────────────────────────────────

#[derive(Deserialize)]
pub struct GoogleLoginRequest {
    #[serde(default)]
    access_token: Option<String>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserProfile,
    pub message: String,
}

/// Log in with a Google access token the frontend already holds.
async fn google_token_login(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<GoogleLoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>> {
    let Json(request) = body.map_err(|e| AppError::MalformedRequestBody(e.body_text()))?;

    let google_token = request
        .access_token
        .filter(|t| !t.is_empty())
        .ok_or(AppError::MissingInputToken)?;

    let claims: GoogleClaims = state.google.fetch_userinfo(&google_token).await?;
    let user = state.provisioner.provision(&claims).await?;
    let pair = state.tokens.issue(user.id)?;

    tracing::info!(user_id = %user.id, "Google token login");

    Ok(Json(LoginResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        user: UserProfile::from(&user),
        message: "Login successful".to_string(),
    }))
}

// ─── Session ─────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct RefreshRequest {
    refresh_token: String,
}

#[derive(Serialize)]
pub struct RefreshResponse {
    pub access_token: String,
}

/// Trade a refresh token for a new access token.
async fn refresh_token(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<RefreshResponse>> {
    let Json(request) = body.map_err(|e| AppError::MalformedRequestBody(e.body_text()))?;
    let access_token = state.tokens.refresh(&request.refresh_token).await?;
    Ok(Json(RefreshResponse { access_token }))
}

#[derive(Serialize)]
pub struct ProfileResponse {
    pub user: UserProfile,
}

async fn profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ProfileResponse>> {
    let user = state
        .db
        .find_user_by_id(user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(ProfileResponse {
        user: UserProfile::from(&user),
    }))
}

#[derive(Deserialize)]
struct LogoutRequest {
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Blacklist the supplied refresh token. Reports success no matter what.
async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    body: Bytes,
) -> Json<serde_json::Value> {
    let refresh_token = serde_json::from_slice::<LogoutRequest>(&body)
        .ok()
        .and_then(|r| r.refresh_token)
        .filter(|t| !t.is_empty());

    if let Some(token) = refresh_token {
        let outcome = state.tokens.revoke(&token).await;
        if outcome == RevokeOutcome::Invalid {
            tracing::debug!(user_id = %user.user_id, "Logout with unusable refresh token");
        }
    }

    tracing::info!(user_id = %user.user_id, "User logged out");
    Json(json!({ "message": "Logout successful" }))
}
