// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google OAuth client: authorization-code exchange and userinfo lookup.
//!
//! Stateless; every call is one outbound request with no retries.

use crate::config::Config;
use crate::error::AppError;
use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;

pub const AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

/// Scopes requested on the authorize redirect.
pub const SCOPES: &str = "email profile";

/// Token payload returned by Google's token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleTokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
}

/// Identity claims for a verified Google account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoogleClaims {
    /// Always non-empty
    pub email: String,
    /// `""` when Google did not supply it
    pub given_name: String,
    /// `""` when Google did not supply it
    pub family_name: String,
    /// Google account id, when present
    pub subject_id: Option<String>,
}

/// Outbound calls to Google's OAuth endpoints.
#[async_trait]
pub trait GoogleIdentity: Send + Sync {
    /// Exchange an authorization code for a token payload.
    ///
    /// `redirect_uri` must be byte-for-byte the one used on the authorize
    /// redirect or Google rejects the exchange.
    async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<GoogleTokenResponse, AppError>;

    /// Resolve a Google access token into identity claims.
    async fn fetch_userinfo(&self, access_token: &str) -> Result<GoogleClaims, AppError>;
}

/// Raw userinfo body. The v2 endpoint uses `id`, the OIDC one uses `sub`.
#[derive(Debug, Deserialize)]
struct UserInfoResponse {
    email: Option<String>,
    given_name: Option<String>,
    family_name: Option<String>,
    id: Option<String>,
    sub: Option<String>,
}

impl TryFrom<UserInfoResponse> for GoogleClaims {
    type Error = AppError;

    fn try_from(info: UserInfoResponse) -> Result<Self, Self::Error> {
        let email = info
            .email
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty())
            .ok_or(AppError::MissingEmailClaim)?;

        Ok(Self {
            email,
            given_name: info.given_name.unwrap_or_default(),
            family_name: info.family_name.unwrap_or_default(),
            subject_id: info.id.or(info.sub).filter(|s| !s.is_empty()),
        })
    }
}

/// Token endpoint body: either a token payload or an OAuth error.
#[derive(Debug, Deserialize)]
struct RawTokenResponse {
    access_token: Option<String>,
    expires_in: Option<u64>,
    token_type: Option<String>,
    scope: Option<String>,
    id_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// reqwest-backed [`GoogleIdentity`].
pub struct GoogleClient {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    token_url: String,
    userinfo_url: String,
}

impl GoogleClient {
    /// Client against Google's production endpoints.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        Self::with_endpoints(config, TOKEN_URL, USERINFO_URL)
    }

    /// Client against arbitrary endpoints (used to point tests at a mock server).
    pub fn with_endpoints(
        config: &Config,
        token_url: impl Into<String>,
        userinfo_url: impl Into<String>,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.google_http_timeout)
            .build()
            .context("failed building Google HTTP client")?;

        Ok(Self {
            http,
            client_id: config.google_client_id.clone(),
            client_secret: config.google_client_secret.clone(),
            token_url: token_url.into(),
            userinfo_url: userinfo_url.into(),
        })
    }
}

#[async_trait]
impl GoogleIdentity for GoogleClient {
    async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<GoogleTokenResponse, AppError> {
        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("grant_type", "authorization_code"),
                ("redirect_uri", redirect_uri),
            ])
            .send()
            .await
            .map_err(|e| AppError::TokenExchangeFailed(format!("request failed: {}", e)))?;

        let status = response.status();

        // Google reports failures as JSON too; the presence of access_token decides.
        let body: RawTokenResponse = response.json().await.map_err(|e| {
            AppError::TokenExchangeFailed(format!("unreadable token response ({status}): {e}"))
        })?;

        match body.access_token {
            Some(access_token) if !access_token.is_empty() => Ok(GoogleTokenResponse {
                access_token,
                expires_in: body.expires_in,
                token_type: body.token_type,
                scope: body.scope,
                id_token: body.id_token,
            }),
            _ => {
                tracing::warn!(
                    status = %status,
                    error = body.error.as_deref().unwrap_or("<none>"),
                    description = body.error_description.as_deref().unwrap_or(""),
                    "Google token response had no access_token"
                );
                Err(AppError::TokenExchangeFailed(format!(
                    "no access_token in response ({})",
                    body.error.unwrap_or_else(|| status.to_string())
                )))
            }
        }
    }

    async fn fetch_userinfo(&self, access_token: &str) -> Result<GoogleClaims, AppError> {
        let response = self
            .http
            .get(&self.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Google userinfo request failed");
                AppError::InvalidOrExpiredToken
            })?;

        if response.status() != reqwest::StatusCode::OK {
            tracing::info!(status = %response.status(), "Google rejected access token");
            return Err(AppError::InvalidOrExpiredToken);
        }

        let info: UserInfoResponse = response.json().await.map_err(|e| {
            tracing::warn!(error = %e, "Unreadable Google userinfo response");
            AppError::InvalidOrExpiredToken
        })?;

        GoogleClaims::try_from(info)
    }
}

/// Authorize URL the browser is redirected to at the start of the code flow.
pub fn authorize_url(client_id: &str, redirect_uri: &str) -> String {
    format!(
        "{}?client_id={}&redirect_uri={}&scope={}&response_type=code&access_type=online&prompt=select_account",
        AUTHORIZE_URL,
        urlencoding::encode(client_id),
        urlencoding::encode(redirect_uri),
        urlencoding::encode(SCOPES),
    )
}
