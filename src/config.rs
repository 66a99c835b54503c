// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Everything is read once at startup and passed around inside `AppState`,
//! so handlers never touch the process environment.

use std::env;
use std::time::Duration;

const DEFAULT_FRONTEND_URL: &str = "http://localhost:3000";
const DEFAULT_REDIRECT_URI: &str = "http://localhost:8000/auth/google/callback/";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_ACCESS_TOKEN_TTL_SECS: u64 = 5 * 60;
const DEFAULT_REFRESH_TOKEN_TTL_SECS: u64 = 24 * 60 * 60;
const DEFAULT_GOOGLE_HTTP_TIMEOUT_SECS: u64 = 10;

/// Where users, conversions and revoked tokens live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    /// Firestore in the given GCP project (or the emulator).
    Firestore { project_id: String },
    /// Process-local maps; contents vanish on restart.
    Memory,
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Google OAuth ---
    /// Google OAuth client ID (public). Empty when not configured.
    pub google_client_id: String,
    /// Google OAuth client secret. Empty when not configured.
    pub google_client_secret: String,
    /// Redirect URI registered with Google; sent byte-for-byte on exchange.
    pub google_redirect_uri: String,
    /// Timeout applied to every outbound Google request.
    pub google_http_timeout: Duration,

    // --- Frontend / server ---
    /// Frontend base URL for post-auth redirects
    pub frontend_url: String,
    /// Server port
    pub port: u16,
    /// Echoed by the health endpoint
    pub debug: bool,
    /// Echoed by the health endpoint
    pub allowed_hosts: Vec<String>,
    /// Take the client IP from `X-Forwarded-For` / `X-Real-IP`. Only safe
    /// behind a proxy that overwrites those headers.
    pub trust_proxy_headers: bool,

    // --- Session tokens ---
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,

    // --- Storage ---
    pub storage: StorageBackend,
}

impl Config {
    /// Config with fixed fake values for tests.
    pub fn test_default() -> Self {
        Self {
            google_client_id: "test-client-id.apps.googleusercontent.com".to_string(),
            google_client_secret: "test_secret".to_string(),
            google_redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            google_http_timeout: Duration::from_secs(DEFAULT_GOOGLE_HTTP_TIMEOUT_SECS),
            frontend_url: DEFAULT_FRONTEND_URL.to_string(),
            port: DEFAULT_PORT,
            debug: true,
            allowed_hosts: vec!["localhost".to_string(), "127.0.0.1".to_string()],
            trust_proxy_headers: true,
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            access_token_ttl: Duration::from_secs(DEFAULT_ACCESS_TOKEN_TTL_SECS),
            refresh_token_ttl: Duration::from_secs(DEFAULT_REFRESH_TOKEN_TTL_SECS),
            storage: StorageBackend::Memory,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is honored for local development.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let jwt_signing_key = env::var("JWT_SIGNING_KEY")
            .map_err(|_| ConfigError::Missing("JWT_SIGNING_KEY"))?
            .into_bytes();

        let storage = match env::var("STORAGE_BACKEND").ok().as_deref() {
            Some("memory") => StorageBackend::Memory,
            Some("firestore") => StorageBackend::Firestore {
                project_id: env::var("GCP_PROJECT_ID")
                    .map_err(|_| ConfigError::Missing("GCP_PROJECT_ID"))?,
            },
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "STORAGE_BACKEND",
                    value: other.to_string(),
                })
            }
            None => match env::var("GCP_PROJECT_ID") {
                Ok(project_id) => StorageBackend::Firestore { project_id },
                Err(_) => StorageBackend::Memory,
            },
        };

        Ok(Self {
            google_client_id: env::var("GOOGLE_OAUTH_CLIENT_ID")
                .map(|v| v.trim().to_string())
                .unwrap_or_default(),
            google_client_secret: env::var("GOOGLE_OAUTH_CLIENT_SECRET")
                .map(|v| v.trim().to_string())
                .unwrap_or_default(),
            google_redirect_uri: env::var("GOOGLE_OAUTH_REDIRECT_URI")
                .unwrap_or_else(|_| DEFAULT_REDIRECT_URI.to_string()),
            google_http_timeout: Duration::from_secs(parse_var(
                "GOOGLE_HTTP_TIMEOUT_SECS",
                DEFAULT_GOOGLE_HTTP_TIMEOUT_SECS,
            )?),
            frontend_url: env::var("FRONTEND_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| DEFAULT_FRONTEND_URL.to_string()),
            port: parse_var("PORT", DEFAULT_PORT)?,
            debug: env::var("DEBUG").map(|v| is_truthy(&v)).unwrap_or(false),
            allowed_hosts: env::var("ALLOWED_HOSTS")
                .map(|v| split_list(&v))
                .unwrap_or_default(),
            trust_proxy_headers: env::var("TRUST_PROXY_HEADERS")
                .map(|v| is_truthy(&v))
                .unwrap_or(true),
            jwt_signing_key,
            access_token_ttl: Duration::from_secs(parse_var(
                "ACCESS_TOKEN_TTL_SECS",
                DEFAULT_ACCESS_TOKEN_TTL_SECS,
            )?),
            refresh_token_ttl: Duration::from_secs(parse_var(
                "REFRESH_TOKEN_TTL_SECS",
                DEFAULT_REFRESH_TOKEN_TTL_SECS,
            )?),
            storage,
        })
    }
}

/// Parse an optional numeric env var, falling back to `default` when unset.
fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            name,
            value: raw,
        }),
        Err(_) => Ok(default),
    }
}

fn is_truthy(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}
