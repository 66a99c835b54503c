// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, Response},
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use unitconv_api::config::Config;
use unitconv_api::db::{FirestoreDb, MemoryDb, Store};
use unitconv_api::error::AppError;
use unitconv_api::routes::create_router;
use unitconv_api::services::{GoogleClaims, GoogleIdentity, GoogleTokenResponse};
use unitconv_api::AppState;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Google access token that resolves to Alice.
#[allow(dead_code)]
pub const ALICE_TOKEN: &str = "google-token-alice";
/// Google access token whose userinfo has no email.
#[allow(dead_code)]
pub const NO_EMAIL_TOKEN: &str = "google-token-no-email";
/// Authorization code that exchanges for [`ALICE_TOKEN`].
#[allow(dead_code)]
pub const ALICE_CODE: &str = "code-alice";
/// Authorization code that exchanges for a token Google then rejects.
#[allow(dead_code)]
pub const STALE_CODE: &str = "code-stale";

/// Canned stand-in for Google's token and userinfo endpoints.
#[derive(Default)]
pub struct FakeGoogle {
    /// Google access token -> claims
    accounts: HashMap<String, GoogleClaims>,
    /// Authorization code -> Google access token
    codes: HashMap<String, String>,
    /// (code, redirect_uri) of every exchange attempted
    pub exchanges: Mutex<Vec<(String, String)>>,
}

#[allow(dead_code)]
impl FakeGoogle {
    pub fn new() -> Self {
        let mut fake = Self::default();
        fake.add_account(ALICE_TOKEN, claims("alice@example.com", "Alice", "Smith", "g-alice"));
        fake.codes.insert(ALICE_CODE.to_string(), ALICE_TOKEN.to_string());
        fake.codes
            .insert(STALE_CODE.to_string(), "google-token-expired".to_string());
        fake
    }

    pub fn add_account(&mut self, token: &str, claims: GoogleClaims) {
        self.accounts.insert(token.to_string(), claims);
    }

    pub fn add_code(&mut self, code: &str, token: &str) {
        self.codes.insert(code.to_string(), token.to_string());
    }
}

#[async_trait]
impl GoogleIdentity for FakeGoogle {
    async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<GoogleTokenResponse, AppError> {
        self.exchanges
            .lock()
            .unwrap()
            .push((code.to_string(), redirect_uri.to_string()));

        match self.codes.get(code) {
            Some(access_token) => Ok(GoogleTokenResponse {
                access_token: access_token.clone(),
                expires_in: Some(3599),
                token_type: Some("Bearer".to_string()),
                scope: None,
                id_token: None,
            }),
            None => Err(AppError::TokenExchangeFailed("invalid_grant".to_string())),
        }
    }

    async fn fetch_userinfo(&self, access_token: &str) -> Result<GoogleClaims, AppError> {
        if access_token == NO_EMAIL_TOKEN {
            return Err(AppError::MissingEmailClaim);
        }
        self.accounts
            .get(access_token)
            .cloned()
            .ok_or(AppError::InvalidOrExpiredToken)
    }
}

#[allow(dead_code)]
pub fn claims(email: &str, given: &str, family: &str, subject: &str) -> GoogleClaims {
    GoogleClaims {
        email: email.to_string(),
        given_name: given.to_string(),
        family_name: family.to_string(),
        subject_id: Some(subject.to_string()),
    }
}

/// Create a test app over a fresh in-memory store and the default fake Google.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    create_test_app_with(
        Config::test_default(),
        Arc::new(MemoryDb::new()),
        Arc::new(FakeGoogle::new()),
    )
}

#[allow(dead_code)]
pub fn create_test_app_with(
    config: Config,
    db: Arc<dyn Store>,
    google: Arc<dyn GoogleIdentity>,
) -> (axum::Router, Arc<AppState>) {
    let state = Arc::new(AppState::new(config, db, google));
    (create_router(state.clone()), state)
}

/// Provision `email` directly and return an access/refresh pair for it.
#[allow(dead_code)]
pub async fn session_for(state: &AppState, email: &str) -> (uuid::Uuid, String, String) {
    let user = state
        .provisioner
        .provision(&claims(email, "", "", &format!("g-{email}")))
        .await
        .unwrap();
    let pair = state.tokens.issue(user.id).unwrap();
    (user.id, pair.access_token, pair.refresh_token)
}

/// Build a request with an optional bearer token and optional JSON body.
#[allow(dead_code)]
pub fn request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// `Location` header of a redirect response.
#[allow(dead_code)]
pub fn location(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .expect("redirect without Location")
        .to_str()
        .unwrap()
        .to_string()
}
