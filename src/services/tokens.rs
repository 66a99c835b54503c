// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session token issuer.
//!
//! Access and refresh tokens are both HS256 JWTs signed with the same key and
//! told apart by the `token_type` claim. Access tokens are stateless; refresh
//! tokens can be revoked through the store's blacklist, keyed by `jti`.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;
use crate::db::Store;
use crate::error::AppError;
use crate::models::RevokedToken;

/// Which half of the pair a token is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// JWT claims structure.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
    /// Unique token id
    pub jti: String,
    pub token_type: TokenType,
}

impl Claims {
    pub fn user_id(&self) -> Result<Uuid, AppError> {
        self.sub.parse().map_err(|_| AppError::InvalidToken)
    }
}

/// Freshly minted credentials for one user.
#[derive(Debug, Clone)]
pub struct SessionTokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// What `revoke` did. Logout reports success regardless.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevokeOutcome {
    Revoked,
    AlreadyRevoked,
    /// Malformed, expired, wrong type, or the blacklist was unreachable.
    Invalid,
}

/// Mints, verifies and revokes session tokens.
#[derive(Clone)]
pub struct SessionTokenIssuer {
    signing_key: Vec<u8>,
    access_ttl: Duration,
    refresh_ttl: Duration,
    store: Arc<dyn Store>,
}

impl SessionTokenIssuer {
    pub fn new(config: &Config, store: Arc<dyn Store>) -> Self {
        Self {
            signing_key: config.jwt_signing_key.clone(),
            access_ttl: config.access_token_ttl,
            refresh_ttl: config.refresh_token_ttl,
            store,
        }
    }

    /// Mint an access/refresh pair whose subject is `user_id`.
    pub fn issue(&self, user_id: Uuid) -> Result<SessionTokenPair, AppError> {
        Ok(SessionTokenPair {
            access_token: self.mint(user_id, TokenType::Access, self.access_ttl)?,
            refresh_token: self.mint(user_id, TokenType::Refresh, self.refresh_ttl)?,
        })
    }

    /// Validate an access token presented as a bearer credential.
    pub fn verify_access(&self, token: &str) -> Result<Claims, AppError> {
        self.verify(token, TokenType::Access)
    }

    /// Exchange a live, unrevoked refresh token for a new access token.
    pub async fn refresh(&self, refresh_token: &str) -> Result<String, AppError> {
        let claims = self.verify(refresh_token, TokenType::Refresh)?;

        let revoked = self
            .store
            .is_refresh_token_revoked(&claims.jti)
            .await
            .map_err(AppError::from)?;
        if revoked {
            tracing::info!(jti = %claims.jti, "Rejected revoked refresh token");
            return Err(AppError::InvalidToken);
        }

        let user_id = claims.user_id()?;
        self.mint(user_id, TokenType::Access, self.access_ttl)
    }

    /// Blacklist a refresh token. Never fails; the outcome is informational.
    pub async fn revoke(&self, refresh_token: &str) -> RevokeOutcome {
        let claims = match self.verify(refresh_token, TokenType::Refresh) {
            Ok(claims) => claims,
            Err(_) => return RevokeOutcome::Invalid,
        };
        let Ok(user_id) = claims.user_id() else {
            return RevokeOutcome::Invalid;
        };

        match self.store.is_refresh_token_revoked(&claims.jti).await {
            Ok(true) => return RevokeOutcome::AlreadyRevoked,
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(error = %e, "Could not check refresh token blacklist");
                return RevokeOutcome::Invalid;
            }
        }

        let entry = RevokedToken {
            jti: claims.jti.clone(),
            user_id,
            expires_at: DateTime::<Utc>::from_timestamp(claims.exp as i64, 0)
                .unwrap_or_else(Utc::now),
            revoked_at: Utc::now(),
        };

        match self.store.revoke_refresh_token(&entry).await {
            Ok(()) => {
                tracing::info!(user_id = %user_id, jti = %claims.jti, "Refresh token revoked");
                RevokeOutcome::Revoked
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to record revoked refresh token");
                RevokeOutcome::Invalid
            }
        }
    }

    fn mint(&self, user_id: Uuid, token_type: TokenType, ttl: Duration) -> Result<String, AppError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("System time error: {}", e)))?
            .as_secs() as usize;

        let claims = Claims {
            sub: user_id.to_string(),
            iat: now,
            exp: now + ttl.as_secs() as usize,
            jti: Uuid::new_v4().simple().to_string(),
            token_type,
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(&self.signing_key),
        )
        .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))
    }

    fn verify(&self, token: &str, expected: TokenType) -> Result<Claims, AppError> {
        let key = DecodingKey::from_secret(&self.signing_key);
        let validation = Validation::new(Algorithm::HS256);

        let claims = decode::<Claims>(token, &key, &validation)
            .map_err(|_| AppError::InvalidToken)?
            .claims;

        if claims.token_type != expected {
            return Err(AppError::InvalidToken);
        }
        Ok(claims)
    }
}
