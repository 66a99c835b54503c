// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Blacklist entry for revoked refresh tokens.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A refresh token that may no longer be exchanged for access tokens.
///
/// Keyed by the token's `jti`. `expires_at` mirrors the token's own `exp`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevokedToken {
    pub jti: String,
    pub user_id: Uuid,
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub expires_at: DateTime<Utc>,
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub revoked_at: DateTime<Utc>,
}
