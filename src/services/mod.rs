// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod google;
pub mod provisioning;
pub mod tokens;

pub use google::{GoogleClaims, GoogleClient, GoogleIdentity, GoogleTokenResponse};
pub use provisioning::AccountProvisioner;
pub use tokens::{Claims, RevokeOutcome, SessionTokenIssuer, SessionTokenPair, TokenType};
