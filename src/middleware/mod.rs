// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Middleware and request extractors (authentication, client address).

pub mod auth;
pub mod client_ip;

pub use auth::{require_auth, AuthUser};
pub use client_ip::ClientIp;
