// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod conversion;
pub mod stats;
pub mod token;
pub mod user;

pub use conversion::ConversionRecord;
pub use stats::ConversionStats;
pub use token::RevokedToken;
pub use user::{LinkedIdentity, NewUser, User, UserProfile};
