// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! unitconv-api: authenticated meters-to-feet conversion backend
//!
//! Users sign in with Google (browser code flow or a frontend-supplied access
//! token), receive a JWT session pair, and record conversions that are kept
//! per user for history and statistics.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use config::Config;
use db::Store;
use services::{AccountProvisioner, GoogleIdentity, SessionTokenIssuer};

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub db: Arc<dyn Store>,
    pub google: Arc<dyn GoogleIdentity>,
    pub provisioner: AccountProvisioner,
    pub tokens: SessionTokenIssuer,
}

impl AppState {
    /// Wire services over a store and a Google identity client.
    pub fn new(config: Config, db: Arc<dyn Store>, google: Arc<dyn GoogleIdentity>) -> Self {
        let provisioner = AccountProvisioner::new(db.clone());
        let tokens = SessionTokenIssuer::new(&config, db.clone());
        Self {
            config,
            db,
            google,
            provisioner,
            tokens,
        }
    }
}
