// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Find-or-create of application users from verified Google claims.

use std::sync::Arc;

use chrono::Utc;

use crate::db::{Store, StoreError};
use crate::error::AppError;
use crate::models::user::GOOGLE_PROVIDER;
use crate::models::{LinkedIdentity, NewUser, User};
use crate::services::google::GoogleClaims;

/// Resolves Google identities to users, creating accounts on first login.
#[derive(Clone)]
pub struct AccountProvisioner {
    store: Arc<dyn Store>,
}

impl AccountProvisioner {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Find the user owning `claims.email`, or create one.
    ///
    /// Existing users get empty names backfilled from the claims. The Google
    /// linked identity is kept in sync on a best-effort basis.
    pub async fn provision(&self, claims: &GoogleClaims) -> Result<User, AppError> {
        let user = match self.find_or_create(claims).await {
            Ok(user) => user,
            Err(e) => {
                tracing::error!(email = %claims.email, error = %e, "User provisioning failed");
                return Err(AppError::ProvisioningFailed);
            }
        };

        self.link_identity(&user, claims).await;
        Ok(user)
    }

    async fn find_or_create(&self, claims: &GoogleClaims) -> Result<User, StoreError> {
        if let Some(user) = self.store.find_user_by_email(&claims.email).await? {
            return self.backfill_names(user, claims).await;
        }

        let base = base_username(&claims.email)
            .ok_or_else(|| StoreError::Backend(format!("no local part in {}", claims.email)))?;

        // One retry covers a concurrent login racing us to the same username.
        let mut retried = false;
        loop {
            let username = self.free_username(base).await?;
            let new_user = NewUser {
                username,
                email: claims.email.clone(),
                first_name: claims.given_name.clone(),
                last_name: claims.family_name.clone(),
                password_hash: None,
            };

            match self.store.create_user(new_user).await {
                Ok(user) => {
                    tracing::info!(
                        user_id = %user.id,
                        username = %user.username,
                        "Created user from Google login"
                    );
                    return Ok(user);
                }
                Err(StoreError::UsernameTaken(taken)) if !retried => {
                    tracing::debug!(username = %taken, "Username claimed concurrently, retrying");
                    retried = true;
                }
                Err(StoreError::EmailTaken(_)) => {
                    return self
                        .store
                        .find_user_by_email(&claims.email)
                        .await?
                        .ok_or_else(|| {
                            StoreError::Backend(format!(
                                "email {} claimed but no user found",
                                claims.email
                            ))
                        });
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// First of `base`, `base1`, `base2`, ... not currently in use.
    async fn free_username(&self, base: &str) -> Result<String, StoreError> {
        let mut candidate = base.to_string();
        let mut counter: u64 = 1;
        while self.store.find_by_username(&candidate).await?.is_some() {
            candidate = format!("{base}{counter}");
            counter += 1;
        }
        Ok(candidate)
    }

    async fn backfill_names(&self, mut user: User, claims: &GoogleClaims) -> Result<User, StoreError> {
        let mut changed = false;
        if user.first_name.is_empty() && !claims.given_name.is_empty() {
            user.first_name = claims.given_name.clone();
            changed = true;
        }
        if user.last_name.is_empty() && !claims.family_name.is_empty() {
            user.last_name = claims.family_name.clone();
            changed = true;
        }

        if changed {
            self.store.update_user(&user).await?;
            tracing::debug!(user_id = %user.id, "Backfilled user names from Google profile");
        }
        Ok(user)
    }

    async fn link_identity(&self, user: &User, claims: &GoogleClaims) {
        let Some(subject_id) = claims.subject_id.as_deref() else {
            tracing::warn!(user_id = %user.id, "Google claims carried no subject id; not linking");
            return;
        };

        let existing = match self.store.get_linked_identity(user.id, GOOGLE_PROVIDER).await {
            Ok(existing) => existing,
            Err(e) => {
                tracing::warn!(user_id = %user.id, error = %e, "Failed to read linked identity");
                return;
            }
        };
        if existing.as_ref().is_some_and(|i| i.subject_id == subject_id) {
            return;
        }

        let identity = LinkedIdentity {
            user_id: user.id,
            provider: GOOGLE_PROVIDER.to_string(),
            subject_id: subject_id.to_string(),
            updated_at: Utc::now(),
        };
        if let Err(e) = self.store.upsert_linked_identity(&identity).await {
            tracing::warn!(user_id = %user.id, error = %e, "Failed to link Google identity");
        }
    }
}

/// Local part of an email address, or `None` when it is empty.
pub fn base_username(email: &str) -> Option<&str> {
    let local = email.split('@').next().unwrap_or_default();
    (!local.is_empty()).then_some(local)
}
