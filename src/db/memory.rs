// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process store backed by `DashMap`.
//!
//! Username and email uniqueness go through the `DashMap` entry API, which
//! holds the shard lock between the check and the insert.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use crate::db::{Store, StoreError, StoreResult};
use crate::models::{ConversionRecord, LinkedIdentity, NewUser, RevokedToken, User};

/// Memory-only store. Cloning shares the same maps.
#[derive(Clone, Default)]
pub struct MemoryDb {
    inner: std::sync::Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    users: DashMap<Uuid, User>,
    usernames: DashMap<String, Uuid>,
    emails: DashMap<String, Uuid>,
    /// Keyed by (user_id, provider)
    identities: DashMap<(Uuid, String), LinkedIdentity>,
    conversions: DashMap<Uuid, ConversionRecord>,
    revoked: DashMap<String, RevokedToken>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryDb {
    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.inner.users.get(&id).map(|u| u.value().clone()))
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let id = self.inner.emails.get(email).map(|id| *id);
        Ok(id.and_then(|id| self.inner.users.get(&id).map(|u| u.value().clone())))
    }

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let id = self.inner.usernames.get(username).map(|id| *id);
        Ok(id.and_then(|id| self.inner.users.get(&id).map(|u| u.value().clone())))
    }

    async fn create_user(&self, new_user: NewUser) -> StoreResult<User> {
        let user = new_user.into_user();

        // The record goes in first so an index entry never points at nothing.
        self.inner.users.insert(user.id, user.clone());

        match self.inner.usernames.entry(user.username.clone()) {
            Entry::Occupied(_) => {
                self.inner.users.remove(&user.id);
                return Err(StoreError::UsernameTaken(user.username));
            }
            Entry::Vacant(slot) => {
                slot.insert(user.id);
            }
        }

        match self.inner.emails.entry(user.email.clone()) {
            Entry::Occupied(_) => {
                self.inner.usernames.remove(&user.username);
                self.inner.users.remove(&user.id);
                return Err(StoreError::EmailTaken(user.email));
            }
            Entry::Vacant(slot) => {
                slot.insert(user.id);
            }
        }

        Ok(user)
    }

    async fn update_user(&self, user: &User) -> StoreResult<()> {
        match self.inner.users.get_mut(&user.id) {
            Some(mut existing) => {
                existing.first_name = user.first_name.clone();
                existing.last_name = user.last_name.clone();
                existing.password_hash = user.password_hash.clone();
                Ok(())
            }
            None => Err(StoreError::Backend(format!("user {} does not exist", user.id))),
        }
    }

    async fn get_linked_identity(
        &self,
        user_id: Uuid,
        provider: &str,
    ) -> StoreResult<Option<LinkedIdentity>> {
        Ok(self
            .inner
            .identities
            .get(&(user_id, provider.to_string()))
            .map(|i| i.value().clone()))
    }

    async fn upsert_linked_identity(&self, identity: &LinkedIdentity) -> StoreResult<()> {
        self.inner.identities.insert(
            (identity.user_id, identity.provider.clone()),
            identity.clone(),
        );
        Ok(())
    }

    async fn insert_conversion(&self, record: &ConversionRecord) -> StoreResult<()> {
        self.inner.conversions.insert(record.id, record.clone());
        Ok(())
    }

    async fn list_conversions_for_user(&self, user_id: Uuid) -> StoreResult<Vec<ConversionRecord>> {
        let mut records: Vec<ConversionRecord> = self
            .inner
            .conversions
            .iter()
            .filter(|r| r.user_id == user_id)
            .map(|r| r.value().clone())
            .collect();
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(records)
    }

    async fn revoke_refresh_token(&self, token: &RevokedToken) -> StoreResult<()> {
        self.inner
            .revoked
            .entry(token.jti.clone())
            .or_insert_with(|| token.clone());
        Ok(())
    }

    async fn is_refresh_token_revoked(&self, jti: &str) -> StoreResult<bool> {
        Ok(self.inner.revoked.contains_key(jti))
    }
}
