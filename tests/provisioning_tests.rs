// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account provisioning against stores that misbehave or race.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use unitconv_api::db::{MemoryDb, Store, StoreError, StoreResult};
use unitconv_api::error::AppError;
use unitconv_api::models::user::GOOGLE_PROVIDER;
use unitconv_api::models::{ConversionRecord, LinkedIdentity, NewUser, RevokedToken, User};
use unitconv_api::services::AccountProvisioner;
use uuid::Uuid;

mod common;

use common::claims;

/// What the wrapped store does on its first `create_user` call.
#[derive(Clone, Copy)]
enum Twist {
    /// Pass everything through.
    None,
    /// Identity writes fail.
    FailLinking,
    /// Another login grabs the same username just before us.
    StealUsername,
    /// Another login for the same email finishes just before us.
    StealEmail,
}

struct TwistedStore {
    inner: MemoryDb,
    twist: Twist,
    fired: AtomicBool,
}

impl TwistedStore {
    fn new(twist: Twist) -> Self {
        Self {
            inner: MemoryDb::new(),
            twist,
            fired: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl Store for TwistedStore {
    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        self.inner.find_user_by_id(id).await
    }
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.inner.find_user_by_email(email).await
    }
    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        self.inner.find_by_username(username).await
    }
    async fn create_user(&self, new_user: NewUser) -> StoreResult<User> {
        if !self.fired.swap(true, Ordering::SeqCst) {
            let rival = match self.twist {
                Twist::StealUsername => Some(NewUser {
                    email: "rival@example.com".to_string(),
                    ..new_user.clone()
                }),
                Twist::StealEmail => Some(NewUser {
                    username: "rival".to_string(),
                    ..new_user.clone()
                }),
                Twist::None | Twist::FailLinking => None,
            };
            if let Some(rival) = rival {
                self.inner.create_user(rival).await?;
            }
        }
        self.inner.create_user(new_user).await
    }
    async fn update_user(&self, user: &User) -> StoreResult<()> {
        self.inner.update_user(user).await
    }
    async fn get_linked_identity(
        &self,
        user_id: Uuid,
        provider: &str,
    ) -> StoreResult<Option<LinkedIdentity>> {
        self.inner.get_linked_identity(user_id, provider).await
    }
    async fn upsert_linked_identity(&self, identity: &LinkedIdentity) -> StoreResult<()> {
        if matches!(self.twist, Twist::FailLinking) {
            return Err(StoreError::Backend("identity collection offline".to_string()));
        }
        self.inner.upsert_linked_identity(identity).await
    }
    async fn insert_conversion(&self, record: &ConversionRecord) -> StoreResult<()> {
        self.inner.insert_conversion(record).await
    }
    async fn list_conversions_for_user(&self, user_id: Uuid) -> StoreResult<Vec<ConversionRecord>> {
        self.inner.list_conversions_for_user(user_id).await
    }
    async fn revoke_refresh_token(&self, token: &RevokedToken) -> StoreResult<()> {
        self.inner.revoke_refresh_token(token).await
    }
    async fn is_refresh_token_revoked(&self, jti: &str) -> StoreResult<bool> {
        self.inner.is_refresh_token_revoked(jti).await
    }
}

#[tokio::test]
async fn test_link_failure_does_not_fail_login() {
    let store = Arc::new(TwistedStore::new(Twist::FailLinking));
    let provisioner = AccountProvisioner::new(store.clone());

    let user = provisioner
        .provision(&claims("dana@example.com", "Dana", "", "g-dana"))
        .await
        .unwrap();

    assert_eq!(user.username, "dana");
    assert!(store
        .get_linked_identity(user.id, GOOGLE_PROVIDER)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_username_race_is_retried_with_next_suffix() {
    let store = Arc::new(TwistedStore::new(Twist::StealUsername));
    let provisioner = AccountProvisioner::new(store.clone());

    let user = provisioner
        .provision(&claims("erin@example.com", "", "", "g-erin"))
        .await
        .unwrap();

    assert_eq!(user.username, "erin1");
    assert_eq!(user.email, "erin@example.com");
}

#[tokio::test]
async fn test_email_race_adopts_existing_user() {
    let store = Arc::new(TwistedStore::new(Twist::StealEmail));
    let provisioner = AccountProvisioner::new(store.clone());

    let user = provisioner
        .provision(&claims("finn@example.com", "", "", "g-finn"))
        .await
        .unwrap();

    // The concurrent login's account wins; we end up signed in as it.
    assert_eq!(user.username, "rival");
    let by_email = store
        .find_user_by_email("finn@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_email.id, user.id);
}

#[tokio::test]
async fn test_subject_id_drift_is_updated_in_place() {
    let store = Arc::new(TwistedStore::new(Twist::None));
    let provisioner = AccountProvisioner::new(store.clone());

    let user = provisioner
        .provision(&claims("gale@example.com", "", "", "g-old"))
        .await
        .unwrap();
    provisioner
        .provision(&claims("gale@example.com", "", "", "g-new"))
        .await
        .unwrap();

    let identity = store
        .get_linked_identity(user.id, GOOGLE_PROVIDER)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(identity.subject_id, "g-new");
}

#[tokio::test]
async fn test_missing_subject_still_provisions() {
    let store = Arc::new(TwistedStore::new(Twist::None));
    let provisioner = AccountProvisioner::new(store.clone());

    let mut no_subject = claims("hana@example.com", "Hana", "Ito", "unused");
    no_subject.subject_id = None;
    let user = provisioner.provision(&no_subject).await.unwrap();

    assert_eq!(user.full_name(), "Hana Ito");
    assert!(store
        .get_linked_identity(user.id, GOOGLE_PROVIDER)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_concurrent_first_logins_share_one_account() {
    let store = Arc::new(MemoryDb::new());
    let provisioner = AccountProvisioner::new(store.clone());

    let mut handles = Vec::new();
    for _ in 0..8 {
        let provisioner = provisioner.clone();
        handles.push(tokio::spawn(async move {
            provisioner
                .provision(&claims("ivy@example.com", "", "", "g-ivy"))
                .await
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        match handle.await.unwrap() {
            Ok(user) => ids.push(user.id),
            Err(e) => assert!(matches!(e, AppError::ProvisioningFailed)),
        }
    }
    assert!(!ids.is_empty());
    assert!(ids.iter().all(|id| *id == ids[0]));
}
