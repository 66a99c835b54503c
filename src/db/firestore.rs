// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore-backed [`Store`].
//!
//! Layout:
//! - `users/{user_id}`: user documents
//! - `usernames/{username}`, `emails/{email}`: uniqueness claims pointing at
//!   a user id, created with Firestore *create* semantics so a second create
//!   for the same key fails with a conflict
//! - `linked_identities/{user_id}_{provider}`
//! - `conversions/{id}`
//! - `revoked_tokens/{jti}`

use async_trait::async_trait;
use firestore::errors::FirestoreError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{collections, Store, StoreError, StoreResult};
use crate::models::{ConversionRecord, LinkedIdentity, NewUser, RevokedToken, User};

/// Uniqueness claim document.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexClaim {
    user_id: Uuid,
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: firestore::FirestoreDb,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> StoreResult<Self> {
        // The emulator accepts any token; skip credential discovery entirely.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| StoreError::Backend(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self { client })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> StoreResult<Self> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            StoreError::Backend(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self { client })
    }

    // ─── Helper Methods ────────────────────────────────────────────

    /// Create a uniqueness claim. `Ok(false)` means the key is already claimed.
    async fn claim(&self, collection: &str, key: &str, user_id: Uuid) -> StoreResult<bool> {
        let result: Result<(), FirestoreError> = self
            .client
            .fluent()
            .insert()
            .into(collection)
            .document_id(claim_doc_id(key))
            .object(&IndexClaim { user_id })
            .execute()
            .await;

        match result {
            Ok(()) => Ok(true),
            Err(FirestoreError::DataConflictError(_)) => Ok(false),
            Err(e) => Err(backend(e)),
        }
    }

    /// Best-effort removal of a claim after a failed create.
    async fn release_claim(&self, collection: &str, key: &str) {
        if let Err(e) = self
            .client
            .fluent()
            .delete()
            .from(collection)
            .document_id(claim_doc_id(key))
            .execute()
            .await
        {
            tracing::error!(collection, error = %e, "Failed to release uniqueness claim");
        }
    }

    async fn lookup_claim(&self, collection: &str, key: &str) -> StoreResult<Option<User>> {
        let claim: Option<IndexClaim> = self
            .client
            .fluent()
            .select()
            .by_id_in(collection)
            .obj()
            .one(&claim_doc_id(key))
            .await
            .map_err(backend)?;

        match claim {
            Some(claim) => self.find_user_by_id(claim.user_id).await,
            None => Ok(None),
        }
    }
}

#[async_trait]
impl Store for FirestoreDb {
    // ─── User Operations ─────────────────────────────────────────

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        self.client
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(&id.to_string())
            .await
            .map_err(backend)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.lookup_claim(collections::EMAILS, email).await
    }

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        self.lookup_claim(collections::USERNAMES, username).await
    }

    async fn create_user(&self, new_user: NewUser) -> StoreResult<User> {
        let user = new_user.into_user();

        if !self
            .claim(collections::USERNAMES, &user.username, user.id)
            .await?
        {
            return Err(StoreError::UsernameTaken(user.username));
        }

        match self.claim(collections::EMAILS, &user.email, user.id).await {
            Ok(true) => {}
            Ok(false) => {
                self.release_claim(collections::USERNAMES, &user.username)
                    .await;
                return Err(StoreError::EmailTaken(user.email));
            }
            Err(e) => {
                self.release_claim(collections::USERNAMES, &user.username)
                    .await;
                return Err(e);
            }
        }

        let written: Result<(), FirestoreError> = self
            .client
            .fluent()
            .update()
            .in_col(collections::USERS)
            .document_id(user.id.to_string())
            .object(&user)
            .execute()
            .await;

        if let Err(e) = written {
            self.release_claim(collections::EMAILS, &user.email).await;
            self.release_claim(collections::USERNAMES, &user.username)
                .await;
            return Err(backend(e));
        }

        tracing::debug!(user_id = %user.id, username = %user.username, "User document created");
        Ok(user)
    }

    async fn update_user(&self, user: &User) -> StoreResult<()> {
        let _: () = self
            .client
            .fluent()
            .update()
            .fields(firestore::paths!(User::{first_name, last_name, password_hash}))
            .in_col(collections::USERS)
            .document_id(user.id.to_string())
            .object(user)
            .execute()
            .await
            .map_err(backend)?;
        Ok(())
    }

    // ─── Linked Identity Operations ──────────────────────────────

    async fn get_linked_identity(
        &self,
        user_id: Uuid,
        provider: &str,
    ) -> StoreResult<Option<LinkedIdentity>> {
        self.client
            .fluent()
            .select()
            .by_id_in(collections::LINKED_IDENTITIES)
            .obj()
            .one(&format!("{}_{}", user_id, provider))
            .await
            .map_err(backend)
    }

    async fn upsert_linked_identity(&self, identity: &LinkedIdentity) -> StoreResult<()> {
        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collections::LINKED_IDENTITIES)
            .document_id(identity.doc_id())
            .object(identity)
            .execute()
            .await
            .map_err(backend)?;
        Ok(())
    }

    // ─── Conversion Operations ───────────────────────────────────

    async fn insert_conversion(&self, record: &ConversionRecord) -> StoreResult<()> {
        let _: () = self
            .client
            .fluent()
            .insert()
            .into(collections::CONVERSIONS)
            .document_id(record.id.to_string())
            .object(record)
            .execute()
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn list_conversions_for_user(&self, user_id: Uuid) -> StoreResult<Vec<ConversionRecord>> {
        let user_id = user_id.to_string();
        self.client
            .fluent()
            .select()
            .from(collections::CONVERSIONS)
            .filter(move |q| q.for_all([q.field("user_id").eq(user_id.clone())]))
            .order_by([("timestamp", firestore::FirestoreQueryDirection::Descending)])
            .obj()
            .query()
            .await
            .map_err(backend)
    }

    // ─── Refresh Token Blacklist ─────────────────────────────────

    async fn revoke_refresh_token(&self, token: &RevokedToken) -> StoreResult<()> {
        let _: () = self
            .client
            .fluent()
            .update()
            .in_col(collections::REVOKED_TOKENS)
            .document_id(&token.jti)
            .object(token)
            .execute()
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn is_refresh_token_revoked(&self, jti: &str) -> StoreResult<bool> {
        let found: Option<RevokedToken> = self
            .client
            .fluent()
            .select()
            .by_id_in(collections::REVOKED_TOKENS)
            .obj()
            .one(jti)
            .await
            .map_err(backend)?;
        Ok(found.is_some())
    }
}

fn backend(e: FirestoreError) -> StoreError {
    StoreError::Backend(e.to_string())
}

/// Document IDs may not contain `/`; percent-encode the key.
fn claim_doc_id(key: &str) -> String {
    urlencoding::encode(key).into_owned()
}
