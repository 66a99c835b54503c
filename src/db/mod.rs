//! Persistence layer.
//!
//! [`Store`] is the only way handlers and services touch durable state.
//! Two implementations exist: [`FirestoreDb`] for deployments and
//! [`MemoryDb`] for local runs and tests.

pub mod firestore;
pub mod memory;

pub use self::firestore::FirestoreDb;
pub use memory::MemoryDb;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{ConversionRecord, LinkedIdentity, NewUser, RevokedToken, User};

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    /// Uniqueness claims keyed by username
    pub const USERNAMES: &str = "usernames";
    /// Uniqueness claims keyed by email
    pub const EMAILS: &str = "emails";
    pub const LINKED_IDENTITIES: &str = "linked_identities";
    pub const CONVERSIONS: &str = "conversions";
    pub const REVOKED_TOKENS: &str = "revoked_tokens";
}

/// Persistence errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("username already taken: {0}")]
    UsernameTaken(String),

    #[error("email already registered: {0}")]
    EmailTaken(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Durable storage for users, linked identities, conversions and the
/// refresh-token blacklist.
///
/// Guarantees every implementation must provide:
/// - `create_user` is atomic with respect to username and email uniqueness:
///   of two concurrent creates for the same username, exactly one succeeds and
///   the other gets [`StoreError::UsernameTaken`] (likewise `EmailTaken`).
///   A failed create leaves no partial user behind.
/// - `upsert_linked_identity` keeps at most one identity per (user, provider).
/// - `insert_conversion` is a single durable write; records are never mutated.
/// - `list_conversions_for_user` returns only that user's records, newest first.
#[async_trait]
pub trait Store: Send + Sync {
    // ─── Users ───────────────────────────────────────────────────

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;

    /// Exact-match lookup.
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Exact-match lookup.
    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    /// Create a user, enforcing username and email uniqueness.
    async fn create_user(&self, new_user: NewUser) -> StoreResult<User>;

    /// Overwrite mutable profile fields (names, password hash) of an existing user.
    async fn update_user(&self, user: &User) -> StoreResult<()>;

    // ─── Linked identities ───────────────────────────────────────

    async fn get_linked_identity(
        &self,
        user_id: Uuid,
        provider: &str,
    ) -> StoreResult<Option<LinkedIdentity>>;

    /// Create or replace the identity for `(identity.user_id, identity.provider)`.
    async fn upsert_linked_identity(&self, identity: &LinkedIdentity) -> StoreResult<()>;

    // ─── Conversions ─────────────────────────────────────────────

    async fn insert_conversion(&self, record: &ConversionRecord) -> StoreResult<()>;

    async fn list_conversions_for_user(&self, user_id: Uuid) -> StoreResult<Vec<ConversionRecord>>;

    // ─── Refresh-token blacklist ─────────────────────────────────

    /// Record a revoked refresh token. Revoking twice is not an error.
    async fn revoke_refresh_token(&self, token: &RevokedToken) -> StoreResult<()>;

    async fn is_refresh_token_revoked(&self, jti: &str) -> StoreResult<bool>;
}
