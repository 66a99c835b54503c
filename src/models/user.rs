//! User and linked-identity models for storage and API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Provider name stored on Google-linked identities.
pub const GOOGLE_PROVIDER: &str = "google";

/// Application account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Stable identifier (also used as document ID and JWT subject)
    pub id: Uuid,
    /// Unique login name
    pub username: String,
    /// Unique email address; the key Google logins are matched on
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    /// bcrypt hash; `None` for accounts that only ever signed in with Google
    #[serde(default)]
    pub password_hash: Option<String>,
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub date_joined: DateTime<Utc>,
}

impl User {
    /// "first last" trimmed, or the username when both names are empty.
    pub fn full_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }
}

/// Fields supplied when creating a user; the store assigns id and join date.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: Option<String>,
}

impl NewUser {
    pub fn into_user(self) -> User {
        User {
            id: Uuid::new_v4(),
            username: self.username,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            password_hash: self.password_hash,
            date_joined: Utc::now(),
        }
    }
}

/// Binding between a user and an external identity provider account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkedIdentity {
    pub user_id: Uuid,
    /// Provider name, e.g. "google"
    pub provider: String,
    /// Provider-issued subject id
    pub subject_id: String,
    #[serde(with = "firestore::serialize_as_timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl LinkedIdentity {
    /// Document ID: one identity per (user, provider).
    pub fn doc_id(&self) -> String {
        format!("{}_{}", self.user_id, self.provider)
    }
}

/// Profile shape returned to the frontend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserProfile {
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub username: String,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            full_name: user.full_name(),
            username: user.username.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(first: &str, last: &str) -> User {
        NewUser {
            username: "jdoe".to_string(),
            email: "jdoe@example.com".to_string(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            password_hash: None,
        }
        .into_user()
    }

    #[test]
    fn full_name_joins_and_trims() {
        assert_eq!(user("Jane", "Doe").full_name(), "Jane Doe");
        assert_eq!(user("Jane", "").full_name(), "Jane");
        assert_eq!(user("", "Doe").full_name(), "Doe");
    }

    #[test]
    fn full_name_falls_back_to_username() {
        assert_eq!(user("", "").full_name(), "jdoe");
        assert_eq!(user(" ", " ").full_name(), "jdoe");
    }

    #[test]
    fn profile_copies_identity_fields() {
        let u = user("Jane", "Doe");
        let profile = UserProfile::from(&u);
        assert_eq!(profile.id, u.id);
        assert_eq!(profile.username, "jdoe");
        assert_eq!(profile.full_name, "Jane Doe");
    }
}
