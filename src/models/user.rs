//! Represents a registered alumni-association member.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A single user record.
///
/// Carries the identity fields checked at registration, the optional
/// profile fields members fill in later, and the current profile-photo
/// reference (a path relative to the storage root, or `None` when the
/// user has no photo set).
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct User {
    /// Internal UUID for DB indexing.
    pub id: Uuid,

    /// Full name as registered.
    pub name: String,

    /// Unique email address, used as the login identifier.
    pub email: String,

    /// 10-digit contact number.
    pub phone: String,

    /// Graduation year.
    pub batch: i64,

    /// Department / branch of study.
    pub branch: String,

    /// University roll number. Together with batch and branch this
    /// identifies one alumni record.
    pub roll_no: i64,

    /// Argon2 password hash. Never serialized into responses.
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Whether an admin (or a matching alumni record) has verified
    /// this account.
    pub is_verified: bool,

    /// `user` or `admin`.
    pub role: String,

    pub biography: Option<String>,
    pub current_workplace: Option<String>,
    pub designation: Option<String>,
    pub address: Option<String>,

    /// Path to the current profile photo, relative to the storage root.
    /// `None` means no photo set. Mutated only by the photo service.
    pub profile_photo: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Registration payload. The plaintext password is hashed before storage
/// and never persisted.
#[derive(Deserialize, Debug)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub batch: i64,
    pub branch: String,
    pub roll_no: i64,
    pub password: String,
}

/// Partial profile update. Each field only overwrites the stored value
/// when provided.
#[derive(Deserialize, Debug, Default)]
pub struct ProfileUpdate {
    pub biography: Option<String>,
    pub current_workplace: Option<String>,
    pub designation: Option<String>,
    pub address: Option<String>,
}

/// Compact projection returned by member search.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub branch: String,
    pub batch: i64,
}
