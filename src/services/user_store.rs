//! src/services/user_store.rs
//!
//! UserStore — persistence for alumni user records, backed by SQLite.
//! Owns registration (field validation, duplicate checks, password
//! hashing), profile updates, password changes, member search, and the
//! single-column profile-photo reference update used by the photo
//! service.

use crate::models::user::{NewUser, ProfileUpdate, User, UserSummary};
use crate::services::password;
use chrono::{Datelike, Utc};
use sqlx::{QueryBuilder, SqlitePool, sqlite::Sqlite};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum UserStoreError {
    #[error("user `{0}` not found")]
    UserNotFound(String),
    #[error("email `{0}` is already registered")]
    EmailTaken(String),
    #[error("a user with these alumni details is already registered")]
    DuplicateAlumni,
    #[error("invalid current password")]
    InvalidCredentials,
    #[error("field `{field}` invalid: {reason}")]
    InvalidField { field: &'static str, reason: String },
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type UserStoreResult<T> = Result<T, UserStoreError>;

const BATCH_FLOOR: i64 = 2006;
const MIN_NAME_LEN: usize = 2;
const MIN_PASSWORD_LEN: usize = 8;
const MAX_BIOGRAPHY_LEN: usize = 500;
const PHONE_DIGITS: usize = 10;

/// Persistence layer for user records.
///
/// Kept deliberately small: every method maps to a single query (plus
/// the duplicate pre-checks during registration). Validation of other
/// fields is not repeated on photo-reference updates.
#[derive(Clone)]
pub struct UserStore {
    /// Shared SQLite connection pool.
    pub db: Arc<SqlitePool>,
}

impl UserStore {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    /// Register a new, unverified member.
    ///
    /// Validates field shapes, rejects duplicate emails and duplicate
    /// `(roll_no, batch, branch)` triples, hashes the password, and
    /// inserts the record.
    pub async fn register(&self, new: NewUser) -> UserStoreResult<User> {
        validate_new_user(&new)?;

        if !self.email_available(&new.email).await? {
            return Err(UserStoreError::EmailTaken(new.email));
        }

        let duplicate: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM users WHERE roll_no = ? AND batch = ? AND branch = ?")
                .bind(new.roll_no)
                .bind(new.batch)
                .bind(&new.branch)
                .fetch_optional(&*self.db)
                .await?;
        if duplicate.is_some() {
            return Err(UserStoreError::DuplicateAlumni);
        }

        let password_hash = password::hash_password(&new.password)
            .map_err(|err| UserStoreError::Hash(err.to_string()))?;

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: new.name,
            email: new.email,
            phone: new.phone,
            batch: new.batch,
            branch: new.branch,
            roll_no: new.roll_no,
            password_hash,
            is_verified: false,
            role: "user".into(),
            biography: None,
            current_workplace: None,
            designation: None,
            address: None,
            profile_photo: None,
            created_at: now,
            updated_at: now,
        };

        let insert_result = sqlx::query(
            "INSERT INTO users (
                id, name, email, phone, batch, branch, roll_no,
                password_hash, is_verified, role, created_at, updated_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(user.batch)
        .bind(&user.branch)
        .bind(user.roll_no)
        .bind(&user.password_hash)
        .bind(user.is_verified)
        .bind(&user.role)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&*self.db)
        .await;

        match insert_result {
            Ok(_) => Ok(user),
            // Pre-checks race with concurrent registrations; the unique
            // indexes are the source of truth.
            Err(err) if is_unique_violation(&err) => {
                if violation_mentions(&err, "email") {
                    Err(UserStoreError::EmailTaken(user.email))
                } else {
                    Err(UserStoreError::DuplicateAlumni)
                }
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Fetch a user by id. Returns UserNotFound if missing.
    pub async fn find_by_id(&self, id: Uuid) -> UserStoreResult<User> {
        sqlx::query_as::<Sqlite, User>(
            "SELECT id, name, email, phone, batch, branch, roll_no, password_hash,
                    is_verified, role, biography, current_workplace, designation,
                    address, profile_photo, created_at, updated_at
             FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => UserStoreError::UserNotFound(id.to_string()),
            other => UserStoreError::Sqlx(other),
        })
    }

    /// Fetch a user by email. Returns UserNotFound if missing.
    pub async fn find_by_email(&self, email: &str) -> UserStoreResult<User> {
        sqlx::query_as::<Sqlite, User>(
            "SELECT id, name, email, phone, batch, branch, roll_no, password_hash,
                    is_verified, role, biography, current_workplace, designation,
                    address, profile_photo, created_at, updated_at
             FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => UserStoreError::UserNotFound(email.to_string()),
            other => UserStoreError::Sqlx(other),
        })
    }

    /// True when no user holds the given email.
    pub async fn email_available(&self, email: &str) -> UserStoreResult<bool> {
        let existing: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&*self.db)
            .await?;
        Ok(existing.is_none())
    }

    /// Apply a partial profile update. Fields left out of the payload
    /// keep their stored values.
    pub async fn update_profile(&self, id: Uuid, update: ProfileUpdate) -> UserStoreResult<User> {
        if let Some(bio) = &update.biography {
            if bio.chars().count() > MAX_BIOGRAPHY_LEN {
                return Err(UserStoreError::InvalidField {
                    field: "biography",
                    reason: format!("cannot exceed {} characters", MAX_BIOGRAPHY_LEN),
                });
            }
        }

        let mut user = self.find_by_id(id).await?;
        if let Some(value) = update.biography {
            user.biography = Some(value);
        }
        if let Some(value) = update.current_workplace {
            user.current_workplace = Some(value);
        }
        if let Some(value) = update.designation {
            user.designation = Some(value);
        }
        if let Some(value) = update.address {
            user.address = Some(value);
        }
        user.updated_at = Utc::now();

        sqlx::query(
            "UPDATE users SET biography = ?, current_workplace = ?, designation = ?,
                    address = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&user.biography)
        .bind(&user.current_workplace)
        .bind(&user.designation)
        .bind(&user.address)
        .bind(user.updated_at)
        .bind(user.id)
        .execute(&*self.db)
        .await?;

        Ok(user)
    }

    /// Change a user's password after verifying the current one.
    pub async fn change_password(
        &self,
        email: &str,
        old_password: &str,
        new_password: &str,
    ) -> UserStoreResult<()> {
        if new_password.chars().count() < MIN_PASSWORD_LEN {
            return Err(UserStoreError::InvalidField {
                field: "password",
                reason: format!("must be at least {} characters long", MIN_PASSWORD_LEN),
            });
        }

        let user = self.find_by_email(email).await?;
        let matches = password::verify_password(old_password, &user.password_hash)
            .map_err(|err| UserStoreError::Hash(err.to_string()))?;
        if !matches {
            return Err(UserStoreError::InvalidCredentials);
        }

        let password_hash = password::hash_password(new_password)
            .map_err(|err| UserStoreError::Hash(err.to_string()))?;

        sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
            .bind(&password_hash)
            .bind(Utc::now())
            .bind(user.id)
            .execute(&*self.db)
            .await?;

        Ok(())
    }

    /// Write exactly the profile-photo column. `None` clears the
    /// reference. Other user fields are not re-validated here.
    pub async fn set_profile_photo(
        &self,
        id: Uuid,
        reference: Option<&str>,
    ) -> UserStoreResult<()> {
        let result = sqlx::query("UPDATE users SET profile_photo = ?, updated_at = ? WHERE id = ?")
            .bind(reference)
            .bind(Utc::now())
            .bind(id)
            .execute(&*self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(UserStoreError::UserNotFound(id.to_string()));
        }
        Ok(())
    }

    /// Search verified members by name, branch, or batch year.
    ///
    /// An empty or absent search term lists all verified members.
    /// `exclude` drops the requesting user from the results.
    pub async fn search_verified(
        &self,
        search: Option<&str>,
        exclude: Option<Uuid>,
    ) -> UserStoreResult<Vec<UserSummary>> {
        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT id, name, branch, batch FROM users \
             WHERE is_verified = 1 AND role = 'user'",
        );

        if let Some(id) = exclude {
            builder.push(" AND id != ");
            builder.push_bind(id);
        }

        if let Some(term) = search.map(str::trim).filter(|t| !t.is_empty()) {
            let pattern = format!("%{}%", term);
            builder.push(" AND (name LIKE ");
            builder.push_bind(pattern.clone());
            builder.push(" OR branch LIKE ");
            builder.push_bind(pattern);
            if let Ok(batch) = term.parse::<i64>() {
                builder.push(" OR batch = ");
                builder.push_bind(batch);
            }
            builder.push(")");
        }

        builder.push(" ORDER BY name ASC");

        Ok(builder.build_query_as().fetch_all(&*self.db).await?)
    }

    /// Mark a user verified. Used by admin tooling and test fixtures.
    pub async fn mark_verified(&self, id: Uuid) -> UserStoreResult<()> {
        let result = sqlx::query("UPDATE users SET is_verified = 1, updated_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(&*self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(UserStoreError::UserNotFound(id.to_string()));
        }
        Ok(())
    }
}

fn validate_new_user(new: &NewUser) -> UserStoreResult<()> {
    if new.name.trim().chars().count() < MIN_NAME_LEN {
        return Err(UserStoreError::InvalidField {
            field: "name",
            reason: format!("must be at least {} characters long", MIN_NAME_LEN),
        });
    }
    if !is_plausible_email(&new.email) {
        return Err(UserStoreError::InvalidField {
            field: "email",
            reason: "must be a valid email address".into(),
        });
    }
    if new.phone.len() != PHONE_DIGITS || !new.phone.bytes().all(|b| b.is_ascii_digit()) {
        return Err(UserStoreError::InvalidField {
            field: "phone",
            reason: format!("must be a {}-digit number", PHONE_DIGITS),
        });
    }
    if new.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(UserStoreError::InvalidField {
            field: "password",
            reason: format!("must be at least {} characters long", MIN_PASSWORD_LEN),
        });
    }
    let batch_ceiling = i64::from(Utc::now().year()) + 4;
    if new.batch < BATCH_FLOOR || new.batch > batch_ceiling {
        return Err(UserStoreError::InvalidField {
            field: "batch",
            reason: format!(
                "must be a valid year between {} and {}",
                BATCH_FLOOR, batch_ceiling
            ),
        });
    }
    if new.branch.trim().is_empty() {
        return Err(UserStoreError::InvalidField {
            field: "branch",
            reason: "is required".into(),
        });
    }
    if new.roll_no <= 0 {
        return Err(UserStoreError::InvalidField {
            field: "roll_no",
            reason: "must be a positive integer".into(),
        });
    }
    Ok(())
}

/// Loose `local@host.tld` shape check, matching the `^\S+@\S+\.\S+$`
/// rule the registration form enforces.
fn is_plausible_email(email: &str) -> bool {
    if email.contains(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

/// Return true if a SQLx error indicates a unique constraint violation.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.message().to_ascii_lowercase().contains("unique")
    )
}

fn violation_mentions(err: &sqlx::Error, column: &str) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.message().contains(column)
    )
}
