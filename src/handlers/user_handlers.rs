//! HTTP handlers for registration, lookup, and profile maintenance.

use crate::{
    errors::AppError,
    models::user::{NewUser, ProfileUpdate},
    services::user_store::UserStore,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct EmailCheck {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct PasswordReset {
    pub email: String,
    pub old_password: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct UserSearch {
    pub search: Option<String>,
}

/// `POST /users` — register a new member, pending verification.
pub async fn register_user(
    State(store): State<UserStore>,
    Json(payload): Json<NewUser>,
) -> Result<impl IntoResponse, AppError> {
    let user = store.register(payload).await?;
    tracing::info!("registered user {} ({})", user.id, user.email);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Registration successful, pending admin approval."
        })),
    ))
}

/// `GET /users/{id}` — public record, password hash never serialized.
pub async fn get_user(
    State(store): State<UserStore>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let user = store.find_by_id(id).await?;
    Ok(Json(user))
}

/// `GET /users?search=` — verified members by name, branch, or batch.
pub async fn search_users(
    State(store): State<UserStore>,
    Query(query): Query<UserSearch>,
) -> Result<impl IntoResponse, AppError> {
    let results = store
        .search_verified(query.search.as_deref(), None)
        .await?;
    Ok(Json(results))
}

/// `POST /users/check-email` — availability probe for the signup form.
pub async fn check_email(
    State(store): State<UserStore>,
    Json(payload): Json<EmailCheck>,
) -> Result<impl IntoResponse, AppError> {
    let available = store.email_available(&payload.email).await?;
    Ok(Json(json!({ "available": available })))
}

/// `PATCH /users/{id}/profile` — partial profile update.
pub async fn update_profile(
    State(store): State<UserStore>,
    Path(id): Path<Uuid>,
    Json(update): Json<ProfileUpdate>,
) -> Result<impl IntoResponse, AppError> {
    let user = store.update_profile(id, update).await?;
    Ok(Json(json!({
        "message": "Profile updated successfully",
        "user": user
    })))
}

/// `PATCH /users/{id}/verify` — admin approval of a pending registration.
pub async fn verify_user(
    State(store): State<UserStore>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    store.mark_verified(id).await?;
    tracing::info!("verified user {}", id);
    Ok(Json(json!({ "message": "User verified successfully" })))
}

/// `POST /users/password-reset` — change password given the current one.
pub async fn reset_password(
    State(store): State<UserStore>,
    Json(payload): Json<PasswordReset>,
) -> Result<impl IntoResponse, AppError> {
    store
        .change_password(&payload.email, &payload.old_password, &payload.new_password)
        .await?;
    Ok(Json(json!({ "message": "Password reset successful" })))
}
