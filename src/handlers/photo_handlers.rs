//! HTTP handlers for the profile-photo lifecycle.
//! Pulls the file out of the multipart body and delegates validation,
//! transcoding, and storage to `PhotoService`.

use crate::{
    errors::AppError,
    services::photo_service::{PhotoError, PhotoService, UploadedPhoto},
};
use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use uuid::Uuid;

/// Multipart field name that carries the photo payload.
const PHOTO_FIELD: &str = "photo";

/// `POST /users/{id}/photo`
///
/// Accepts a multipart form with a single `photo` file field. The user
/// id in the path is the authenticated principal resolved upstream.
pub async fn upload_profile_photo(
    State(service): State<PhotoService>,
    Path(user_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut photo: Option<UploadedPhoto> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::new(StatusCode::BAD_REQUEST, err.to_string()))?
    {
        if field.name() != Some(PHOTO_FIELD) {
            continue;
        }
        let original_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|err| AppError::new(StatusCode::BAD_REQUEST, err.to_string()))?;
        photo = Some(UploadedPhoto {
            bytes,
            content_type,
            original_name,
        });
        break;
    }

    // An absent or empty file field is "no file", distinct from an
    // unsupported one.
    let photo = photo
        .filter(|p| !p.bytes.is_empty() && !p.original_name.is_empty())
        .ok_or(PhotoError::NoFileProvided)?;

    let reference = service.upload(user_id, photo).await?;

    Ok(Json(json!({
        "message": "Profile photo uploaded successfully",
        "photoPath": reference
    })))
}

/// `GET /users/{id}/photo` — current reference, or an explicit null.
pub async fn get_profile_photo(
    State(service): State<PhotoService>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    match service.get_reference(user_id).await? {
        Some(path) => Ok(Json(json!({ "profilePhoto": path }))),
        None => Ok(Json(json!({
            "profilePhoto": null,
            "message": "User does not have a profile photo set"
        }))),
    }
}

/// `DELETE /users/{id}/photo`
pub async fn remove_profile_photo(
    State(service): State<PhotoService>,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    service.remove(user_id).await?;
    Ok(Json(json!({ "message": "Profile photo deleted successfully" })))
}
