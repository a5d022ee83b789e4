use crate::services::photo_service::PhotoError;
use crate::services::user_store::UserStoreError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;

/// A lightweight wrapper for general errors that keeps the message local.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    /// Create a new AppError with a specific status and message.
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            message: msg.into(),
        }
    }

    /// Shortcut for a 500 Internal Server Error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// Shortcut for 404 Not Found
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "status": self.status.as_u16()
        }));

        (self.status, body).into_response()
    }
}

impl From<UserStoreError> for AppError {
    fn from(err: UserStoreError) -> Self {
        match &err {
            UserStoreError::UserNotFound(_) => AppError::not_found(err.to_string()),
            UserStoreError::EmailTaken(_)
            | UserStoreError::DuplicateAlumni
            | UserStoreError::InvalidCredentials
            | UserStoreError::InvalidField { .. } => {
                AppError::new(StatusCode::BAD_REQUEST, err.to_string())
            }
            UserStoreError::Hash(_) | UserStoreError::Sqlx(_) => {
                tracing::error!("user store failure: {}", err);
                AppError::internal("Server error")
            }
        }
    }
}

impl From<PhotoError> for AppError {
    fn from(err: PhotoError) -> Self {
        match err {
            PhotoError::Store(inner) => AppError::from(inner),
            PhotoError::NoFileProvided => AppError::new(
                StatusCode::BAD_REQUEST,
                "No file selected. Please choose a file to upload.",
            ),
            PhotoError::UnsupportedFileType(_) | PhotoError::NoPhotoToDelete => {
                AppError::new(StatusCode::BAD_REQUEST, err.to_string())
            }
            PhotoError::Transcode(_) | PhotoError::Io(_) => {
                tracing::error!("photo pipeline failure: {}", err);
                AppError::internal("Server error")
            }
        }
    }
}
