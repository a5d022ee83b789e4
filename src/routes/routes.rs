//! Defines routes for the alumni-association API.
//!
//! ## Structure
//! - **Member endpoints**
//!   - `POST  /users`                 — register a new member
//!   - `GET   /users?search=`         — search verified members
//!   - `POST  /users/check-email`     — email availability for the signup form
//!   - `POST  /users/password-reset`  — change password given the current one
//!   - `GET   /users/{id}`            — fetch one member record
//!   - `PATCH /users/{id}/profile`    — partial profile update
//!   - `PATCH /users/{id}/verify`     — admin approval of a registration
//!
//! - **Profile-photo endpoints**
//!   - `POST   /users/{id}/photo` — multipart upload (field `photo`)
//!   - `GET    /users/{id}/photo` — current reference, or explicit null
//!   - `DELETE /users/{id}/photo` — remove the current photo
//!
//! The `{id}` segment is the authenticated principal; token verification
//! happens upstream of this service.

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        photo_handlers::{get_profile_photo, remove_profile_photo, upload_profile_photo},
        user_handlers::{
            check_email, get_user, register_user, reset_password, search_users, update_profile,
            verify_user,
        },
    },
    services::{photo_service::PhotoService, user_store::UserStore},
};
use axum::{
    Router,
    extract::FromRef,
    routing::{get, patch, post},
};

/// Shared state handed to every handler. Each handler extracts only the
/// slice it needs via `FromRef`.
#[derive(Clone)]
pub struct AppState {
    pub users: UserStore,
    pub photos: PhotoService,
}

impl FromRef<AppState> for UserStore {
    fn from_ref(state: &AppState) -> Self {
        state.users.clone()
    }
}

impl FromRef<AppState> for PhotoService {
    fn from_ref(state: &AppState) -> Self {
        state.photos.clone()
    }
}

/// Build and return the router for all API routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // member routes
        .route("/users", post(register_user).get(search_users))
        .route("/users/check-email", post(check_email))
        .route("/users/password-reset", post(reset_password))
        .route("/users/{id}", get(get_user))
        .route("/users/{id}/profile", patch(update_profile))
        .route("/users/{id}/verify", patch(verify_user))
        // profile-photo routes
        .route(
            "/users/{id}/photo",
            post(upload_profile_photo)
                .get(get_profile_photo)
                .delete(remove_profile_photo),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::user_store::test_support::{memory_store, sample_user};
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use image::{ImageFormat, RgbImage};
    use serde_json::{Value, json};
    use std::io::Cursor;
    use tempfile::TempDir;
    use tower::ServiceExt;
    use uuid::Uuid;

    const BOUNDARY: &str = "XPHOTOBOUNDARYX";

    async fn test_app() -> (Router, Uuid, TempDir) {
        let users = memory_store().await;
        let user = users
            .register(sample_user("router@example.com", 77))
            .await
            .unwrap();
        let root = TempDir::new().unwrap();
        let photos = PhotoService::new(users.clone(), root.path());
        let app = routes().with_state(AppState { users, photos });
        (app, user.id, root)
    }

    fn multipart_body(field: &str, file_name: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn png_bytes() -> Vec<u8> {
        let img = RgbImage::from_pixel(400, 400, image::Rgb([10, 20, 30]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn healthz_responds_ok() {
        let (app, _, _root) = test_app().await;
        let response = app
            .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn photo_round_trip_over_http() {
        let (app, user_id, _root) = test_app().await;

        // No photo yet: explicit null.
        let response = app
            .clone()
            .oneshot(
                Request::get(format!("/users/{user_id}/photo"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(json_body(response).await["profilePhoto"].is_null());

        // Upload a PNG whose name needs sanitizing.
        let body = multipart_body("photo", "avatar one.png", "image/png", &png_bytes());
        let response = app
            .clone()
            .oneshot(
                Request::post(format!("/users/{user_id}/photo"))
                    .header(
                        header::CONTENT_TYPE,
                        format!("multipart/form-data; boundary={BOUNDARY}"),
                    )
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let uploaded = json_body(response).await;
        let path = uploaded["photoPath"].as_str().unwrap().to_string();
        assert!(path.starts_with("uploads/profilephotos/"));
        assert!(path.ends_with("avatar_one.png"));

        // Reference now visible.
        let response = app
            .clone()
            .oneshot(
                Request::get(format!("/users/{user_id}/photo"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(json_body(response).await["profilePhoto"], json!(path));

        // Remove, then removing again reports nothing to delete.
        let response = app
            .clone()
            .oneshot(
                Request::delete(format!("/users/{user_id}/photo"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(
                Request::delete(format!("/users/{user_id}/photo"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn upload_without_file_field_is_rejected() {
        let (app, user_id, _root) = test_app().await;

        let body = multipart_body("attachment", "notes.png", "image/png", b"irrelevant");
        let response = app
            .oneshot(
                Request::post(format!("/users/{user_id}/photo"))
                    .header(
                        header::CONTENT_TYPE,
                        format!("multipart/form-data; boundary={BOUNDARY}"),
                    )
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn upload_of_unsupported_type_is_rejected() {
        let (app, user_id, _root) = test_app().await;

        let body = multipart_body("photo", "clip.gif", "image/gif", b"GIF89a");
        let response = app
            .oneshot(
                Request::post(format!("/users/{user_id}/photo"))
                    .header(
                        header::CONTENT_TYPE,
                        format!("multipart/form-data; boundary={BOUNDARY}"),
                    )
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn photo_routes_report_unknown_users() {
        let (app, _, _root) = test_app().await;
        let unknown = Uuid::new_v4();

        let response = app
            .oneshot(
                Request::get(format!("/users/{unknown}/photo"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn register_then_check_email() {
        let (app, _, _root) = test_app().await;

        let payload = json!({
            "name": "Meera Nair",
            "email": "meera@example.com",
            "phone": "9998887776",
            "batch": 2016,
            "branch": "ME",
            "roll_no": 512,
            "password": "longenoughpw"
        });
        let response = app
            .clone()
            .oneshot(
                Request::post("/users")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(payload.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app
            .oneshot(
                Request::post("/users/check-email")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        json!({ "email": "meera@example.com" }).to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(json_body(response).await["available"], json!(false));
    }
}
