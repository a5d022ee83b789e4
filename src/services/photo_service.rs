//! src/services/photo_service.rs
//!
//! PhotoService — profile-photo ingestion and storage.
//!
//! Orchestrates validate -> transcode -> persist -> supersede-previous ->
//! record-reference for a single user's profile photo. Photo files live
//! under `{storage_root}/uploads/profilephotos/` and the user record
//! holds a path relative to the storage root (or nothing at all).
//!
//! Filesystem state and the stored reference are deliberately not kept
//! in a transaction: deleting a superseded photo is best-effort, and two
//! racing uploads for the same user may orphan a file. Losing an orphan
//! is preferable to blocking an upload.

use crate::services::user_store::{UserStore, UserStoreError};
use bytes::Bytes;
use chrono::Utc;
use image::{codecs::jpeg::JpegEncoder, imageops::FilterType};
use std::{
    io,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

/// Directory for profile photos, relative to the storage root. Stored
/// references carry this prefix.
pub const PHOTO_DIR: &str = "uploads/profilephotos";

/// Side length of the transcoded output box. Smaller sources are never
/// enlarged; the output then stays at the source size rather than being
/// padded out to the box.
const TARGET_SIZE: u32 = 350;

/// JPEG quality on the encoder's 0-100 scale.
const JPEG_QUALITY: u8 = 50;

const ALLOWED_MIME: [&str; 3] = ["image/jpeg", "image/jpg", "image/png"];
const ALLOWED_EXT: [&str; 3] = ["jpeg", "jpg", "png"];

/// One uploaded file, as handed over by the transport layer. Lives only
/// for the duration of the request.
#[derive(Debug)]
pub struct UploadedPhoto {
    pub bytes: Bytes,
    /// MIME type declared by the client.
    pub content_type: String,
    /// Client-side filename, untrusted. Sanitized before use.
    pub original_name: String,
}

#[derive(Debug, Error)]
pub enum PhotoError {
    #[error("no file selected")]
    NoFileProvided,
    #[error("unsupported file type: {0}")]
    UnsupportedFileType(String),
    #[error("no profile photo to delete")]
    NoPhotoToDelete,
    #[error(transparent)]
    Store(#[from] UserStoreError),
    #[error("could not process image: {0}")]
    Transcode(#[from] image::ImageError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type PhotoResult<T> = Result<T, PhotoError>;

/// Manages the photo slot of each user record: `Empty -> Present` on
/// upload, `Present -> Present` on supersede, `Present -> Empty` on
/// remove.
#[derive(Clone)]
pub struct PhotoService {
    pub users: UserStore,

    /// Base directory that stored references resolve against.
    pub storage_root: PathBuf,
}

impl PhotoService {
    pub fn new(users: UserStore, storage_root: impl Into<PathBuf>) -> Self {
        Self {
            users,
            storage_root: storage_root.into(),
        }
    }

    fn asset_path(&self, reference: &str) -> PathBuf {
        self.storage_root.join(reference)
    }

    /// Store a new profile photo for the user and return the reference
    /// to it. Supersedes (and best-effort deletes) any previous photo.
    pub async fn upload(&self, user_id: Uuid, photo: UploadedPhoto) -> PhotoResult<String> {
        self.upload_at(user_id, photo, Utc::now().timestamp_millis())
            .await
    }

    async fn upload_at(
        &self,
        user_id: Uuid,
        photo: UploadedPhoto,
        timestamp_millis: i64,
    ) -> PhotoResult<String> {
        validate_upload(&photo)?;
        let user = self.users.find_by_id(user_id).await?;

        let reference = photo_reference(
            &user_id.to_string(),
            timestamp_millis,
            &photo.original_name,
        );

        // Best-effort removal of the superseded asset. A failure here
        // must not abort the upload; the orphan is only logged.
        if let Some(old) = user.profile_photo.as_deref() {
            let old_path = self.asset_path(old);
            match fs::remove_file(&old_path).await {
                Ok(_) => debug!("deleted superseded profile photo {}", old_path.display()),
                Err(err) => warn!(
                    "could not delete superseded profile photo {}: {}",
                    old_path.display(),
                    err
                ),
            }
        }

        let jpeg = transcode_to_jpeg(&photo.bytes)?;

        let target = self.asset_path(&reference);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&target, &jpeg).await?;

        self.users
            .set_profile_photo(user_id, Some(&reference))
            .await?;

        debug!("stored profile photo for {} at {}", user_id, reference);
        Ok(reference)
    }

    /// Delete the user's current photo and clear the reference.
    ///
    /// Unlike the supersede path in `upload`, a delete failure here is
    /// fatal and the stored reference is left untouched; there is no
    /// replacement asset to fall back on.
    pub async fn remove(&self, user_id: Uuid) -> PhotoResult<()> {
        let user = self.users.find_by_id(user_id).await?;
        let reference = user.profile_photo.ok_or(PhotoError::NoPhotoToDelete)?;

        fs::remove_file(self.asset_path(&reference)).await?;

        self.users.set_profile_photo(user_id, None).await?;
        debug!("removed profile photo for {}", user_id);
        Ok(())
    }

    /// Current photo reference for the user. `Ok(None)` means the user
    /// exists but has no photo set.
    pub async fn get_reference(&self, user_id: Uuid) -> PhotoResult<Option<String>> {
        Ok(self.users.find_by_id(user_id).await?.profile_photo)
    }
}

/// Accept only files whose declared MIME type *and* filename extension
/// both sit on the JPEG/PNG allow-list. Pure predicate, no I/O.
pub fn validate_upload(photo: &UploadedPhoto) -> PhotoResult<()> {
    let mime_ok = ALLOWED_MIME
        .iter()
        .any(|mime| photo.content_type.eq_ignore_ascii_case(mime));
    let extension = Path::new(&photo.original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());
    let ext_ok = extension
        .as_deref()
        .is_some_and(|ext| ALLOWED_EXT.contains(&ext));

    if mime_ok && ext_ok {
        Ok(())
    } else {
        Err(PhotoError::UnsupportedFileType(format!(
            "`{}` declared as {}",
            photo.original_name, photo.content_type
        )))
    }
}

/// Strip directory components from an uploaded filename and collapse
/// every whitespace run to a single underscore. Case is preserved.
pub fn sanitize_file_name(original: &str) -> String {
    let base = original
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(original);

    let mut sanitized = String::with_capacity(base.len());
    let mut in_whitespace = false;
    for ch in base.chars() {
        if ch.is_whitespace() {
            if !in_whitespace {
                sanitized.push('_');
            }
            in_whitespace = true;
        } else {
            sanitized.push(ch);
            in_whitespace = false;
        }
    }
    sanitized
}

/// Build the storage reference for one upload:
/// `uploads/profilephotos/{userId}-{timestampMillis}-{sanitizedName}`.
///
/// The extension is whatever the original name carried, even though the
/// stored bytes are always JPEG.
pub fn photo_reference(user_id: &str, timestamp_millis: i64, original_name: &str) -> String {
    format!(
        "{}/{}-{}-{}",
        PHOTO_DIR,
        user_id,
        timestamp_millis,
        sanitize_file_name(original_name)
    )
}

/// Normalize an uploaded image to a JPEG at most `TARGET_SIZE` square.
///
/// Cover fit: the source is scaled to fully cover the target box and
/// the overflow is center-cropped. The box is first clamped to the
/// source dimensions so small sources are never upscaled. Encoded at
/// quality 50; any decode or encode failure is fatal to the request.
pub fn transcode_to_jpeg(bytes: &[u8]) -> Result<Vec<u8>, image::ImageError> {
    let source = image::load_from_memory(bytes)?;

    let target_w = TARGET_SIZE.min(source.width());
    let target_h = TARGET_SIZE.min(source.height());
    let resized = if source.width() == target_w && source.height() == target_h {
        source
    } else {
        source.resize_to_fill(target_w, target_h, FilterType::Lanczos3)
    };

    // JPEG has no alpha channel; flatten before encoding.
    let rgb = resized.to_rgb8();
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY).encode_image(&rgb)?;
    Ok(out)
}
