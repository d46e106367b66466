//! Avatar storage on the local filesystem.
//!
//! Files live under `{UPLOAD_FOLDER}/profile_pictures/` with random names.
//! The stored path is relative to the upload folder; the server exposes the
//! folder under `/uploads`.

use std::path::{Component, Path, PathBuf};

use axum::http::StatusCode;
use thiserror::Error;
use tracing::instrument;
use uuid::Uuid;

/// Subdirectory of the upload folder holding avatars.
pub const AVATAR_DIR: &str = "profile_pictures";

/// Largest accepted avatar (5 MiB).
pub const MAX_AVATAR_BYTES: usize = 5 * 1024 * 1024;

/// Accepted extensions, in the order shown to clients.
pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp"];

/// Shown by the frontend when a user has no avatar.
pub const DEFAULT_AVATAR: &str = "/images/default-avatar.png";

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("No file uploaded")]
    NoFile,

    #[error("No file selected")]
    NoFileSelected,

    #[error("File type not allowed. Allowed types: png, jpg, jpeg, gif, webp")]
    TypeNotAllowed,

    #[error("File size too large. Maximum size: 5.0MB")]
    TooLarge,

    #[error("Invalid image file")]
    InvalidImage,

    #[error("Invalid multipart body: {0}")]
    Multipart(String),

    #[error("storage error: {0}")]
    Io(#[from] std::io::Error),
}

impl UploadError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<axum::extract::multipart::MultipartError> for UploadError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::TooLarge
        } else {
            Self::Multipart(err.body_text())
        }
    }
}

/// Lowercased extension of an uploaded file name, if it is one we accept.
///
/// # Errors
///
/// Returns `NoFileSelected` for an empty name and `TypeNotAllowed` otherwise.
pub fn allowed_extension(filename: &str) -> Result<&'static str, UploadError> {
    let filename = filename.trim();
    if filename.is_empty() {
        return Err(UploadError::NoFileSelected);
    }
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .ok_or(UploadError::TypeNotAllowed)?;
    ALLOWED_EXTENSIONS
        .iter()
        .copied()
        .find(|allowed| *allowed == ext)
        .ok_or(UploadError::TypeNotAllowed)
}

/// Check that the content looks like the image family its extension claims.
#[must_use]
pub fn magic_bytes_match(ext: &str, bytes: &[u8]) -> bool {
    match ext {
        "png" => bytes.starts_with(b"\x89PNG\r\n\x1a\n"),
        "jpg" | "jpeg" => bytes.starts_with(&[0xFF, 0xD8, 0xFF]),
        "gif" => bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a"),
        "webp" => bytes.starts_with(b"RIFF") && bytes.get(8..12) == Some(b"WEBP".as_slice()),
        _ => false,
    }
}

/// Validate an avatar upload and return the extension to store it under.
///
/// # Errors
///
/// Returns the first failed check.
pub fn validate_avatar(filename: &str, bytes: &[u8]) -> Result<&'static str, UploadError> {
    let ext = allowed_extension(filename)?;
    if bytes.len() > MAX_AVATAR_BYTES {
        return Err(UploadError::TooLarge);
    }
    if !magic_bytes_match(ext, bytes) {
        return Err(UploadError::InvalidImage);
    }
    Ok(ext)
}

/// Public URL for a stored avatar. External (OAuth) avatars pass through.
#[must_use]
pub fn public_url(base_url: &str, stored: &str) -> String {
    if stored.starts_with("http://") || stored.starts_with("https://") {
        stored.to_owned()
    } else {
        format!("{base_url}/uploads/{stored}")
    }
}

/// Avatar files under the upload folder.
#[derive(Debug, Clone)]
pub struct AvatarStore {
    root: PathBuf,
}

impl AvatarStore {
    #[must_use]
    pub const fn new(root: PathBuf) -> Self {
        Self { root }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write an already validated avatar. Returns the path relative to the
    /// upload folder.
    ///
    /// # Errors
    ///
    /// Returns `UploadError::Io` if the directory or file cannot be written.
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn save(&self, ext: &str, bytes: &[u8]) -> Result<String, UploadError> {
        let dir = self.root.join(AVATAR_DIR);
        tokio::fs::create_dir_all(&dir).await?;

        let name = format!("{}.{ext}", Uuid::new_v4());
        tokio::fs::write(dir.join(&name), bytes).await?;

        Ok(format!("{AVATAR_DIR}/{name}"))
    }

    /// Delete a previously stored avatar. External URLs and paths outside
    /// the avatar directory are ignored, as is a file that is already gone.
    ///
    /// # Errors
    ///
    /// Returns `UploadError::Io` for any other filesystem error.
    pub async fn remove(&self, stored: &str) -> Result<(), UploadError> {
        let Some(path) = self.local_path(stored) else {
            return Ok(());
        };
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn local_path(&self, stored: &str) -> Option<PathBuf> {
        let relative = Path::new(stored);
        let mut components = relative.components();
        if components.next() != Some(Component::Normal(AVATAR_DIR.as_ref())) {
            return None;
        }
        if !components.all(|c| matches!(c, Component::Normal(_))) {
            return None;
        }
        Some(self.root.join(relative))
    }
}
