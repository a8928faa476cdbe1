//! Upload pipeline and lifecycle for stored media.
//!
//! Uploads are validated (size, content type), images are normalized to
//! JPEG, and the resulting bytes are written under the media root with a
//! generated name before the metadata record is registered with the store.
//! Payloads never leave the media root and client filenames never reach a
//! path.

use super::{
    ensure_active,
    media_processing::{
        NORMALIZED_IMAGE_FORMAT, PDF_FORMAT, classify_content_type, normalize_image,
        resolve_content_type,
    },
    spool::UploadedFile,
};
use crate::{
    errors::AppError,
    models::{Media, MediaKind},
    store::MediaStore,
};
use anyhow::Context;
use bytes::Bytes;
use chrono::Utc;
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::{fs, io::AsyncReadExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Largest accepted upload: 200 MiB.
pub const MAX_UPLOAD_BYTES: u64 = 200 * 1024 * 1024;

const SUPPORTED_TYPES_LABEL: &str = "JPEG, PNG, WebP, GIF, PDF";

#[derive(Clone)]
pub struct MediaService {
    store: Arc<dyn MediaStore>,

    /// Root directory on disk where media payloads are stored.
    root: PathBuf,
}

impl MediaService {
    /// Create the service, making the media root if it does not exist yet.
    pub async fn new(store: Arc<dyn MediaStore>, root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await?;
        Ok(Self { store, root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Validate, normalize, persist and register an uploaded file.
    pub async fn upload_media(
        &self,
        upload: &UploadedFile,
        cancel: &CancellationToken,
    ) -> Result<Media, AppError> {
        ensure_active(cancel)?;

        if upload.size > MAX_UPLOAD_BYTES {
            return Err(AppError::file_too_large(format!(
                "file size exceeds maximum limit of 200 MB (file size: {:.2} MB)",
                upload.size as f64 / (1024.0 * 1024.0)
            )));
        }

        let mut source = upload.open().await.map_err(|err| {
            error!(error = %err, "failed to open uploaded file");
            AppError::internal_with("failed to open file", err)
        })?;

        let content_type = resolve_content_type(upload.content_type.as_deref(), &upload.filename);
        let kind = classify_content_type(&content_type).ok_or_else(|| {
            let shown = if content_type.is_empty() {
                "unknown"
            } else {
                content_type.as_str()
            };
            AppError::unsupported_type(format!(
                "unsupported file type: {shown}. Supported types: {SUPPORTED_TYPES_LABEL}"
            ))
        })?;

        let mut raw = Vec::with_capacity(upload.size as usize);
        source.read_to_end(&mut raw).await.map_err(|err| {
            error!(error = %err, "failed to read uploaded file");
            AppError::internal_with("failed to read file", err)
        })?;

        let (payload, format, dimensions) = match kind {
            MediaKind::Image => {
                let decode_type = content_type;
                let normalized = tokio::task::spawn_blocking(move || {
                    normalize_image(&raw, &decode_type).map_err(|err| {
                        error!(error = %err, content_type = %decode_type, "failed to optimize image");
                        AppError::internal_with("failed to optimize image", err)
                    })
                })
                .await
                .context("image normalization task did not complete")
                .and_then(|outcome| outcome.map_err(anyhow::Error::new))
                .map_err(AppError::from)?;
                (
                    normalized.bytes,
                    NORMALIZED_IMAGE_FORMAT,
                    Some((normalized.width, normalized.height)),
                )
            }
            MediaKind::Pdf => (Bytes::from(raw), PDF_FORMAT, None),
        };

        let stored_name = generate_stored_name(format);
        let file_path = self.root.join(&stored_name);
        fs::write(&file_path, &payload).await.map_err(|err| {
            error!(error = %err, path = %file_path.display(), "failed to save file");
            AppError::internal_with("failed to save file", err)
        })?;

        let (width, height) = match dimensions {
            Some((w, h)) if w > 0 && h > 0 => (Some(w), Some(h)),
            _ => (None, None),
        };

        let media = Media {
            id: Uuid::new_v4(),
            original_name: upload.filename.clone(),
            stored_name,
            kind,
            format: format.to_string(),
            size_bytes: payload.len() as u64,
            file_path,
            uploaded_at: Utc::now(),
            width,
            height,
        };

        if let Err(err) = self.store.save(media.clone()).await {
            // The written payload is not rolled back.
            error!(
                error = %err,
                path = %media.file_path.display(),
                "failed to register media; stored file left in place"
            );
            return Err(AppError::internal_with(
                "failed to save media to repository",
                err,
            ));
        }

        info!(
            media_id = %media.id,
            kind = %media.kind,
            size_bytes = media.size_bytes,
            "media stored"
        );
        Ok(media)
    }

    pub async fn get_media(&self, id: Uuid, cancel: &CancellationToken) -> Result<Media, AppError> {
        ensure_active(cancel)?;
        self.store.get(id).await.inspect_err(|err| {
            debug!(media_id = %id, error = %err, "media lookup failed");
        })
    }

    pub async fn list_media(&self, cancel: &CancellationToken) -> Result<Vec<Media>, AppError> {
        ensure_active(cancel)?;
        self.store.list().await.map_err(|err| {
            error!(error = %err, "failed to list media");
            AppError::internal_with("failed to retrieve media", err)
        })
    }

    /// Remove the stored payload, then the metadata record.
    ///
    /// A payload that is already gone is not an error; any other removal
    /// failure, or a failure to drop the record afterwards, is Internal.
    pub async fn delete_media(&self, id: Uuid, cancel: &CancellationToken) -> Result<(), AppError> {
        ensure_active(cancel)?;
        let media = self.store.get(id).await?;

        match fs::remove_file(&media.file_path).await {
            Ok(()) => debug!("removed physical file {}", media.file_path.display()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                warn!(media_id = %id, "file {} already missing", media.file_path.display());
            }
            Err(err) => {
                error!(media_id = %id, error = %err, "failed to delete file");
                return Err(AppError::internal_with("failed to delete file", err));
            }
        }

        self.store.delete(id).await.map_err(|err| {
            error!(media_id = %id, error = %err, "payload removed but record deletion failed");
            AppError::internal_with("failed to delete media record", err)
        })?;

        info!(media_id = %id, "media deleted");
        Ok(())
    }
}

/// `{uuid}_{unix-nanos}.{format}`, unique with overwhelming probability.
fn generate_stored_name(format: &str) -> String {
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    format!("{}_{}.{}", Uuid::new_v4(), nanos, format)
}
