//! Represents an uploaded media file and the response envelopes around it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, path::PathBuf};
use uuid::Uuid;

/// What an upload was classified as after content-type validation.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Pdf,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Image => f.write_str("image"),
            MediaKind::Pdf => f.write_str("pdf"),
        }
    }
}

/// Metadata for one stored media file. The payload itself lives on disk at
/// `file_path`, always beneath the service's media root.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Media {
    pub id: Uuid,

    /// Filename as submitted by the client. Display data only; never used to
    /// build a path.
    pub original_name: String,

    /// Server-generated `{token}_{nanos}.{format}` name.
    pub stored_name: String,

    #[serde(rename = "type")]
    pub kind: MediaKind,

    /// Normalized encoding: `jpg` for every image, `pdf` for documents.
    pub format: String,

    /// Size of the persisted (post-normalization) payload.
    pub size_bytes: u64,

    pub file_path: PathBuf,

    pub uploaded_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

/// Response body of `POST /media/upload`.
#[derive(Serialize, Debug)]
pub struct MediaUploadResponse {
    pub success: bool,
    pub message: String,
    pub media: Media,
}

/// Response body of `GET /media`.
#[derive(Serialize, Debug)]
pub struct MediaListResponse {
    pub total: usize,
    pub media: Vec<Media>,
}

/// Response body of `DELETE /media/{id}`.
#[derive(Serialize, Debug)]
pub struct MediaDeleteResponse {
    pub success: bool,
    pub message: String,
}

/// Content type served for a stored format.
pub fn content_type_for_format(format: &str) -> &'static str {
    match format {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}
