//! HTTP handlers for media upload, listing, download and deletion.
//! Uploads are spooled to disk before processing; downloads stream the
//! stored payload without buffering it in memory.

use crate::{
    errors::AppError,
    middleware::{
        logging::RequestCancellation,
        request_context::{Loaded, ScopedId},
    },
    models::{
        Media,
        media::{MediaDeleteResponse, MediaListResponse, MediaUploadResponse, content_type_for_format},
    },
    services::spool::UploadedFile,
    state::AppState,
};
use axum::{
    Json,
    body::Body,
    extract::{
        State,
        multipart::{Multipart, MultipartError, MultipartRejection},
    },
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::Response,
};
use futures::StreamExt;
use std::io::ErrorKind;
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::{error, warn};

/// Multipart field carrying the upload.
const FILE_FIELD: &str = "file";

/// `POST /media/upload`
pub async fn upload_media(
    State(state): State<AppState>,
    RequestCancellation(cancel): RequestCancellation,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<MediaUploadResponse>), AppError> {
    let mut multipart =
        multipart.map_err(|err| AppError::bad_request("failed to parse form").with_source(err))?;

    let upload = receive_file_field(&state, &mut multipart).await?;
    let result = state.media.upload_media(&upload, &cancel).await;
    upload.discard().await;
    let media = result?;

    Ok((
        StatusCode::CREATED,
        Json(MediaUploadResponse {
            success: true,
            message: "File uploaded and processed successfully".into(),
            media,
        }),
    ))
}

/// Spool the first file part named `file`; other parts are skipped.
async fn receive_file_field(
    state: &AppState,
    multipart: &mut Multipart,
) -> Result<UploadedFile, AppError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let Some(filename) = field.file_name().map(str::to_string) else {
            break;
        };
        let content_type = field.content_type().map(str::to_string);
        let chunks = field.map(|chunk| chunk.map_err(multipart_error));
        return state.spool.receive(filename, content_type, chunks).await;
    }
    Err(AppError::bad_request("failed to get file from request"))
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::file_too_large("request body exceeds the configured limit").with_source(err)
    } else {
        AppError::bad_request("failed to parse form").with_source(err)
    }
}

/// `GET /media`
pub async fn list_media(
    State(state): State<AppState>,
    RequestCancellation(cancel): RequestCancellation,
) -> Result<Json<MediaListResponse>, AppError> {
    let media = state.media.list_media(&cancel).await?;
    Ok(Json(MediaListResponse {
        total: media.len(),
        media,
    }))
}

/// `GET /media/{id}`
pub async fn get_media(Loaded(media): Loaded<Media>) -> Json<Media> {
    Json(media)
}

/// `GET /media/{id}/download`
pub async fn download_media(Loaded(media): Loaded<Media>) -> Result<Response, AppError> {
    let file = match File::open(&media.file_path).await {
        Ok(file) => file,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            warn!(media_id = %media.id, "stored file missing for download");
            return Err(AppError::not_found("media file not found"));
        }
        Err(err) => {
            error!(media_id = %media.id, error = %err, "failed to open stored file");
            return Err(AppError::internal_with("failed to open file", err));
        }
    };
    let length = file
        .metadata()
        .await
        .map(|meta| meta.len())
        .unwrap_or(media.size_bytes);

    let stream = ReaderStream::new(file);
    let mut response = Response::new(Body::from_stream(stream));
    *response.status_mut() = StatusCode::OK;
    set_download_headers(response.headers_mut(), &media, length);
    Ok(response)
}

fn set_download_headers(headers: &mut HeaderMap, media: &Media, length: u64) {
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(content_type_for_format(&media.format)),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));

    let disposition = format!(
        "attachment; filename=\"{}\"",
        sanitize_filename(&media.original_name)
    );
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&disposition)
            .unwrap_or_else(|_| HeaderValue::from_static("attachment")),
    );
}

/// Strip characters that would break out of a quoted header parameter.
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_control() && *c != '"' && *c != '\\')
        .collect()
}

/// `DELETE /media/{id}`
pub async fn delete_media(
    State(state): State<AppState>,
    RequestCancellation(cancel): RequestCancellation,
    ScopedId(id): ScopedId<Media>,
) -> Result<Json<MediaDeleteResponse>, AppError> {
    state.media.delete_media(id, &cancel).await?;
    Ok(Json(MediaDeleteResponse {
        success: true,
        message: "Media deleted successfully".into(),
    }))
}
