//! Fixtures shared by the unit and router tests.

use crate::{
    services::spool::UploadedFile,
    state::AppState,
    store::{InMemoryMediaStore, InMemoryUserStore},
};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use std::{io::Cursor, path::Path, sync::Arc};

pub fn encode_image(img: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buffer = Vec::new();
    img.write_to(&mut Cursor::new(&mut buffer), format)
        .expect("encode test image");
    buffer
}

/// A noisy RGB image so encoders cannot collapse it to a handful of bytes.
fn patterned(width: u32, height: u32) -> DynamicImage {
    let img = RgbImage::from_fn(width, height, |x, y| {
        let v = x.wrapping_mul(31) ^ y.wrapping_mul(17);
        Rgb([(v % 251) as u8, (x * 7 % 253) as u8, (y * 13 % 241) as u8])
    });
    DynamicImage::ImageRgb8(img)
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    encode_image(&patterned(width, height), ImageFormat::Png)
}

pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    encode_image(&patterned(width, height), ImageFormat::Jpeg)
}

pub fn gif_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba([200, 10, 10, 255]));
    encode_image(&DynamicImage::ImageRgba8(img), ImageFormat::Gif)
}

/// Write `data` to a staging file and describe it the way the upload
/// handler would.
pub fn staged_upload(
    dir: &Path,
    filename: &str,
    content_type: Option<&str>,
    data: &[u8],
) -> UploadedFile {
    let path = dir.join(format!(".tmp-{}", uuid::Uuid::new_v4()));
    std::fs::write(&path, data).expect("write staged upload");
    UploadedFile::new(
        filename.to_string(),
        content_type.map(str::to_string),
        data.len() as u64,
        path,
    )
}

/// Regular files directly under `dir`, ignoring staging files.
pub fn stored_files(dir: &Path) -> Vec<std::path::PathBuf> {
    let mut files: Vec<_> = std::fs::read_dir(dir)
        .expect("read media dir")
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            !path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(".tmp-"))
        })
        .collect();
    files.sort();
    files
}

pub struct TestApp {
    pub state: AppState,
    pub dir: tempfile::TempDir,
}

impl TestApp {
    pub fn media_dir(&self) -> std::path::PathBuf {
        self.dir.path().join("uploads")
    }
}

pub async fn test_app() -> TestApp {
    let dir = tempfile::tempdir().expect("tempdir");
    let state = AppState::new(
        Arc::new(InMemoryUserStore::new()),
        Arc::new(InMemoryMediaStore::new()),
        dir.path().join("uploads"),
        dir.path().join("incoming"),
    )
    .await
    .expect("build state");
    TestApp { state, dir }
}

pub const BOUNDARY: &str = "X-USER-MEDIA-BOUNDARY";

/// A `multipart/form-data` body with a single file part.
pub fn multipart_body(
    field: &str,
    filename: &str,
    content_type: Option<&str>,
    data: &[u8],
) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n")
            .as_bytes(),
    );
    if let Some(ct) = content_type {
        body.extend_from_slice(format!("Content-Type: {ct}\r\n").as_bytes());
    }
    body.extend_from_slice(b"\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}
