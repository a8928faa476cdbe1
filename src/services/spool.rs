//! Staging area for incoming multipart file parts.
//!
//! The upload handler streams the `file` part to `{spool_dir}/.tmp-{uuid}`
//! while counting bytes; the media pipeline then opens the staged file like
//! any other source. Staged files are always discarded afterwards.

use crate::errors::AppError;
use bytes::Bytes;
use futures::{Stream, StreamExt, pin_mut};
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Clone, Debug)]
pub struct UploadSpool {
    dir: PathBuf,
}

impl UploadSpool {
    /// Create the spool, making `dir` if it does not exist yet.
    pub async fn new(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Drain `stream` into a fresh staging file.
    ///
    /// Stream errors are returned as-is. The staging file belongs to the
    /// returned [`UploadedFile`] from creation on, so an error or a dropped
    /// future removes the partial file.
    pub async fn receive<S>(
        &self,
        filename: String,
        content_type: Option<String>,
        stream: S,
    ) -> Result<UploadedFile, AppError>
    where
        S: Stream<Item = Result<Bytes, AppError>>,
    {
        let tmp_path = self.dir.join(format!(".tmp-{}", Uuid::new_v4()));
        let mut staged = UploadedFile::new(filename, content_type, 0, tmp_path);
        let mut file = File::create(&staged.path)
            .await
            .map_err(|err| AppError::internal_with("failed to stage upload", err))?;

        pin_mut!(stream);
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            staged.size += chunk.len() as u64;
            file.write_all(&chunk)
                .await
                .map_err(|err| AppError::internal_with("failed to stage upload", err))?;
        }
        file.flush()
            .await
            .map_err(|err| AppError::internal_with("failed to stage upload", err))?;

        debug!(path = %staged.path.display(), size = staged.size, "staged upload");
        Ok(staged)
    }
}

/// A received file part: client metadata plus the staged payload.
///
/// The staged file is removed by [`UploadedFile::discard`], or on drop if
/// it was never discarded.
#[derive(Debug)]
pub struct UploadedFile {
    /// Client-supplied filename, untrusted.
    pub filename: String,
    /// Content type declared on the part, if any.
    pub content_type: Option<String>,
    /// Size of the received payload in bytes.
    pub size: u64,
    path: PathBuf,
    discarded: bool,
}

impl UploadedFile {
    pub fn new(
        filename: String,
        content_type: Option<String>,
        size: u64,
        path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            filename,
            content_type,
            size,
            path: path.into(),
            discarded: false,
        }
    }

    pub async fn open(&self) -> io::Result<File> {
        File::open(&self.path).await
    }

    /// Remove the staged payload. A file that is already gone is fine.
    pub async fn discard(mut self) {
        self.discarded = true;
        if let Err(err) = fs::remove_file(&self.path).await {
            log_discard_failure(&self.path, err);
        }
    }
}

impl Drop for UploadedFile {
    fn drop(&mut self) {
        if self.discarded {
            return;
        }
        // Drop cannot await.
        if let Err(err) = std::fs::remove_file(&self.path) {
            log_discard_failure(&self.path, err);
        }
    }
}

fn log_discard_failure(path: &Path, err: io::Error) {
    if err.kind() != ErrorKind::NotFound {
        warn!(path = %path.display(), error = %err, "failed to discard staged upload");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind as AppErrorKind;
    use futures::stream;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn receive_counts_and_stages_all_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let spool = UploadSpool::new(dir.path().join("incoming")).await.unwrap();

        let chunks = vec![
            Ok(Bytes::from_static(b"hello ")),
            Ok(Bytes::from_static(b"world")),
        ];
        let upload = spool
            .receive("greeting.txt".into(), Some("text/plain".into()), stream::iter(chunks))
            .await
            .unwrap();

        assert_eq!(upload.size, 11);
        assert_eq!(upload.filename, "greeting.txt");

        let mut contents = String::new();
        upload
            .open()
            .await
            .unwrap()
            .read_to_string(&mut contents)
            .await
            .unwrap();
        assert_eq!(contents, "hello world");

        upload.discard().await;
        assert_eq!(std::fs::read_dir(spool.dir()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn stream_error_removes_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let spool = UploadSpool::new(dir.path()).await.unwrap();

        let chunks = vec![
            Ok(Bytes::from_static(b"partial")),
            Err(AppError::file_too_large("request body too large")),
        ];
        let err = spool
            .receive("big.bin".into(), None, stream::iter(chunks))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), AppErrorKind::FileTooLarge);
        assert_eq!(std::fs::read_dir(spool.dir()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn discard_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let upload = UploadedFile::new("x".into(), None, 0, dir.path().join("missing"));
        upload.discard().await;
    }

    #[tokio::test]
    async fn dropped_upload_removes_staged_file() {
        let dir = tempfile::tempdir().unwrap();
        let spool = UploadSpool::new(dir.path()).await.unwrap();

        let upload = spool
            .receive("a.bin".into(), None, stream::iter(vec![Ok(Bytes::from_static(b"abc"))]))
            .await
            .unwrap();
        assert_eq!(std::fs::read_dir(spool.dir()).unwrap().count(), 1);

        drop(upload);
        assert_eq!(std::fs::read_dir(spool.dir()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn abandoned_receive_removes_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let spool = UploadSpool::new(dir.path()).await.unwrap();

        let stalled = stream::iter(vec![Ok(Bytes::from_static(b"partial"))]).chain(stream::pending());
        let outcome = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            spool.receive("slow.bin".into(), None, stalled),
        )
        .await;

        assert!(outcome.is_err());
        assert_eq!(std::fs::read_dir(spool.dir()).unwrap().count(), 0);
    }
}
