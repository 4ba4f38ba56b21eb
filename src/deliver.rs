//! Delivery streamer: emits a file or an on-the-fly zip as the response body
//!
//! Memory use is bounded by I/O buffer sizes in both modes. Single files go
//! out through a [`ReaderStream`]; archives are built incrementally by an
//! async zip writer feeding one end of a bounded duplex pipe whose other end
//! is the response body. Neither mode materializes the full payload in
//! memory or on disk.
//!
//! Cleanup rides the body: the job's [`WorkspaceGuard`] is owned by the
//! stream (or the archive task), so stream completion, a mid-stream error,
//! and a client disconnect all release the workspace through the same drop.

use async_zip::tokio::write::ZipFileWriter;
use async_zip::{Compression, ZipEntryBuilder};
use axum::body::Body;
use axum::http::{header, HeaderValue, Response, StatusCode};
use futures::Stream;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::DuplexStream;
use tokio_util::compat::FuturesAsyncWriteCompatExt;
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::job::MediaFormat;
use crate::workspace::WorkspaceGuard;

/// Buffer size of the pipe between the archive writer and the response body
///
/// Large enough to keep compression ahead of a fast client, small enough to
/// backpressure it against a slow one.
const ARCHIVE_PIPE_BUFFER: usize = 64 * 1024;

/// Archive filename for a playlist job, per the historical naming scheme
///
/// `playlist-720p.zip` for video, `playlist-audio-192k.zip` for audio.
pub fn archive_filename(format: MediaFormat, quality: &str) -> String {
    match format {
        MediaFormat::Video => format!("playlist-{quality}p.zip"),
        MediaFormat::Audio => format!("playlist-audio-{quality}k.zip"),
    }
}

/// Build an `attachment` content-disposition value for `filename`
///
/// Quotes and control characters are stripped so the value stays a valid
/// header regardless of what the acquisition tool named the file.
pub fn content_disposition(filename: &str) -> String {
    let safe: String = filename
        .chars()
        .filter(|c| *c != '"' && !c.is_control())
        .collect();
    format!("attachment; filename=\"{safe}\"")
}

fn header_value(value: &str) -> HeaderValue {
    HeaderValue::from_str(value).unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

/// Stream one located file as the response body
///
/// Sets content type, length, and attachment disposition from the file
/// itself. The workspace guard travels inside the body stream and is dropped
/// when the body is (completion, error, or disconnect).
pub async fn stream_file(
    path: PathBuf,
    format: MediaFormat,
    guard: WorkspaceGuard,
) -> Result<Response<Body>> {
    let file = tokio::fs::File::open(&path).await?;
    let length = file.metadata().await?.len();
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("download")
        .to_string();

    debug!(?path, length, "streaming single file");

    let stream = GuardedStream {
        inner: ReaderStream::new(file),
        _guard: guard,
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, format.content_type())
        .header(header::CONTENT_LENGTH, length)
        .header(
            header::CONTENT_DISPOSITION,
            header_value(&content_disposition(&filename)),
        )
        .body(Body::from_stream(stream))
        .map_err(|e| Error::ApiServer(e.to_string()))
}

/// Stream a zip archive of `files` as the response body
///
/// The archive is constructed incrementally; each file is added under its
/// base filename, flattening any directory structure. A client disconnect
/// drops the reading half of the pipe, the next write fails with a broken
/// pipe, and the archive task winds down, releasing the workspace.
pub fn stream_archive(
    files: Vec<PathBuf>,
    archive_name: &str,
    guard: WorkspaceGuard,
) -> Result<Response<Body>> {
    let (reader, writer) = tokio::io::duplex(ARCHIVE_PIPE_BUFFER);

    tokio::spawn(async move {
        if let Err(e) = write_archive(&files, writer).await {
            warn!(error = %e, "archive stream ended early");
        }
        drop(guard);
    });

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/zip")
        .header(
            header::CONTENT_DISPOSITION,
            header_value(&content_disposition(archive_name)),
        )
        .body(Body::from_stream(ReaderStream::new(reader)))
        .map_err(|e| Error::ApiServer(e.to_string()))
}

/// Compress `files` into the pipe, one deflate entry per file
async fn write_archive(files: &[PathBuf], writer: DuplexStream) -> Result<()> {
    let mut zip = ZipFileWriter::with_tokio(writer);

    for path in files {
        let name = entry_name(path)?;
        let builder = ZipEntryBuilder::new(name.into(), Compression::Deflate);
        let entry = zip
            .write_entry_stream(builder)
            .await
            .map_err(|e| Error::Archive(format!("failed to start entry for {path:?}: {e}")))?;

        let mut file = tokio::fs::File::open(path).await?;
        let mut entry = entry.compat_write();
        tokio::io::copy(&mut file, &mut entry).await?;
        entry
            .into_inner()
            .close()
            .await
            .map_err(|e| Error::Archive(format!("failed to close entry for {path:?}: {e}")))?;
    }

    zip.close()
        .await
        .map_err(|e| Error::Archive(format!("failed to finalize archive: {e}")))?;
    Ok(())
}

/// Base filename for an archive entry (directory structure is flattened)
fn entry_name(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| Error::Archive(format!("unrepresentable filename: {path:?}")))
}

/// Byte stream that owns the workspace guard for its lifetime
struct GuardedStream<S> {
    inner: S,
    _guard: WorkspaceGuard,
}

impl<S, T> Stream for GuardedStream<S>
where
    S: Stream<Item = T> + Unpin,
{
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.get_mut().inner).poll_next(cx)
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobId;
    use crate::workspace::WorkspaceManager;
    use std::io::Read;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn archive_filename_follows_historical_pattern() {
        assert_eq!(archive_filename(MediaFormat::Video, "720"), "playlist-720p.zip");
        assert_eq!(
            archive_filename(MediaFormat::Audio, "192"),
            "playlist-audio-192k.zip"
        );
    }

    #[test]
    fn content_disposition_strips_header_breaking_characters() {
        assert_eq!(
            content_disposition("a \"b\".mp4"),
            "attachment; filename=\"a b.mp4\""
        );
        assert_eq!(
            content_disposition("new\nline.mp3"),
            "attachment; filename=\"newline.mp3\""
        );
    }

    fn workspace_with_files(files: &[(&str, &[u8])]) -> (Arc<WorkspaceManager>, WorkspaceGuard) {
        let root = tempdir().unwrap();
        let manager = Arc::new(WorkspaceManager::new(root.path().to_path_buf()));
        let guard = Arc::clone(&manager).allocate(&JobId::generate()).unwrap();
        for (name, content) in files {
            std::fs::write(guard.path().join(name), content).unwrap();
        }
        // Leak the tempdir so the manager root outlives this helper; the
        // guard still removes the job directory itself
        std::mem::forget(root);
        (manager, guard)
    }

    #[tokio::test]
    async fn single_file_response_has_expected_headers_and_body() {
        let (_manager, guard) = workspace_with_files(&[("title.mp4", b"fake video bytes")]);
        let path = guard.path().join("title.mp4");
        let workspace = guard.path().to_path_buf();

        let response = stream_file(path, MediaFormat::Video, guard).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "video/mp4"
        );
        assert_eq!(
            response.headers().get(header::CONTENT_DISPOSITION).unwrap(),
            "attachment; filename=\"title.mp4\""
        );

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"fake video bytes");

        // Body fully consumed and dropped: workspace must be gone
        assert!(!workspace.exists());
    }

    #[tokio::test]
    async fn archive_contains_exactly_the_given_files_in_order() {
        let (_manager, guard) = workspace_with_files(&[
            ("01 - a.mp3", b"aaaa" as &[u8]),
            ("02 - b.mp3", b"bbbb"),
            ("03 - c.mp3", b"cccc"),
        ]);
        let workspace = guard.path().to_path_buf();
        let files: Vec<PathBuf> = ["01 - a.mp3", "02 - b.mp3", "03 - c.mp3"]
            .iter()
            .map(|n| workspace.join(n))
            .collect();

        let response = stream_archive(files, "playlist-audio-192k.zip", guard).unwrap();
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/zip"
        );
        assert_eq!(
            response.headers().get(header::CONTENT_DISPOSITION).unwrap(),
            "attachment; filename=\"playlist-audio-192k.zip\""
        );

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(body.to_vec())).unwrap();
        assert_eq!(archive.len(), 3);
        let names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        assert_eq!(names, vec!["01 - a.mp3", "02 - b.mp3", "03 - c.mp3"]);

        let mut content = String::new();
        archive
            .by_name("02 - b.mp3")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "bbbb");

        // The archive task has finished by the time the body ends, so the
        // workspace is already released
        assert!(!workspace.exists());
    }

    #[tokio::test]
    async fn dropped_body_releases_workspace() {
        let (_manager, guard) =
            workspace_with_files(&[("01 - a.mp4", &[7u8; 1024 * 1024] as &[u8])]);
        let workspace = guard.path().to_path_buf();
        let files = vec![workspace.join("01 - a.mp4")];

        let response = stream_archive(files, "playlist-720p.zip", guard).unwrap();
        // Client disconnect: drop the response without reading the body
        drop(response);

        // The archive task notices the closed pipe and releases
        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while workspace.exists() && std::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(!workspace.exists());
    }

    #[tokio::test]
    async fn large_file_streams_without_full_buffering() {
        // 4 MiB of incompressible-ish data through a 64 KiB pipe proves the
        // writer is backpressured rather than buffering the archive whole
        let payload: Vec<u8> = (0..4 * 1024 * 1024u32).map(|i| (i % 251) as u8).collect();
        let (_manager, guard) = workspace_with_files(&[("01 - big.mp4", payload.as_slice())]);
        let workspace = guard.path().to_path_buf();
        let files = vec![workspace.join("01 - big.mp4")];

        let response = stream_archive(files, "playlist-720p.zip", guard).unwrap();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(body.to_vec())).unwrap();
        let mut restored = Vec::new();
        archive
            .by_name("01 - big.mp4")
            .unwrap()
            .read_to_end(&mut restored)
            .unwrap();
        assert_eq!(restored, payload);
    }
}
