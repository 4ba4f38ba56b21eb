//! # media-dl
//!
//! HTTP gateway for media downloads via an external acquisition tool
//! (yt-dlp compatible): given a media URL, fetch one video, one audio track,
//! or a whole playlist into an isolated temporary workspace, then stream the
//! result (raw file or on-the-fly zip archive) back to the caller,
//! guaranteeing workspace cleanup regardless of outcome.
//!
//! ## Design Philosophy
//!
//! - **Per-request job lifecycle** - One isolated workspace per request,
//!   released exactly once on the first terminal event (stream completion,
//!   error, timeout, client disconnect, or shutdown sweep)
//! - **Streaming delivery** - Memory use bounded by I/O buffer sizes; the
//!   zip archive is never materialized in memory or on disk
//! - **Bounded subprocesses** - Every external tool invocation runs under a
//!   hard wall-clock timeout and is killed on expiry or disconnect
//!
//! ## Quick Start
//!
//! ```no_run
//! use media_dl::{api, AppState, CliAcquirer, CliTranscoder, Config, WorkspaceManager};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Arc::new(Config::from_env());
//!     let workspaces = Arc::new(WorkspaceManager::new(config.workspace_root.clone()));
//!     let acquirer = Arc::new(CliAcquirer::from_path().ok_or("yt-dlp not found in PATH")?);
//!     let transcoder = Arc::new(CliTranscoder::from_path().ok_or("ffmpeg not found in PATH")?);
//!
//!     let state = AppState::new(config, workspaces, acquirer, transcoder);
//!     api::start_api_server(state).await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Acquisition invoker (external fetch tool)
pub mod acquire;
/// REST API module
pub mod api;
/// Configuration types
pub mod config;
/// Delivery streaming (single file and zip archive)
pub mod deliver;
/// Error types
pub mod error;
/// Job types and request classification
pub mod job;
/// Result locator (workspace output discovery)
pub mod locate;
/// Transcoding invoker (external resize tool)
pub mod transcode;
/// Workspace allocation and cleanup
pub mod workspace;

// Re-export commonly used types
pub use acquire::{Acquirer, CliAcquirer};
pub use api::AppState;
pub use config::Config;
pub use error::{ApiError, Error, Result, ToHttpStatus};
pub use job::{Job, JobId, JobKind, JobState, MediaFormat};
pub use transcode::{CliTranscoder, Transcoder};
pub use workspace::{WorkspaceGuard, WorkspaceManager};
