//! Acquisition invoker: runs the external fetch tool against a job workspace
//!
//! The acquisition seam is the [`Acquirer`] trait so tests can substitute a
//! stub that writes files directly. [`CliAcquirer`] is the production
//! implementation, driving a yt-dlp compatible binary under a hard wall-clock
//! timeout. The child is spawned with `kill_on_drop`, so a client disconnect
//! (which drops the handler future mid-await) terminates the subprocess
//! rather than orphaning it.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::job::{Job, JobKind, MediaFormat};

/// Output filename template for single-item jobs
const SINGLE_TEMPLATE: &str = "%(title)s.%(ext)s";

/// Output filename template for playlist jobs
///
/// The zero-padded index keeps filenames sortable; archive ordering itself
/// does not depend on it (see `locate`).
const PLAYLIST_TEMPLATE: &str = "%(playlist_index)03d - %(title)s.%(ext)s";

/// Runs the acquisition tool for one job
#[async_trait]
pub trait Acquirer: Send + Sync {
    /// Fetch media into `workspace`, bounded by `timeout`
    ///
    /// Writes zero or more files into the workspace; output inspection is the
    /// locator's concern, not the invoker's. An exit status of 0 means the
    /// tool ran without internal error, not that it produced output.
    async fn run(&self, job: &Job, workspace: &Path, timeout: Duration) -> Result<()>;

    /// Short name for logging
    fn name(&self) -> &'static str;
}

/// CLI acquirer driving a yt-dlp compatible binary
pub struct CliAcquirer {
    binary_path: PathBuf,
}

impl CliAcquirer {
    /// Create an acquirer with an explicit binary path
    pub fn new(binary_path: PathBuf) -> Self {
        Self { binary_path }
    }

    /// Attempt to find `yt-dlp` in PATH
    pub fn from_path() -> Option<Self> {
        which::which("yt-dlp").ok().map(Self::new)
    }

    /// Build the argument vector for one job
    ///
    /// The format-selection expression constrains resolution (video) or
    /// bitrate (audio) and the container; the output template scopes every
    /// write to the job's workspace.
    fn build_args(job: &Job, workspace: &Path) -> Vec<String> {
        let quality = &job.quality;
        let template = match job.kind {
            JobKind::Playlist => PLAYLIST_TEMPLATE,
            JobKind::SingleVideo | JobKind::SingleAudio => SINGLE_TEMPLATE,
        };
        let output = workspace.join(template).to_string_lossy().into_owned();

        let mut args = Vec::new();
        match job.format {
            MediaFormat::Video => {
                args.push("-f".to_string());
                args.push(format!(
                    "bestvideo[height<={quality}][ext=mp4]+bestaudio[ext=m4a]/best[height<={quality}][ext=mp4]"
                ));
            }
            MediaFormat::Audio => {
                args.push("-x".to_string());
                args.push("--audio-format".to_string());
                args.push("mp3".to_string());
                args.push("--audio-quality".to_string());
                args.push(format!("{quality}K"));
            }
        }
        match job.kind {
            JobKind::Playlist => args.push("--yes-playlist".to_string()),
            JobKind::SingleVideo | JobKind::SingleAudio => {
                args.push("--no-playlist".to_string())
            }
        }
        args.push("-o".to_string());
        args.push(output);
        args.push(job.source_url.to_string());
        args
    }
}

#[async_trait]
impl Acquirer for CliAcquirer {
    async fn run(&self, job: &Job, workspace: &Path, timeout: Duration) -> Result<()> {
        let args = Self::build_args(job, workspace);
        debug!(job_id = %job.id, tool = ?self.binary_path, ?args, "launching acquisition");

        let mut child = Command::new(&self.binary_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::AcquisitionFailed {
                status: -1,
                diagnostic: format!("failed to execute {:?}: {e}", self.binary_path),
            })?;

        let mut stderr_pipe = child.stderr.take();
        let wait_and_collect = async {
            let mut diagnostic = String::new();
            if let Some(pipe) = stderr_pipe.as_mut() {
                // Drain stderr while waiting so the child cannot block on a
                // full pipe
                let _ = pipe.read_to_string(&mut diagnostic).await;
            }
            let status = child.wait().await;
            (status, diagnostic)
        };

        let outcome = tokio::time::timeout(timeout, wait_and_collect).await;
        match outcome {
            Ok((Ok(status), diagnostic)) if status.success() => {
                debug!(job_id = %job.id, "acquisition completed");
                if !diagnostic.is_empty() {
                    debug!(job_id = %job.id, stderr = %diagnostic, "acquisition stderr");
                }
                Ok(())
            }
            Ok((Ok(status), diagnostic)) => {
                let status = status.code().unwrap_or(-1);
                warn!(job_id = %job.id, status, stderr = %diagnostic, "acquisition tool failed");
                Err(Error::AcquisitionFailed { status, diagnostic })
            }
            Ok((Err(e), _)) => Err(Error::AcquisitionFailed {
                status: -1,
                diagnostic: format!("failed to await acquisition tool: {e}"),
            }),
            Err(_elapsed) => {
                warn!(job_id = %job.id, timeout_secs = timeout.as_secs(), "acquisition timed out, killing");
                // The wait future was dropped by the timeout; reclaim the
                // child and terminate it before reporting
                child.start_kill().ok();
                child.wait().await.ok();
                Err(Error::AcquisitionTimeout {
                    seconds: timeout.as_secs(),
                })
            }
        }
    }

    fn name(&self) -> &'static str {
        "cli-yt-dlp"
    }
}
