//! Transcoding invoker for the `/process` variant
//!
//! Thin wrapper over an ffmpeg compatible binary: given an input file it
//! produces a resized copy in the same workspace, synchronously from the
//! job's point of view and under the same timeout-and-kill regime as
//! acquisition.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Produces a resized copy of a media file
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Scale `input` to `width` pixels wide, writing `output`
    async fn scale(
        &self,
        input: &Path,
        output: &Path,
        width: u32,
        timeout: Duration,
    ) -> Result<()>;

    /// Short name for logging
    fn name(&self) -> &'static str;
}

/// CLI transcoder driving an ffmpeg compatible binary
pub struct CliTranscoder {
    binary_path: PathBuf,
}

impl CliTranscoder {
    /// Create a transcoder with an explicit binary path
    pub fn new(binary_path: PathBuf) -> Self {
        Self { binary_path }
    }

    /// Attempt to find `ffmpeg` in PATH
    pub fn from_path() -> Option<Self> {
        which::which("ffmpeg").ok().map(Self::new)
    }
}

#[async_trait]
impl Transcoder for CliTranscoder {
    async fn scale(
        &self,
        input: &Path,
        output: &Path,
        width: u32,
        timeout: Duration,
    ) -> Result<()> {
        // -2 keeps the height divisible by two, which most codecs require
        let filter = format!("scale={width}:-2");
        debug!(?input, ?output, %filter, "launching transcode");

        let mut child = Command::new(&self.binary_path)
            .arg("-i")
            .arg(input)
            .arg("-vf")
            .arg(&filter)
            .arg("-y")
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Transcode {
                status: -1,
                diagnostic: format!("failed to execute {:?}: {e}", self.binary_path),
            })?;

        let mut stderr_pipe = child.stderr.take();
        let wait_and_collect = async {
            let mut diagnostic = String::new();
            if let Some(pipe) = stderr_pipe.as_mut() {
                let _ = pipe.read_to_string(&mut diagnostic).await;
            }
            let status = child.wait().await;
            (status, diagnostic)
        };

        let outcome = tokio::time::timeout(timeout, wait_and_collect).await;
        match outcome {
            Ok((Ok(status), _)) if status.success() => Ok(()),
            Ok((Ok(status), diagnostic)) => {
                let status = status.code().unwrap_or(-1);
                warn!(status, stderr = %diagnostic, "transcode tool failed");
                Err(Error::Transcode { status, diagnostic })
            }
            Ok((Err(e), _)) => Err(Error::Transcode {
                status: -1,
                diagnostic: format!("failed to await transcode tool: {e}"),
            }),
            Err(_elapsed) => {
                warn!(timeout_secs = timeout.as_secs(), "transcode timed out, killing");
                child.start_kill().ok();
                child.wait().await.ok();
                Err(Error::Transcode {
                    status: -1,
                    diagnostic: format!("timed out after {}s", timeout.as_secs()),
                })
            }
        }
    }

    fn name(&self) -> &'static str {
        "cli-ffmpeg"
    }
}
