//! Job types and request classification
//!
//! A [`Job`] is one HTTP request's unit of work, from classification through
//! cleanup. Classification of the smart `/download` endpoint goes through
//! [`classify`], an explicit shared routine, rather than any re-dispatch
//! through the routing layer.

use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};

/// Unique identifier for a job
///
/// Derived from the creation time (milliseconds) plus a random hex suffix.
/// Used only for workspace naming; never exposed to callers. Collisions are
/// treated as negligible rather than formally prevented.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Generate a fresh id from the current time and a random suffix
    pub fn generate() -> Self {
        let suffix: u32 = rand::thread_rng().gen();
        Self(format!("{}-{:08x}", Utc::now().timestamp_millis(), suffix))
    }

    /// The id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a job fetches
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// One video file
    SingleVideo,
    /// One audio track
    SingleAudio,
    /// Every item of a playlist, delivered as a zip archive
    Playlist,
}

/// Requested media format (relevant for playlist jobs)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaFormat {
    /// MP4 video
    #[default]
    Video,
    /// MP3 audio
    Audio,
}

impl MediaFormat {
    /// Output file extension the acquisition tool is expected to produce
    pub fn extension(&self) -> &'static str {
        match self {
            MediaFormat::Video => "mp4",
            MediaFormat::Audio => "mp3",
        }
    }

    /// MIME type for single-file delivery
    pub fn content_type(&self) -> &'static str {
        match self {
            MediaFormat::Video => "video/mp4",
            MediaFormat::Audio => "audio/mpeg",
        }
    }
}

impl std::str::FromStr for MediaFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "video" => Ok(MediaFormat::Video),
            "audio" => Ok(MediaFormat::Audio),
            other => Err(Error::Validation(format!(
                "unknown format '{other}', expected 'video' or 'audio'"
            ))),
        }
    }
}

/// Lifecycle state of a job
///
/// Transitions are strictly ordered within one job:
/// `Created → Fetching → Locating → Delivering → Cleaned`, with `Failed`
/// reachable from any non-terminal state and `Aborted` on client disconnect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Job record assembled, workspace not yet allocated
    Created,
    /// Acquisition subprocess running
    Fetching,
    /// Scanning the workspace for output files
    Locating,
    /// Streaming the response body
    Delivering,
    /// Terminal: delivered and workspace released
    Cleaned,
    /// Terminal: failed; workspace released
    Failed,
    /// Terminal: client disconnected; workspace released
    Aborted,
}

impl JobState {
    /// Whether this state is terminal
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Cleaned | JobState::Failed | JobState::Aborted)
    }
}

/// One in-flight request's unit of work
#[derive(Clone, Debug)]
pub struct Job {
    /// Opaque unique identifier, used for workspace naming only
    pub id: JobId,
    /// What this job fetches
    pub kind: JobKind,
    /// Requested media format
    pub format: MediaFormat,
    /// Requested resolution (video) or bitrate in kbit/s (audio)
    pub quality: String,
    /// Caller-supplied source URL
    pub source_url: Url,
    /// Current lifecycle state
    pub state: JobState,
}

impl Job {
    /// Assemble a job record from validated request parameters
    pub fn new(kind: JobKind, format: MediaFormat, quality: String, source_url: Url) -> Self {
        Self {
            id: JobId::generate(),
            kind,
            format,
            quality,
            source_url,
            state: JobState::Created,
        }
    }

    /// Advance the lifecycle state, logging the transition
    pub fn transition(&mut self, next: JobState) {
        tracing::debug!(job_id = %self.id, from = ?self.state, to = ?next, "job state transition");
        self.state = next;
    }
}

/// Parse and validate a caller-supplied URL
///
/// Missing (`None`) and unparsable values are both validation errors; no
/// workspace exists yet at this point, so nothing needs cleanup.
pub fn parse_source_url(url: Option<&str>) -> Result<Url> {
    let raw = url.ok_or_else(|| Error::Validation("no url provided".to_string()))?;
    let parsed =
        Url::parse(raw).map_err(|e| Error::Validation(format!("invalid url: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(Error::Validation(format!(
            "unsupported url scheme '{other}'"
        ))),
    }
}

/// Validate a quality value as a plain decimal number
///
/// The value is spliced into the acquisition tool's format expression, so
/// anything but digits is rejected outright.
pub fn validate_quality(quality: &str) -> Result<()> {
    if !quality.is_empty() && quality.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(Error::Validation(format!(
            "quality must be numeric, got '{quality}'"
        )))
    }
}

/// Classify a request by URL shape and requested format
///
/// A URL carrying a playlist marker (a `list` query parameter or a
/// `/playlist` path segment) becomes a [`JobKind::Playlist`]; otherwise the
/// format decides between single video and single audio.
pub fn classify(url: &Url, format: MediaFormat) -> JobKind {
    let has_list_param = url.query_pairs().any(|(k, _)| k == "list");
    let has_playlist_path = url.path_segments().is_some_and(|mut segments| {
        segments.any(|s| s.eq_ignore_ascii_case("playlist"))
    });
    if has_list_param || has_playlist_path {
        JobKind::Playlist
    } else {
        match format {
            MediaFormat::Video => JobKind::SingleVideo,
            MediaFormat::Audio => JobKind::SingleAudio,
        }
    }
}
