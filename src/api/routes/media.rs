//! Media job handlers: `/video`, `/audio`, `/playlist`, `/download`, `/process`
//!
//! Every handler funnels into [`run_job`], the one pipeline implementing the
//! job lifecycle: allocate workspace → acquire → locate → deliver. The
//! workspace guard created at allocation is threaded through to the response
//! body, so cleanup fires on whichever terminal event comes first: stream
//! completion, any error, or the client disconnecting (which drops the
//! handler future or the body, and with it the guard and any still-running
//! subprocess).

use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::Response;
use serde::Deserialize;

use crate::api::AppState;
use crate::deliver::{archive_filename, stream_archive, stream_file};
use crate::error::Result;
use crate::job::{classify, parse_source_url, validate_quality, Job, JobKind, JobState, MediaFormat};
use crate::locate::{locate_many, locate_single};

/// Query parameters for `/video` and `/audio`
#[derive(Debug, Deserialize)]
pub struct SingleQuery {
    /// Source media URL
    pub url: Option<String>,
    /// Resolution ceiling (video) or bitrate in kbit/s (audio)
    pub quality: Option<String>,
}

/// Query parameters for `/playlist` and `/download`
#[derive(Debug, Deserialize)]
pub struct DispatchQuery {
    /// Source media URL
    pub url: Option<String>,
    /// "video" or "audio" (default video)
    pub format: Option<String>,
    /// Resolution ceiling (video) or bitrate in kbit/s (audio)
    pub quality: Option<String>,
}

/// Query parameters for `/process`
#[derive(Debug, Deserialize)]
pub struct ProcessQuery {
    /// Source media URL
    pub url: Option<String>,
    /// Resolution ceiling for the initial fetch
    pub quality: Option<String>,
    /// Target width in pixels for the resized copy (default 640)
    pub width: Option<u32>,
}

/// GET /video - fetch one video as an mp4 stream
#[utoipa::path(
    get,
    path = "/video",
    tag = "media",
    params(
        ("url" = String, Query, description = "Source media URL"),
        ("quality" = Option<String>, Query, description = "Resolution ceiling in pixels (default 720)")
    ),
    responses(
        (status = 200, description = "Video stream (video/mp4, attachment)"),
        (status = 400, description = "Missing or invalid url", body = crate::error::ApiError),
        (status = 404, description = "No output produced", body = crate::error::ApiError),
        (status = 500, description = "Acquisition or storage failure", body = crate::error::ApiError)
    )
)]
pub async fn video(
    State(state): State<AppState>,
    Query(query): Query<SingleQuery>,
) -> Result<Response<Body>> {
    let url = parse_source_url(query.url.as_deref())?;
    let quality = query
        .quality
        .unwrap_or_else(|| state.config.defaults.video_quality.clone());
    validate_quality(&quality)?;

    let job = Job::new(JobKind::SingleVideo, MediaFormat::Video, quality, url);
    run_job(&state, job).await
}

/// GET /audio - fetch one audio track as an mp3 stream
#[utoipa::path(
    get,
    path = "/audio",
    tag = "media",
    params(
        ("url" = String, Query, description = "Source media URL"),
        ("quality" = Option<String>, Query, description = "Bitrate in kbit/s (default 192)")
    ),
    responses(
        (status = 200, description = "Audio stream (audio/mpeg, attachment)"),
        (status = 400, description = "Missing or invalid url", body = crate::error::ApiError),
        (status = 404, description = "No output produced", body = crate::error::ApiError),
        (status = 500, description = "Acquisition or storage failure", body = crate::error::ApiError)
    )
)]
pub async fn audio(
    State(state): State<AppState>,
    Query(query): Query<SingleQuery>,
) -> Result<Response<Body>> {
    let url = parse_source_url(query.url.as_deref())?;
    let quality = query
        .quality
        .unwrap_or_else(|| state.config.defaults.audio_quality.clone());
    validate_quality(&quality)?;

    let job = Job::new(JobKind::SingleAudio, MediaFormat::Audio, quality, url);
    run_job(&state, job).await
}

/// GET /playlist - fetch a whole playlist as a zip archive
#[utoipa::path(
    get,
    path = "/playlist",
    tag = "media",
    params(
        ("url" = String, Query, description = "Playlist URL"),
        ("format" = Option<String>, Query, description = "video or audio (default video)"),
        ("quality" = Option<String>, Query, description = "Resolution or bitrate ceiling")
    ),
    responses(
        (status = 200, description = "Zip archive stream (application/zip, attachment)"),
        (status = 400, description = "Missing or invalid parameter", body = crate::error::ApiError),
        (status = 404, description = "No output produced", body = crate::error::ApiError),
        (status = 500, description = "Acquisition or storage failure", body = crate::error::ApiError)
    )
)]
pub async fn playlist(
    State(state): State<AppState>,
    Query(query): Query<DispatchQuery>,
) -> Result<Response<Body>> {
    let url = parse_source_url(query.url.as_deref())?;
    let format: MediaFormat = query.format.as_deref().unwrap_or("video").parse()?;
    let quality = query.quality.unwrap_or_else(|| default_quality(&state, format));
    validate_quality(&quality)?;

    let job = Job::new(JobKind::Playlist, format, quality, url);
    run_job(&state, job).await
}

/// GET /download - classify by URL shape and dispatch
///
/// URLs carrying a playlist marker become playlist jobs; anything else is a
/// single fetch in the requested format. Classification is an explicit call
/// into [`classify`], shared with nothing hidden in the routing layer.
#[utoipa::path(
    get,
    path = "/download",
    tag = "media",
    params(
        ("url" = String, Query, description = "Source media URL"),
        ("format" = Option<String>, Query, description = "video or audio (default video)"),
        ("quality" = Option<String>, Query, description = "Resolution or bitrate ceiling")
    ),
    responses(
        (status = 200, description = "Media or archive stream, depending on URL shape"),
        (status = 400, description = "Missing or invalid parameter", body = crate::error::ApiError),
        (status = 404, description = "No output produced", body = crate::error::ApiError),
        (status = 500, description = "Acquisition or storage failure", body = crate::error::ApiError)
    )
)]
pub async fn download(
    State(state): State<AppState>,
    Query(query): Query<DispatchQuery>,
) -> Result<Response<Body>> {
    let url = parse_source_url(query.url.as_deref())?;
    let format: MediaFormat = query.format.as_deref().unwrap_or("video").parse()?;
    let quality = query.quality.unwrap_or_else(|| default_quality(&state, format));
    validate_quality(&quality)?;

    let kind = classify(&url, format);
    tracing::debug!(?kind, %url, "classified download request");

    let job = Job::new(kind, format, quality, url);
    run_job(&state, job).await
}

/// GET /process - fetch one video, then deliver a resized copy
#[utoipa::path(
    get,
    path = "/process",
    tag = "media",
    params(
        ("url" = String, Query, description = "Source media URL"),
        ("quality" = Option<String>, Query, description = "Resolution ceiling for the fetch (default 720)"),
        ("width" = Option<u32>, Query, description = "Target width in pixels (default 640)")
    ),
    responses(
        (status = 200, description = "Resized video stream (video/mp4, attachment)"),
        (status = 400, description = "Missing or invalid parameter", body = crate::error::ApiError),
        (status = 404, description = "No output produced", body = crate::error::ApiError),
        (status = 500, description = "Acquisition, transcode or storage failure", body = crate::error::ApiError)
    )
)]
pub async fn process(
    State(state): State<AppState>,
    Query(query): Query<ProcessQuery>,
) -> Result<Response<Body>> {
    let url = parse_source_url(query.url.as_deref())?;
    let quality = query
        .quality
        .unwrap_or_else(|| state.config.defaults.video_quality.clone());
    validate_quality(&quality)?;
    let width = query.width.unwrap_or(640);

    let mut job = Job::new(JobKind::SingleVideo, MediaFormat::Video, quality, url);
    let guard = state.workspaces.clone().allocate(&job.id)?;

    let result = async {
        job.transition(JobState::Fetching);
        let timeout = state.config.limits.acquisition_timeout(job.kind);
        state.acquirer.run(&job, guard.path(), timeout).await?;

        job.transition(JobState::Locating);
        let input = locate_single(guard.path(), job.format.extension())?;

        let stem = input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("processed");
        let output = guard.path().join(format!("{stem}-{width}w.scaled.mp4"));
        state
            .transcoder
            .scale(&input, &output, width, state.config.limits.transcode_timeout)
            .await?;

        job.transition(JobState::Delivering);
        Ok(output)
    }
    .await;

    match result {
        Ok(output) => stream_file(output, MediaFormat::Video, guard).await,
        Err(e) => {
            job.transition(JobState::Failed);
            // guard drops here, releasing the workspace
            Err(e)
        }
    }
}

/// Default quality for a format when the caller omits the parameter
fn default_quality(state: &AppState, format: MediaFormat) -> String {
    match format {
        MediaFormat::Video => state.config.defaults.video_quality.clone(),
        MediaFormat::Audio => state.config.defaults.audio_quality.clone(),
    }
}

/// The shared job pipeline: allocate → acquire → locate → deliver
///
/// Ownership of the workspace guard moves into the delivery stream on
/// success; on any error it drops here and the workspace is released before
/// the error response leaves the handler. If the caller disconnects, this
/// future is dropped mid-await: the acquisition child is killed via
/// `kill_on_drop` and the guard's drop releases the workspace.
async fn run_job(state: &AppState, mut job: Job) -> Result<Response<Body>> {
    tracing::info!(job_id = %job.id, kind = ?job.kind, url = %job.source_url, "job started");
    let guard = state.workspaces.clone().allocate(&job.id)?;

    let result = async {
        job.transition(JobState::Fetching);
        let timeout = state.config.limits.acquisition_timeout(job.kind);
        state.acquirer.run(&job, guard.path(), timeout).await?;

        job.transition(JobState::Locating);
        Ok(())
    }
    .await;

    if let Err(e) = result {
        job.transition(JobState::Failed);
        return Err(e);
    }

    let extension = job.format.extension();
    let delivery = match job.kind {
        JobKind::Playlist => locate_many(guard.path(), extension).and_then(|files| {
            job.transition(JobState::Delivering);
            let name = archive_filename(job.format, &job.quality);
            stream_archive(files, &name, guard)
        }),
        JobKind::SingleVideo | JobKind::SingleAudio => {
            match locate_single(guard.path(), extension) {
                Ok(file) => {
                    job.transition(JobState::Delivering);
                    stream_file(file, job.format, guard).await
                }
                Err(e) => {
                    job.transition(JobState::Failed);
                    return Err(e);
                }
            }
        }
    };

    match delivery {
        Ok(response) => Ok(response),
        Err(e) => {
            job.transition(JobState::Failed);
            Err(e)
        }
    }
}
