//! media-dl server binary

use media_dl::{api, AppState, CliAcquirer, CliTranscoder, Config, WorkspaceManager};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> std::process::ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("media_dl=info")),
        )
        .init();

    let config = Arc::new(Config::from_env());

    let acquirer = match media_dl::config::ToolsConfig::resolve(
        &config.tools.acquisition_path,
        "yt-dlp",
    ) {
        Some(path) => Arc::new(CliAcquirer::new(path)),
        None => {
            tracing::error!("yt-dlp not found in PATH");
            return std::process::ExitCode::FAILURE;
        }
    };
    let transcoder = match media_dl::config::ToolsConfig::resolve(
        &config.tools.transcode_path,
        "ffmpeg",
    ) {
        Some(path) => Arc::new(CliTranscoder::new(path)),
        None => {
            tracing::error!("ffmpeg not found in PATH");
            return std::process::ExitCode::FAILURE;
        }
    };

    let workspaces = Arc::new(WorkspaceManager::new(config.workspace_root.clone()));
    tracing::info!(
        bind = %config.server.bind_address,
        workspace_root = ?config.workspace_root,
        "starting media-dl"
    );

    let state = AppState::new(config, workspaces, acquirer, transcoder);
    match api::start_api_server(state).await {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "server exited with error");
            std::process::ExitCode::FAILURE
        }
    }
}
