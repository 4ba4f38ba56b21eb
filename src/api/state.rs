//! Application state for the API server

use crate::acquire::Acquirer;
use crate::transcode::Transcoder;
use crate::workspace::WorkspaceManager;
use crate::Config;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned per request (cheap Arc clones). The acquirer and transcoder sit
/// behind trait objects so tests can substitute stubs for the external
/// tools.
#[derive(Clone)]
pub struct AppState {
    /// Configuration
    pub config: Arc<Config>,

    /// Workspace allocation and cleanup
    pub workspaces: Arc<WorkspaceManager>,

    /// External acquisition tool
    pub acquirer: Arc<dyn Acquirer>,

    /// External transcoding tool
    pub transcoder: Arc<dyn Transcoder>,

    /// Process start time, for the health endpoint's uptime report
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(
        config: Arc<Config>,
        workspaces: Arc<WorkspaceManager>,
        acquirer: Arc<dyn Acquirer>,
        transcoder: Arc<dyn Transcoder>,
    ) -> Self {
        Self {
            config,
            workspaces,
            acquirer,
            transcoder,
            started_at: Utc::now(),
        }
    }
}
