use super::*;
use crate::acquire::Acquirer;
use crate::config::Config;
use crate::error::Error as DomainError;
use crate::job::Job;
use crate::transcode::Transcoder;
use crate::workspace::WorkspaceManager;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

mod system;

/// Scripted behavior for the stub acquisition tool
#[derive(Clone)]
enum StubBehavior {
    /// Exit 0 after writing these files into the workspace
    WriteFiles(Vec<(&'static str, &'static [u8])>),
    /// Exit nonzero with a diagnostic
    Fail,
    /// Report a timeout
    Timeout,
}

/// Stub acquirer standing in for the external fetch tool
struct StubAcquirer {
    behavior: StubBehavior,
}

#[async_trait]
impl Acquirer for StubAcquirer {
    async fn run(&self, _job: &Job, workspace: &Path, _timeout: Duration) -> crate::Result<()> {
        match &self.behavior {
            StubBehavior::WriteFiles(files) => {
                for (name, content) in files {
                    std::fs::write(workspace.join(name), content)?;
                }
                Ok(())
            }
            StubBehavior::Fail => Err(DomainError::AcquisitionFailed {
                status: 1,
                diagnostic: "ERROR: unsupported url (stub)".to_string(),
            }),
            StubBehavior::Timeout => Err(DomainError::AcquisitionTimeout { seconds: 300 }),
        }
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

/// Stub transcoder that copies its input to the output path
struct StubTranscoder;

#[async_trait]
impl Transcoder for StubTranscoder {
    async fn scale(
        &self,
        input: &Path,
        output: &Path,
        _width: u32,
        _timeout: Duration,
    ) -> crate::Result<()> {
        std::fs::copy(input, output)?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

/// Build an AppState over a temp workspace root and a scripted acquirer
fn test_state(behavior: StubBehavior) -> (AppState, TempDir) {
    let root = tempfile::tempdir().expect("tempdir");
    let mut config = Config::default();
    config.workspace_root = root.path().to_path_buf();

    let state = AppState::new(
        std::sync::Arc::new(config),
        std::sync::Arc::new(WorkspaceManager::new(root.path().to_path_buf())),
        std::sync::Arc::new(StubAcquirer { behavior }),
        std::sync::Arc::new(StubTranscoder),
    );
    (state, root)
}

/// Workspace directories currently present under the root
fn workspace_count(root: &TempDir) -> usize {
    std::fs::read_dir(root.path())
        .map(|entries| entries.filter_map(|e| e.ok()).count())
        .unwrap_or(0)
}

async fn send_get(app: Router, uri: &str) -> axum::http::Response<Body> {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_api_server_spawns() {
    let (state, _root) = test_state(StubBehavior::WriteFiles(vec![]));
    let mut config = (*state.config).clone();
    config.server.bind_address = "127.0.0.1:0".parse().unwrap();

    let state = AppState {
        config: std::sync::Arc::new(config),
        ..state
    };

    let handle = tokio::spawn(async move { start_api_server(state).await });
    tokio::time::sleep(Duration::from_millis(100)).await;
    handle.abort();
}

#[tokio::test]
async fn test_cors_headers_present() {
    let (state, _root) = test_state(StubBehavior::WriteFiles(vec![]));
    let app = create_router(state);

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .contains_key("access-control-allow-origin"));
}
