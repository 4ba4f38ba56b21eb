use super::*;
use serde_json::Value;

#[tokio::test]
async fn health_reports_status_and_uptime() {
    let (state, _root) = test_state(StubBehavior::WriteFiles(vec![]));
    let app = create_router(state);

    let response = send_get(app, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "ok");
    assert!(json["uptime_seconds"].is_i64() || json["uptime_seconds"].is_u64());
    assert_eq!(json["active_jobs"], 0);
}

#[tokio::test]
async fn index_documents_all_endpoints() {
    let (state, _root) = test_state(StubBehavior::WriteFiles(vec![]));
    let app = create_router(state);

    let response = send_get(app, "/").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    let endpoints = json["endpoints"].as_object().unwrap();
    for path in ["/video", "/audio", "/playlist", "/download", "/process", "/health"] {
        assert!(endpoints.contains_key(path), "undocumented endpoint {path}");
    }
}

#[tokio::test]
async fn openapi_spec_is_served() {
    let (state, _root) = test_state(StubBehavior::WriteFiles(vec![]));
    let app = create_router(state);

    let response = send_get(app, "/openapi.json").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert!(json["paths"].as_object().unwrap().contains_key("/video"));
}
