//! Integration tests for the document API.
//!
//! These run against the in-memory backend; no database is needed.

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use podvault_engine::{
    HttpRemote, ManualClock, MemoryKv, MirrorConfig, MirrorState, RemoteDocumentStore,
    Session, SessionOptions, StatusLog,
};
use podvault_server::{app, AppState, Config, DocumentStore};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const DOC_PATH: &str = "/v1/projects/studio/documents/podcast_dashboard/main";

fn test_app(api_key: Option<&str>) -> Router {
    let config = Config {
        api_key: api_key.map(str::to_string),
        ..Config::default()
    };
    app(AppState::new(DocumentStore::memory(), config))
}

fn request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    match body {
        Some(body) => builder.body(Body::from(body.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[cfg(test)]
mod http_tests {
    use super::*;

    #[tokio::test]
    async fn health_reports_backend() {
        let response = test_app(None)
            .oneshot(request("GET", "/health", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["storage"], "memory");
    }

    #[tokio::test]
    async fn missing_document_is_404() {
        let response = test_app(None)
            .oneshot(request("GET", DOC_PATH, None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(json_body(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn patch_merges_top_level_fields() {
        let app = test_app(None);

        let first = app
            .clone()
            .oneshot(request(
                "PATCH",
                DOC_PATH,
                Some(json!({"label": "cloud_bootstrap", "data": {"brand": {"name": "X"}}})),
            ))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        assert!(first.headers().contains_key("x-updated-at"));

        let second = app
            .clone()
            .oneshot(request("PATCH", DOC_PATH, Some(json!({"label": "edit", "updatedBy": "desk"}))))
            .await
            .unwrap();
        assert_eq!(
            json_body(second).await,
            json!({"label": "edit", "data": {"brand": {"name": "X"}}, "updatedBy": "desk"})
        );

        let read = app.oneshot(request("GET", DOC_PATH, None)).await.unwrap();
        assert_eq!(read.status(), StatusCode::OK);
        assert_eq!(json_body(read).await["label"], "edit");
    }

    #[tokio::test]
    async fn patch_rejects_non_objects() {
        let response = test_app(None)
            .oneshot(request("PATCH", DOC_PATH, Some(json!([1, 2, 3]))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn documents_are_scoped_by_project() {
        let app = test_app(None);
        app.clone()
            .oneshot(request("PATCH", DOC_PATH, Some(json!({"v": 1}))))
            .await
            .unwrap();

        let other = app
            .oneshot(request(
                "GET",
                "/v1/projects/other/documents/podcast_dashboard/main",
                None,
            ))
            .await
            .unwrap();
        assert_eq!(other.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn api_key_is_enforced_when_configured() {
        let app = test_app(Some("secret"));

        let anonymous = app
            .clone()
            .oneshot(request("GET", DOC_PATH, None))
            .await
            .unwrap();
        assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

        let mut wrong = request("GET", DOC_PATH, None);
        wrong.headers_mut().insert("x-api-key", "nope".parse().unwrap());
        assert_eq!(
            app.clone().oneshot(wrong).await.unwrap().status(),
            StatusCode::UNAUTHORIZED
        );

        let mut header_key = request("GET", DOC_PATH, None);
        header_key
            .headers_mut()
            .insert("x-api-key", "secret".parse().unwrap());
        assert_eq!(
            app.clone().oneshot(header_key).await.unwrap().status(),
            StatusCode::NOT_FOUND
        );

        let mut bearer = request("GET", DOC_PATH, None);
        bearer
            .headers_mut()
            .insert("authorization", "Bearer secret".parse().unwrap());
        assert_eq!(
            app.oneshot(bearer).await.unwrap().status(),
            StatusCode::NOT_FOUND
        );
    }
}

#[cfg(test)]
mod client_tests {
    use super::*;

    /// Serve the app on an ephemeral port and return its base URL.
    async fn spawn_server(api_key: Option<&str>) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = test_app(api_key);
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn mirror_config(endpoint: String, api_key: &str) -> MirrorConfig {
        MirrorConfig {
            api_key: api_key.into(),
            project_id: "studio".into(),
            app_id: "1:123:web:abc".into(),
            endpoint,
            writer: "desk".into(),
            ..Default::default()
        }
        .validate()
        .unwrap()
    }

    #[tokio::test]
    async fn http_remote_reads_and_merges() {
        let endpoint = spawn_server(Some("secret")).await;
        let remote = HttpRemote::new(&mirror_config(endpoint, "secret"));

        assert_eq!(remote.read().await.unwrap(), None);

        remote
            .write_merge(json!({"label": "a", "data": {"brand": {"name": "X"}}}))
            .await
            .unwrap();
        remote.write_merge(json!({"label": "b"})).await.unwrap();

        let document = remote.read().await.unwrap().unwrap();
        assert_eq!(document["label"], "b");
        assert_eq!(document["data"]["brand"]["name"], "X");
    }

    #[tokio::test]
    async fn http_remote_reports_auth_failure() {
        let endpoint = spawn_server(Some("secret")).await;
        let remote = HttpRemote::new(&mirror_config(endpoint, "wrong"));

        let err = remote.read().await.unwrap_err();
        assert!(matches!(
            err,
            podvault_engine::RemoteError::Status { code: 401, .. }
        ));
    }

    #[tokio::test]
    async fn session_bootstraps_then_pulls_through_server() {
        let endpoint = spawn_server(None).await;
        let config = mirror_config(endpoint, "any-key");
        let clock = Arc::new(ManualClock::at_millis(1_700_000_000_000));

        // First device: empty remote gets bootstrapped with local data
        let log = StatusLog::new();
        let mut first = Session::boot(
            MemoryKv::new(),
            HttpRemote::new(&config),
            SessionOptions::default()
                .with_mirror(config.clone())
                .with_clock(clock.clone())
                .with_sink(Arc::new(log.clone())),
        )
        .await;
        assert_eq!(first.mirror_state(), MirrorState::Active);
        first.import_document(r#"{"brand": {"name": "Shared Show"}}"#).unwrap();

        let remote = HttpRemote::new(&config);
        let mut pushed = false;
        for _ in 0..50 {
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            if let Some(doc) = remote.read().await.unwrap() {
                if doc["label"] == "import" {
                    pushed = true;
                    break;
                }
            }
        }
        assert!(pushed, "import never reached the server");

        // Second device: remote wins over its empty local store
        let second = Session::boot(
            MemoryKv::new(),
            HttpRemote::new(&config),
            SessionOptions::default()
                .with_mirror(config)
                .with_clock(clock),
        )
        .await;
        assert_eq!(second.snapshot().brand.name, "Shared Show");
    }
}
