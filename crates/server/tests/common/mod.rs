//! Common test utilities for E2E testing with mocks.
//!
//! This module provides a test fixture that creates an in-process router
//! with mock adapters injected, enabling E2E testing of the HTTP API
//! without yt-dlp, demucs or ffmpeg installed.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use stemyard_core::testing::{MockAcquirer, MockSeparator, MockTranscoder};
use stemyard_core::{Config, ProcessorConfig};
use stemyard_server::{Adapters, AppState};

/// Re-export fixtures for test convenience
pub use stemyard_core::testing::fixtures;

/// Test fixture for E2E testing with mock dependencies.
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    pub state: Arc<AppState>,
    /// Mock acquirer - configure search results and download failures
    pub acquirer: Arc<MockAcquirer>,
    /// Mock separator - control separation duration and failures
    pub separator: Arc<MockSeparator>,
    pub transcoder: Arc<MockTranscoder>,
    /// Temporary directory holding the library roots
    pub temp_dir: TempDir,
    pub music_dir: PathBuf,
    pub separated_dir: PathBuf,
    pub work_dir: PathBuf,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
    pub text: String,
}

impl TestFixture {
    /// Create a new test fixture with default mocks.
    pub async fn new() -> Self {
        Self::with_config(TestConfig::default()).await
    }

    /// Create a test fixture with custom configuration.
    pub async fn with_config(test_config: TestConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let music_dir = temp_dir.path().join("music");
        let separated_dir = temp_dir.path().join("separated");
        let work_dir = temp_dir.path().join("work");
        let static_dir = temp_dir.path().join("static");
        std::fs::create_dir_all(&music_dir).expect("Failed to create music dir");
        std::fs::create_dir_all(&separated_dir).expect("Failed to create separated dir");

        if test_config.with_frontend {
            std::fs::create_dir_all(&static_dir).expect("Failed to create static dir");
            std::fs::write(static_dir.join("index.html"), "<html>stemyard</html>")
                .expect("Failed to write index.html");
        }

        let mut config = Config::default();
        config.library.music_dir = music_dir.clone();
        config.library.separated_dir = separated_dir.clone();
        config.separator = config.separator.with_work_dir(work_dir.clone());
        config.server.static_dir = static_dir;
        config.processor =
            ProcessorConfig::default().with_max_parallel_jobs(test_config.max_parallel_jobs);

        let acquirer = Arc::new(MockAcquirer::new(&music_dir));
        let separator = Arc::new(MockSeparator::new());
        let transcoder = Arc::new(MockTranscoder::new());

        let adapters = Adapters {
            acquirer: Arc::clone(&acquirer) as Arc<dyn stemyard_core::Acquirer>,
            separator: Arc::clone(&separator) as Arc<dyn stemyard_core::Separator>,
            transcoder: Arc::clone(&transcoder) as Arc<dyn stemyard_core::Transcoder>,
        };

        let state = Arc::new(AppState::new(config, adapters));
        let router = stemyard_server::api::create_router(Arc::clone(&state));

        Self {
            router,
            state,
            acquirer,
            separator,
            transcoder,
            temp_dir,
            music_dir,
            separated_dir,
            work_dir,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a DELETE request.
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path, None).await
    }

    /// Send a POST request with raw string body (for testing malformed JSON).
    pub async fn post_raw(&self, path: &str, body: &str) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let mut request_builder = Request::builder().method(method).uri(path);

        let body = if let Some(json_body) = body {
            request_builder = request_builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&json_body).unwrap())
        } else {
            Body::empty()
        };

        self.send(request_builder.body(body).unwrap()).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let text = String::from_utf8_lossy(&body_bytes).into_owned();
        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body, text }
    }

    /// Poll a task until it reaches `status` or the timeout expires.
    pub async fn wait_for_task_status(&self, task_id: &str, status: &str) -> Value {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            let response = self.get(&format!("/api/task/{}", task_id)).await;
            if response.body["status"] == status {
                return response.body;
            }
            if tokio::time::Instant::now() > deadline {
                panic!(
                    "Task {} never reached '{}', last: {}",
                    task_id, status, response.body
                );
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }
}

/// Configuration for test fixture.
#[derive(Debug, Clone)]
pub struct TestConfig {
    pub max_parallel_jobs: usize,
    /// Serve a fake web frontend from the static dir
    pub with_frontend: bool,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            max_parallel_jobs: 2,
            with_frontend: false,
        }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
