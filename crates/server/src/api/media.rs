//! Search, download and separation handlers.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use stemyard_core::{metrics as core_metrics, DownloadRequest, SeparationJob, VideoSummary};
use tracing::info;

use super::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Default number of search results
const DEFAULT_MAX_RESULTS: usize = 5;

/// Maximum allowed number of search results
const MAX_RESULTS_LIMIT: usize = 50;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SearchBody {
    pub query: String,
    #[serde(default)]
    pub max_results: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub success: bool,
    pub results: Vec<VideoSummary>,
}

#[derive(Debug, Deserialize)]
pub struct DownloadBody {
    pub video_id: String,
    pub title: String,
    #[serde(default)]
    pub artist: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DownloadResponse {
    pub success: bool,
    pub task_id: String,
    pub file_path: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct SeparateBody {
    pub file_path: PathBuf,
    /// Model name; the configured default when absent.
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub device: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SeparateResponse {
    pub success: bool,
    pub task_id: String,
    pub message: String,
}

/// Blank strings count as absent.
fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// ============================================================================
// Handlers
// ============================================================================

/// Search the video platform.
pub async fn search(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SearchBody>,
) -> ApiResult<Json<SearchResponse>> {
    let query = body.query.trim();
    if query.is_empty() {
        return Err(ApiError::bad_request("query must not be empty"));
    }
    let limit = body
        .max_results
        .unwrap_or(DEFAULT_MAX_RESULTS)
        .clamp(1, MAX_RESULTS_LIMIT);

    let result = state.acquirer().search(query, limit).await;
    let label = if result.is_ok() { "success" } else { "failure" };
    core_metrics::SEARCHES_TOTAL.with_label_values(&[label]).inc();

    let results = result?;
    info!(query, count = results.len(), "Search finished");
    Ok(Json(SearchResponse {
        success: true,
        results,
    }))
}

/// Download a video's audio. Waits for the download; the task stays queryable.
pub async fn download(
    State(state): State<Arc<AppState>>,
    Json(body): Json<DownloadBody>,
) -> ApiResult<Json<DownloadResponse>> {
    if body.video_id.trim().is_empty() {
        return Err(ApiError::bad_request("video_id must not be empty"));
    }
    if body.title.trim().is_empty() {
        return Err(ApiError::bad_request("title must not be empty"));
    }

    let mut request = DownloadRequest::new(body.video_id.trim(), body.title.trim());
    if let Some(artist) = non_blank(body.artist) {
        request = request.with_artist(artist);
    }

    let (task_id, file_path) = state.processor().download(request).await?;
    Ok(Json(DownloadResponse {
        success: true,
        task_id,
        file_path,
    }))
}

/// Queue a separation and return its task id.
pub async fn separate(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SeparateBody>,
) -> ApiResult<Json<SeparateResponse>> {
    if body.file_path.as_os_str().is_empty() {
        return Err(ApiError::bad_request("file_path must not be empty"));
    }

    let mut job = SeparationJob::new(body.file_path).with_artist(non_blank(body.artist));
    if let Some(model) = non_blank(body.model) {
        job = job.with_model(model);
    }
    if let Some(device) = non_blank(body.device) {
        job = job.with_device(device);
    }

    let task_id = state.processor().submit_separation(job)?;
    Ok(Json(SeparateResponse {
        success: true,
        task_id,
        message: "Separation started".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(None), None);
        assert_eq!(non_blank(Some("   ".to_string())), None);
        assert_eq!(
            non_blank(Some(" Radiohead ".to_string())),
            Some("Radiohead".to_string())
        );
    }

    #[test]
    fn test_separate_body_defaults() {
        let body: SeparateBody =
            serde_json::from_str(r#"{"file_path": "music/Song A.mp3"}"#).unwrap();
        assert_eq!(body.file_path, PathBuf::from("music/Song A.mp3"));
        assert!(body.model.is_none());
        assert!(body.artist.is_none());
    }
}
