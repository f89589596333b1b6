//! End-to-end tests with mocked external tools.
//!
//! These tests run the full router in-process with mock implementations of
//! yt-dlp, demucs and ffmpeg, against a temporary library on disk.

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use serde_json::json;
use stemyard_core::{AcquisitionError, SeparationError};

use common::{fixtures, TestConfig, TestFixture};

const SIX_STEMS: [&str; 6] = ["bass", "drums", "guitar", "other", "piano", "vocals"];

// =============================================================================
// Basic API Tests
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let fixture = TestFixture::new().await;
    let response = fixture.get("/api/health").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
    assert_eq!(response.body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_config_endpoint() {
    let fixture = TestFixture::new().await;
    let response = fixture.get("/api/config").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(
        response.body["library"]["music_dir"],
        fixture.music_dir.display().to_string()
    );
    assert_eq!(response.body["separator"]["default_model"], "htdemucs_6s");
}

#[tokio::test]
async fn test_processor_status() {
    let fixture = TestFixture::with_config(TestConfig {
        max_parallel_jobs: 3,
        ..Default::default()
    })
    .await;
    let response = fixture.get("/api/processor").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["max_concurrent"], 3);
    assert_eq!(response.body["active_jobs"], 0);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let fixture = TestFixture::new().await;
    fixture.get("/api/health").await;

    let response = fixture.get("/metrics").await;
    assert_status!(response, StatusCode::OK);
    assert!(response.text.contains("stemyard_http_requests_total"));
    assert!(response.text.contains("stemyard_tasks_by_status"));
}

// =============================================================================
// Search
// =============================================================================

#[tokio::test]
async fn test_search_returns_results() {
    let fixture = TestFixture::new().await;
    fixture
        .acquirer
        .set_results(vec![
            fixtures::video("abc123", "High and Dry"),
            fixtures::video("def456", "High and Dry (Live)"),
        ])
        .await;

    let response = fixture
        .post("/api/search", json!({ "query": "high and dry", "max_results": 1 }))
        .await;

    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["success"], true);
    let results = response.body["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["video_id"], "abc123");
    assert_eq!(results[0]["duration"], 215);
    assert_eq!(
        fixture.acquirer.recorded_searches().await,
        vec!["high and dry".to_string()]
    );
}

#[tokio::test]
async fn test_search_rejects_empty_query() {
    let fixture = TestFixture::new().await;
    let response = fixture.post("/api/search", json!({ "query": "   " })).await;
    assert_status!(response, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["success"], false);
    assert!(fixture.acquirer.recorded_searches().await.is_empty());
}

#[tokio::test]
async fn test_search_backend_failure_is_bad_gateway() {
    let fixture = TestFixture::new().await;
    fixture
        .acquirer
        .set_next_error(AcquisitionError::ProcessFailed {
            code: Some(1),
            stderr: "ERROR: network unreachable".to_string(),
        })
        .await;

    let response = fixture.post("/api/search", json!({ "query": "creep" })).await;
    assert_status!(response, StatusCode::BAD_GATEWAY);
    assert_eq!(response.body["success"], false);
    assert!(response.body["error"]
        .as_str()
        .unwrap()
        .contains("network unreachable"));
}

#[tokio::test]
async fn test_malformed_json_is_rejected() {
    let fixture = TestFixture::new().await;
    let response = fixture.post_raw("/api/search", "{ not json").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

// =============================================================================
// Download
// =============================================================================

#[tokio::test]
async fn test_download_writes_track_and_tracks_task() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .post(
            "/api/download",
            json!({ "video_id": "abc123", "title": "High and Dry", "artist": "Radiohead" }),
        )
        .await;

    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["success"], true);
    let expected = fixture.music_dir.join("Radiohead").join("High and Dry.mp3");
    assert_eq!(response.body["file_path"], expected.display().to_string());
    assert!(expected.is_file());

    let task_id = response.body["task_id"].as_str().unwrap().to_string();
    assert!(task_id.starts_with("download_"));

    let task = fixture.get(&format!("/api/task/{}", task_id)).await;
    assert_status!(task, StatusCode::OK);
    assert_eq!(task.body["kind"], "download");
    assert_eq!(task.body["status"], "completed");
    assert_eq!(task.body["progress"], 100);
    assert_eq!(task.body["file_path"], expected.display().to_string());
    assert!(task.body.get("output_dir").is_none());
}

#[tokio::test]
async fn test_download_without_artist_lands_in_music_root() {
    let fixture = TestFixture::new().await;

    let response = fixture
        .post("/api/download", json!({ "video_id": "xyz", "title": "Song A" }))
        .await;

    assert_status!(response, StatusCode::OK);
    assert!(fixture.music_dir.join("Song A.mp3").is_file());

    let stats = fixture.get("/api/stats").await;
    assert_eq!(stats.body["stats"]["total_songs"], 1);
    assert_eq!(stats.body["stats"]["total_artists"], 0);
}

#[tokio::test]
async fn test_download_failure_marks_task_failed() {
    let fixture = TestFixture::new().await;
    fixture
        .acquirer
        .set_next_error(AcquisitionError::ProcessFailed {
            code: Some(1),
            stderr: "Video unavailable".to_string(),
        })
        .await;

    let response = fixture
        .post("/api/download", json!({ "video_id": "gone", "title": "Gone" }))
        .await;
    assert_status!(response, StatusCode::BAD_GATEWAY);

    let tasks = fixture.get("/api/tasks").await;
    let tasks = tasks.body["tasks"].as_array().unwrap().clone();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["status"], "failed");
    assert!(tasks[0]["message"]
        .as_str()
        .unwrap()
        .starts_with("Download failed"));
}

#[tokio::test]
async fn test_download_requires_video_id() {
    let fixture = TestFixture::new().await;
    let response = fixture
        .post("/api/download", json!({ "video_id": "", "title": "Song" }))
        .await;
    assert_status!(response, StatusCode::BAD_REQUEST);
    assert!(fixture.acquirer.recorded_downloads().await.is_empty());
}

#[tokio::test]
async fn test_download_artist_cannot_leave_music_root() {
    let fixture = TestFixture::new().await;
    let response = fixture
        .post(
            "/api/download",
            json!({ "video_id": "abc", "title": "Song A", "artist": ".." }),
        )
        .await;
    assert_status!(response, StatusCode::BAD_REQUEST);
    assert!(!fixture.temp_dir.path().join("Song A.mp3").exists());
    assert!(!fixture.music_dir.join("Song A.mp3").exists());
}

#[tokio::test]
async fn test_dot_title_falls_back_to_video_id() {
    let fixture = TestFixture::new().await;
    let response = fixture
        .post("/api/download", json!({ "video_id": "abc", "title": ".." }))
        .await;
    assert_status!(response, StatusCode::OK);
    let expected = fixture.music_dir.join("abc.mp3");
    assert_eq!(response.body["file_path"], expected.display().to_string());

    let songs = fixture.get("/api/songs").await;
    assert_eq!(songs.body["songs"][0]["title"], "abc");
}

// =============================================================================
// Separation
// =============================================================================

#[tokio::test]
async fn test_separate_groups_stems_by_artist() {
    let fixture = TestFixture::new().await;
    let track = fixtures::track(&fixture.music_dir, Some("Radiohead"), "High and Dry");

    let response = fixture
        .post(
            "/api/separate",
            json!({ "file_path": track, "artist": "Radiohead" }),
        )
        .await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["success"], true);
    let task_id = response.body["task_id"].as_str().unwrap().to_string();
    assert!(task_id.starts_with("separate_"));

    let task = fixture.wait_for_task_status(&task_id, "completed").await;
    let expected = fixture.separated_dir.join("Radiohead").join("High and Dry");
    assert_eq!(task["output_dir"], expected.display().to_string());
    assert_eq!(task["progress"], 100);
    assert!(task.get("file_path").is_none());

    for stem in SIX_STEMS {
        assert!(expected.join(format!("{}.mp3", stem)).is_file(), "missing {}", stem);
    }
    assert!(!fixture.work_dir.join(&task_id).exists());

    let stems = fixture.get("/api/separated/High%20and%20Dry").await;
    assert_status!(stems, StatusCode::OK);
    let files = &stems.body["files"];
    assert_eq!(files["song_id"], "High and Dry");
    let names: Vec<&str> = files["stems"]
        .as_object()
        .unwrap()
        .keys()
        .map(String::as_str)
        .collect();
    assert_eq!(names, SIX_STEMS);
}

#[tokio::test]
async fn test_separate_without_artist_colocates_stems() {
    let fixture = TestFixture::new().await;
    let track = fixtures::track(&fixture.music_dir, None, "Song A");

    let response = fixture
        .post(
            "/api/separate",
            json!({ "file_path": track, "model": "htdemucs" }),
        )
        .await;
    let task_id = response.body["task_id"].as_str().unwrap().to_string();

    let task = fixture.wait_for_task_status(&task_id, "completed").await;
    let expected = fixture.music_dir.join("Song A");
    assert_eq!(task["output_dir"], expected.display().to_string());

    let recorded = fixture.separator.recorded_requests().await;
    assert_eq!(recorded[0].model, "htdemucs");

    // Colocated stem dirs are not tracks or artists
    let songs = fixture.get("/api/songs").await;
    assert_eq!(songs.body["songs"].as_array().unwrap().len(), 1);
    let artists = fixture.get("/api/artists").await;
    assert!(artists.body["artists"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_separate_missing_track_is_not_found() {
    let fixture = TestFixture::new().await;
    let missing = fixture.music_dir.join("Nope.mp3");

    let response = fixture
        .post("/api/separate", json!({ "file_path": missing }))
        .await;
    assert_status!(response, StatusCode::NOT_FOUND);
    assert_eq!(fixture.separator.separation_count().await, 0);
}

#[tokio::test]
async fn test_separator_failure_marks_task_failed() {
    let fixture = TestFixture::new().await;
    let track = fixtures::track(&fixture.music_dir, None, "Broken");
    fixture
        .separator
        .set_next_error(SeparationError::ProcessFailed {
            code: Some(1),
            stderr: "CUDA out of memory".to_string(),
        })
        .await;

    let response = fixture
        .post("/api/separate", json!({ "file_path": track }))
        .await;
    let task_id = response.body["task_id"].as_str().unwrap().to_string();

    let task = fixture.wait_for_task_status(&task_id, "failed").await;
    let message = task["message"].as_str().unwrap();
    assert!(message.starts_with("Separation failed"), "{}", message);
    assert!(task.get("output_dir").is_none());
}

// =============================================================================
// Tasks
// =============================================================================

#[tokio::test]
async fn test_unknown_task_is_not_found() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/api/task/separate_missing").await;
    assert_status!(response, StatusCode::NOT_FOUND);
    assert_eq!(response.body["success"], false);

    let response = fixture.delete("/api/task/separate_missing").await;
    assert_status!(response, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cancel_running_separation() {
    let fixture = TestFixture::new().await;
    let track = fixtures::track(&fixture.music_dir, None, "Long Song");
    fixture.separator.set_duration(Duration::from_secs(10)).await;

    let response = fixture
        .post("/api/separate", json!({ "file_path": track }))
        .await;
    let task_id = response.body["task_id"].as_str().unwrap().to_string();
    fixture.wait_for_task_status(&task_id, "running").await;

    let response = fixture.delete(&format!("/api/task/{}", task_id)).await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["task_id"], task_id);

    let task = fixture.wait_for_task_status(&task_id, "failed").await;
    assert_eq!(task["message"], "Cancelled");
    assert!(!fixture.music_dir.join("Long Song").exists());

    // Finished tasks cannot be cancelled again
    let response = fixture.delete(&format!("/api/task/{}", task_id)).await;
    assert_status!(response, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_queued_jobs_wait_for_a_slot() {
    let fixture = TestFixture::with_config(TestConfig {
        max_parallel_jobs: 1,
        ..Default::default()
    })
    .await;
    let first = fixtures::track(&fixture.music_dir, None, "First");
    let second = fixtures::track(&fixture.music_dir, None, "Second");
    fixture.separator.set_duration(Duration::from_millis(400)).await;

    let a = fixture.post("/api/separate", json!({ "file_path": first })).await;
    let a = a.body["task_id"].as_str().unwrap().to_string();
    fixture.wait_for_task_status(&a, "running").await;

    let b = fixture.post("/api/separate", json!({ "file_path": second })).await;
    let b = b.body["task_id"].as_str().unwrap().to_string();

    let queued = fixture.get(&format!("/api/task/{}", b)).await;
    assert_eq!(queued.body["status"], "pending");
    assert_eq!(queued.body["message"], "Queued");

    fixture.wait_for_task_status(&a, "completed").await;
    fixture.wait_for_task_status(&b, "completed").await;

    let status = fixture.get("/api/processor").await;
    assert_eq!(status.body["total_processed"], 2);
    assert_eq!(status.body["queued_jobs"], 0);

    let tasks = fixture.get("/api/tasks").await;
    let ids: Vec<&str> = tasks.body["tasks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["task_id"].as_str().unwrap())
        .collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&a.as_str()));
    assert!(ids.contains(&b.as_str()));
}

// =============================================================================
// Library
// =============================================================================

#[tokio::test]
async fn test_songs_filtered_by_artist() {
    let fixture = TestFixture::new().await;
    fixtures::track(&fixture.music_dir, Some("Radiohead"), "Creep");
    fixtures::track(&fixture.music_dir, Some("Radiohead"), "Airbag");
    fixtures::track(&fixture.music_dir, Some("Portishead"), "Roads");
    fixtures::track(&fixture.music_dir, None, "Loose Track");

    let all = fixture.get("/api/songs").await;
    assert_status!(all, StatusCode::OK);
    let songs = all.body["songs"].as_array().unwrap();
    let order: Vec<(&str, &str)> = songs
        .iter()
        .map(|s| (s["artist"].as_str().unwrap(), s["title"].as_str().unwrap()))
        .collect();
    assert_eq!(
        order,
        vec![
            ("Portishead", "Roads"),
            ("Radiohead", "Airbag"),
            ("Radiohead", "Creep"),
            ("Unknown", "Loose Track"),
        ]
    );

    let filtered = fixture.get("/api/songs?artist=Radiohead").await;
    let songs = filtered.body["songs"].as_array().unwrap();
    assert_eq!(songs.len(), 2);
    assert!(songs.iter().all(|s| s["artist"] == "Radiohead"));

    let artists = fixture.get("/api/artists").await;
    assert_eq!(artists.body["artists"], json!(["Portishead", "Radiohead"]));

    let stats = fixture.get("/api/stats").await;
    assert_eq!(stats.body["success"], true);
    assert_eq!(stats.body["stats"]["total_songs"], 4);
    assert_eq!(stats.body["stats"]["total_artists"], 2);
    assert_eq!(stats.body["stats"]["total_separated"], 0);
}

#[tokio::test]
async fn test_unknown_song_has_empty_stem_set() {
    let fixture = TestFixture::new().await;
    let response = fixture.get("/api/separated/nothing-here").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["success"], true);
    assert!(response.body["files"]["output_dir"].is_null());
    assert!(response.body["files"]["stems"].as_object().unwrap().is_empty());
}

// =============================================================================
// Static files
// =============================================================================

#[tokio::test]
async fn test_music_files_are_served() {
    let fixture = TestFixture::new().await;
    fixtures::track(&fixture.music_dir, Some("Radiohead"), "Creep");

    let response = fixture.get("/music/Radiohead/Creep.mp3").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.text, "fake mp3 data");
}

#[tokio::test]
async fn test_frontend_fallback_serves_index() {
    let fixture = TestFixture::with_config(TestConfig {
        with_frontend: true,
        ..Default::default()
    })
    .await;

    let response = fixture.get("/").await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.text.contains("stemyard"));

    let response = fixture.get("/library/some-view").await;
    assert!(response.text.contains("stemyard"));
}

#[tokio::test]
async fn test_no_frontend_means_not_found() {
    let fixture = TestFixture::new().await;
    let response = fixture.get("/").await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}
