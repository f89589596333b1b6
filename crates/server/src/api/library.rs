//! Library browsing handlers. Directory walks run on the blocking pool.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use stemyard_core::{LibraryStats, StemSet, Track};

use super::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SongsParams {
    pub artist: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SongsResponse {
    pub success: bool,
    pub songs: Vec<Track>,
}

#[derive(Debug, Serialize)]
pub struct StemsResponse {
    pub success: bool,
    pub files: StemSet,
}

#[derive(Debug, Serialize)]
pub struct ArtistsResponse {
    pub success: bool,
    pub artists: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub success: bool,
    pub stats: LibraryStats,
}

pub async fn list_songs(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SongsParams>,
) -> ApiResult<Json<SongsResponse>> {
    let library = state.library().clone();
    let artist = params.artist.filter(|a| !a.is_empty());
    let songs =
        tokio::task::spawn_blocking(move || library.list_tracks(artist.as_deref())).await??;
    Ok(Json(SongsResponse {
        success: true,
        songs,
    }))
}

/// Stems for a track id. Unknown ids yield an empty set, not an error.
pub async fn get_stems(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<StemsResponse>> {
    let library = state.library().clone();
    let files = tokio::task::spawn_blocking(move || library.get_stem_set(&id)).await?;
    Ok(Json(StemsResponse {
        success: true,
        files,
    }))
}

pub async fn list_artists(State(state): State<Arc<AppState>>) -> ApiResult<Json<ArtistsResponse>> {
    let library = state.library().clone();
    let artists = tokio::task::spawn_blocking(move || library.list_artists()).await??;
    Ok(Json(ArtistsResponse {
        success: true,
        artists,
    }))
}

pub async fn get_stats(State(state): State<Arc<AppState>>) -> ApiResult<Json<StatsResponse>> {
    let library = state.library().clone();
    let stats = tokio::task::spawn_blocking(move || library.library_stats()).await??;
    Ok(Json(StatsResponse {
        success: true,
        stats,
    }))
}
