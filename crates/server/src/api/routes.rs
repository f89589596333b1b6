use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

use super::{handlers, library, media, middleware::metrics_middleware, tasks};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let library_config = &state.config().library;
    let music_dir = library_config.music_dir.clone();
    let separated_dir = library_config.separated_dir.clone();
    let static_dir = state.config().server.static_dir.clone();

    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .route("/processor", get(handlers::processor_status))
        // Acquisition and separation
        .route("/search", post(media::search))
        .route("/download", post(media::download))
        .route("/separate", post(media::separate))
        // Tasks
        .route("/task/{id}", get(tasks::get_task).delete(tasks::cancel_task))
        .route("/tasks", get(tasks::list_tasks))
        // Library
        .route("/songs", get(library::list_songs))
        .route("/separated/{id}", get(library::get_stems))
        .route("/artists", get(library::list_artists))
        .route("/stats", get(library::get_stats))
        .with_state(Arc::clone(&state));

    let mut router = Router::new()
        .nest("/api", api_routes)
        .route("/metrics", get(handlers::get_metrics).with_state(state))
        .nest_service("/music", ServeDir::new(music_dir))
        .nest_service("/separated", ServeDir::new(separated_dir));

    // Web frontend, only when built
    if static_dir.is_dir() {
        let index_path = static_dir.join("index.html");
        let serve_dir = ServeDir::new(&static_dir).fallback(ServeFile::new(index_path));
        router = router.fallback_service(serve_dir);
    }

    router
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
