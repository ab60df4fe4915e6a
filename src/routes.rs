// src/routes.rs

use axum::{Router, extract::DefaultBodyLimit, handler::HandlerWithoutStateExt, routing::post};
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::{
    handlers::results::{not_found, save_result},
    state::AppState,
};

/// Assembles the main application router.
///
/// * `POST /save-result` appends a quiz result; other methods on it get 404.
/// * Every other `GET`/`HEAD` is served from the configured root directory.
/// * Anything else falls through to 404.
pub fn create_router(state: AppState) -> Router {
    let static_files = ServeDir::new(&state.config.root_dir)
        .call_fallback_on_method_not_allowed(true)
        .not_found_service(not_found.into_service());

    Router::new()
        .route(
            "/save-result",
            post(save_result)
                .fallback(not_found)
                .layer(DefaultBodyLimit::max(state.config.max_body_bytes)),
        )
        .fallback_service(static_files)
        // Global Middleware
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
