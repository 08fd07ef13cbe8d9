use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::info;

use super::{handlers, jobs, middleware::metrics_middleware};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Jobs
        .route("/jobs", post(jobs::submit_job))
        .route("/jobs/{id}", get(jobs::get_job))
        .route("/conversions/{id}", get(jobs::get_conversion));

    let mut router = Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .with_state(Arc::clone(&state));

    // In local mode this process serves the published artifacts
    if state.serves_artifacts() {
        let storage = &state.config().storage;
        let prefix = format!("/{}", storage.public_prefix.trim_matches('/'));
        info!(
            prefix = %prefix,
            root = %storage.output_root.display(),
            "Serving artifacts"
        );
        let serve_dir = ServeDir::new(&storage.output_root);
        router = if prefix == "/" {
            router.fallback_service(serve_dir)
        } else {
            router.nest_service(&prefix, serve_dir)
        };
    }

    router
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
}
