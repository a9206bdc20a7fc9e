//! HTTP surface: router, handlers, error mapping and request logging.

pub mod error;
pub mod handlers;
pub mod middleware;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};

use crate::application::feed::FeedService;
use crate::infra::db::PostgresStore;
use crate::infra::media::MediaStorage;

#[derive(Clone)]
pub struct AppState {
    pub feed: Arc<FeedService>,
    pub media: Arc<MediaStorage>,
    /// Present only when the posts store is database-backed; drives the
    /// readiness half of the health probe.
    pub db: Option<PostgresStore>,
}

pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route(
            "/api/v1/posts",
            get(handlers::posts::list_posts).post(handlers::posts::create_post),
        )
        .route("/api/v1/posts/grouped", get(handlers::posts::grouped_posts))
        .route(
            "/api/v1/categories",
            get(handlers::posts::known_categories),
        )
        .route("/api/v1/posts/compose", post(handlers::posts::compose_post))
        .route("/api/v1/posts/{id}", delete(handlers::posts::delete_post))
        .route("/api/v1/media/{bucket}", post(handlers::media::upload_media))
        .route("/media/{bucket}/{*path}", get(handlers::media::serve_media))
        .route("/healthz", get(handlers::healthz))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(axum::middleware::from_fn(middleware::log_responses))
        .with_state(state)
}
