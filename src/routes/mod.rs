use std::sync::Arc;

use axum::{
    http::StatusCode,
    middleware,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    middleware::{make_span_with_request_id, request_id_middleware},
    services::ViewOrchestrator,
};

pub mod catalog;
pub mod view;
pub mod watchlist;

/// Shared handler state
pub struct AppState {
    pub view: Arc<ViewOrchestrator>,
}

impl AppState {
    pub fn new(view: Arc<ViewOrchestrator>) -> Arc<Self> {
        Arc::new(Self { view })
    }
}

/// Creates the application router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(CorsLayer::permissive())
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id)),
        )
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        // Page state
        .route("/view", get(view::snapshot))
        .route("/search", put(view::set_search).delete(view::clear_search))
        .route("/genre", put(view::select_genre))
        .route("/page", put(view::go_to_page))
        .route("/page/next", post(view::next_page))
        .route("/page/previous", post(view::previous_page))
        .route("/mode", put(view::set_mode))
        .route("/notification", delete(view::dismiss_notification))
        // Catalog sections
        .route("/genres", get(catalog::genres))
        .route("/trending", get(catalog::trending))
        .route("/trends", get(catalog::community_trends))
        .route("/movies/:id", get(catalog::movie_details))
        .route("/selection", delete(catalog::close_details))
        // Watchlist
        .route("/watchlist", get(watchlist::list))
        .route("/watchlist/toggle", post(watchlist::toggle))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
