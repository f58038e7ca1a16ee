use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use std::sync::Arc;

use crate::{
    error::AppResult,
    middleware::RequestId,
    models::{MovieDetails, MovieId},
    routes::AppState,
    services::orchestrator::{CommunityTrends, GenreSection, TrendingSection},
};

pub async fn genres(State(state): State<Arc<AppState>>) -> Json<GenreSection> {
    Json(state.view.genres().await)
}

pub async fn trending(State(state): State<Arc<AppState>>) -> Json<TrendingSection> {
    Json(state.view.trending().await)
}

pub async fn community_trends(State(state): State<Arc<AppState>>) -> Json<CommunityTrends> {
    Json(state.view.community_trends().await)
}

/// Handler for the detail view; requesting the same id again retries
pub async fn movie_details(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Path(id): Path<MovieId>,
) -> AppResult<Json<MovieDetails>> {
    tracing::info!(request_id = %request_id, movie_id = id, "Loading movie details");

    let details = state.view.movie_details(id).await?;
    Ok(Json(details))
}

pub async fn close_details(State(state): State<Arc<AppState>>) -> StatusCode {
    state.view.close_details().await;
    StatusCode::NO_CONTENT
}
