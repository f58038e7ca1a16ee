use axum::{extract::State, Extension, Json};
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    error::AppResult,
    middleware::RequestId,
    models::{MovieId, MovieSummary, WatchlistEntry},
    routes::AppState,
    services::ToggleOutcome,
};

/// Either the full card being toggled, or just its id when the movie is on
/// screen or already saved
#[derive(Debug, Deserialize)]
pub struct ToggleRequest {
    pub movie_id: MovieId,
    #[serde(default)]
    pub movie: Option<MovieSummary>,
}

pub async fn list(State(state): State<Arc<AppState>>) -> Json<Vec<WatchlistEntry>> {
    Json(state.view.watchlist().await)
}

/// Handler for the save/unsave button. Rejections and rollbacks are
/// reported in the outcome, not as HTTP errors.
pub async fn toggle(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<ToggleRequest>,
) -> AppResult<Json<ToggleOutcome>> {
    let movie = match request.movie {
        Some(movie) if movie.id == request.movie_id => movie,
        _ => state.view.find_summary(request.movie_id).await?,
    };

    let outcome = state.view.toggle_watchlist(&movie).await;

    tracing::info!(
        request_id = %request_id,
        movie_id = outcome.movie_id,
        status = ?outcome.status,
        is_error = outcome.is_error,
        "Watchlist toggle finished"
    );

    Ok(Json(outcome))
}
