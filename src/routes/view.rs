use axum::{extract::State, http::StatusCode, Extension, Json};
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    middleware::RequestId,
    models::{GenreId, PageInput, ViewMode},
    routes::AppState,
    services::ViewSnapshot,
};

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub term: String,
}

#[derive(Debug, Deserialize)]
pub struct GenreRequest {
    /// `null` selects all genres
    pub genre_id: Option<GenreId>,
}

#[derive(Debug, Deserialize)]
pub struct PageRequest {
    pub page: PageInput,
}

#[derive(Debug, Deserialize)]
pub struct ModeRequest {
    pub mode: ViewMode,
}

pub async fn snapshot(State(state): State<Arc<AppState>>) -> Json<ViewSnapshot> {
    Json(state.view.snapshot().await)
}

/// Handler for search box input; the fetch follows once typing pauses
pub async fn set_search(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SearchRequest>,
) -> Json<ViewSnapshot> {
    state.view.set_search_term(request.term).await;
    Json(state.view.snapshot().await)
}

pub async fn clear_search(State(state): State<Arc<AppState>>) -> Json<ViewSnapshot> {
    state.view.clear_search().await;
    Json(state.view.snapshot().await)
}

pub async fn select_genre(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<GenreRequest>,
) -> Json<ViewSnapshot> {
    tracing::debug!(request_id = %request_id, genre_id = ?request.genre_id, "Selecting genre");
    state.view.select_genre(request.genre_id).await;
    Json(state.view.snapshot().await)
}

pub async fn go_to_page(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PageRequest>,
) -> Json<ViewSnapshot> {
    state.view.go_to_page(&request.page).await;
    Json(state.view.snapshot().await)
}

pub async fn next_page(State(state): State<Arc<AppState>>) -> Json<ViewSnapshot> {
    state.view.next_page().await;
    Json(state.view.snapshot().await)
}

pub async fn previous_page(State(state): State<Arc<AppState>>) -> Json<ViewSnapshot> {
    state.view.previous_page().await;
    Json(state.view.snapshot().await)
}

pub async fn set_mode(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ModeRequest>,
) -> Json<ViewSnapshot> {
    state.view.set_mode(request.mode).await;
    Json(state.view.snapshot().await)
}

pub async fn dismiss_notification(State(state): State<Arc<AppState>>) -> StatusCode {
    state.view.dismiss_notification().await;
    StatusCode::NO_CONTENT
}
