use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex,
};

use serde::Serialize;
use tokio::{sync::RwLock, task::JoinHandle};

use crate::{
    error::{AppError, AppResult},
    models::{CatalogPage, GenreId, Movie, MAX_TOTAL_PAGES},
    services::{
        catalog::MovieCatalog,
        trends::{should_record_search, TrendService},
    },
};

/// Shown for transport failures and malformed responses
pub const FETCH_FAILURE_MESSAGE: &str = "Error fetching movies. Please try again later.";

/// Everything one fetch depends on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// Settled (debounced) search text; may be empty
    pub search_text: String,
    pub genre: Option<GenreId>,
    pub page: u32,
}

/// Browse list as last applied
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ListState {
    pub movies: Vec<Movie>,
    pub total_pages: u32,
    /// Set on read while a newer submission is outstanding
    pub is_loading: bool,
    pub error: Option<String>,
    /// Generation of the request whose outcome is shown
    pub generation: u64,
}

impl Default for ListState {
    fn default() -> Self {
        Self {
            movies: Vec::new(),
            total_pages: 1,
            is_loading: false,
            error: None,
            generation: 0,
        }
    }
}

/// Turns (search text, genre, page) into a page of movies.
///
/// Every submission is tagged with a generation number. Submitting aborts
/// the previous in-flight request, and an outcome whose generation is no
/// longer the latest is dropped instead of applied, so the list always
/// reflects the most recent submission regardless of response order.
pub struct FetchPipeline {
    catalog: Arc<dyn MovieCatalog>,
    trends: TrendService,
    generation: AtomicU64,
    state: RwLock<ListState>,
    in_flight: Mutex<Option<JoinHandle<()>>>,
}

impl FetchPipeline {
    pub fn new(catalog: Arc<dyn MovieCatalog>, trends: TrendService) -> Self {
        Self {
            catalog,
            trends,
            generation: AtomicU64::new(0),
            state: RwLock::new(ListState::default()),
            in_flight: Mutex::new(None),
        }
    }

    /// Runs one request against the catalog without touching list state.
    ///
    /// Search takes precedence over the genre filter. A qualifying first-page
    /// search is counted towards community trends in the background.
    pub async fn fetch(&self, request: &FetchRequest) -> AppResult<CatalogPage> {
        let term = request.search_text.trim();

        let mut page = if term.is_empty() {
            self.catalog.discover(request.genre, request.page).await?
        } else {
            self.catalog.search(term, request.page).await?
        };
        page.total_pages = page.total_pages.min(MAX_TOTAL_PAGES);

        if should_record_search(term, request.page, page.movies.len()) {
            self.trends
                .record_in_background(term.to_string(), page.movies[0].clone());
        }

        Ok(page)
    }

    /// Starts a fetch for `request`, superseding any fetch still running.
    /// Returns the generation assigned to it.
    ///
    /// Numbering, spawning and replacing the in-flight handle happen under one
    /// lock, so concurrent submissions register in generation order.
    pub fn submit(self: &Arc<Self>, request: FetchRequest) -> u64 {
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        tracing::debug!(
            generation = generation,
            search = %request.search_text,
            genre = ?request.genre,
            page = request.page,
            catalog = self.catalog.name(),
            "Submitting movie fetch"
        );

        let pipeline = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let outcome = pipeline.fetch(&request).await;
            pipeline.apply(generation, outcome).await;
        });

        if let Some(previous) = in_flight.replace(handle) {
            previous.abort();
        }

        generation
    }

    /// Applies an outcome if it belongs to the latest generation.
    /// Returns whether it was applied.
    pub async fn apply(&self, generation: u64, outcome: AppResult<CatalogPage>) -> bool {
        let mut state = self.state.write().await;

        let latest = self.generation.load(Ordering::SeqCst);
        if generation != latest {
            tracing::debug!(
                generation = generation,
                latest = latest,
                "Discarding stale fetch response"
            );
            return false;
        }

        state.generation = generation;

        match outcome {
            Ok(page) => {
                state.movies = page.movies;
                state.total_pages = page.total_pages;
                state.error = None;
            }
            Err(e) => {
                tracing::error!(error = %e, generation = generation, "Movie fetch failed");
                state.movies = Vec::new();
                state.error = Some(user_message(&e));
            }
        }

        true
    }

    /// The applied list. Until the latest submission lands it reads as
    /// loading with no error.
    pub async fn state(&self) -> ListState {
        let mut state = self.state.read().await.clone();
        if state.generation != self.latest_generation() {
            state.is_loading = true;
            state.error = None;
        }
        state
    }

    pub fn latest_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}

/// The catalog's own message when it rejected the request, a generic one otherwise
fn user_message(error: &AppError) -> String {
    match error {
        AppError::CatalogRejected(msg) => msg.clone(),
        _ => FETCH_FAILURE_MESSAGE.to_string(),
    }
}
