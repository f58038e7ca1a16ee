//! Page-level state and the reactions that keep it consistent
//!
//! The orchestrator owns the browse query, the debounced search text, the
//! selected movie, the view mode and the notification. Whenever the
//! (debounced search, genre, page) tuple changes it submits a new fetch.

use std::{
    sync::{Arc, Weak},
    time::Duration,
};

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use serde::Serialize;
use tokio::{
    sync::{watch, RwLock},
    time::Instant,
};

use crate::{
    config::Config,
    error::{AppError, AppResult},
    models::{
        image_url, Genre, GenreId, Movie, MovieDetails, MovieId, MovieSummary, PageInput,
        PageQuery, SearchTrendRecord, SyncStatus, ViewMode, WatchlistEntry,
    },
    services::{
        catalog::MovieCatalog,
        debounce::Debouncer,
        fetch_pipeline::{FetchPipeline, FetchRequest, ListState},
        session::SessionStore,
        store::{TrendStore, WatchlistStore},
        trends::TrendService,
        watchlist::{ToggleOutcome, WatchlistSynchronizer, LOAD_FAILED_MESSAGE},
    },
};

pub const TRENDS_FAILED_MESSAGE: &str = "Could not load local trends.";
pub const TRENDING_FAILED_MESSAGE: &str = "Could not load global trends.";
pub const GENRES_FAILED_MESSAGE: &str = "Could not load genres";
pub const DETAILS_FAILED_MESSAGE: &str = "Failed to load movie details";

const TRENDING_LIMIT: usize = 10;
const HERO_IMAGE_SIZE: &str = "w1280";
const GENRE_LANGUAGE: &str = "en";

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub image_base_url: String,
    pub search_debounce: Duration,
    pub notice_ttl: Duration,
}

impl From<&Config> for OrchestratorSettings {
    fn from(config: &Config) -> Self {
        Self {
            image_base_url: config.tmdb_image_url.clone(),
            search_debounce: config.search_debounce(),
            notice_ttl: config.notice_ttl(),
        }
    }
}

/// Transient message shown to the user
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Notification {
    pub message: String,
    pub is_error: bool,
    pub shown_at: DateTime<Utc>,
    #[serde(skip)]
    expires_at: Instant,
}

impl Notification {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Movie opened in the detail view
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SelectedMovie {
    pub movie_id: MovieId,
    pub details: Option<MovieDetails>,
    pub is_loading: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct GenreSection {
    pub genres: Vec<Genre>,
    pub error: Option<String>,
}

/// Daily trending movies from the catalog
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct TrendingSection {
    pub movies: Vec<Movie>,
    pub hero_image_url: Option<String>,
    pub error: Option<String>,
}

/// Most searched terms in this deployment
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct CommunityTrends {
    pub trends: Vec<SearchTrendRecord>,
    pub error: Option<String>,
}

/// Everything the UI needs to render the page
#[derive(Debug, Clone, Serialize)]
pub struct ViewSnapshot {
    pub query: PageQuery,
    pub debounced_search: String,
    pub mode: ViewMode,
    pub list: ListState,
    pub selected: Option<SelectedMovie>,
    pub notification: Option<Notification>,
    pub watchlist: Vec<WatchlistEntry>,
    pub session_ready: bool,
    pub show_trending: bool,
    pub show_genres: bool,
}

#[derive(Default)]
struct ViewState {
    query: PageQuery,
    mode: ViewMode,
    selected: Option<SelectedMovie>,
    notification: Option<Notification>,
    genres: GenreSection,
    trending: TrendingSection,
    community: CommunityTrends,
    last_submitted: Option<FetchRequest>,
}

pub struct ViewOrchestrator {
    catalog: Arc<dyn MovieCatalog>,
    trends: TrendService,
    sessions: Arc<dyn SessionStore>,
    pipeline: Arc<FetchPipeline>,
    watchlist: WatchlistSynchronizer,
    search: Debouncer<String>,
    state: RwLock<ViewState>,
    settings: OrchestratorSettings,
}

impl ViewOrchestrator {
    /// Builds the orchestrator and starts listening for settled search text.
    /// Must be called inside a tokio runtime.
    pub fn new(
        catalog: Arc<dyn MovieCatalog>,
        trend_store: Arc<dyn TrendStore>,
        watchlist_store: Arc<dyn WatchlistStore>,
        sessions: Arc<dyn SessionStore>,
        settings: OrchestratorSettings,
    ) -> Arc<Self> {
        let trends = TrendService::new(trend_store, settings.image_base_url.clone());
        let pipeline = Arc::new(FetchPipeline::new(Arc::clone(&catalog), trends.clone()));

        let orchestrator = Arc::new(Self {
            catalog,
            trends,
            sessions,
            pipeline,
            watchlist: WatchlistSynchronizer::new(watchlist_store),
            search: Debouncer::new(String::new(), settings.search_debounce),
            state: RwLock::new(ViewState::default()),
            settings,
        });

        let settled = orchestrator.search.subscribe();
        tokio::spawn(follow_settled_search(Arc::downgrade(&orchestrator), settled));

        orchestrator
    }

    /// Loads the side sections, establishes the session and issues the
    /// first fetch
    pub async fn mount(&self) {
        let (community, trending, genres, session) = tokio::join!(
            self.trends.top_searches(),
            self.catalog.trending_today(),
            self.catalog.genres(GENRE_LANGUAGE),
            self.sessions.load_or_create(),
        );

        {
            let mut state = self.state.write().await;

            state.community = match community {
                Ok(trends) => CommunityTrends {
                    trends,
                    error: None,
                },
                Err(e) => {
                    tracing::error!(error = %e, "Failed to load community trends");
                    CommunityTrends {
                        trends: Vec::new(),
                        error: Some(TRENDS_FAILED_MESSAGE.to_string()),
                    }
                }
            };

            state.trending = match trending {
                Ok(mut movies) => {
                    movies.truncate(TRENDING_LIMIT);
                    let hero_image_url = pick_hero_image(&movies, &self.settings.image_base_url);
                    TrendingSection {
                        movies,
                        hero_image_url,
                        error: None,
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to load trending movies");
                    TrendingSection {
                        error: Some(TRENDING_FAILED_MESSAGE.to_string()),
                        ..TrendingSection::default()
                    }
                }
            };

            state.genres = match genres {
                Ok(genres) => GenreSection {
                    genres,
                    error: None,
                },
                Err(e) => {
                    tracing::error!(error = %e, "Failed to load genres");
                    GenreSection {
                        genres: Vec::new(),
                        error: Some(GENRES_FAILED_MESSAGE.to_string()),
                    }
                }
            };
        }

        match session {
            Ok(session_id) => {
                if let Err(e) = self.watchlist.bootstrap(session_id).await {
                    tracing::error!(error = %e, "Failed to load watchlist");
                    self.notify(LOAD_FAILED_MESSAGE, true).await;
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to establish guest session");
                self.notify(LOAD_FAILED_MESSAGE, true).await;
            }
        }

        self.refresh().await;

        tracing::info!(catalog = self.catalog.name(), "View mounted");
    }

    /// Submits a fetch if (debounced search, genre, page) changed since the
    /// last submission
    ///
    /// The view-state guard is held across the submission so the recorded
    /// request and the latest generation always agree.
    pub async fn refresh(&self) {
        let mut state = self.state.write().await;
        let request = FetchRequest {
            search_text: self.search.current(),
            genre: state.query.genre,
            page: state.query.page,
        };
        if state.last_submitted.as_ref() == Some(&request) {
            return;
        }
        state.last_submitted = Some(request.clone());
        self.pipeline.submit(request);
    }

    pub async fn set_search_term(&self, term: String) {
        self.state.write().await.query.set_search_term(term.clone());
        self.search.push(term);
        self.refresh().await;
    }

    /// Empties the search box without waiting for the debounce window
    pub async fn clear_search(&self) {
        self.state.write().await.query.clear_search();
        self.search.settle(String::new());
        self.refresh().await;
    }

    /// `None` selects "All"
    pub async fn select_genre(&self, genre: Option<GenreId>) {
        self.state.write().await.query.select_genre(genre);
        self.search.settle(String::new());
        self.refresh().await;
    }

    /// Jumps to a page, clamped to what the current list has
    pub async fn go_to_page(&self, input: &PageInput) -> u32 {
        let total_pages = self.pipeline.state().await.total_pages;
        let page = input.clamp(total_pages);
        self.state.write().await.query.page = page;
        self.refresh().await;
        page
    }

    /// No-op on the last page
    pub async fn next_page(&self) -> u32 {
        let total_pages = self.pipeline.state().await.total_pages;
        let page = {
            let mut state = self.state.write().await;
            if state.query.page < total_pages {
                state.query.page += 1;
            }
            state.query.page
        };
        self.refresh().await;
        page
    }

    /// No-op on the first page
    pub async fn previous_page(&self) -> u32 {
        let page = {
            let mut state = self.state.write().await;
            if state.query.page > 1 {
                state.query.page -= 1;
            }
            state.query.page
        };
        self.refresh().await;
        page
    }

    pub async fn set_mode(&self, mode: ViewMode) {
        self.state.write().await.mode = mode;
    }

    /// Opens the detail view for `id`. Calling it again retries.
    pub async fn movie_details(&self, id: MovieId) -> AppResult<MovieDetails> {
        self.state.write().await.selected = Some(SelectedMovie {
            movie_id: id,
            details: None,
            is_loading: true,
            error: None,
        });

        let result = self.catalog.movie_details(id).await;

        let mut state = self.state.write().await;
        // the user may have closed or switched movies meanwhile
        let Some(selected) = state.selected.as_mut().filter(|s| s.movie_id == id) else {
            return result;
        };
        selected.is_loading = false;

        match &result {
            Ok(details) => {
                selected.details = Some(details.clone());
                selected.error = None;
            }
            Err(e) => {
                tracing::error!(error = %e, movie_id = id, "Failed to load movie details");
                selected.error = Some(DETAILS_FAILED_MESSAGE.to_string());
            }
        }

        result
    }

    pub async fn close_details(&self) {
        self.state.write().await.selected = None;
    }

    pub async fn toggle_watchlist(&self, movie: &MovieSummary) -> ToggleOutcome {
        let outcome = self.watchlist.toggle(movie).await;
        self.notify(&outcome.message, outcome.is_error).await;
        outcome
    }

    pub async fn watchlist(&self) -> Vec<WatchlistEntry> {
        self.watchlist.entries().await
    }

    pub async fn watchlist_status(&self, movie_id: MovieId) -> SyncStatus {
        self.watchlist.status(movie_id).await
    }

    pub async fn notify(&self, message: &str, is_error: bool) {
        self.state.write().await.notification = Some(Notification {
            message: message.to_string(),
            is_error,
            shown_at: Utc::now(),
            expires_at: Instant::now() + self.settings.notice_ttl,
        });
    }

    pub async fn dismiss_notification(&self) {
        self.state.write().await.notification = None;
    }

    /// Current notification, dropping it once its display time has passed
    pub async fn notification(&self) -> Option<Notification> {
        let mut state = self.state.write().await;
        if state.notification.as_ref().is_some_and(Notification::is_expired) {
            state.notification = None;
        }
        state.notification.clone()
    }

    pub async fn genres(&self) -> GenreSection {
        self.state.read().await.genres.clone()
    }

    pub async fn trending(&self) -> TrendingSection {
        self.state.read().await.trending.clone()
    }

    pub async fn community_trends(&self) -> CommunityTrends {
        self.state.read().await.community.clone()
    }

    pub async fn snapshot(&self) -> ViewSnapshot {
        let notification = self.notification().await;
        let list = self.pipeline.state().await;
        let watchlist = self.watchlist.entries().await;
        let session_ready = self.watchlist.session_id().await.is_some();

        let state = self.state.read().await;
        ViewSnapshot {
            query: state.query.clone(),
            debounced_search: self.search.current(),
            mode: state.mode,
            list,
            selected: state.selected.clone(),
            notification,
            watchlist,
            session_ready,
            show_trending: state.query.is_home(),
            show_genres: state.query.search_term.is_empty(),
        }
    }

    /// Looks a movie up in the current list or the watchlist, for callers
    /// that only have an id
    pub async fn find_summary(&self, movie_id: MovieId) -> AppResult<MovieSummary> {
        let listed = self.pipeline.state().await.movies;
        let trending = self.state.read().await.trending.movies.clone();

        if let Some(movie) = listed.iter().chain(trending.iter()).find(|m| m.id == movie_id) {
            return Ok(MovieSummary::from(movie));
        }

        self.watchlist
            .entries()
            .await
            .iter()
            .find(|e| e.movie_id == movie_id)
            .map(MovieSummary::from)
            .ok_or_else(|| AppError::NotFound(format!("Movie {} is not on screen", movie_id)))
    }
}

async fn follow_settled_search(
    orchestrator: Weak<ViewOrchestrator>,
    mut settled: watch::Receiver<String>,
) {
    while settled.changed().await.is_ok() {
        let Some(orchestrator) = orchestrator.upgrade() else {
            break;
        };
        orchestrator.refresh().await;
    }
}

/// Random backdrop (or poster when a movie has no backdrop) at hero size
fn pick_hero_image(movies: &[Movie], image_base_url: &str) -> Option<String> {
    let candidates: Vec<&str> = movies
        .iter()
        .filter_map(|m| m.backdrop_path.as_deref().or(m.poster_path.as_deref()))
        .collect();

    candidates
        .choose(&mut rand::thread_rng())
        .map(|path| image_url(image_base_url, HERO_IMAGE_SIZE, path))
}
