#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc, Mutex,
};
use std::time::Duration;

use novafilm::{
    error::{AppError, AppResult},
    models::{
        CatalogPage, Genre, GenreId, Movie, MovieDetails, MovieId, NewWatchlistEntry,
        SearchTrendRecord, TrendDocument, WatchlistDocument,
    },
    services::{
        MovieCatalog, OrchestratorSettings, SessionStore, TrendStore, ViewOrchestrator,
        WatchlistStore,
    },
};

pub const TEST_DEBOUNCE: Duration = Duration::from_millis(20);

pub fn movie(id: MovieId, title: &str) -> Movie {
    serde_json::from_value(serde_json::json!({
        "id": id,
        "title": title,
        "poster_path": format!("/{}.jpg", id),
        "backdrop_path": format!("/{}-backdrop.jpg", id),
        "vote_average": 7.0,
        "release_date": "1999-03-30",
        "original_language": "en",
    }))
    .unwrap()
}

/// Catalog with canned results that records every list call
#[derive(Default)]
pub struct FakeCatalog {
    pub calls: Mutex<Vec<String>>,
    pub total_pages: u32,
}

impl FakeCatalog {
    pub fn new(total_pages: u32) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            total_pages,
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait::async_trait]
impl MovieCatalog for FakeCatalog {
    async fn search(&self, term: &str, page: u32) -> AppResult<CatalogPage> {
        self.record(format!("search:{}:{}", term, page));
        Ok(CatalogPage {
            movies: vec![movie(603, "The Matrix"), movie(604, "The Matrix Reloaded")],
            total_pages: self.total_pages,
        })
    }

    async fn discover(&self, genre: Option<GenreId>, page: u32) -> AppResult<CatalogPage> {
        let genre = genre.map(|g| g.to_string()).unwrap_or_default();
        self.record(format!("discover:{}:{}", genre, page));
        Ok(CatalogPage {
            movies: (1..=20).map(|id| movie(id, "Popular")).collect(),
            total_pages: self.total_pages,
        })
    }

    async fn movie_details(&self, id: MovieId) -> AppResult<MovieDetails> {
        if id == 404 {
            return Err(AppError::ExternalApi("status 404".to_string()));
        }
        Ok(MovieDetails {
            movie: movie(id, "Fight Club"),
            trailer_key: Some("yt-key".to_string()),
            providers: vec![],
            cast: vec![],
            reviews: vec![],
        })
    }

    async fn genres(&self, _language: &str) -> AppResult<Vec<Genre>> {
        Ok(vec![
            Genre {
                id: 28,
                name: "Action".to_string(),
            },
            Genre {
                id: 35,
                name: "Comedy".to_string(),
            },
        ])
    }

    async fn trending_today(&self) -> AppResult<Vec<Movie>> {
        Ok((100..115).map(|id| movie(id, "Trending")).collect())
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// In-memory trend and watchlist collections
#[derive(Default)]
pub struct MemoryStore {
    pub trends: Mutex<Vec<SearchTrendRecord>>,
    pub watchlist: Mutex<Vec<WatchlistDocument>>,
    pub fail_creates: AtomicBool,
    next_id: AtomicU64,
}

impl MemoryStore {
    fn next_id(&self) -> String {
        format!("doc-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

#[async_trait::async_trait]
impl TrendStore for MemoryStore {
    async fn find_trend(&self, term: &str) -> AppResult<Option<SearchTrendRecord>> {
        Ok(self
            .trends
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.term == term)
            .cloned())
    }

    async fn create_trend(&self, trend: TrendDocument) -> AppResult<SearchTrendRecord> {
        let record = SearchTrendRecord {
            id: self.next_id(),
            term: trend.search_term,
            count: trend.count,
            movie_id: trend.movie_id,
            poster_url: trend.poster_url,
        };
        self.trends.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn update_trend_count(&self, id: &str, count: u64) -> AppResult<()> {
        let mut trends = self.trends.lock().unwrap();
        let trend = trends
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| AppError::Store(format!("no trend {}", id)))?;
        trend.count = count;
        Ok(())
    }

    async fn top_trends(&self, limit: u32) -> AppResult<Vec<SearchTrendRecord>> {
        let mut trends = self.trends.lock().unwrap().clone();
        trends.sort_by(|a, b| b.count.cmp(&a.count));
        trends.truncate(limit as usize);
        Ok(trends)
    }
}

#[async_trait::async_trait]
impl WatchlistStore for MemoryStore {
    async fn list_entries(&self, session_id: &str) -> AppResult<Vec<WatchlistDocument>> {
        Ok(self
            .watchlist
            .lock()
            .unwrap()
            .iter()
            .filter(|d| d.user_id == session_id)
            .cloned()
            .collect())
    }

    async fn find_entry(
        &self,
        session_id: &str,
        movie_id: MovieId,
    ) -> AppResult<Option<WatchlistDocument>> {
        Ok(self
            .watchlist
            .lock()
            .unwrap()
            .iter()
            .find(|d| d.user_id == session_id && d.movie_id == movie_id)
            .cloned())
    }

    async fn create_entry(&self, entry: NewWatchlistEntry) -> AppResult<WatchlistDocument> {
        if self.fail_creates.load(Ordering::SeqCst) {
            return Err(AppError::Store("create refused".to_string()));
        }
        let doc = WatchlistDocument {
            id: self.next_id(),
            user_id: entry.user_id,
            movie_id: entry.movie_id,
            title: entry.title,
            poster_path: entry.poster_path,
            vote_average: entry.vote_average,
        };
        self.watchlist.lock().unwrap().push(doc.clone());
        Ok(doc)
    }

    async fn delete_entry(&self, record_id: &str) -> AppResult<()> {
        let mut docs = self.watchlist.lock().unwrap();
        let before = docs.len();
        docs.retain(|d| d.id != record_id);
        if docs.len() == before {
            return Err(AppError::Store(format!("no document {}", record_id)));
        }
        Ok(())
    }
}

pub struct FixedSession(pub &'static str);

#[async_trait::async_trait]
impl SessionStore for FixedSession {
    async fn load_or_create(&self) -> AppResult<String> {
        Ok(self.0.to_string())
    }
}

pub fn settings() -> OrchestratorSettings {
    OrchestratorSettings {
        image_base_url: "https://img.test".to_string(),
        search_debounce: TEST_DEBOUNCE,
        notice_ttl: Duration::from_secs(3),
    }
}

pub struct Harness {
    pub view: Arc<ViewOrchestrator>,
    pub catalog: Arc<FakeCatalog>,
    pub store: Arc<MemoryStore>,
}

pub async fn mounted_view(total_pages: u32) -> Harness {
    let catalog = Arc::new(FakeCatalog::new(total_pages));
    let store = Arc::new(MemoryStore::default());

    let view = ViewOrchestrator::new(
        catalog.clone(),
        store.clone(),
        store.clone(),
        Arc::new(FixedSession("guest-1")),
        settings(),
    );
    view.mount().await;

    Harness {
        view,
        catalog,
        store,
    }
}

/// Polls `check` until it holds or a second has passed
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..100 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
