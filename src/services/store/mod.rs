//! Document store abstraction
//!
//! Two logical collections live in the hosted document store: search-trend
//! aggregates and per-session watchlist entries. Each gets its own trait so
//! the services depending on them can be tested in isolation.

use crate::{
    error::AppResult,
    models::{MovieId, NewWatchlistEntry, SearchTrendRecord, TrendDocument, WatchlistDocument},
};

pub mod appwrite;

pub use appwrite::{AppwriteClient, AppwriteStore, Query};

/// Search-trend aggregates, unique by term
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait TrendStore: Send + Sync {
    async fn find_trend(&self, term: &str) -> AppResult<Option<SearchTrendRecord>>;

    async fn create_trend(&self, trend: TrendDocument) -> AppResult<SearchTrendRecord>;

    async fn update_trend_count(&self, id: &str, count: u64) -> AppResult<()>;

    /// Most searched terms first
    async fn top_trends(&self, limit: u32) -> AppResult<Vec<SearchTrendRecord>>;
}

/// Watchlist entries scoped by session id
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait WatchlistStore: Send + Sync {
    async fn list_entries(&self, session_id: &str) -> AppResult<Vec<WatchlistDocument>>;

    async fn find_entry(
        &self,
        session_id: &str,
        movie_id: MovieId,
    ) -> AppResult<Option<WatchlistDocument>>;

    async fn create_entry(&self, entry: NewWatchlistEntry) -> AppResult<WatchlistDocument>;

    /// Deletes by store-assigned document id, not by movie id
    async fn delete_entry(&self, record_id: &str) -> AppResult<()>;
}
