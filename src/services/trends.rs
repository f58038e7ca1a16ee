use std::sync::Arc;

use crate::{
    error::AppResult,
    models::{image_url, Movie, SearchTrendRecord, TrendDocument},
    services::store::TrendStore,
};

/// Shortest search term worth counting
pub const MIN_TREND_TERM_CHARS: usize = 3;

/// Number of community trends shown
pub const TOP_TRENDS_LIMIT: u32 = 5;

/// Whether a finished search should be counted towards community trends
pub fn should_record_search(term: &str, page: u32, result_count: usize) -> bool {
    !term.is_empty() && term.chars().count() >= MIN_TREND_TERM_CHARS && page == 1 && result_count > 0
}

/// Records search terms and reads back the most popular ones.
///
/// Trend data is analytics: recording failures are logged and never reach
/// the caller of [`TrendService::record_in_background`].
#[derive(Clone)]
pub struct TrendService {
    store: Arc<dyn TrendStore>,
    image_base_url: String,
}

impl TrendService {
    pub fn new(store: Arc<dyn TrendStore>, image_base_url: String) -> Self {
        Self {
            store,
            image_base_url,
        }
    }

    /// Increments the term's count, creating it with the sample movie when new
    pub async fn record_search(&self, term: &str, sample: &Movie) -> AppResult<()> {
        match self.store.find_trend(term).await? {
            Some(existing) => {
                let count = existing.count + 1;
                self.store.update_trend_count(&existing.id, count).await?;
                tracing::debug!(term = %term, count = count, "Search trend incremented");
            }
            None => {
                let trend = TrendDocument {
                    id: String::new(),
                    search_term: term.to_string(),
                    count: 1,
                    movie_id: Some(sample.id),
                    poster_url: sample
                        .poster_path
                        .as_deref()
                        .map(|path| image_url(&self.image_base_url, "w500", path)),
                };
                self.store.create_trend(trend).await?;
                tracing::debug!(term = %term, "Search trend created");
            }
        }
        Ok(())
    }

    /// Fire-and-forget variant of [`TrendService::record_search`]
    pub fn record_in_background(&self, term: String, sample: Movie) {
        let service = self.clone();
        tokio::spawn(async move {
            if let Err(e) = service.record_search(&term, &sample).await {
                tracing::warn!(error = %e, term = %term, "Failed to record search trend");
            }
        });
    }

    pub async fn top_searches(&self) -> AppResult<Vec<SearchTrendRecord>> {
        self.store.top_trends(TOP_TRENDS_LIMIT).await
    }
}
