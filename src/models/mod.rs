use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

use crate::error::{AppError, AppResult};

pub mod query;
pub mod trend;
pub mod watchlist;

pub use query::{clamp_page_input, PageInput, PageQuery, ViewMode};
pub use trend::{SearchTrendRecord, TrendDocument};
pub use watchlist::{EntryStatus, NewWatchlistEntry, SyncStatus, WatchlistDocument, WatchlistEntry};

/// TMDB movie identifier
pub type MovieId = u64;

/// TMDB genre identifier
pub type GenreId = u32;

/// The catalog refuses to page past this point
pub const MAX_TOTAL_PAGES: u32 = 500;

const CAST_LIMIT: usize = 10;
const REVIEW_LIMIT: usize = 3;
const PROVIDER_REGION: &str = "US";

/// Movie record as returned by the catalog. Read-only projection of remote data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Movie {
    pub id: MovieId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    /// ISO date; the catalog sends `""` for unreleased titles
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub release_date: Option<String>,
    #[serde(default)]
    pub original_language: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub tagline: Option<String>,
}

impl Movie {
    pub fn release_year(&self) -> Option<i32> {
        self.release_date
            .as_deref()
            .and_then(|date| date.get(..4))
            .and_then(|year| year.parse().ok())
    }
}

/// Canonical display shape shared by catalog results and watchlist entries
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovieSummary {
    pub id: MovieId,
    pub title: String,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub release_year: Option<i32>,
    #[serde(default)]
    pub original_language: Option<String>,
}

impl From<&Movie> for MovieSummary {
    fn from(movie: &Movie) -> Self {
        Self {
            id: movie.id,
            title: movie.title.clone(),
            poster_path: movie.poster_path.clone(),
            vote_average: movie.vote_average,
            release_year: movie.release_year(),
            original_language: movie.original_language.clone(),
        }
    }
}

impl From<&WatchlistEntry> for MovieSummary {
    fn from(entry: &WatchlistEntry) -> Self {
        Self {
            id: entry.movie_id,
            title: entry.title.clone(),
            poster_path: entry.poster_path.clone(),
            vote_average: entry.vote_average,
            release_year: None,
            original_language: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Genre {
    pub id: GenreId,
    pub name: String,
}

/// One page of catalog results
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CatalogPage {
    pub movies: Vec<Movie>,
    /// Already clamped to [`MAX_TOTAL_PAGES`]
    pub total_pages: u32,
}

/// Movie plus the sub-resources shown in the detail view
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MovieDetails {
    pub movie: Movie,
    /// YouTube key of the first trailer
    pub trailer_key: Option<String>,
    /// US subscription providers
    pub providers: Vec<WatchProvider>,
    pub cast: Vec<CastMember>,
    pub reviews: Vec<Review>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WatchProvider {
    pub provider_id: u64,
    pub provider_name: String,
    #[serde(default)]
    pub logo_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CastMember {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub character: Option<String>,
    #[serde(default)]
    pub profile_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Review {
    pub id: String,
    pub author: String,
    pub content: String,
}

/// Builds a CDN URL such as `https://image.tmdb.org/t/p/w500/abc.jpg`
pub fn image_url(base: &str, size: &str, path: &str) -> String {
    format!("{}/{}{}", base.trim_end_matches('/'), size, path)
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

// ============================================================================
// TMDB API Types
// ============================================================================

/// Paged list envelope used by search, discover and trending
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbPage {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub results: Vec<Movie>,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total_results: u32,
}

impl From<TmdbPage> for CatalogPage {
    fn from(page: TmdbPage) -> Self {
        Self {
            movies: page.results,
            total_pages: page.total_pages.min(MAX_TOTAL_PAGES),
        }
    }
}

/// Failure body; also appears with HTTP 200 and `success: false`
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbStatus {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub status_code: Option<u16>,
    #[serde(default)]
    pub status_message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbGenreList {
    #[serde(default)]
    pub genres: Vec<Genre>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbResults<T> {
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbVideo {
    pub key: String,
    #[serde(default)]
    pub site: String,
    #[serde(rename = "type", default)]
    pub video_type: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbWatchProviders {
    #[serde(default)]
    pub results: HashMap<String, TmdbRegionProviders>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbRegionProviders {
    #[serde(default)]
    pub flatrate: Option<Vec<WatchProvider>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbCredits {
    #[serde(default)]
    pub cast: Vec<CastMember>,
}

/// `GET /movie/{id}?append_to_response=videos,reviews,watch/providers,credits`
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbMovieDetails {
    #[serde(flatten)]
    pub movie: Movie,
    #[serde(default)]
    pub videos: Option<TmdbResults<TmdbVideo>>,
    #[serde(default)]
    pub reviews: Option<TmdbResults<Review>>,
    #[serde(rename = "watch/providers", default)]
    pub watch_providers: Option<TmdbWatchProviders>,
    #[serde(default)]
    pub credits: Option<TmdbCredits>,
}

impl TryFrom<TmdbMovieDetails> for MovieDetails {
    type Error = AppError;

    fn try_from(details: TmdbMovieDetails) -> AppResult<Self> {
        let videos = details
            .videos
            .ok_or_else(|| AppError::MalformedResponse("Invalid response from API".to_string()))?;

        let trailer_key = videos
            .results
            .into_iter()
            .find(|video| video.video_type == "Trailer" && video.site == "YouTube")
            .map(|video| video.key);

        let providers = details
            .watch_providers
            .and_then(|mut wp| wp.results.remove(PROVIDER_REGION))
            .and_then(|region| region.flatrate)
            .unwrap_or_default();

        let cast = details
            .credits
            .map(|credits| credits.cast.into_iter().take(CAST_LIMIT).collect())
            .unwrap_or_default();

        let reviews = details
            .reviews
            .map(|reviews| reviews.results.into_iter().take(REVIEW_LIMIT).collect())
            .unwrap_or_default();

        Ok(MovieDetails {
            movie: details.movie,
            trailer_key,
            providers,
            cast,
            reviews,
        })
    }
}
