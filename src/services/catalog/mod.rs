//! Movie catalog abstraction
//!
//! The browse list, the detail view, the genre pills and the trending strip
//! all read from a single catalog. The TMDB REST API is the only
//! implementation; tests substitute mocks or fakes.

use crate::{
    error::AppResult,
    models::{CatalogPage, Genre, GenreId, Movie, MovieDetails, MovieId},
};

pub mod tmdb;

pub use tmdb::TmdbCatalog;

/// Trait for movie catalogs
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MovieCatalog: Send + Sync {
    /// Full-text title search
    async fn search(&self, term: &str, page: u32) -> AppResult<CatalogPage>;

    /// Browse by descending popularity, optionally restricted to one genre
    async fn discover(&self, genre: Option<GenreId>, page: u32) -> AppResult<CatalogPage>;

    /// Movie with videos, reviews, watch providers and credits
    async fn movie_details(&self, id: MovieId) -> AppResult<MovieDetails>;

    async fn genres(&self, language: &str) -> AppResult<Vec<Genre>>;

    /// Today's trending movies, most trending first
    async fn trending_today(&self) -> AppResult<Vec<Movie>>;

    /// Catalog name for logging and debugging
    fn name(&self) -> &'static str;
}
