//! TMDB v3 catalog
//!
//! All requests authenticate with the v4 read access token as a bearer
//! token. TMDB reports some failures (bad key, unknown resource) as a JSON
//! body carrying `success: false`, occasionally with HTTP 200, so every body
//! is checked for that flag before being decoded.

use crate::{
    error::{AppError, AppResult},
    models::{
        CatalogPage, Genre, GenreId, Movie, MovieDetails, MovieId, TmdbGenreList,
        TmdbMovieDetails, TmdbPage, TmdbStatus,
    },
    services::catalog::MovieCatalog,
};
use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;
use serde_json::Value;

const DISCOVER_SORT: &str = "popularity.desc";
const DETAIL_APPENDS: &str = "videos,reviews,watch/providers,credits";
const TRENDING_LANGUAGE: &str = "en-US";
const FALLBACK_FAILURE: &str = "Failed to fetch movies";

#[derive(Clone)]
pub struct TmdbCatalog {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
}

impl TmdbCatalog {
    pub fn new(api_key: String, api_url: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    /// Issues a GET and decodes the body, surfacing `success: false` as
    /// [`AppError::CatalogRejected`]
    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> AppResult<T> {
        let url = format!("{}{}", self.api_url, path);
        tracing::debug!(url = %url, "TMDB request");

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.api_key)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(query)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(AppError::ExternalApi(format!(
                "TMDB API returned status {}: {}",
                status, body
            )));
        }

        decode_body(&body)
    }
}

/// Decodes a 200 body, honouring TMDB's in-band failure flag
fn decode_body<T: DeserializeOwned>(body: &str) -> AppResult<T> {
    let value: Value = serde_json::from_str(body).map_err(|e| {
        AppError::MalformedResponse(format!("TMDB response is not JSON: {}", e))
    })?;

    if value.get("success") == Some(&Value::Bool(false)) {
        let status: TmdbStatus = serde_json::from_value(value).map_err(|e| {
            AppError::MalformedResponse(format!("Failed to parse TMDB status: {}", e))
        })?;
        tracing::warn!(
            status_code = ?status.status_code,
            status_message = ?status.status_message,
            "TMDB flagged request as failed"
        );
        return Err(AppError::CatalogRejected(
            status
                .status_message
                .unwrap_or_else(|| FALLBACK_FAILURE.to_string()),
        ));
    }

    serde_json::from_value(value)
        .map_err(|e| AppError::MalformedResponse(format!("Failed to parse TMDB response: {}", e)))
}

#[async_trait::async_trait]
impl MovieCatalog for TmdbCatalog {
    async fn search(&self, term: &str, page: u32) -> AppResult<CatalogPage> {
        if term.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Search query cannot be empty".to_string(),
            ));
        }

        let result: TmdbPage = self
            .get(
                "/search/movie",
                &[("query", term.to_string()), ("page", page.to_string())],
            )
            .await?;

        tracing::info!(
            query = %term,
            page = page,
            results = result.results.len(),
            total_pages = result.total_pages,
            catalog = "tmdb",
            "Movie search completed"
        );

        Ok(result.into())
    }

    async fn discover(&self, genre: Option<GenreId>, page: u32) -> AppResult<CatalogPage> {
        let mut query = vec![
            ("sort_by", DISCOVER_SORT.to_string()),
            ("page", page.to_string()),
        ];
        if let Some(genre) = genre {
            query.push(("with_genres", genre.to_string()));
        }

        let result: TmdbPage = self.get("/discover/movie", &query).await?;

        tracing::info!(
            genre = ?genre,
            page = page,
            results = result.results.len(),
            total_pages = result.total_pages,
            catalog = "tmdb",
            "Discover completed"
        );

        Ok(result.into())
    }

    async fn movie_details(&self, id: MovieId) -> AppResult<MovieDetails> {
        let raw: TmdbMovieDetails = self
            .get(
                &format!("/movie/{}", id),
                &[("append_to_response", DETAIL_APPENDS.to_string())],
            )
            .await?;

        let details = MovieDetails::try_from(raw)?;

        tracing::info!(
            movie_id = id,
            has_trailer = details.trailer_key.is_some(),
            providers = details.providers.len(),
            catalog = "tmdb",
            "Movie details fetched"
        );

        Ok(details)
    }

    async fn genres(&self, language: &str) -> AppResult<Vec<Genre>> {
        let list: TmdbGenreList = self
            .get("/genre/movie/list", &[("language", language.to_string())])
            .await?;
        Ok(list.genres)
    }

    async fn trending_today(&self) -> AppResult<Vec<Movie>> {
        let result: TmdbPage = self
            .get(
                "/trending/movie/day",
                &[("language", TRENDING_LANGUAGE.to_string())],
            )
            .await?;
        Ok(result.results)
    }

    fn name(&self) -> &'static str {
        "tmdb"
    }
}
