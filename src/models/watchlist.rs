use serde::{Deserialize, Serialize};

use super::{MovieId, MovieSummary};

/// Local confirmation state of a watchlist entry
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    /// Inserted optimistically; the remote create has not answered yet
    Pending,
    /// The store holds this entry
    Confirmed,
}

/// Per-movie synchronization state seen from the outside
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    /// Not saved and nothing outstanding
    Idle,
    /// An add or remove is in flight
    Pending,
    Confirmed,
}

/// A saved movie as held in local state
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WatchlistEntry {
    /// Store document id; `None` until the store has confirmed the entry
    /// and it has been read back
    pub record_id: Option<String>,
    pub movie_id: MovieId,
    pub title: String,
    pub poster_path: Option<String>,
    pub vote_average: Option<f64>,
    pub status: EntryStatus,
}

impl WatchlistEntry {
    /// Placeholder inserted before the remote create completes
    pub fn pending(movie: &MovieSummary) -> Self {
        Self {
            record_id: None,
            movie_id: movie.id,
            title: movie.title.clone(),
            poster_path: movie.poster_path.clone(),
            vote_average: movie.vote_average,
            status: EntryStatus::Pending,
        }
    }
}

/// Watchlist document as stored in the watchlist collection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WatchlistDocument {
    #[serde(rename = "$id")]
    pub id: String,
    pub user_id: String,
    pub movie_id: MovieId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub vote_average: Option<f64>,
}

impl From<WatchlistDocument> for WatchlistEntry {
    fn from(doc: WatchlistDocument) -> Self {
        Self {
            record_id: Some(doc.id),
            movie_id: doc.movie_id,
            title: doc.title,
            poster_path: doc.poster_path,
            vote_average: doc.vote_average,
            status: EntryStatus::Confirmed,
        }
    }
}

/// Payload for creating a watchlist document
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewWatchlistEntry {
    pub user_id: String,
    pub movie_id: MovieId,
    pub title: String,
    pub poster_path: Option<String>,
    pub vote_average: Option<f64>,
}

impl NewWatchlistEntry {
    pub fn new(session_id: &str, movie: &MovieSummary) -> Self {
        Self {
            user_id: session_id.to_string(),
            movie_id: movie.id,
            title: movie.title.clone(),
            poster_path: movie.poster_path.clone(),
            vote_average: movie.vote_average,
        }
    }
}
