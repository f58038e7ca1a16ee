use serde::{Deserialize, Serialize};

use super::MovieId;

/// How often a search term was issued, with a sample result for display
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchTrendRecord {
    /// Store-assigned document id
    pub id: String,
    pub term: String,
    pub count: u64,
    pub movie_id: Option<MovieId>,
    pub poster_url: Option<String>,
}

/// Trend document as stored in the trends collection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrendDocument {
    #[serde(rename = "$id", default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(rename = "searchTerm")]
    pub search_term: String,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub movie_id: Option<MovieId>,
    #[serde(default)]
    pub poster_url: Option<String>,
}

impl From<TrendDocument> for SearchTrendRecord {
    fn from(doc: TrendDocument) -> Self {
        Self {
            id: doc.id,
            term: doc.search_term,
            count: doc.count,
            movie_id: doc.movie_id,
            poster_url: doc.poster_url,
        }
    }
}
