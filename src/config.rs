use std::time::Duration;

use serde::Deserialize;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// TMDB v4 read access token, sent as a bearer token
    pub tmdb_api_key: String,

    /// TMDB API base URL
    #[serde(default = "default_tmdb_api_url")]
    pub tmdb_api_url: String,

    /// TMDB image CDN base URL (size segment and path are appended)
    #[serde(default = "default_tmdb_image_url")]
    pub tmdb_image_url: String,

    /// Appwrite REST endpoint
    #[serde(default = "default_appwrite_endpoint")]
    pub appwrite_endpoint: String,

    pub appwrite_project_id: String,

    pub appwrite_database_id: String,

    /// Collection holding search-trend aggregates
    pub appwrite_trends_collection_id: String,

    /// Collection holding watchlist entries
    pub appwrite_watchlist_collection_id: String,

    /// Server API key; guest permissions are used when absent
    #[serde(default)]
    pub appwrite_api_key: Option<String>,

    /// File holding the guest session identifier
    #[serde(default = "default_session_file")]
    pub session_file: String,

    #[serde(default = "default_search_debounce_ms")]
    pub search_debounce_ms: u64,

    /// How long a notification stays visible
    #[serde(default = "default_notice_ttl_ms")]
    pub notice_ttl_ms: u64,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_tmdb_api_url() -> String {
    "https://api.themoviedb.org/3".to_string()
}

fn default_tmdb_image_url() -> String {
    "https://image.tmdb.org/t/p".to_string()
}

fn default_appwrite_endpoint() -> String {
    "https://nyc.cloud.appwrite.io/v1".to_string()
}

fn default_session_file() -> String {
    ".novafilm_session".to_string()
}

fn default_search_debounce_ms() -> u64 {
    1000
}

fn default_notice_ttl_ms() -> u64 {
    3000
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    pub fn notice_ttl(&self) -> Duration {
        Duration::from_millis(self.notice_ttl_ms)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
