pub mod catalog;
pub mod debounce;
pub mod fetch_pipeline;
pub mod orchestrator;
pub mod session;
pub mod store;
pub mod trends;
pub mod watchlist;

pub use catalog::{MovieCatalog, TmdbCatalog};
pub use debounce::Debouncer;
pub use fetch_pipeline::{FetchPipeline, FetchRequest, ListState};
pub use orchestrator::{OrchestratorSettings, ViewOrchestrator, ViewSnapshot};
pub use session::{FileSessionStore, SessionStore};
pub use store::{AppwriteClient, AppwriteStore, TrendStore, WatchlistStore};
pub use trends::TrendService;
pub use watchlist::{ToggleOutcome, WatchlistSynchronizer};
