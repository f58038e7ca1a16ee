use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use novafilm::{
    config::Config,
    routes::{create_router, AppState},
    services::{
        AppwriteClient, AppwriteStore, FileSessionStore, OrchestratorSettings, TmdbCatalog,
        ViewOrchestrator,
    },
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("novafilm=info,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let catalog = Arc::new(TmdbCatalog::new(
        config.tmdb_api_key.clone(),
        config.tmdb_api_url.clone(),
    ));

    let store = Arc::new(AppwriteStore::new(
        AppwriteClient::new(
            config.appwrite_endpoint.clone(),
            config.appwrite_project_id.clone(),
            config.appwrite_database_id.clone(),
            config.appwrite_api_key.clone(),
        ),
        config.appwrite_trends_collection_id.clone(),
        config.appwrite_watchlist_collection_id.clone(),
    ));

    let sessions = Arc::new(FileSessionStore::new(&config.session_file));

    let view = ViewOrchestrator::new(
        catalog,
        store.clone(),
        store,
        sessions,
        OrchestratorSettings::from(&config),
    );
    view.mount().await;

    let app = create_router(AppState::new(view));

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;

    tracing::info!(address = %address, "NovaFilm listening");

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
