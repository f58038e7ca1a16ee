use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};

use serde::Serialize;
use tokio::sync::RwLock;

use crate::{
    error::{AppError, AppResult},
    models::{EntryStatus, MovieId, MovieSummary, NewWatchlistEntry, SyncStatus, WatchlistEntry},
    services::store::WatchlistStore,
};

pub const NOT_READY_MESSAGE: &str = "Please wait, loading...";
pub const BUSY_MESSAGE: &str = "Still saving your last change to this movie.";
pub const ADDED_MESSAGE: &str = "Added to watchlist!";
pub const ADDED_UNCONFIRMED_MESSAGE: &str = "Added! Please refresh the page to see your list.";
pub const ADD_FAILED_MESSAGE: &str = "Failed to add. Please try again.";
pub const REMOVED_MESSAGE: &str = "Removed from watchlist";
pub const REMOVE_FAILED_MESSAGE: &str = "Failed to remove. Please try again.";
pub const LOAD_FAILED_MESSAGE: &str = "Could not load watchlist. Please try again.";

/// Result of one toggle, phrased for the user
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ToggleOutcome {
    pub movie_id: MovieId,
    pub message: String,
    pub is_error: bool,
    /// State of the movie once the toggle has finished
    pub status: SyncStatus,
}

impl ToggleOutcome {
    fn new(movie_id: MovieId, message: &str, is_error: bool, status: SyncStatus) -> Self {
        Self {
            movie_id,
            message: message.to_string(),
            is_error,
            status,
        }
    }
}

/// Marks a movie as having a toggle outstanding for as long as it lives
struct InFlightGuard<'a> {
    in_flight: &'a Mutex<HashSet<MovieId>>,
    movie_id: MovieId,
}

impl<'a> InFlightGuard<'a> {
    /// `None` when the movie already has a toggle outstanding
    fn acquire(in_flight: &'a Mutex<HashSet<MovieId>>, movie_id: MovieId) -> Option<Self> {
        let mut ids = in_flight.lock().ok()?;
        if !ids.insert(movie_id) {
            return None;
        }
        Some(Self {
            in_flight,
            movie_id,
        })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut ids) = self.in_flight.lock() {
            ids.remove(&self.movie_id);
        }
    }
}

/// Keeps the local watchlist in step with the document store.
///
/// Every toggle mutates the local list first and then calls the store. A
/// failed store call reverts that movie's change; a successful add is
/// followed by a full re-read so placeholders get their store record ids.
/// The list is always replaced as a whole, never edited in place.
pub struct WatchlistSynchronizer {
    store: Arc<dyn WatchlistStore>,
    session_id: RwLock<Option<String>>,
    entries: RwLock<Vec<WatchlistEntry>>,
    in_flight: Mutex<HashSet<MovieId>>,
}

impl WatchlistSynchronizer {
    pub fn new(store: Arc<dyn WatchlistStore>) -> Self {
        Self {
            store,
            session_id: RwLock::new(None),
            entries: RwLock::new(Vec::new()),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Establishes the session and loads its watchlist. The session stays
    /// established even when the load fails.
    pub async fn bootstrap(&self, session_id: String) -> AppResult<()> {
        *self.session_id.write().await = Some(session_id);
        self.refresh().await
    }

    /// Replaces the local list with the store's
    pub async fn refresh(&self) -> AppResult<()> {
        let session_id = self.session_id().await.ok_or(AppError::SessionNotReady)?;

        let docs = self.store.list_entries(&session_id).await?;
        let entries: Vec<WatchlistEntry> = docs.into_iter().map(WatchlistEntry::from).collect();

        tracing::info!(entries = entries.len(), "Watchlist loaded");

        *self.entries.write().await = entries;
        Ok(())
    }

    pub async fn session_id(&self) -> Option<String> {
        self.session_id.read().await.clone()
    }

    pub async fn entries(&self) -> Vec<WatchlistEntry> {
        self.entries.read().await.clone()
    }

    pub async fn contains(&self, movie_id: MovieId) -> bool {
        self.entries
            .read()
            .await
            .iter()
            .any(|entry| entry.movie_id == movie_id)
    }

    pub async fn status(&self, movie_id: MovieId) -> SyncStatus {
        if self.is_in_flight(movie_id) {
            return SyncStatus::Pending;
        }
        if self.contains(movie_id).await {
            SyncStatus::Confirmed
        } else {
            SyncStatus::Idle
        }
    }

    fn is_in_flight(&self, movie_id: MovieId) -> bool {
        self.in_flight
            .lock()
            .map(|ids| ids.contains(&movie_id))
            .unwrap_or(false)
    }

    /// Adds the movie when absent, removes it when present
    pub async fn toggle(&self, movie: &MovieSummary) -> ToggleOutcome {
        let Some(session_id) = self.session_id().await else {
            return ToggleOutcome::new(movie.id, NOT_READY_MESSAGE, true, SyncStatus::Idle);
        };

        let Some(_guard) = InFlightGuard::acquire(&self.in_flight, movie.id) else {
            return ToggleOutcome::new(movie.id, BUSY_MESSAGE, true, SyncStatus::Pending);
        };

        let existing = {
            let entries = self.entries.read().await;
            entries
                .iter()
                .position(|entry| entry.movie_id == movie.id)
                .map(|index| (index, entries[index].clone()))
        };

        match existing {
            Some((index, entry)) => self.remove(&session_id, index, entry).await,
            None => self.add(&session_id, movie).await,
        }
    }

    async fn add(&self, session_id: &str, movie: &MovieSummary) -> ToggleOutcome {
        {
            let mut entries = self.entries.write().await;
            let mut next = entries.clone();
            next.push(WatchlistEntry::pending(movie));
            *entries = next;
        }

        let created = self
            .store
            .create_entry(NewWatchlistEntry::new(session_id, movie))
            .await;

        if let Err(e) = created {
            tracing::error!(error = %e, movie_id = movie.id, "Failed to add watchlist entry");
            self.revert_add(movie.id).await;
            return ToggleOutcome::new(movie.id, ADD_FAILED_MESSAGE, true, SyncStatus::Idle);
        }

        match self.store.list_entries(session_id).await {
            Ok(docs) => {
                let authoritative = docs.into_iter().map(WatchlistEntry::from).collect();
                self.reconcile(authoritative, movie.id).await;
                ToggleOutcome::new(movie.id, ADDED_MESSAGE, false, SyncStatus::Confirmed)
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    movie_id = movie.id,
                    "Watchlist entry created but the list could not be reloaded"
                );
                self.confirm_placeholder(movie.id).await;
                ToggleOutcome::new(movie.id, ADDED_UNCONFIRMED_MESSAGE, true, SyncStatus::Confirmed)
            }
        }
    }

    async fn remove(&self, session_id: &str, index: usize, entry: WatchlistEntry) -> ToggleOutcome {
        let movie_id = entry.movie_id;

        {
            let mut entries = self.entries.write().await;
            let next = entries
                .iter()
                .filter(|e| e.movie_id != movie_id)
                .cloned()
                .collect();
            *entries = next;
        }

        match self.delete_remote(session_id, &entry).await {
            Ok(()) => ToggleOutcome::new(movie_id, REMOVED_MESSAGE, false, SyncStatus::Idle),
            Err(e) => {
                tracing::error!(error = %e, movie_id = movie_id, "Failed to remove watchlist entry");
                self.revert_remove(index, entry).await;
                ToggleOutcome::new(movie_id, REMOVE_FAILED_MESSAGE, true, SyncStatus::Confirmed)
            }
        }
    }

    /// Deletes by record id, looking the id up first when it is not known
    /// locally. An entry the store no longer holds counts as deleted.
    async fn delete_remote(&self, session_id: &str, entry: &WatchlistEntry) -> AppResult<()> {
        let record_id = match &entry.record_id {
            Some(id) => id.clone(),
            None => match self.store.find_entry(session_id, entry.movie_id).await? {
                Some(doc) => doc.id,
                None => {
                    tracing::debug!(movie_id = entry.movie_id, "Watchlist entry already absent from store");
                    return Ok(());
                }
            },
        };

        self.store.delete_entry(&record_id).await
    }

    async fn revert_add(&self, movie_id: MovieId) {
        let mut entries = self.entries.write().await;
        let next = entries
            .iter()
            .filter(|e| e.movie_id != movie_id)
            .cloned()
            .collect();
        *entries = next;
    }

    async fn revert_remove(&self, index: usize, entry: WatchlistEntry) {
        let mut entries = self.entries.write().await;
        if entries.iter().any(|e| e.movie_id == entry.movie_id) {
            return;
        }
        let mut next = entries.clone();
        next.insert(index.min(next.len()), entry);
        *entries = next;
    }

    async fn confirm_placeholder(&self, movie_id: MovieId) {
        let mut entries = self.entries.write().await;
        let next = entries
            .iter()
            .cloned()
            .map(|mut e| {
                if e.movie_id == movie_id {
                    e.status = EntryStatus::Confirmed;
                }
                e
            })
            .collect();
        *entries = next;
    }

    /// Takes the store's list as truth, except for movies that another
    /// toggle is still working on, which keep their local state
    async fn reconcile(&self, authoritative: Vec<WatchlistEntry>, settled: MovieId) {
        let others: HashSet<MovieId> = self
            .in_flight
            .lock()
            .map(|ids| ids.iter().copied().filter(|id| *id != settled).collect())
            .unwrap_or_default();

        let mut entries = self.entries.write().await;
        let mut next: Vec<WatchlistEntry> = authoritative
            .into_iter()
            .filter(|e| !others.contains(&e.movie_id))
            .collect();
        next.extend(
            entries
                .iter()
                .filter(|e| others.contains(&e.movie_id))
                .cloned(),
        );
        *entries = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WatchlistDocument;
    use crate::services::store::MockWatchlistStore;
    use mockall::predicate::eq;

    fn summary(id: MovieId, title: &str) -> MovieSummary {
        MovieSummary {
            id,
            title: title.to_string(),
            poster_path: Some(format!("/{}.jpg", id)),
            vote_average: Some(7.5),
            release_year: None,
            original_language: None,
        }
    }

    fn doc(record_id: &str, movie_id: MovieId, title: &str) -> WatchlistDocument {
        WatchlistDocument {
            id: record_id.to_string(),
            user_id: "guest".to_string(),
            movie_id,
            title: title.to_string(),
            poster_path: Some(format!("/{}.jpg", movie_id)),
            vote_average: Some(7.5),
        }
    }

    async fn bootstrapped(store: MockWatchlistStore) -> WatchlistSynchronizer {
        let sync = WatchlistSynchronizer::new(Arc::new(store));
        sync.bootstrap("guest".to_string()).await.unwrap();
        sync
    }

    #[tokio::test]
    async fn test_toggle_without_session_is_rejected() {
        let mut store = MockWatchlistStore::new();
        store.expect_create_entry().times(0);
        store.expect_delete_entry().times(0);

        let sync = WatchlistSynchronizer::new(Arc::new(store));
        let outcome = sync.toggle(&summary(550, "Fight Club")).await;

        assert_eq!(outcome.message, NOT_READY_MESSAGE);
        assert!(outcome.is_error);
        assert!(sync.entries().await.is_empty());
        assert_eq!(sync.status(550).await, SyncStatus::Idle);
    }

    #[tokio::test]
    async fn test_bootstrap_loads_entries() {
        let mut store = MockWatchlistStore::new();
        store
            .expect_list_entries()
            .with(eq("guest"))
            .times(1)
            .returning(|_| Ok(vec![doc("d1", 603, "The Matrix")]));

        let sync = bootstrapped(store).await;
        let entries = sync.entries().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].record_id.as_deref(), Some("d1"));
        assert_eq!(sync.status(603).await, SyncStatus::Confirmed);
    }

    #[tokio::test]
    async fn test_failed_bootstrap_keeps_session() {
        let mut store = MockWatchlistStore::new();
        store
            .expect_list_entries()
            .returning(|_| Err(AppError::Store("offline".to_string())));

        let sync = WatchlistSynchronizer::new(Arc::new(store));
        assert!(sync.bootstrap("guest".to_string()).await.is_err());
        assert_eq!(sync.session_id().await.as_deref(), Some("guest"));
    }

    #[tokio::test]
    async fn test_failed_create_restores_list() {
        let mut store = MockWatchlistStore::new();
        store
            .expect_list_entries()
            .times(1)
            .returning(|_| Ok(vec![doc("d1", 603, "The Matrix")]));
        store
            .expect_create_entry()
            .times(1)
            .returning(|_| Err(AppError::Store("rejected".to_string())));

        let sync = bootstrapped(store).await;
        let before = sync.entries().await;

        let outcome = sync.toggle(&summary(550, "Fight Club")).await;

        assert_eq!(outcome.message, ADD_FAILED_MESSAGE);
        assert!(outcome.is_error);
        assert_eq!(sync.entries().await, before);
        assert_eq!(sync.status(550).await, SyncStatus::Idle);
    }

    #[tokio::test]
    async fn test_add_then_remove_round_trip() {
        let mut store = MockWatchlistStore::new();
        let mut seq = mockall::Sequence::new();
        store
            .expect_list_entries()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(vec![]));
        store
            .expect_create_entry()
            .withf(|entry| entry.user_id == "guest" && entry.movie_id == 550)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(doc("d550", 550, "Fight Club")));
        store
            .expect_list_entries()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(vec![doc("d550", 550, "Fight Club")]));
        store
            .expect_delete_entry()
            .with(eq("d550"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        let sync = bootstrapped(store).await;

        let added = sync.toggle(&summary(550, "Fight Club")).await;
        assert_eq!(added.message, ADDED_MESSAGE);
        assert!(!added.is_error);
        let entries = sync.entries().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].record_id.as_deref(), Some("d550"));
        assert_eq!(entries[0].status, EntryStatus::Confirmed);

        let removed = sync.toggle(&summary(550, "Fight Club")).await;
        assert_eq!(removed.message, REMOVED_MESSAGE);
        assert!(sync.entries().await.is_empty());
        assert_eq!(sync.status(550).await, SyncStatus::Idle);
    }

    #[tokio::test]
    async fn test_failed_delete_restores_position() {
        let mut store = MockWatchlistStore::new();
        store.expect_list_entries().times(1).returning(|_| {
            Ok(vec![
                doc("d1", 1, "First"),
                doc("d2", 2, "Second"),
                doc("d3", 3, "Third"),
            ])
        });
        store
            .expect_delete_entry()
            .with(eq("d2"))
            .returning(|_| Err(AppError::Store("timeout".to_string())));

        let sync = bootstrapped(store).await;
        let before = sync.entries().await;

        let outcome = sync.toggle(&summary(2, "Second")).await;

        assert_eq!(outcome.message, REMOVE_FAILED_MESSAGE);
        assert_eq!(sync.entries().await, before);
    }

    #[tokio::test]
    async fn test_degraded_add_keeps_optimistic_entry() {
        let mut store = MockWatchlistStore::new();
        let mut seq = mockall::Sequence::new();
        store
            .expect_list_entries()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(vec![]));
        store
            .expect_create_entry()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(doc("d550", 550, "Fight Club")));
        store
            .expect_list_entries()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(AppError::Store("flaky".to_string())));

        let sync = bootstrapped(store).await;
        let outcome = sync.toggle(&summary(550, "Fight Club")).await;

        assert_eq!(outcome.message, ADDED_UNCONFIRMED_MESSAGE);
        assert!(outcome.is_error);

        let entries = sync.entries().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, EntryStatus::Confirmed);
        assert_eq!(entries[0].record_id, None);
    }

    #[tokio::test]
    async fn test_remove_without_record_id_looks_it_up() {
        let mut store = MockWatchlistStore::new();
        store.expect_list_entries().returning(|_| Ok(vec![]));
        store
            .expect_find_entry()
            .with(eq("guest"), eq(550u64))
            .times(1)
            .returning(|_, _| Ok(Some(doc("d550", 550, "Fight Club"))));
        store
            .expect_delete_entry()
            .with(eq("d550"))
            .times(1)
            .returning(|_| Ok(()));

        let sync = bootstrapped(store).await;
        *sync.entries.write().await = vec![WatchlistEntry {
            status: EntryStatus::Confirmed,
            ..WatchlistEntry::pending(&summary(550, "Fight Club"))
        }];

        let outcome = sync.toggle(&summary(550, "Fight Club")).await;
        assert_eq!(outcome.message, REMOVED_MESSAGE);
        assert!(sync.entries().await.is_empty());
    }

    #[tokio::test]
    async fn test_toggle_while_outstanding_is_rejected() {
        let mut store = MockWatchlistStore::new();
        store.expect_list_entries().returning(|_| Ok(vec![]));
        store.expect_create_entry().times(0);

        let sync = bootstrapped(store).await;
        let _held = InFlightGuard::acquire(&sync.in_flight, 550).unwrap();

        let outcome = sync.toggle(&summary(550, "Fight Club")).await;
        assert_eq!(outcome.message, BUSY_MESSAGE);
        assert!(sync.entries().await.is_empty());
        assert_eq!(sync.status(550).await, SyncStatus::Pending);
    }

    #[tokio::test]
    async fn test_in_flight_guard_releases_on_drop() {
        let ids = Mutex::new(HashSet::new());
        {
            let _guard = InFlightGuard::acquire(&ids, 7).unwrap();
            assert!(InFlightGuard::acquire(&ids, 7).is_none());
        }
        assert!(InFlightGuard::acquire(&ids, 7).is_some());
    }
}
