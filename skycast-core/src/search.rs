//! Debounced city search for keystroke-driven input.
//!
//! Each input replaces the pending request: the previous quiet-period timer
//! is aborted and a new search ticket is taken, which also invalidates any
//! request already in flight. Only the latest query ever reaches the
//! suggestion list.

use parking_lot::Mutex;
use std::{sync::Arc, time::Duration};
use tokio::task::JoinHandle;

use crate::store::WeatherStore;

pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(300);

#[derive(Debug)]
pub struct SuggestionSearch {
    store: Arc<WeatherStore>,
    quiet: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl SuggestionSearch {
    pub fn new(store: Arc<WeatherStore>) -> Self {
        Self::with_quiet_period(store, DEFAULT_QUIET_PERIOD)
    }

    pub fn with_quiet_period(store: Arc<WeatherStore>, quiet: Duration) -> Self {
        Self { store, quiet, pending: Mutex::new(None) }
    }

    /// Record the latest query. A blank query cancels without searching.
    ///
    /// Must be called from within a tokio runtime.
    pub fn input(&self, query: &str) {
        let mut pending = self.pending.lock();
        let ticket = self.store.begin_search();
        if let Some(handle) = pending.take() {
            handle.abort();
        }

        let query = query.trim().to_string();
        if query.is_empty() {
            return;
        }

        let store = self.store.clone();
        let quiet = self.quiet;
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(quiet).await;
            if !store.is_current(ticket) {
                return;
            }
            if let Err(e) = store.search_cities_for(ticket, &query).await {
                tracing::debug!(query = %query, error = %e, "suggestion search failed");
            }
        }));
    }

    /// Drop the pending request and ignore any in-flight result.
    pub fn cancel(&self) {
        let mut pending = self.pending.lock();
        self.store.begin_search();
        if let Some(handle) = pending.take() {
            handle.abort();
        }
    }

    /// Wait for the currently scheduled search, if any, to finish.
    pub async fn settle(&self) {
        let handle = self.pending.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

impl Drop for SuggestionSearch {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.get_mut().take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::CitySuggestion,
        storage::{MemoryStore, Persistence},
        testing::FakeProvider,
    };

    fn setup() -> (Arc<FakeProvider>, Arc<WeatherStore>, SuggestionSearch) {
        let provider = Arc::new(FakeProvider::default());
        let store = Arc::new(WeatherStore::new(
            provider.clone(),
            Persistence::new(Arc::new(MemoryStore::default())),
        ));
        let search = SuggestionSearch::new(store.clone());
        (provider, store, search)
    }

    fn one(name: &str) -> Vec<CitySuggestion> {
        vec![CitySuggestion { name: name.into(), country: "GB".into() }]
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_typing_issues_one_request() {
        let (provider, store, search) = setup();
        provider.set_suggestions("London", Ok(one("London")));

        for q in ["L", "Lo", "Lon", "Lond", "Londo", "London"] {
            search.input(q);
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert_eq!(provider.calls(), 0);

        tokio::time::sleep(DEFAULT_QUIET_PERIOD).await;
        search.settle().await;

        assert_eq!(provider.calls(), 1);
        assert_eq!(store.suggestions(), one("London"));
    }

    #[tokio::test(start_paused = true)]
    async fn nothing_is_sent_before_quiet_period() {
        let (provider, _store, search) = setup();

        search.input("Par");
        tokio::time::sleep(Duration::from_millis(299)).await;
        assert_eq!(provider.calls(), 0);

        tokio::time::sleep(Duration::from_millis(2)).await;
        search.settle().await;
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn new_input_aborts_in_flight_request() {
        let (provider, store, search) = setup();
        provider.set_suggestions("Lon", Ok(one("Lonavala")));
        provider.set_suggestions("London", Ok(one("London")));
        let gate = provider.gate("Lon");

        search.input("Lon");
        tokio::time::sleep(DEFAULT_QUIET_PERIOD + Duration::from_millis(1)).await;
        // "Lon" is now in flight, held by the gate
        assert_eq!(provider.calls(), 1);

        search.input("London");
        tokio::time::sleep(DEFAULT_QUIET_PERIOD + Duration::from_millis(1)).await;
        search.settle().await;
        assert_eq!(provider.calls(), 2);
        assert_eq!(store.suggestions(), one("London"));

        let _ = gate.send(());
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(store.suggestions(), one("London"));
    }

    #[tokio::test(start_paused = true)]
    async fn response_for_older_ticket_is_discarded() {
        let (provider, store, search) = setup();
        provider.set_suggestions("Lon", Ok(one("Lonavala")));
        provider.set_suggestions("London", Ok(one("London")));
        let gate = provider.gate("Lon");

        let older = {
            let store = store.clone();
            let ticket = store.begin_search();
            tokio::spawn(async move { store.search_cities_for(ticket, "Lon").await })
        };
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(provider.calls(), 1);

        search.input("London");
        tokio::time::sleep(DEFAULT_QUIET_PERIOD + Duration::from_millis(1)).await;
        search.settle().await;
        assert_eq!(store.suggestions(), one("London"));

        let _ = gate.send(());
        assert_eq!(older.await.unwrap().unwrap(), None);
        assert_eq!(store.suggestions(), one("London"));
    }

    #[tokio::test(start_paused = true)]
    async fn superseded_timer_skips_request() {
        let (provider, store, search) = setup();
        provider.set_suggestions("Oslo", Ok(one("Oslo")));

        search.input("Oslo");
        store.begin_search();
        tokio::time::sleep(DEFAULT_QUIET_PERIOD * 2).await;
        search.settle().await;

        assert_eq!(provider.calls(), 0);
        assert!(store.suggestions().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn blank_input_cancels() {
        let (provider, store, search) = setup();
        provider.set_suggestions("Ber", Ok(one("Berlin")));

        search.input("Ber");
        search.input("   ");
        tokio::time::sleep(DEFAULT_QUIET_PERIOD * 2).await;

        assert_eq!(provider.calls(), 0);
        assert!(store.suggestions().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_drops_pending_request() {
        let (provider, _store, search) = setup();

        search.input("Madrid");
        search.cancel();
        tokio::time::sleep(DEFAULT_QUIET_PERIOD * 2).await;

        assert_eq!(provider.calls(), 0);
    }
}
