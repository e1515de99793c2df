//! # Session Management Module
//!
//! Holds the active [`Session`] and drives its lifecycle:
//!
//! - load the durable record on first use
//! - refresh through the injected [`SessionRefresher`] when nothing usable is
//!   stored or the platform rejects the session
//! - persist every replacement through the [`CookieStore`] before it becomes
//!   visible
//!
//! The session is copy-on-refresh: readers clone an `Arc<Session>` and keep
//! observing it even while a replacement is installed, so nobody ever sees a
//! half-updated cookie set.
//!
//! ## Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use xhs_signed_client::session::{MemoryCookieStore, NoopRefresher, RefreshOptions, SessionManager};
//! use xhs_signed_client::types::Session;
//!
//! # tokio_test::block_on(async {
//! let session = Session::from_pairs([("a1", "device-1")]).unwrap();
//! let manager = SessionManager::new(
//!     Arc::new(MemoryCookieStore::with_session(session)),
//!     Arc::new(NoopRefresher),
//!     RefreshOptions::default(),
//! );
//!
//! let current = manager.ensure().await?;
//! assert_eq!(current.device_id(), "device-1");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # });
//! ```

use crate::{
    Result,
    session::{
        refresher::{RefreshOptions, SessionRefresher},
        store::CookieStore,
    },
    types::Session,
};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Owner of the active session
#[derive(Debug)]
pub struct SessionManager {
    /// Durable record
    store: Arc<dyn CookieStore>,
    /// Fresh-session source
    refresher: Arc<dyn SessionRefresher>,
    /// Inputs handed to every refresh
    refresh_options: RefreshOptions,
    /// Active session, swapped whole
    current: RwLock<Option<Arc<Session>>>,
    /// Serialises refreshes
    refresh_lock: Mutex<()>,
}

impl SessionManager {
    pub fn new(
        store: Arc<dyn CookieStore>,
        refresher: Arc<dyn SessionRefresher>,
        refresh_options: RefreshOptions,
    ) -> Self {
        Self {
            store,
            refresher,
            refresh_options,
            current: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Snapshot of the active session, without touching storage
    pub async fn current(&self) -> Option<Arc<Session>> {
        self.current.read().await.clone()
    }

    /// The active session, loading or refreshing it if necessary
    pub async fn ensure(&self) -> Result<Arc<Session>> {
        if let Some(session) = self.current().await {
            return Ok(session);
        }

        if let Some(stored) = self.store.load().await? {
            let stored = Arc::new(stored);
            let mut current = self.current.write().await;
            // Another task may have refreshed in the meantime
            if let Some(existing) = current.as_ref() {
                return Ok(existing.clone());
            }
            *current = Some(stored.clone());
            return Ok(stored);
        }

        let _guard = self.refresh_lock.lock().await;
        if let Some(session) = self.current().await {
            return Ok(session);
        }
        tracing::info!("No stored session, requesting a fresh one");
        self.refresh_locked().await
    }

    /// Obtain a brand new session, persist it, then make it active
    pub async fn refresh(&self) -> Result<Arc<Session>> {
        let _guard = self.refresh_lock.lock().await;
        self.refresh_locked().await
    }

    /// Refresh only if `stale` is still the active session
    ///
    /// Callers that were all rejected with the same session share one
    /// refresh; the later ones get the session the first one installed.
    pub async fn refresh_if_stale(&self, stale: &Arc<Session>) -> Result<Arc<Session>> {
        let _guard = self.refresh_lock.lock().await;
        match self.current().await {
            Some(current) if !Arc::ptr_eq(&current, stale) => {
                tracing::debug!("Session was already replaced, skipping refresh");
                return Ok(current);
            }
            _ => {}
        }
        self.refresh_locked().await
    }

    /// Persist `session` and make it active
    pub async fn replace(&self, session: Session) -> Result<Arc<Session>> {
        let _guard = self.refresh_lock.lock().await;
        self.install(session).await
    }

    pub fn refresh_options(&self) -> &RefreshOptions {
        &self.refresh_options
    }

    async fn refresh_locked(&self) -> Result<Arc<Session>> {
        let fresh = self.refresher.refresh(&self.refresh_options).await?;
        tracing::info!("Refreshed session with {} cookies", fresh.len());
        self.install(fresh).await
    }

    async fn install(&self, session: Session) -> Result<Arc<Session>> {
        self.store.save(&session).await?;
        let session = Arc::new(session);
        *self.current.write().await = Some(session.clone());
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Error, session::store::MemoryCookieStore};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct CountingRefresher {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SessionRefresher for CountingRefresher {
        async fn refresh(&self, _options: &RefreshOptions) -> Result<Session> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(Session::from_pairs([("a1", format!("fresh-{}", n))]).unwrap())
        }
    }

    #[derive(Debug)]
    struct FailingStore;

    #[async_trait]
    impl CookieStore for FailingStore {
        async fn load(&self) -> Result<Option<Session>> {
            Ok(None)
        }

        async fn save(&self, _session: &Session) -> Result<()> {
            Err(std::io::Error::other("read-only filesystem").into())
        }
    }

    fn manager_with(
        store: Arc<dyn CookieStore>,
    ) -> (SessionManager, Arc<CountingRefresher>) {
        let refresher = Arc::new(CountingRefresher::default());
        let manager = SessionManager::new(store, refresher.clone(), RefreshOptions::default());
        (manager, refresher)
    }

    #[tokio::test]
    async fn test_ensure_prefers_stored_session() {
        let stored = Session::from_pairs([("a1", "stored")]).unwrap();
        let (manager, refresher) =
            manager_with(Arc::new(MemoryCookieStore::with_session(stored)));

        let session = manager.ensure().await.unwrap();
        assert_eq!(session.device_id(), "stored");
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_ensure_refreshes_when_store_is_empty() {
        let store = Arc::new(MemoryCookieStore::new());
        let (manager, refresher) = manager_with(store.clone());

        let session = manager.ensure().await.unwrap();
        assert_eq!(session.device_id(), "fresh-1");
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);

        // Persisted and cached
        assert_eq!(store.load().await.unwrap().unwrap().device_id(), "fresh-1");
        manager.ensure().await.unwrap();
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_refresh_replaces_whole_session() {
        let (manager, _refresher) = manager_with(Arc::new(MemoryCookieStore::new()));

        let first = manager.ensure().await.unwrap();
        let second = manager.refresh().await.unwrap();

        assert_eq!(first.device_id(), "fresh-1");
        assert_eq!(second.device_id(), "fresh-2");
        assert_eq!(manager.current().await.unwrap().device_id(), "fresh-2");
    }

    #[tokio::test]
    async fn test_save_failure_is_not_swallowed() {
        let (manager, _refresher) = manager_with(Arc::new(FailingStore));

        let err = manager.ensure().await.unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert!(manager.current().await.is_none());
    }

    #[tokio::test]
    async fn test_stale_refresh_is_shared() {
        let stored = Session::from_pairs([("a1", "stale")]).unwrap();
        let (manager, refresher) =
            manager_with(Arc::new(MemoryCookieStore::with_session(stored)));

        let stale = manager.ensure().await.unwrap();
        let first = manager.refresh_if_stale(&stale).await.unwrap();
        let second = manager.refresh_if_stale(&stale).await.unwrap();

        assert_eq!(first.device_id(), "fresh-1");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);

        // The installed session can still be refreshed once it is rejected
        let third = manager.refresh_if_stale(&first).await.unwrap();
        assert_eq!(third.device_id(), "fresh-2");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_use_refreshes_once() {
        let (manager, refresher) = manager_with(Arc::new(MemoryCookieStore::new()));
        let manager = Arc::new(manager);

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let manager = manager.clone();
                tokio::spawn(async move { manager.ensure().await.unwrap() })
            })
            .collect();
        for task in tasks {
            assert_eq!(task.await.unwrap().device_id(), "fresh-1");
        }

        assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_replace_persists() {
        let store = Arc::new(MemoryCookieStore::new());
        let (manager, _refresher) = manager_with(store.clone());

        let logged_in = Session::from_pairs([("a1", "d"), ("web_session", "ws")]).unwrap();
        manager.replace(logged_in.clone()).await.unwrap();

        assert_eq!(store.load().await.unwrap(), Some(logged_in));
    }
}
