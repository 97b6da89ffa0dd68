//! Headless screen state for a profile list.
//!
//! A [`ProfileSession`] ties the sync coordinator, the query view and the lookup
//! resolver to one scope: a status cell (`is_loading`, `error`, `profile_count`),
//! the selected profile, and the background tasks it spawned. Closing the
//! session aborts those tasks and stops its live views; store writes already
//! started still commit whole.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tokio::task::JoinSet;

use crate::db::StoreView;
use crate::error::SyncResult;
use crate::lookup::{LookupOutcome, LookupResolver};
use crate::models::{Profile, ProfileId};
use crate::query::{QueryViewManager, SortMode};
use crate::remote::RemoteSource;
use crate::services::Subscription;
use crate::sync::SyncCoordinator;

/// Observable status of a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStatus {
    pub is_loading: bool,
    /// Last failure, until cleared or replaced
    pub error: Option<String>,
    pub profile_count: u64,
}

struct SessionInner<R> {
    sync: SyncCoordinator<R>,
    lookup: LookupResolver,
    status: watch::Sender<SessionStatus>,
    in_flight: AtomicUsize,
}

/// Marks the session as loading while alive, including when its task is aborted.
struct LoadingGuard<'a> {
    status: &'a watch::Sender<SessionStatus>,
    in_flight: &'a AtomicUsize,
}

impl<'a> LoadingGuard<'a> {
    fn begin(status: &'a watch::Sender<SessionStatus>, in_flight: &'a AtomicUsize) -> Self {
        in_flight.fetch_add(1, Ordering::SeqCst);
        publish_loading(status, in_flight);
        Self { status, in_flight }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        publish_loading(self.status, self.in_flight);
    }
}

fn publish_loading(status: &watch::Sender<SessionStatus>, in_flight: &AtomicUsize) {
    status.send_if_modified(|status| {
        let loading = in_flight.load(Ordering::SeqCst) > 0;
        let changed = status.is_loading != loading;
        status.is_loading = loading;
        changed
    });
}

impl<R: RemoteSource> SessionInner<R> {
    fn set_error(&self, message: Option<String>) {
        self.status.send_if_modified(|status| {
            let changed = status.error != message;
            status.error = message;
            changed
        });
    }

    /// Run `operation`, recording a failure as the session error.
    async fn report<T>(
        &self,
        context: Option<&str>,
        operation: impl Future<Output = SyncResult<T>>,
    ) -> SyncResult<T> {
        let result = operation.await;
        if let Err(error) = &result {
            let message = match context {
                Some(context) => format!("{context}: {error}"),
                None => error.to_string(),
            };
            self.set_error(Some(message));
        }
        result
    }

    /// Like [`SessionInner::report`], clearing the error first and flagging loading.
    async fn load<T>(
        &self,
        context: Option<&str>,
        operation: impl Future<Output = SyncResult<T>>,
    ) -> SyncResult<T> {
        let _loading = LoadingGuard::begin(&self.status, &self.in_flight);
        self.set_error(None);
        self.report(context, operation).await
    }

    async fn populate(&self) -> SyncResult<Vec<Profile>> {
        if !self.report(None, self.sync.is_empty()).await? {
            return Ok(Vec::new());
        }
        self.load(None, self.sync.ensure_populated()).await
    }
}

/// One screen's worth of profile state.
///
/// Create within a tokio runtime.
pub struct ProfileSession<R> {
    inner: Arc<SessionInner<R>>,
    query: QueryViewManager,
    tasks: Mutex<JoinSet<()>>,
    count_view: Mutex<Option<Subscription>>,
}

impl<R: RemoteSource> ProfileSession<R> {
    /// Start observing the store and populate it in the background if it is empty.
    pub fn start(sync: SyncCoordinator<R>) -> Self {
        let store = sync.store().clone();
        let (status, _) = watch::channel(SessionStatus::default());
        let inner = Arc::new(SessionInner {
            sync,
            lookup: LookupResolver::new(store.clone()),
            status,
            in_flight: AtomicUsize::new(0),
        });

        let counter = Arc::clone(&inner);
        let count_view = store.subscribe(StoreView::Recent, move |profiles| {
            let count = u64::try_from(profiles.len()).unwrap_or(u64::MAX);
            counter.status.send_if_modified(|status| {
                let changed = status.profile_count != count;
                status.profile_count = count;
                changed
            });
        });

        let session = Self {
            inner,
            query: QueryViewManager::new(store),
            tasks: Mutex::new(JoinSet::new()),
            count_view: Mutex::new(Some(count_view)),
        };
        session.spawn(|inner| async move {
            let _ = inner.populate().await;
        });
        session
    }

    fn lock_tasks(&self) -> MutexGuard<'_, JoinSet<()>> {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn spawn<F, Fut>(&self, task: F)
    where
        F: FnOnce(Arc<SessionInner<R>>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.lock_tasks();
        while tasks.try_join_next().is_some() {}
        tasks.spawn(task(Arc::clone(&self.inner)));
    }

    pub fn status(&self) -> SessionStatus {
        self.inner.status.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<SessionStatus> {
        self.inner.status.subscribe()
    }

    pub fn clear_error(&self) {
        self.inner.set_error(None);
    }

    pub fn sync(&self) -> &SyncCoordinator<R> {
        &self.inner.sync
    }

    pub const fn query(&self) -> &QueryViewManager {
        &self.query
    }

    /// Displayed list for the active sort mode and search.
    pub fn profiles(&self) -> Vec<Profile> {
        self.query.current()
    }

    pub fn subscribe_profiles(&self) -> watch::Receiver<Vec<Profile>> {
        self.query.subscribe()
    }

    pub fn set_sort_mode(&self, mode: SortMode) {
        self.query.set_sort_mode(mode);
    }

    pub fn set_search_text(&self, text: impl Into<String>) {
        self.query.set_search_text(text);
    }

    pub fn clear_search(&self) {
        self.query.clear_search();
    }

    pub async fn refresh(&self, count: usize, force: bool) -> SyncResult<Vec<Profile>> {
        self.inner.load(None, self.inner.sync.refresh(count, force)).await
    }

    /// Background [`ProfileSession::refresh`]; failures land in the status.
    pub fn spawn_refresh(&self, count: usize, force: bool) {
        self.spawn(move |inner| async move {
            let _ = inner.load(None, inner.sync.refresh(count, force)).await;
        });
    }

    pub async fn fill_database(&self, count: usize) -> SyncResult<Vec<Profile>> {
        self.inner
            .load(Some("Failed to fill database"), self.inner.sync.fill(count))
            .await
    }

    pub fn spawn_fill(&self, count: usize) {
        self.spawn(move |inner| async move {
            let _ = inner
                .load(Some("Failed to fill database"), inner.sync.fill(count))
                .await;
        });
    }

    pub async fn add_random(&self) -> SyncResult<Profile> {
        self.inner.report(None, self.inner.sync.add_one()).await
    }

    pub async fn create_manual(&self, profile: Profile) -> SyncResult<Profile> {
        self.inner
            .report(
                Some("Failed to create profile"),
                self.inner.sync.create_manual(profile),
            )
            .await
    }

    /// Write through, replacing the selection when it is the same profile.
    pub async fn update(&self, profile: Profile) -> SyncResult<Profile> {
        let updated = self
            .inner
            .report(
                Some("Failed to update profile"),
                self.inner.sync.update(profile),
            )
            .await?;
        if self.selected().is_some_and(|selected| selected.id == updated.id) {
            self.inner.lookup.select(updated.clone());
        }
        Ok(updated)
    }

    /// Delete, clearing the selection when it is the deleted profile.
    pub async fn delete(&self, id: &ProfileId) -> SyncResult<u64> {
        let removed = self
            .inner
            .report(
                Some("Failed to delete profile"),
                self.inner.sync.delete_one(id),
            )
            .await?;
        if self.selected().is_some_and(|selected| &selected.id == id) {
            self.inner.lookup.clear_selection();
        }
        Ok(removed)
    }

    pub async fn empty_database(&self) -> SyncResult<u64> {
        let _loading = LoadingGuard::begin(&self.inner.status, &self.inner.in_flight);
        let removed = self
            .inner
            .report(
                Some("Failed to empty database"),
                self.inner.sync.delete_all(),
            )
            .await?;
        self.inner.lookup.clear_selection();
        Ok(removed)
    }

    pub fn selected(&self) -> Option<Profile> {
        self.inner.lookup.selected()
    }

    pub fn subscribe_selected(&self) -> watch::Receiver<Option<Profile>> {
        self.inner.lookup.subscribe_selected()
    }

    pub fn select(&self, profile: Profile) {
        self.inner.lookup.select(profile);
    }

    pub fn clear_selection(&self) {
        self.inner.lookup.clear_selection();
    }

    pub fn lookup(&self) -> &LookupResolver {
        &self.inner.lookup
    }

    /// Resolve scanned text; a miss is reported through the status error.
    pub async fn resolve_scan(&self, text: &str) -> SyncResult<LookupOutcome> {
        let outcome = self
            .inner
            .report(Some("Database error"), self.inner.lookup.resolve(text))
            .await?;
        match &outcome {
            LookupOutcome::Resolved(_) => self.inner.set_error(None),
            LookupOutcome::NotFound { .. } => self.inner.set_error(outcome.not_found_message()),
            LookupOutcome::Suppressed | LookupOutcome::InvalidPayload => {}
        }
        Ok(outcome)
    }

    pub async fn reset_lookup(&self) {
        self.inner.lookup.reset().await;
    }

    /// Abort background work and stop every live view of this session.
    pub fn close(&self) {
        self.lock_tasks().abort_all();
        self.query.close();
        if let Some(count_view) = self
            .count_view
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            count_view.cancel();
        }
        tracing::debug!("Profile session closed");
    }
}

impl<R> Drop for ProfileSession<R> {
    fn drop(&mut self) {
        self.tasks
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .abort_all();
    }
}
