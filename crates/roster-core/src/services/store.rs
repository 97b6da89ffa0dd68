//! Shared profile store with live, push-updating views.
//!
//! Every access goes through one `Mutex<Database>`, so writes are serialized.
//! Writes run on their own task and bump a change counter after they commit; a
//! caller that gives up halfway never leaves a partial write behind, and live
//! views always re-query after the write that woke them.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;

use crate::db::{ConflictPolicy, Database, LibSqlProfileRepository, ProfileRepository, StoreView};
use crate::models::{Profile, ProfileId, Provenance};
use crate::{Error, Result};

/// Thread-safe handle to the profile table. Cheap to clone.
#[derive(Clone)]
pub struct ProfileStore {
    db: Arc<Mutex<Database>>,
    changes: Arc<watch::Sender<u64>>,
}

impl ProfileStore {
    /// Open a store backed by a database file, creating parent directories.
    pub async fn open_path(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        tracing::info!("Opening profile store at {}", db_path.display());
        let db = Database::open(&db_path).await?;
        Ok(Self::from_database(db))
    }

    /// Open an in-memory store (primarily for tests).
    pub async fn open_in_memory() -> Result<Self> {
        let db = Database::open_in_memory().await?;
        Ok(Self::from_database(db))
    }

    fn from_database(db: Database) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            db: Arc::new(Mutex::new(db)),
            changes: Arc::new(changes),
        }
    }

    /// Run a write to completion on its own task, then notify live views.
    async fn write<T, F, Fut>(&self, label: &'static str, op: F) -> Result<T>
    where
        F: FnOnce(Arc<Mutex<Database>>) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let db = Arc::clone(&self.db);
        let changes = Arc::clone(&self.changes);

        tokio::spawn(async move {
            let result = op(db).await;
            match &result {
                Ok(_) => changes.send_modify(|version| *version = version.wrapping_add(1)),
                Err(error) => tracing::warn!("Store {label} failed: {error}"),
            }
            result
        })
        .await
        .map_err(|error| Error::Database(format!("{label} task failed: {error}")))?
    }

    /// Insert one profile.
    pub async fn insert(&self, profile: Profile, policy: ConflictPolicy) -> Result<ProfileId> {
        self.write("insert", move |db| async move {
            let db = db.lock().await;
            let repo = LibSqlProfileRepository::new(db.connection());
            repo.insert(&profile, policy).await
        })
        .await
    }

    /// Insert a batch of profiles in one transaction.
    pub async fn insert_many(
        &self,
        profiles: Vec<Profile>,
        policy: ConflictPolicy,
    ) -> Result<Vec<ProfileId>> {
        self.write("insert_many", move |db| async move {
            let db = db.lock().await;
            let repo = LibSqlProfileRepository::new(db.connection());
            let written = repo.insert_many(&profiles, policy).await?;
            tracing::debug!("Stored {} of {} profiles", written.len(), profiles.len());
            Ok(written)
        })
        .await
    }

    /// Replace a stored profile's mutable fields. `Ok(0)` means not found.
    pub async fn update(&self, profile: Profile) -> Result<u64> {
        self.write("update", move |db| async move {
            let db = db.lock().await;
            let repo = LibSqlProfileRepository::new(db.connection());
            repo.update(&profile).await
        })
        .await
    }

    /// Update only the contact fields of a stored profile.
    pub async fn update_contact(
        &self,
        id: ProfileId,
        email: String,
        phone: String,
        cell: String,
    ) -> Result<u64> {
        self.write("update_contact", move |db| async move {
            let db = db.lock().await;
            let repo = LibSqlProfileRepository::new(db.connection());
            repo.update_contact(&id, &email, &phone, &cell).await
        })
        .await
    }

    /// Delete one profile.
    pub async fn delete(&self, id: ProfileId) -> Result<u64> {
        self.write("delete", move |db| async move {
            let db = db.lock().await;
            let repo = LibSqlProfileRepository::new(db.connection());
            repo.delete(&id).await
        })
        .await
    }

    /// Delete every profile.
    pub async fn delete_all(&self) -> Result<u64> {
        self.write("delete_all", |db| async move {
            let db = db.lock().await;
            let repo = LibSqlProfileRepository::new(db.connection());
            repo.delete_all().await
        })
        .await
    }

    /// Delete all profiles of one provenance.
    pub async fn delete_by_provenance(&self, provenance: Provenance) -> Result<u64> {
        self.write("delete_by_provenance", move |db| async move {
            let db = db.lock().await;
            let repo = LibSqlProfileRepository::new(db.connection());
            repo.delete_by_provenance(provenance).await
        })
        .await
    }

    /// Fetch a profile by id.
    pub async fn get(&self, id: &ProfileId) -> Result<Option<Profile>> {
        let db = self.db.lock().await;
        let repo = LibSqlProfileRepository::new(db.connection());
        repo.get(id).await
    }

    /// Count stored profiles.
    pub async fn count(&self) -> Result<u64> {
        let db = self.db.lock().await;
        let repo = LibSqlProfileRepository::new(db.connection());
        repo.count().await
    }

    /// One-off full snapshot of a view.
    pub async fn snapshot(&self, view: &StoreView) -> Result<Vec<Profile>> {
        let db = self.db.lock().await;
        let repo = LibSqlProfileRepository::new(db.connection());
        repo.list(view).await
    }

    /// Push every full snapshot of `view` to `on_snapshot`: once now, then after each write.
    ///
    /// Must be called from within a tokio runtime. Snapshots for one subscription
    /// arrive in commit order; bursts of writes may be coalesced into one snapshot.
    pub fn subscribe<F>(&self, view: StoreView, mut on_snapshot: F) -> Subscription
    where
        F: FnMut(Vec<Profile>) + Send + 'static,
    {
        let store = self.clone();
        let mut changes = self.changes.subscribe();

        let handle = tokio::spawn(async move {
            loop {
                changes.mark_unchanged();
                match store.snapshot(&view).await {
                    Ok(profiles) => on_snapshot(profiles),
                    Err(error) => tracing::warn!("Live view {view:?} query failed: {error}"),
                }
                if changes.changed().await.is_err() {
                    break;
                }
            }
        });

        Subscription { handle }
    }

    /// Channel flavour of [`ProfileStore::subscribe`].
    pub fn live(&self, view: StoreView) -> LiveView {
        let (sender, receiver) = mpsc::unbounded_channel();
        let subscription = self.subscribe(view, move |profiles| {
            // Receiver gone means the LiveView is being dropped
            let _ = sender.send(profiles);
        });
        LiveView {
            receiver,
            _subscription: subscription,
        }
    }
}

/// Handle to a running live view. Dropping it cancels the view.
#[must_use = "dropping a subscription cancels it"]
pub struct Subscription {
    handle: JoinHandle<()>,
}

impl Subscription {
    /// Stop the view. No snapshot is delivered after the next suspension point.
    pub fn cancel(self) {
        self.handle.abort();
    }

    pub fn is_active(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Live view whose snapshots are read from a channel.
pub struct LiveView {
    receiver: mpsc::UnboundedReceiver<Vec<Profile>>,
    _subscription: Subscription,
}

impl LiveView {
    /// Wait for the next full snapshot.
    pub async fn next(&mut self) -> Option<Vec<Profile>> {
        self.receiver.recv().await
    }
}
