//! Reconciles the remote profile source with the local store.
//!
//! Every operation returns a [`SyncResult`]; persistence errors are reported as
//! [`SyncError::Store`] and remote failures pass through unchanged. A failed
//! fetch never touches the store.

use crate::db::{ConflictPolicy, StoreView};
use crate::error::{SyncError, SyncResult};
use crate::models::{Profile, ProfileId, Provenance};
use crate::remote::{RemoteSource, NO_PROFILES_RECEIVED};
use crate::services::{LiveView, ProfileStore};
use crate::util::text_prefix;

pub struct SyncCoordinator<R> {
    store: ProfileStore,
    remote: R,
    default_batch_size: usize,
}

impl<R: RemoteSource> SyncCoordinator<R> {
    pub const fn new(store: ProfileStore, remote: R, default_batch_size: usize) -> Self {
        Self {
            store,
            remote,
            default_batch_size,
        }
    }

    pub const fn store(&self) -> &ProfileStore {
        &self.store
    }

    pub const fn default_batch_size(&self) -> usize {
        self.default_batch_size
    }

    /// Force a refresh of the default batch when the store is empty.
    ///
    /// Returns whatever the refresh returned, or an empty success when data already exists.
    pub async fn ensure_populated(&self) -> SyncResult<Vec<Profile>> {
        if !self.is_empty().await? {
            tracing::debug!("Store already populated; skipping initial fetch");
            return Ok(Vec::new());
        }
        self.refresh(self.default_batch_size, true).await
    }

    /// Fetch `count` profiles and store them with replace-on-conflict.
    ///
    /// Unless forced, a store already holding `count` or more profiles makes this an
    /// empty success with no remote call. Live views carry the data in that case.
    /// An empty remote batch is an API failure.
    pub async fn refresh(&self, count: usize, force: bool) -> SyncResult<Vec<Profile>> {
        if !force {
            let local = self.store.count().await?;
            if local >= u64::try_from(count).unwrap_or(u64::MAX) {
                tracing::debug!("Refresh skipped: {local} profiles stored, {count} requested");
                return Ok(Vec::new());
            }
        }

        let profiles = match self.remote.fetch_many(count).await {
            Ok(profiles) if profiles.is_empty() => {
                Err(SyncError::Api(NO_PROFILES_RECEIVED.to_string()))
            }
            result => result,
        }
        .inspect_err(|error| tracing::warn!("Refresh of {count} profiles failed: {error}"))?;

        self.store
            .insert_many(profiles.clone(), ConflictPolicy::Replace)
            .await?;
        tracing::info!("Refreshed {} profiles from remote", profiles.len());
        Ok(profiles)
    }

    /// Always fetch `count` more profiles.
    pub async fn fill(&self, count: usize) -> SyncResult<Vec<Profile>> {
        self.refresh(count, true).await
    }

    /// Fetch and store one remote profile.
    pub async fn add_one(&self) -> SyncResult<Profile> {
        let profile = self.remote.fetch_one().await?;
        self.store
            .insert(profile.clone(), ConflictPolicy::Replace)
            .await?;
        Ok(profile)
    }

    /// Store a locally built profile, forcing manual provenance.
    pub async fn create_manual(&self, mut profile: Profile) -> SyncResult<Profile> {
        profile.provenance = Provenance::Manual;
        self.store
            .insert(profile.clone(), ConflictPolicy::Abort)
            .await?;
        Ok(profile)
    }

    /// Replace a stored profile. Fails when no row matched.
    pub async fn update(&self, profile: Profile) -> SyncResult<Profile> {
        let affected = self.store.update(profile.clone()).await?;
        if affected == 0 {
            return Err(not_found(&profile.id));
        }
        Ok(profile)
    }

    /// Update email and phone numbers only.
    pub async fn update_contact(
        &self,
        id: &ProfileId,
        email: &str,
        phone: &str,
        cell: &str,
    ) -> SyncResult<()> {
        let affected = self
            .store
            .update_contact(
                id.clone(),
                email.to_string(),
                phone.to_string(),
                cell.to_string(),
            )
            .await?;
        if affected == 0 {
            return Err(not_found(id));
        }
        Ok(())
    }

    /// Delete one profile; returns the number of rows removed (0 or 1).
    pub async fn delete_one(&self, id: &ProfileId) -> SyncResult<u64> {
        Ok(self.store.delete(id.clone()).await?)
    }

    pub async fn delete_all(&self) -> SyncResult<u64> {
        let removed = self.store.delete_all().await?;
        tracing::info!("Deleted all {removed} profiles");
        Ok(removed)
    }

    pub async fn delete_by_provenance(&self, provenance: Provenance) -> SyncResult<u64> {
        Ok(self.store.delete_by_provenance(provenance).await?)
    }

    pub async fn get(&self, id: &ProfileId) -> SyncResult<Option<Profile>> {
        Ok(self.store.get(id).await?)
    }

    pub async fn count(&self) -> SyncResult<u64> {
        Ok(self.store.count().await?)
    }

    pub async fn is_empty(&self) -> SyncResult<bool> {
        Ok(self.count().await? == 0)
    }

    /// Live view of one provenance, newest first.
    pub fn live_by_provenance(&self, provenance: Provenance) -> LiveView {
        self.store.live(StoreView::BySource(provenance))
    }
}

fn not_found(id: &ProfileId) -> SyncError {
    SyncError::Store(format!("Profile not found: {}", text_prefix(id.as_str(), 8)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PersonName;
    use crate::test_support::{manual_profile, remote_batch, remote_profile, FakeRemote};
    use pretty_assertions::assert_eq;

    async fn coordinator(remote: FakeRemote) -> SyncCoordinator<FakeRemote> {
        let store = ProfileStore::open_in_memory().await.unwrap();
        SyncCoordinator::new(store, remote, 10)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn refresh_with_enough_local_profiles_is_a_no_op() {
        let sync = coordinator(FakeRemote::new()).await;
        sync.store()
            .insert_many(remote_batch(7), ConflictPolicy::Abort)
            .await
            .unwrap();
        let before = sync.store().snapshot(&StoreView::Recent).await.unwrap();

        let fetched = sync.refresh(5, false).await.unwrap();

        assert!(fetched.is_empty());
        assert_eq!(sync.remote.calls(), 0);
        assert_eq!(sync.store().snapshot(&StoreView::Recent).await.unwrap(), before);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn ensure_populated_fetches_only_once() {
        let sync = coordinator(FakeRemote::new().with_batch(remote_batch(10))).await;

        let first = sync.ensure_populated().await.unwrap();
        let second = sync.ensure_populated().await.unwrap();

        assert_eq!(first.len(), 10);
        assert!(second.is_empty());
        assert_eq!(sync.remote.calls(), 1);
        assert_eq!(sync.count().await.unwrap(), 10);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn forced_refresh_stores_remote_batch_newest_first() {
        let batch = remote_batch(10);
        let sync = coordinator(FakeRemote::new().with_batch(batch.clone())).await;

        let fetched = sync.refresh(10, true).await.unwrap();
        assert_eq!(fetched, batch);
        assert_eq!(sync.count().await.unwrap(), 10);

        let recent = sync.store().snapshot(&StoreView::Recent).await.unwrap();
        assert!(recent.iter().all(|p| p.provenance == Provenance::Remote));
        let expected: Vec<_> = batch.iter().rev().map(|p| p.id.clone()).collect();
        let actual: Vec<_> = recent.iter().map(|p| p.id.clone()).collect();
        assert_eq!(actual, expected);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn refresh_replaces_rows_with_the_same_id() {
        let mut batch = remote_batch(3);
        let sync = coordinator(FakeRemote::new().with_batch(batch.clone())).await;
        sync.refresh(3, true).await.unwrap();

        batch[0].email = "changed@example.com".to_string();
        sync.remote.push(Ok(batch.clone()));
        sync.refresh(3, true).await.unwrap();

        assert_eq!(sync.count().await.unwrap(), 3);
        let stored = sync.get(&batch[0].id).await.unwrap().unwrap();
        assert_eq!(stored.email, "changed@example.com");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failed_refresh_leaves_store_untouched() {
        let sync = coordinator(
            FakeRemote::new()
                .with_failure(SyncError::Network("connection refused".to_string()))
                .with_batch(Vec::new()),
        )
        .await;
        sync.store()
            .insert(manual_profile("Ada", "Lovelace", "ada@example.com"), ConflictPolicy::Abort)
            .await
            .unwrap();

        let network = sync.refresh(10, true).await;
        assert_eq!(network, Err(SyncError::Network("connection refused".to_string())));

        let empty = sync.refresh(10, true).await;
        assert_eq!(empty, Err(SyncError::Api(NO_PROFILES_RECEIVED.to_string())));
        assert_eq!(sync.count().await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn empty_batch_fails_every_fetching_operation() {
        let sync = coordinator(
            FakeRemote::new()
                .with_batch(Vec::new())
                .with_batch(Vec::new())
                .with_batch(Vec::new())
                .with_batch(Vec::new()),
        )
        .await;

        let no_data = Err(SyncError::Api(NO_PROFILES_RECEIVED.to_string()));
        assert_eq!(sync.ensure_populated().await, no_data);
        assert_eq!(sync.refresh(10, false).await, no_data);
        assert_eq!(sync.fill(5).await, no_data);
        assert!(matches!(sync.add_one().await, Err(SyncError::Api(_))));
        assert_eq!(sync.remote.calls(), 4);
        assert!(sync.is_empty().await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn add_one_inserts_single_remote_profile() {
        let jane = remote_profile("Jane", "Roe", "Canada", "Toronto");
        let sync = coordinator(FakeRemote::new().with_batch(vec![jane.clone()])).await;

        let added = sync.add_one().await.unwrap();
        assert_eq!(added, jane);
        assert_eq!(sync.count().await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn create_manual_forces_manual_provenance() {
        let sync = coordinator(FakeRemote::new()).await;
        let mut profile = remote_profile("Kai", "Lee", "Norway", "Oslo");
        profile.provenance = Provenance::Remote;

        let created = sync.create_manual(profile.clone()).await.unwrap();
        assert_eq!(created.provenance, Provenance::Manual);
        let stored = sync.get(&profile.id).await.unwrap().unwrap();
        assert_eq!(stored.provenance, Provenance::Manual);

        let duplicate = sync.create_manual(profile).await;
        assert!(matches!(duplicate, Err(SyncError::Store(_))));
        assert_eq!(sync.count().await.unwrap(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn update_of_missing_profile_fails() {
        let sync = coordinator(FakeRemote::new()).await;
        let ghost = Profile::new_manual(PersonName::new("", "No", "One"), "none@example.com");

        let result = sync.update(ghost).await;
        assert!(matches!(result, Err(SyncError::Store(reason)) if reason.contains("not found")));
        assert!(sync.is_empty().await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn update_and_update_contact_write_through() {
        let sync = coordinator(FakeRemote::new()).await;
        let mut ada = manual_profile("Ada", "Lovelace", "ada@example.com");
        sync.create_manual(ada.clone()).await.unwrap();

        ada.name.last = "King".to_string();
        sync.update(ada.clone()).await.unwrap();
        sync.update_contact(&ada.id, "ada@king.example", "1", "2")
            .await
            .unwrap();

        let stored = sync.get(&ada.id).await.unwrap().unwrap();
        assert_eq!(stored.name.last, "King");
        assert_eq!(stored.email, "ada@king.example");
        assert_eq!((stored.phone.as_str(), stored.cell.as_str()), ("1", "2"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn deletes_pass_through() {
        let sync = coordinator(FakeRemote::new()).await;
        let ada = manual_profile("Ada", "Lovelace", "ada@example.com");
        sync.create_manual(ada.clone()).await.unwrap();
        sync.store()
            .insert_many(remote_batch(3), ConflictPolicy::Abort)
            .await
            .unwrap();

        assert_eq!(sync.delete_by_provenance(Provenance::Remote).await.unwrap(), 3);
        assert_eq!(sync.delete_one(&ada.id).await.unwrap(), 1);
        assert_eq!(sync.delete_one(&ada.id).await.unwrap(), 0);

        sync.store()
            .insert_many(remote_batch(2), ConflictPolicy::Abort)
            .await
            .unwrap();
        assert_eq!(sync.delete_all().await.unwrap(), 2);
        assert!(sync.is_empty().await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn fill_always_fetches() {
        let sync = coordinator(
            FakeRemote::new()
                .with_batch(remote_batch(2))
                .with_batch(remote_batch(2)),
        )
        .await;
        sync.fill(2).await.unwrap();
        sync.fill(2).await.unwrap();
        assert_eq!(sync.remote.calls(), 2);
        assert_eq!(sync.count().await.unwrap(), 4);
    }
}
