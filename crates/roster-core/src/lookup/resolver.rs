use tokio::sync::{watch, Mutex};

use super::payload::extract_identifier;
use crate::error::SyncResult;
use crate::models::{Profile, ProfileId};
use crate::services::ProfileStore;
use crate::util::text_prefix;

const ID_PREFIX_LEN: usize = 8;

/// Result of resolving one scanned text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    /// The profile was found and is now selected
    Resolved(Profile),
    /// A valid payload naming a profile that is not stored
    NotFound { id_prefix: String, store_count: u64 },
    /// Same identifier as the last resolved one; no lookup was made
    Suppressed,
    /// The text is not a lookup payload
    InvalidPayload,
}

impl LookupOutcome {
    /// User-facing explanation for a miss.
    pub fn not_found_message(&self) -> Option<String> {
        match self {
            Self::NotFound {
                id_prefix,
                store_count,
            } => Some(format!(
                "Profile not found in the current database.\n\nScanned ID: {id_prefix}...\nDatabase has: {store_count} profiles"
            )),
            _ => None,
        }
    }
}

/// Resolves scanned payloads against the store and tracks the selected profile.
pub struct LookupResolver {
    store: ProfileStore,
    last_resolved: Mutex<Option<ProfileId>>,
    selected: watch::Sender<Option<Profile>>,
}

impl LookupResolver {
    pub fn new(store: ProfileStore) -> Self {
        let (selected, _) = watch::channel(None);
        Self {
            store,
            last_resolved: Mutex::new(None),
            selected,
        }
    }

    /// Resolve scanned text.
    ///
    /// Resolutions are serialized; a repeat of the last resolved identifier is
    /// suppressed until [`LookupResolver::reset`]. Misses are not remembered.
    pub async fn resolve(&self, text: &str) -> SyncResult<LookupOutcome> {
        let Some(id) = extract_identifier(text) else {
            return Ok(LookupOutcome::InvalidPayload);
        };

        let mut last_resolved = self.last_resolved.lock().await;
        if last_resolved.as_ref() == Some(&id) {
            return Ok(LookupOutcome::Suppressed);
        }

        let id_prefix = text_prefix(id.as_str(), ID_PREFIX_LEN);
        if let Some(profile) = self.store.get(&id).await? {
            tracing::debug!("Lookup resolved {id_prefix}...");
            *last_resolved = Some(id);
            self.selected.send_replace(Some(profile.clone()));
            return Ok(LookupOutcome::Resolved(profile));
        }

        let store_count = self.store.count().await?;
        tracing::warn!("Lookup miss for {id_prefix}... ({store_count} profiles stored)");
        Ok(LookupOutcome::NotFound {
            id_prefix,
            store_count,
        })
    }

    /// Allow the last resolved identifier to be looked up again.
    pub async fn reset(&self) {
        *self.last_resolved.lock().await = None;
    }

    pub fn selected(&self) -> Option<Profile> {
        self.selected.borrow().clone()
    }

    pub fn select(&self, profile: Profile) {
        self.selected.send_replace(Some(profile));
    }

    pub fn clear_selection(&self) {
        self.selected.send_replace(None);
    }

    pub fn subscribe_selected(&self) -> watch::Receiver<Option<Profile>> {
        self.selected.subscribe()
    }
}
