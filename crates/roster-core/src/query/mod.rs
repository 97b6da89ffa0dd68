//! Sorted and searched view over the store.
//!
//! One [`QueryViewManager`] owns exactly one store subscription at a time. Each
//! emission fully replaces the published list.

use std::cmp::Ordering as CmpOrdering;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::db::StoreView;
use crate::models::Profile;
use crate::services::{ProfileStore, Subscription};

/// Display ordering. The reversed modes are computed in memory from their base view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    #[default]
    NewestFirst,
    OldestFirst,
    NameAsc,
    NameDesc,
    LocationAsc,
    LocationDesc,
}

impl SortMode {
    pub const ALL: [Self; 6] = [
        Self::NewestFirst,
        Self::OldestFirst,
        Self::NameAsc,
        Self::NameDesc,
        Self::LocationAsc,
        Self::LocationDesc,
    ];

    /// The store view this mode is derived from.
    pub const fn base_view(self) -> StoreView {
        match self {
            Self::NewestFirst | Self::OldestFirst => StoreView::Recent,
            Self::NameAsc | Self::NameDesc => StoreView::ByName,
            Self::LocationAsc | Self::LocationDesc => StoreView::ByLocation,
        }
    }

    pub const fn is_reversed(self) -> bool {
        matches!(self, Self::OldestFirst | Self::NameDesc | Self::LocationDesc)
    }

    /// Ordering of the base view, identical to the store's ordering for it.
    pub fn compare_base(self, a: &Profile, b: &Profile) -> CmpOrdering {
        match self {
            Self::NewestFirst | Self::OldestFirst => b
                .created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id)),
            Self::NameAsc | Self::NameDesc => (&a.name.first, &a.name.last, &a.id)
                .cmp(&(&b.name.first, &b.name.last, &b.id)),
            Self::LocationAsc | Self::LocationDesc => {
                (&a.location.country, &a.location.city, &a.id)
                    .cmp(&(&b.location.country, &b.location.city, &b.id))
            }
        }
    }

    /// Put a base-view snapshot into this mode's display order.
    fn arrange(self, mut profiles: Vec<Profile>, resort: bool) -> Vec<Profile> {
        if resort {
            profiles.sort_by(|a, b| self.compare_base(a, b));
        }
        if self.is_reversed() {
            profiles.reverse();
        }
        profiles
    }
}

struct QueryState {
    sort_mode: SortMode,
    search_text: String,
    subscription: Option<Subscription>,
}

/// Publishes the list for the active sort mode and search text.
///
/// Create within a tokio runtime. Dropping the manager cancels its subscription.
pub struct QueryViewManager {
    store: ProfileStore,
    state: Mutex<QueryState>,
    generation: Arc<AtomicU64>,
    output: Arc<watch::Sender<Vec<Profile>>>,
}

impl QueryViewManager {
    /// Start on newest-first with no search.
    pub fn new(store: ProfileStore) -> Self {
        let (output, _) = watch::channel(Vec::new());
        let manager = Self {
            store,
            state: Mutex::new(QueryState {
                sort_mode: SortMode::default(),
                search_text: String::new(),
                subscription: None,
            }),
            generation: Arc::new(AtomicU64::new(0)),
            output: Arc::new(output),
        };
        {
            let mut state = manager.lock_state();
            manager.resubscribe(&mut state);
        }
        manager
    }

    pub fn set_sort_mode(&self, mode: SortMode) {
        let mut state = self.lock_state();
        if state.sort_mode == mode && state.subscription.is_some() {
            return;
        }
        state.sort_mode = mode;
        self.resubscribe(&mut state);
    }

    /// Blank text shows the plain sort-mode view.
    pub fn set_search_text(&self, text: impl Into<String>) {
        let text = text.into();
        let mut state = self.lock_state();
        if state.search_text == text && state.subscription.is_some() {
            return;
        }
        state.search_text = text;
        self.resubscribe(&mut state);
    }

    pub fn clear_search(&self) {
        self.set_search_text(String::new());
    }

    pub fn sort_mode(&self) -> SortMode {
        self.lock_state().sort_mode
    }

    pub fn search_text(&self) -> String {
        self.lock_state().search_text.clone()
    }

    /// The list most recently published.
    pub fn current(&self) -> Vec<Profile> {
        self.output.borrow().clone()
    }

    /// Receiver notified whenever a new list is published.
    pub fn subscribe(&self) -> watch::Receiver<Vec<Profile>> {
        self.output.subscribe()
    }

    /// Stop observing the store. The last published list stays readable.
    pub fn close(&self) {
        let mut state = self.lock_state();
        self.retire_current_view(&mut state);
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, QueryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Invalidate and cancel the active subscription.
    ///
    /// The generation moves under the output lock, so once this returns no
    /// snapshot from the old subscription can be published.
    fn retire_current_view(&self, state: &mut QueryState) -> u64 {
        let mut next = 0;
        self.output.send_if_modified(|_| {
            next = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            false
        });
        if let Some(subscription) = state.subscription.take() {
            subscription.cancel();
        }
        next
    }

    fn resubscribe(&self, state: &mut QueryState) {
        let generation = self.retire_current_view(state);
        let mode = state.sort_mode;
        let searching = !state.search_text.trim().is_empty();
        let view = if searching {
            StoreView::Search(state.search_text.clone())
        } else {
            mode.base_view()
        };
        tracing::debug!("Query view switched to {view:?} ({mode:?})");

        let output = Arc::clone(&self.output);
        let current_generation = Arc::clone(&self.generation);
        let subscription = self.store.subscribe(view, move |profiles| {
            let arranged = mode.arrange(profiles, searching);
            output.send_if_modified(|published| {
                if current_generation.load(Ordering::SeqCst) != generation {
                    return false;
                }
                *published = arranged;
                true
            });
        });
        state.subscription = Some(subscription);
    }
}
