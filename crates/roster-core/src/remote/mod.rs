//! Remote profile source.

mod client;
mod wire;

use std::future::Future;

pub use client::RandomUserClient;
pub use wire::{
    RandomUser, RandomUserResponse, ResponseInfo, WireCoordinates, WireDated, WireLocation,
    WireLogin, WireName, WireNationalId, WirePicture, WireStreet, WireTimezone,
};

use crate::error::{SyncError, SyncResult};
use crate::models::Profile;

pub(crate) const NO_PROFILES_RECEIVED: &str = "No profiles received from remote";

/// Capability that produces freshly generated profiles.
///
/// Implementations map transport failures to [`SyncError::Network`] and
/// non-success answers, including an empty batch, to [`SyncError::Api`]. No retries.
pub trait RemoteSource: Send + Sync + 'static {
    /// Fetch `count` profiles. Never succeeds with an empty list.
    fn fetch_many(&self, count: usize) -> impl Future<Output = SyncResult<Vec<Profile>>> + Send;

    /// Fetch a single profile.
    fn fetch_one(&self) -> impl Future<Output = SyncResult<Profile>> + Send {
        async move {
            self.fetch_many(1)
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| SyncError::Api("No profile received from remote".to_string()))
        }
    }
}
