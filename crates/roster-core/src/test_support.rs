//! Fixtures shared by unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::error::{SyncError, SyncResult};
use crate::models::{
    Credentials, DatedAge, Location, NationalId, PersonName, Pictures, Profile, ProfileId,
    Provenance,
};
use crate::remote::RemoteSource;
use crate::util::next_timestamp_millis;

/// A remote-provenance profile with a fresh time-qualified id.
pub fn remote_profile(first: &str, last: &str, country: &str, city: &str) -> Profile {
    let created_at = next_timestamp_millis();
    let remote_uuid = uuid::Uuid::now_v7().to_string();
    Profile {
        id: ProfileId::qualified(&remote_uuid, created_at).unwrap(),
        gender: "female".to_string(),
        name: PersonName::new("Ms", first, last),
        email: format!("{}.{}@example.com", first.to_lowercase(), last.to_lowercase()),
        phone: "(555) 010-0000".to_string(),
        cell: "(555) 010-0001".to_string(),
        nationality: "CA".to_string(),
        location: Location {
            street_number: 42,
            street_name: "Main Street".to_string(),
            city: city.to_string(),
            state: "State".to_string(),
            country: country.to_string(),
            postcode: "A1B 2C3".to_string(),
            latitude: "43.6532".to_string(),
            longitude: "-79.3832".to_string(),
            timezone_offset: "-5:00".to_string(),
            timezone_description: "Eastern Time (US & Canada), Bogota, Lima".to_string(),
        },
        date_of_birth: DatedAge {
            date: "1990-04-12T08:15:00.000Z".to_string(),
            age: 36,
        },
        registered: DatedAge {
            date: "2015-06-01T10:00:00.000Z".to_string(),
            age: 11,
        },
        login: Credentials {
            uuid: remote_uuid,
            username: format!("{}{}", first.to_lowercase(), 7),
            password: "secret".to_string(),
            salt: "salt".to_string(),
            md5: "md5".to_string(),
            sha1: "sha1".to_string(),
            sha256: "sha256".to_string(),
        },
        national_id: NationalId {
            name: Some("SIN".to_string()),
            value: Some("046 454 286".to_string()),
        },
        picture: Pictures {
            large: "https://randomuser.me/api/portraits/women/1.jpg".to_string(),
            medium: "https://randomuser.me/api/portraits/med/women/1.jpg".to_string(),
            thumbnail: "https://randomuser.me/api/portraits/thumb/women/1.jpg".to_string(),
        },
        created_at,
        provenance: Provenance::Remote,
    }
}

/// A manual-provenance profile.
pub fn manual_profile(first: &str, last: &str, email: &str) -> Profile {
    Profile::new_manual(PersonName::new("", first, last), email)
}

/// Scripted `RemoteSource` that counts calls.
///
/// Each fetch pops the next scripted outcome; an exhausted script answers with
/// a network failure.
#[derive(Default)]
pub struct FakeRemote {
    outcomes: Mutex<VecDeque<SyncResult<Vec<Profile>>>>,
    calls: AtomicUsize,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_batch(self, batch: Vec<Profile>) -> Self {
        self.push(Ok(batch));
        self
    }

    pub fn with_failure(self, failure: SyncError) -> Self {
        self.push(Err(failure));
        self
    }

    pub fn push(&self, outcome: SyncResult<Vec<Profile>>) {
        self.outcomes.lock().unwrap().push_back(outcome);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RemoteSource for FakeRemote {
    async fn fetch_many(&self, _count: usize) -> SyncResult<Vec<Profile>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let outcome = self.outcomes.lock().unwrap().pop_front();
        outcome.unwrap_or_else(|| Err(SyncError::Network("no scripted response".to_string())))
    }
}

/// `count` remote profiles named `Person0..`, created in order.
pub fn remote_batch(count: usize) -> Vec<Profile> {
    (0..count)
        .map(|i| remote_profile(&format!("Person{i}"), "Batch", "Chile", "Arica"))
        .collect()
}
