//! Profile model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::Error;
use crate::util::next_timestamp_millis;

/// Stable identifier of a stored profile.
///
/// Remote profiles get `<remote uuid>_<local creation ms>`; manual profiles get a
/// fresh UUID v7 qualified the same way. Identifiers never contain line breaks and
/// carry no surrounding whitespace, so they survive the scan payload round-trip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProfileId(String);

impl ProfileId {
    /// Build an identifier from a remote-supplied id and the local creation time.
    pub fn qualified(remote_id: &str, created_at: i64) -> Result<Self, Error> {
        let remote_id = remote_id.trim();
        if remote_id.is_empty() {
            return Err(Error::InvalidInput(
                "Remote profile id cannot be empty".to_string(),
            ));
        }
        format!("{remote_id}_{created_at}").parse()
    }

    /// Generate an identifier for a locally created profile.
    #[must_use]
    pub fn generate(created_at: i64) -> Self {
        Self(format!("{}_{created_at}", Uuid::now_v7()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ProfileId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidInput(
                "Profile id cannot be empty".to_string(),
            ));
        }
        if trimmed.contains(['\n', '\r']) {
            return Err(Error::InvalidInput(
                "Profile id cannot contain line breaks".to_string(),
            ));
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl TryFrom<String> for ProfileId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ProfileId> for String {
    fn from(value: ProfileId) -> Self {
        value.0
    }
}

/// Where a stored profile came from. Set once at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Mapped from a remote fetch
    Remote,
    /// Created by hand
    Manual,
}

impl Provenance {
    pub const fn is_remote(self) -> bool {
        matches!(self, Self::Remote)
    }

    pub const fn from_remote_flag(is_from_remote: bool) -> Self {
        if is_from_remote {
            Self::Remote
        } else {
            Self::Manual
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonName {
    /// Mr, Ms, Dr, ...
    pub title: String,
    pub first: String,
    pub last: String,
}

impl PersonName {
    pub fn new(
        title: impl Into<String>,
        first: impl Into<String>,
        last: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            first: first.into(),
            last: last.into(),
        }
    }

    /// `"<title> <first> <last>"`, skipping empty parts.
    #[must_use]
    pub fn full_name(&self) -> String {
        [self.title.as_str(), self.first.as_str(), self.last.as_str()]
            .into_iter()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Postal address plus geo and timezone data. Coordinates stay strings, as delivered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub street_number: i64,
    pub street_name: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub postcode: String,
    pub latitude: String,
    pub longitude: String,
    pub timezone_offset: String,
    pub timezone_description: String,
}

impl Location {
    /// `"<city>, <country>"`
    #[must_use]
    pub fn summary(&self) -> String {
        format!("{}, {}", self.city, self.country)
    }
}

/// An ISO date together with the whole years elapsed since it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatedAge {
    pub date: String,
    pub age: i64,
}

/// Generated login bundle. Opaque strings; never used for authentication here.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Remote identifier, distinct from the local [`ProfileId`]
    pub uuid: String,
    pub username: String,
    pub password: String,
    pub salt: String,
    pub md5: String,
    pub sha1: String,
    pub sha256: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Credentials")
            .field("uuid", &self.uuid)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("salt", &"[REDACTED]")
            .field("md5", &"[REDACTED]")
            .field("sha1", &"[REDACTED]")
            .field("sha256", &"[REDACTED]")
            .finish()
    }
}

/// National identifier; either half may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NationalId {
    pub name: Option<String>,
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pictures {
    pub large: String,
    pub medium: String,
    pub thumbnail: String,
}

/// A stored user profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Unique identifier, immutable after creation
    pub id: ProfileId,
    pub gender: String,
    pub name: PersonName,
    pub email: String,
    pub phone: String,
    pub cell: String,
    /// Nationality code, e.g. `"GB"`
    pub nationality: String,
    pub location: Location,
    pub date_of_birth: DatedAge,
    pub registered: DatedAge,
    pub login: Credentials,
    pub national_id: NationalId,
    pub picture: Pictures,
    /// Local creation timestamp (Unix ms), set once
    pub created_at: i64,
    /// Set once at creation
    pub provenance: Provenance,
}

impl Profile {
    /// Create a manual profile with a fresh identifier. Remaining fields start empty.
    #[must_use]
    pub fn new_manual(name: PersonName, email: impl Into<String>) -> Self {
        let created_at = next_timestamp_millis();
        Self {
            id: ProfileId::generate(created_at),
            gender: String::new(),
            name,
            email: email.into(),
            phone: String::new(),
            cell: String::new(),
            nationality: String::new(),
            location: Location::default(),
            date_of_birth: DatedAge::default(),
            registered: DatedAge::default(),
            login: Credentials::default(),
            national_id: NationalId::default(),
            picture: Pictures::default(),
            created_at,
            provenance: Provenance::Manual,
        }
    }

    #[must_use]
    pub fn full_name(&self) -> String {
        self.name.full_name()
    }

    /// Case-insensitive substring match against first name, last name or email.
    ///
    /// An empty query matches everything.
    #[must_use]
    pub fn matches_search(&self, query: &str) -> bool {
        let query = query.to_lowercase();
        if query.is_empty() {
            return true;
        }
        [&self.name.first, &self.name.last, &self.email]
            .into_iter()
            .any(|field| field.to_lowercase().contains(&query))
    }
}
