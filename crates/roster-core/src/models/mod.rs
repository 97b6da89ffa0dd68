//! Data models for Roster

mod profile;

pub use profile::{
    Credentials, DatedAge, Location, NationalId, PersonName, Pictures, Profile, ProfileId,
    Provenance,
};
