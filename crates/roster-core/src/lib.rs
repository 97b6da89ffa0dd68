//! roster-core - Core library for Roster
//!
//! This crate contains the profile models, the local libSQL store with live
//! views, the remote profile source, sync coordination, sorted/searched query
//! views and the visual-code lookup protocol consumed by a UI shell.

pub mod config;
pub mod db;
pub mod error;
pub mod lookup;
pub mod models;
pub mod query;
pub mod remote;
pub mod services;
pub mod session;
pub mod sync;
pub mod util;

#[cfg(test)]
mod test_support;

pub use error::{Error, Result, SyncError, SyncResult};
pub use models::{Profile, ProfileId, Provenance};
