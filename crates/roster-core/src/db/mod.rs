//! Database layer for Roster

mod connection;
mod migrations;
mod repository;

pub use connection::Database;
pub use repository::{ConflictPolicy, LibSqlProfileRepository, ProfileRepository, StoreView};
