//! Shared services built on top of the database layer.

mod store;

pub use store::{LiveView, ProfileStore, Subscription};
