//! Offline-first daily planner.
//!
//! Plans, achievements and special notes are cached locally and kept in sync
//! with a remote table store through [`sync::SyncCoordinator`].

pub mod config;
pub mod models;
pub mod server;
pub mod store;
pub mod sync;
