//! Offline-first synchronization.
//!
//! Every mutation lands in the local cache first. The remote store gets one
//! immediate attempt; anything it does not confirm goes to a durable FIFO
//! queue that is replayed later by a drain.
//!
//! ```no_run
//! # async fn demo(config: &dailyplan::config::Config) -> Result<(), Box<dyn std::error::Error>> {
//! use dailyplan::models::NewSpecialNote;
//! use dailyplan::sync::SyncCoordinator;
//!
//! let sync = SyncCoordinator::open(config).await?;
//! sync.notes().create(NewSpecialNote::new("Call mom")).await?;
//! sync.sync_now().await;
//! # Ok(())
//! # }
//! ```

mod coordinator;
mod error;
mod ids;
mod operation;
mod probe;
mod queue;
mod remote;
mod rest;
mod worker;

#[cfg(test)]
pub(crate) mod memory;

pub use coordinator::{Entity, SyncCoordinator};
pub use error::SyncError;
pub use ids::next_id;
pub use operation::{NewOperation, OperationKind, SyncOperation};
pub use probe::ConnectivityProbe;
pub use queue::{DrainReport, PendingQueue};
pub use remote::{Disconnected, RemoteClient, RemoteError, RemoteStore};
pub use rest::RestStore;
pub use worker::{QueueError, QueueHandle};
