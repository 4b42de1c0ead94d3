//! Synchronization engine between a local calendar store and a CalDAV
//! collection.
//!
//! The engine keeps a small database linking every remote href to the hash
//! of its local counterpart, compares it against both sides at the start of
//! a pass and then pulls, pushes and deletes objects until the sides agree:
//! - `remote` talks CalDAV
//! - `local` adapts calcurse or a plain directory of `.ics` files
//! - `sync` runs one pass under a lock file

pub mod config;
pub mod constants;
pub mod diff;
pub mod error;
pub mod hooks;
pub mod local;
pub mod lock;
pub mod remote;
pub mod sync;
pub mod sync_db;

#[cfg(test)]
mod testing;

pub use crate::config::{Config, ConfigOverrides};
pub use crate::error::{CalSyncError, CalSyncResult};
pub use crate::sync::{InitMode, Phase, SyncSummary, SyncWarning, Synchronizer};
