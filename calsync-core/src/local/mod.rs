//! Local calendar store access.
//!
//! Objects in the local store are identified by a hash of their content.
//! The engine only needs to list, export, import and remove objects, so
//! each backend is an adapter behind the [`LocalStore`] trait.

mod calcurse;
mod directory;

use std::collections::HashSet;

use sha2::{Digest, Sha256};

pub use calcurse::{Calcurse, parse_calcurse_version};
pub use directory::DirectoryStore;

use crate::config::{Config, LocalConfig};
use crate::error::CalSyncResult;

#[allow(async_fn_in_trait)]
pub trait LocalStore {
    /// Fail if the store cannot be used for synchronization.
    async fn check_compatible(&self) -> CalSyncResult<()> {
        Ok(())
    }

    /// Hashes of every object currently in the store.
    async fn list_hashes(&self) -> CalSyncResult<HashSet<String>>;

    /// iCalendar text of one object.
    async fn export(&self, hash: &str) -> CalSyncResult<String>;

    /// Add an object and return its hash, or `None` if the store did not
    /// accept it.
    async fn import(&self, data: &str) -> CalSyncResult<Option<String>>;

    /// The hash `import` would assign to `data`, for stores that can tell
    /// without importing. Used to simulate imports during a dry run.
    fn hash_of(&self, _data: &str) -> Option<String> {
        None
    }

    async fn remove(&self, hash: &str) -> CalSyncResult<()>;

    /// Remove every object from the store.
    async fn wipe(&self) -> CalSyncResult<()>;
}

/// The local store selected by the configuration.
pub enum AnyStore {
    Calcurse(Calcurse),
    Directory(DirectoryStore),
}

impl AnyStore {
    pub fn from_config(config: &Config) -> CalSyncResult<Self> {
        Ok(match &config.local {
            LocalConfig::Calcurse {
                binary,
                datadir,
                sync_filter,
            } => AnyStore::Calcurse(Calcurse::new(binary, datadir.as_deref(), sync_filter)?),
            LocalConfig::Directory { path } => AnyStore::Directory(DirectoryStore::new(path)),
        })
    }
}

impl LocalStore for AnyStore {
    async fn check_compatible(&self) -> CalSyncResult<()> {
        match self {
            AnyStore::Calcurse(store) => store.check_compatible().await,
            AnyStore::Directory(store) => store.check_compatible().await,
        }
    }

    async fn list_hashes(&self) -> CalSyncResult<HashSet<String>> {
        match self {
            AnyStore::Calcurse(store) => store.list_hashes().await,
            AnyStore::Directory(store) => store.list_hashes().await,
        }
    }

    async fn export(&self, hash: &str) -> CalSyncResult<String> {
        match self {
            AnyStore::Calcurse(store) => store.export(hash).await,
            AnyStore::Directory(store) => store.export(hash).await,
        }
    }

    async fn import(&self, data: &str) -> CalSyncResult<Option<String>> {
        match self {
            AnyStore::Calcurse(store) => store.import(data).await,
            AnyStore::Directory(store) => store.import(data).await,
        }
    }

    fn hash_of(&self, data: &str) -> Option<String> {
        match self {
            AnyStore::Calcurse(store) => store.hash_of(data),
            AnyStore::Directory(store) => store.hash_of(data),
        }
    }

    async fn remove(&self, hash: &str) -> CalSyncResult<()> {
        match self {
            AnyStore::Calcurse(store) => store.remove(hash).await,
            AnyStore::Directory(store) => store.remove(hash).await,
        }
    }

    async fn wipe(&self) -> CalSyncResult<()> {
        match self {
            AnyStore::Calcurse(store) => store.wipe().await,
            AnyStore::Directory(store) => store.wipe().await,
        }
    }
}

/// Line endings normalized to LF with exactly one trailing newline, so the
/// same object always hashes the same no matter how it was transported.
pub fn canonicalize(data: &str) -> String {
    let mut canonical = data.replace("\r\n", "\n");
    let trimmed_len = canonical.trim_end().len();
    canonical.truncate(trimmed_len);
    canonical.push('\n');
    canonical
}

/// Hex SHA-256 of the canonical form of `data`.
pub fn content_hash(data: &str) -> String {
    format!("{:x}", Sha256::digest(canonicalize(data).as_bytes()))
}

/// Store hashes are non-empty lowercase hex strings.
pub fn is_valid_hash(hash: &str) -> bool {
    !hash.is_empty() && hash.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
