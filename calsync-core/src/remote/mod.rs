//! Remote calendar collection access.
//!
//! The engine talks to the server only through the [`Remote`] trait. The
//! production implementation is [`CalDavClient`]; tests use an in-memory
//! fake.

mod caldav;
mod multistatus;
mod request;

use std::collections::{BTreeMap, BTreeSet};

pub use caldav::{CalDavClient, Credentials, poll_etag};
pub use multistatus::{MultistatusEntry, parse_etag_listing, parse_multistatus};

use crate::error::CalSyncResult;

/// Current ETag of every object in the collection, keyed by href.
pub type RemoteSnapshot = BTreeMap<String, String>;

/// A calendar object downloaded from the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteObject {
    pub href: String,
    pub etag: String,
    pub data: String,
}

/// Result of a bulk fetch. Hrefs the server reported as gone are listed
/// separately; they are skipped for this pass, not treated as failures.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchOutcome {
    pub objects: Vec<RemoteObject>,
    pub not_found: Vec<String>,
}

/// Location and ETag of a freshly uploaded object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedObject {
    pub href: String,
    pub etag: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// The object changed on the server since `etag` was recorded.
    PreconditionFailed,
}

#[allow(async_fn_in_trait)]
pub trait Remote {
    /// List every href in the collection with its current ETag.
    async fn list_etags(&self) -> CalSyncResult<RemoteSnapshot>;

    /// Download the given objects in one request.
    async fn fetch(&self, hrefs: &BTreeSet<String>) -> CalSyncResult<FetchOutcome>;

    /// Upload a new object named after its local content hash.
    async fn create(&self, hash: &str, data: &str) -> CalSyncResult<CreatedObject>;

    /// Delete `href` only if its ETag still equals `etag`.
    async fn delete(&self, href: &str, etag: &str) -> CalSyncResult<DeleteOutcome>;
}
