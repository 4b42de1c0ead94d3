//! Classification of remote and local objects against the sync database.

use std::collections::{BTreeSet, HashSet};

use crate::remote::RemoteSnapshot;
use crate::sync_db::SyncDatabase;

/// What changed on either side since the last successful pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncDiff {
    /// On the server but never synced: pull.
    pub missing: BTreeSet<String>,
    /// Synced before, ETag changed on the server: pull and replace.
    pub modified: BTreeSet<String>,
    /// Synced before, no longer on the server: delete locally.
    pub orphaned: BTreeSet<String>,
    /// Local hashes that were never pushed: push.
    pub new_local: BTreeSet<String>,
    /// Synced hashes no longer in the local store: delete remotely.
    pub gone_local: BTreeSet<String>,
}

impl SyncDiff {
    pub fn compute(db: &SyncDatabase, remote: &RemoteSnapshot, local: &HashSet<String>) -> Self {
        let mut diff = SyncDiff::default();

        for (href, etag) in remote {
            match db.get(href) {
                None => {
                    diff.missing.insert(href.clone());
                }
                Some(record) if record.etag != *etag => {
                    diff.modified.insert(href.clone());
                }
                Some(_) => {}
            }
        }

        diff.orphaned = db
            .records()
            .filter(|r| !remote.contains_key(&r.href))
            .map(|r| r.href.clone())
            .collect();

        let synced_hashes = db.hashes();

        diff.new_local = local
            .iter()
            .filter(|hash| !synced_hashes.contains(hash.as_str()))
            .cloned()
            .collect();

        diff.gone_local = synced_hashes
            .into_iter()
            .filter(|hash| !local.contains(*hash))
            .map(String::from)
            .collect();

        diff
    }

    /// Hrefs that need their content fetched.
    pub fn to_fetch(&self) -> BTreeSet<String> {
        self.missing.union(&self.modified).cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.missing.is_empty()
            && self.modified.is_empty()
            && self.orphaned.is_empty()
            && self.new_local.is_empty()
            && self.gone_local.is_empty()
    }
}
