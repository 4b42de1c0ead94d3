//! One synchronization pass between the local store and the CalDAV
//! collection.
//!
//! A pass takes the lock, loads the sync database, snapshots both sides,
//! pulls remote changes, removes local objects deleted on the server,
//! pushes local changes, removes remote objects deleted locally and finally
//! saves the database. Any fatal error skips the save, so the next pass
//! re-derives the same work from the old database.

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use tracing::{debug, info, warn};

use crate::config::{Config, SyncPaths};
use crate::diff::SyncDiff;
use crate::error::{CalSyncError, CalSyncResult};
use crate::local::LocalStore;
use crate::lock::SyncLock;
use crate::remote::{DeleteOutcome, Remote, RemoteSnapshot};
use crate::sync_db::SyncDatabase;

/// How to reconcile the two sides when there is no sync database yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitMode {
    /// Delete every local object and import the server's.
    KeepRemote,
    /// Delete every remote object and export the local ones.
    KeepLocal,
    /// Copy local objects to the server and vice versa.
    TwoWay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Locked,
    Loaded,
    Diffed,
    Pulling,
    LocalDeleting,
    Pushing,
    RemoteDeleting,
    Persisted,
    Unlocked,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::Locked => "locked",
            Phase::Loaded => "loaded",
            Phase::Diffed => "diffed",
            Phase::Pulling => "pulling",
            Phase::LocalDeleting => "local-deleting",
            Phase::Pushing => "pushing",
            Phase::RemoteDeleting => "remote-deleting",
            Phase::Persisted => "persisted",
            Phase::Unlocked => "unlocked",
        };
        f.write_str(name)
    }
}

/// A problem that skipped one object but did not abort the pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncWarning {
    /// Deleted locally but modified on the server. The server copy is kept.
    DeleteConflict { hash: String, href: String },
    /// The server reported the object as gone while fetching it.
    NotFound { href: String },
    /// The local store did not accept the downloaded object.
    ImportFailed { href: String, etag: String },
    /// Changed on the server while the collection was being cleared by
    /// `--init keep-local`. The server copy is kept.
    WipeConflict { href: String },
}

impl fmt::Display for SyncWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncWarning::DeleteConflict { hash, href } => write!(
                f,
                "{} was deleted locally but modified in the CalDAV calendar ({}). \
                Keeping the modified version on the server. Run the synchronization \
                again to import the modified object.",
                hash, href
            ),
            SyncWarning::NotFound { href } => {
                write!(f, "{} disappeared from the server while fetching it; skipped.", href)
            }
            SyncWarning::ImportFailed { href, etag } => {
                write!(f, "Failed to import object: {} ({})", etag, href)
            }
            SyncWarning::WipeConflict { href } => write!(
                f,
                "{} was modified on the server while removing all remote objects; kept.",
                href
            ),
        }
    }
}

/// Counters reported at the end of a pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub local_added: usize,
    pub local_deleted: usize,
    pub remote_added: usize,
    pub remote_deleted: usize,
    pub warnings: Vec<SyncWarning>,
    /// Counts describe what would have happened; nothing was changed.
    pub dry_run: bool,
}

impl SyncSummary {
    pub fn has_changes(&self) -> bool {
        self.local_added + self.local_deleted + self.remote_added + self.remote_deleted > 0
    }
}

/// Mutable state of a pass in progress.
struct PassState {
    phase: Phase,
    db: SyncDatabase,
    remote: RemoteSnapshot,
    summary: SyncSummary,
}

impl PassState {
    fn enter(&mut self, phase: Phase) {
        debug!("Sync phase: {} -> {}", self.phase, phase);
        self.phase = phase;
    }

    fn warn(&mut self, warning: SyncWarning) {
        warn!("{}", warning);
        self.summary.warnings.push(warning);
    }
}

pub struct Synchronizer<'a, R: Remote, L: LocalStore> {
    remote: &'a R,
    local: &'a L,
    paths: SyncPaths,
    dry_run: bool,
}

impl<'a, R: Remote, L: LocalStore> Synchronizer<'a, R, L> {
    pub fn new(config: &Config, remote: &'a R, local: &'a L) -> CalSyncResult<Self> {
        Ok(Synchronizer {
            remote,
            local,
            paths: config.sync_paths()?,
            dry_run: config.general.dry_run,
        })
    }

    pub fn paths(&self) -> &SyncPaths {
        &self.paths
    }

    /// Run one complete pass. With `init`, start from an empty database
    /// after applying the requested initialization.
    pub async fn run(&self, init: Option<InitMode>) -> CalSyncResult<SyncSummary> {
        let mut state = PassState {
            phase: Phase::Idle,
            db: SyncDatabase::default(),
            remote: RemoteSnapshot::new(),
            summary: SyncSummary {
                dry_run: self.dry_run,
                ..Default::default()
            },
        };

        let result = self.run_locked(&mut state, init).await;

        if let Err(e) = &result {
            debug!("Synchronization aborted during {} phase: {}", state.phase, e);
        }
        state.enter(Phase::Unlocked);

        result.map(|()| state.summary)
    }

    async fn run_locked(&self, state: &mut PassState, init: Option<InitMode>) -> CalSyncResult<()> {
        let _lock = SyncLock::acquire(&self.paths.lock_file)?;
        state.enter(Phase::Locked);

        state.db = match init {
            Some(mode) => {
                self.initialize(state, mode).await?;
                SyncDatabase::default()
            }
            None => {
                if !self.paths.sync_db.exists() {
                    return Err(CalSyncError::Uninitialized);
                }
                SyncDatabase::load(&self.paths.sync_db)?
            }
        };
        state.enter(Phase::Loaded);

        // A dry run skips the init wipe, so the side it would have emptied
        // is taken as empty instead of listed.
        let wiped = if self.dry_run { init } else { None };

        state.remote = match wiped {
            Some(InitMode::KeepLocal) => RemoteSnapshot::new(),
            _ => self.remote.list_etags().await?,
        };
        let local_hashes = match wiped {
            Some(InitMode::KeepRemote) => HashSet::new(),
            _ => self.local.list_hashes().await?,
        };
        let diff = SyncDiff::compute(&state.db, &state.remote, &local_hashes);
        debug!(
            "Diff: {} missing, {} modified, {} orphaned, {} new, {} gone",
            diff.missing.len(),
            diff.modified.len(),
            diff.orphaned.len(),
            diff.new_local.len(),
            diff.gone_local.len()
        );
        state.enter(Phase::Diffed);

        state.enter(Phase::Pulling);
        self.pull_objects(state, &diff).await?;

        state.enter(Phase::LocalDeleting);
        self.remove_local_objects(state, &diff.orphaned).await?;

        state.enter(Phase::Pushing);
        self.push_objects(state, &diff.new_local).await?;

        state.enter(Phase::RemoteDeleting);
        self.remove_remote_objects(state, &diff.gone_local).await?;

        if self.dry_run {
            info!("Dry run; not saving the synchronization database.");
        } else {
            state.db.save(&self.paths.sync_db)?;
        }
        state.enter(Phase::Persisted);

        Ok(())
    }

    async fn initialize(&self, state: &mut PassState, mode: InitMode) -> CalSyncResult<()> {
        match mode {
            InitMode::KeepRemote => {
                info!("Removing all local objects...");
                if !self.dry_run {
                    self.local.wipe().await?;
                }
            }
            InitMode::KeepLocal => {
                info!("Removing all objects from the CalDAV server...");
                if self.dry_run {
                    return Ok(());
                }
                for (href, etag) in self.remote.list_etags().await? {
                    if self.remote.delete(&href, &etag).await? == DeleteOutcome::PreconditionFailed {
                        state.warn(SyncWarning::WipeConflict { href });
                    }
                }
            }
            InitMode::TwoWay => {}
        }
        Ok(())
    }

    /// Download new and modified objects and import them locally.
    async fn pull_objects(&self, state: &mut PassState, diff: &SyncDiff) -> CalSyncResult<()> {
        // A modified object whose local copy is gone is a delete conflict.
        // It is left to the remote deletion phase, which reports it and
        // drops the record so the next pass pulls it as new.
        let mut requested = diff.to_fetch();
        requested.retain(|href| {
            let conflicted = diff.modified.contains(href)
                && state
                    .db
                    .get(href)
                    .is_some_and(|record| diff.gone_local.contains(&record.hash));
            if conflicted {
                debug!("Not pulling {}; its local copy was deleted", href);
            }
            !conflicted
        });
        if requested.is_empty() {
            return Ok(());
        }

        let fetched = self.remote.fetch(&requested).await?;

        let mut answered: HashSet<String> = fetched.not_found.iter().cloned().collect();
        answered.extend(fetched.objects.iter().map(|o| o.href.clone()));

        for href in fetched.not_found {
            state.warn(SyncWarning::NotFound { href });
        }
        for href in requested.iter().filter(|h| !answered.contains(*h)) {
            state.warn(SyncWarning::NotFound { href: href.clone() });
        }

        for object in fetched.objects {
            if !requested.contains(&object.href) {
                debug!("Ignoring unrequested object {}", object.href);
                continue;
            }

            let replacing = diff.modified.contains(&object.href);
            if replacing {
                info!("Replacing object {}.", object.etag);
            } else {
                info!("Importing new object {}.", object.etag);
            }

            if self.dry_run {
                // Record what the import would have linked so later phases
                // see the same state as a real pass.
                match self.local.hash_of(&object.data) {
                    Some(hash) => state.db.put(&object.href, &object.etag, &hash),
                    None if replacing => {
                        state.db.remove(&object.href);
                    }
                    None => {}
                }
                state.summary.local_added += 1;
                continue;
            }

            if replacing && let Some(record) = state.db.get(&object.href) {
                let stale_hash = record.hash.clone();
                self.local.remove(&stale_hash).await?;
            }

            match self.local.import(&object.data).await? {
                Some(hash) => {
                    state.db.put(&object.href, &object.etag, &hash);
                    state.summary.local_added += 1;
                }
                None => {
                    if replacing {
                        state.db.remove(&object.href);
                    }
                    state.warn(SyncWarning::ImportFailed {
                        href: object.href,
                        etag: object.etag,
                    });
                }
            }
        }

        Ok(())
    }

    /// Delete local objects that no longer exist on the server.
    async fn remove_local_objects(
        &self,
        state: &mut PassState,
        orphaned: &BTreeSet<String>,
    ) -> CalSyncResult<()> {
        for href in orphaned {
            let Some(record) = state.db.get(href).cloned() else {
                continue;
            };

            info!("Removing local object {}.", record.hash);
            if !self.dry_run {
                self.local.remove(&record.hash).await?;
            }

            state.db.remove(href);
            state.summary.local_deleted += 1;
        }

        Ok(())
    }

    /// Upload local objects that were never synced.
    async fn push_objects(
        &self,
        state: &mut PassState,
        new_local: &BTreeSet<String>,
    ) -> CalSyncResult<()> {
        for hash in new_local {
            // Content that was just pulled under another href is already linked.
            if !state.db.hrefs_for_hash(hash).is_empty() {
                debug!("Object {} is already linked to a remote object", hash);
                continue;
            }

            info!("Pushing new object {} to the server.", hash);
            if self.dry_run {
                state.summary.remote_added += 1;
                continue;
            }

            let data = self.local.export(hash).await?;
            let created = self.remote.create(hash, &data).await?;
            state.db.put(&created.href, &created.etag, hash);
            state.summary.remote_added += 1;
        }

        Ok(())
    }

    /// Delete remote objects whose local counterpart was deleted, unless
    /// the server copy changed since the last pass.
    async fn remove_remote_objects(
        &self,
        state: &mut PassState,
        gone_local: &BTreeSet<String>,
    ) -> CalSyncResult<()> {
        for hash in gone_local {
            for href in state.db.hrefs_for_hash(hash) {
                let Some(record) = state.db.get(&href).cloned() else {
                    continue;
                };

                match state.remote.get(&href) {
                    None => {
                        debug!("{} is gone on both sides", href);
                        state.db.remove(&href);
                        continue;
                    }
                    Some(current) if *current != record.etag => {
                        state.db.remove(&href);
                        state.warn(SyncWarning::DeleteConflict {
                            hash: hash.clone(),
                            href,
                        });
                        continue;
                    }
                    Some(_) => {}
                }

                info!("Removing remote object {} ({}).", record.etag, href);
                if self.dry_run {
                    state.db.remove(&href);
                    state.summary.remote_deleted += 1;
                    continue;
                }

                match self.remote.delete(&href, &record.etag).await? {
                    DeleteOutcome::Deleted => {
                        state.db.remove(&href);
                        state.summary.remote_deleted += 1;
                    }
                    DeleteOutcome::PreconditionFailed => {
                        state.db.remove(&href);
                        state.warn(SyncWarning::DeleteConflict {
                            hash: hash.clone(),
                            href,
                        });
                    }
                }
            }
        }

        Ok(())
    }
}
