//! In-memory stores and a scratch environment for engine tests.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tempfile::TempDir;

use crate::config::{Config, ConfigOverrides, SyncPaths};
use crate::error::{CalSyncError, CalSyncResult};
use crate::local::{LocalStore, canonicalize, content_hash};
use crate::remote::{
    CreatedObject, DeleteOutcome, FetchOutcome, Remote, RemoteObject, RemoteSnapshot,
};
use crate::sync::{InitMode, SyncSummary, Synchronizer};
use crate::sync_db::SyncDatabase;

/// A small iCalendar object named `uid`.
pub fn ics(uid: &str) -> String {
    format!(
        "BEGIN:VCALENDAR\nVERSION:2.0\nBEGIN:VEVENT\nUID:{uid}\nSUMMARY:{uid}\nEND:VEVENT\nEND:VCALENDAR\n"
    )
}

/// Lock, database and hook paths inside a scratch directory.
pub struct TestEnv {
    _tempdir: Option<TempDir>,
    root: PathBuf,
    pub config: Config,
    pub paths: SyncPaths,
}

impl TestEnv {
    pub fn new(dry_run: bool) -> Self {
        let tempdir = tempfile::tempdir().unwrap();
        let mut env = Self::with_dir(tempdir.path(), dry_run);
        env._tempdir = Some(tempdir);
        env
    }

    /// Another view of an existing environment, e.g. with dry-run toggled.
    pub fn with_dir(root: &Path, dry_run: bool) -> Self {
        let toml = format!(
            r#"
[general]
hostname = "dav.example.com"
path = "/cal/"
dry_run = {dry_run}

[local]
kind = "directory"
path = "{store}"

[paths]
lock_file = "{lock}"
sync_db = "{db}"
hook_dir = "{hooks}"
"#,
            store = root.join("store").display(),
            lock = root.join("lock").display(),
            db = root.join("sync.db").display(),
            hooks = root.join("hooks").display(),
        );

        let config = Config::from_toml_str(&toml, &ConfigOverrides::default()).unwrap();
        let paths = config.sync_paths().unwrap();

        TestEnv {
            _tempdir: None,
            root: root.to_path_buf(),
            config,
            paths,
        }
    }

    pub fn dir_path(&self) -> &Path {
        &self.root
    }

    pub async fn sync<R: Remote, L: LocalStore>(
        &self,
        remote: &R,
        local: &L,
        init: Option<InitMode>,
    ) -> CalSyncResult<SyncSummary> {
        Synchronizer::new(&self.config, remote, local)?.run(init).await
    }

    pub fn load_db(&self) -> SyncDatabase {
        SyncDatabase::load(&self.paths.sync_db).unwrap()
    }
}

#[derive(Default)]
struct MemoryState {
    objects: BTreeMap<String, String>,
    reject_imports: bool,
}

/// A local store keeping canonical object text by content hash.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, data: &str) -> String {
        let hash = content_hash(data);
        self.state
            .lock()
            .unwrap()
            .objects
            .insert(hash.clone(), canonicalize(data));
        hash
    }

    pub fn delete(&self, hash: &str) {
        self.state.lock().unwrap().objects.remove(hash);
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.state.lock().unwrap().objects.contains_key(hash)
    }

    pub fn get(&self, hash: &str) -> Option<String> {
        self.state.lock().unwrap().objects.get(hash).cloned()
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap().objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.state.lock().unwrap().objects.clone()
    }

    /// Make every following import fail.
    pub fn reject_imports(&self) {
        self.state.lock().unwrap().reject_imports = true;
    }
}

impl LocalStore for MemoryStore {
    async fn list_hashes(&self) -> CalSyncResult<HashSet<String>> {
        Ok(self.state.lock().unwrap().objects.keys().cloned().collect())
    }

    async fn export(&self, hash: &str) -> CalSyncResult<String> {
        self.get(hash)
            .ok_or_else(|| CalSyncError::LocalStore(format!("no object {hash}")))
    }

    fn hash_of(&self, data: &str) -> Option<String> {
        Some(content_hash(data))
    }

    async fn import(&self, data: &str) -> CalSyncResult<Option<String>> {
        if self.state.lock().unwrap().reject_imports {
            return Ok(None);
        }
        Ok(Some(self.insert(data)))
    }

    async fn remove(&self, hash: &str) -> CalSyncResult<()> {
        self.delete(hash);
        Ok(())
    }

    async fn wipe(&self) -> CalSyncResult<()> {
        self.state.lock().unwrap().objects.clear();
        Ok(())
    }
}

#[derive(Default)]
struct RemoteState {
    /// href -> (etag, data)
    objects: BTreeMap<String, (String, String)>,
    next_etag: u64,
    fail_creates: bool,
    reject_deletes: bool,
    hidden: BTreeSet<String>,
    requests: Vec<String>,
}

impl RemoteState {
    fn fresh_etag(&mut self) -> String {
        self.next_etag += 1;
        format!("etag-{}", self.next_etag)
    }
}

/// A CalDAV collection held in memory, recording every request.
#[derive(Default)]
pub struct FakeRemote {
    state: Mutex<RemoteState>,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, href: &str, data: &str) -> String {
        let mut state = self.state.lock().unwrap();
        let etag = state.fresh_etag();
        state
            .objects
            .insert(href.to_string(), (etag.clone(), data.to_string()));
        etag
    }

    pub fn put_with_etag(&self, href: &str, etag: &str, data: &str) {
        self.state
            .lock()
            .unwrap()
            .objects
            .insert(href.to_string(), (etag.to_string(), data.to_string()));
    }

    /// Replace the content of `href` under a new ETag.
    pub fn edit(&self, href: &str, data: &str) {
        assert!(self.etag(href).is_some(), "no object at {href}");
        self.put(href, data);
    }

    /// Delete `href` behind the engine's back.
    pub fn remove(&self, href: &str) {
        self.state.lock().unwrap().objects.remove(href);
    }

    pub fn etag(&self, href: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .objects
            .get(href)
            .map(|(etag, _)| etag.clone())
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap().objects.len()
    }

    pub fn snapshot(&self) -> BTreeMap<String, (String, String)> {
        self.state.lock().unwrap().objects.clone()
    }

    pub fn requests(&self) -> Vec<String> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn clear_requests(&self) {
        self.state.lock().unwrap().requests.clear();
    }

    pub fn fail_creates(&self, fail: bool) {
        self.state.lock().unwrap().fail_creates = fail;
    }

    /// Answer every conditional delete with a failed precondition.
    pub fn reject_deletes(&self) {
        self.state.lock().unwrap().reject_deletes = true;
    }

    /// Report `href` as not found when it is fetched.
    pub fn hide_on_fetch(&self, href: &str) {
        self.state.lock().unwrap().hidden.insert(href.to_string());
    }
}

impl Remote for FakeRemote {
    async fn list_etags(&self) -> CalSyncResult<RemoteSnapshot> {
        let mut state = self.state.lock().unwrap();
        state.requests.push("list".into());
        Ok(state
            .objects
            .iter()
            .map(|(href, (etag, _))| (href.clone(), etag.clone()))
            .collect())
    }

    async fn fetch(&self, hrefs: &BTreeSet<String>) -> CalSyncResult<FetchOutcome> {
        let mut state = self.state.lock().unwrap();
        let joined: Vec<&str> = hrefs.iter().map(String::as_str).collect();
        let request = format!("fetch {}", joined.join(" "));
        state.requests.push(request);

        let mut outcome = FetchOutcome::default();
        for href in hrefs {
            match state.objects.get(href) {
                Some((etag, data)) if !state.hidden.contains(href) => {
                    outcome.objects.push(RemoteObject {
                        href: href.clone(),
                        etag: etag.clone(),
                        data: data.clone(),
                    });
                }
                _ => outcome.not_found.push(href.clone()),
            }
        }
        Ok(outcome)
    }

    async fn create(&self, hash: &str, data: &str) -> CalSyncResult<CreatedObject> {
        let mut state = self.state.lock().unwrap();
        state.requests.push(format!("create {hash}"));

        let href = format!("/cal/{hash}.ics");
        if state.fail_creates {
            return Err(CalSyncError::HttpStatus {
                status: 500,
                reason: "Internal Server Error".into(),
                url: format!("https://dav.example.com{href}"),
            });
        }

        let etag = state.fresh_etag();
        state
            .objects
            .insert(href.clone(), (etag.clone(), data.to_string()));
        Ok(CreatedObject { href, etag })
    }

    async fn delete(&self, href: &str, etag: &str) -> CalSyncResult<DeleteOutcome> {
        let mut state = self.state.lock().unwrap();
        state.requests.push(format!("delete {href}"));

        if state.reject_deletes {
            return Ok(DeleteOutcome::PreconditionFailed);
        }
        let current = state.objects.get(href).map(|(current, _)| current.clone());
        match current {
            None => Ok(DeleteOutcome::Deleted),
            Some(current) if current != etag => Ok(DeleteOutcome::PreconditionFailed),
            Some(_) => {
                state.objects.remove(href);
                Ok(DeleteOutcome::Deleted)
            }
        }
    }
}
