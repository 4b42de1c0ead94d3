//! A directory of content-addressed `.ics` files as a local store.
//!
//! Each object lives in `<hash>.ics`, where the hash is the SHA-256 of the
//! object's canonical text. Editing an object means writing a new file and
//! removing the old one, so the file name always identifies the content.

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::info;

use super::{LocalStore, canonicalize, content_hash, is_valid_hash};
use crate::error::{CalSyncError, CalSyncResult};

const EXTENSION: &str = "ics";

pub struct DirectoryStore {
    dir: PathBuf,
}

impl DirectoryStore {
    pub fn new(dir: &Path) -> Self {
        DirectoryStore {
            dir: dir.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    fn object_path(&self, hash: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", hash, EXTENSION))
    }
}

impl LocalStore for DirectoryStore {
    async fn check_compatible(&self) -> CalSyncResult<()> {
        if self.dir.is_dir() {
            Ok(())
        } else {
            Err(CalSyncError::IncompatibleStore(format!(
                "Calendar directory {} does not exist",
                self.dir.display()
            )))
        }
    }

    async fn list_hashes(&self) -> CalSyncResult<HashSet<String>> {
        let mut hashes = HashSet::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|e| e == EXTENSION)
                && let Some(stem) = path.file_stem().and_then(|s| s.to_str())
                && is_valid_hash(stem)
            {
                hashes.insert(stem.to_string());
            }
        }

        Ok(hashes)
    }

    async fn export(&self, hash: &str) -> CalSyncResult<String> {
        let path = self.object_path(hash);
        tokio::fs::read_to_string(&path).await.map_err(|e| {
            CalSyncError::LocalStore(format!("Failed to read {}: {}", path.display(), e))
        })
    }

    fn hash_of(&self, data: &str) -> Option<String> {
        (!data.trim().is_empty()).then(|| content_hash(data))
    }

    async fn import(&self, data: &str) -> CalSyncResult<Option<String>> {
        let Some(hash) = self.hash_of(data) else {
            return Ok(None);
        };
        let path = self.object_path(&hash);

        if !path.exists() {
            let temp = self.dir.join(format!(".{}.{}.tmp", hash, EXTENSION));
            tokio::fs::write(&temp, canonicalize(data)).await?;
            tokio::fs::rename(&temp, &path).await?;
        }

        Ok(Some(hash))
    }

    async fn remove(&self, hash: &str) -> CalSyncResult<()> {
        match tokio::fs::remove_file(self.object_path(hash)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn wipe(&self) -> CalSyncResult<()> {
        info!("Removing all objects from {}...", self.dir.display());
        for hash in self.list_hashes().await? {
            self.remove(&hash).await?;
        }
        Ok(())
    }
}
