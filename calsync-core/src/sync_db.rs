//! Persistent correspondence between remote hrefs and local object hashes.
//!
//! The database is a plain text file with one `href etag hash` record per
//! line. It is the only state carried from one pass to the next and is
//! rewritten as a whole at the end of a successful pass.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::Write;
use std::path::Path;

use tracing::{debug, info};

use crate::error::{CalSyncError, CalSyncResult};

/// Last known link between one remote object and one local object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRecord {
    pub href: String,
    pub etag: String,
    pub hash: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncDatabase {
    records: BTreeMap<String, SyncRecord>,
}

impl SyncDatabase {
    /// Read the database at `path`. A missing file yields an empty database.
    pub fn load(path: &Path) -> CalSyncResult<Self> {
        if !path.exists() {
            return Ok(SyncDatabase::default());
        }

        info!("Loading synchronization database from {}...", path.display());

        let content = std::fs::read_to_string(path)?;
        let mut db = SyncDatabase::default();

        for (index, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }

            let fields: Vec<&str> = line.split_whitespace().collect();
            let [href, etag, hash] = fields[..] else {
                return Err(CalSyncError::CorruptDatabase {
                    path: path.to_path_buf(),
                    line: index + 1,
                    content: line.to_string(),
                });
            };

            db.records.insert(
                href.to_string(),
                SyncRecord {
                    href: href.to_string(),
                    etag: etag.to_string(),
                    hash: hash.to_string(),
                },
            );
        }

        Ok(db)
    }

    /// Write the database to `path`, replacing the previous file atomically.
    ///
    /// The records go to a sibling temporary file first, so an interrupted
    /// write leaves the old database intact.
    pub fn save(&self, path: &Path) -> CalSyncResult<()> {
        info!("Saving synchronization database to {}...", path.display());

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let mut content = String::new();
        for record in self.records.values() {
            content.push_str(&format!("{} {} {}\n", record.href, record.etag, record.hash));
        }

        let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
        temp_name.push(".tmp");
        let temp = path.with_file_name(temp_name);

        // Flushed to disk before the rename so a crash leaves either the old
        // or the new database, never a truncated one.
        let mut file = File::create(&temp)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
        drop(file);

        std::fs::rename(&temp, path)?;
        Ok(())
    }

    pub fn get(&self, href: &str) -> Option<&SyncRecord> {
        self.records.get(href)
    }

    pub fn put(&mut self, href: &str, etag: &str, hash: &str) {
        debug!("New sync database entry: {} {} {}", href, etag, hash);
        self.records.insert(
            href.to_string(),
            SyncRecord {
                href: href.to_string(),
                etag: etag.to_string(),
                hash: hash.to_string(),
            },
        );
    }

    pub fn remove(&mut self, href: &str) -> Option<SyncRecord> {
        debug!("Removing sync database entry: {}", href);
        self.records.remove(href)
    }

    pub fn contains(&self, href: &str) -> bool {
        self.records.contains_key(href)
    }

    /// Every href whose record points at `hash`.
    pub fn hrefs_for_hash(&self, hash: &str) -> Vec<String> {
        self.records
            .values()
            .filter(|r| r.hash == hash)
            .map(|r| r.href.clone())
            .collect()
    }

    /// All hashes referenced by at least one record.
    pub fn hashes(&self) -> BTreeSet<&str> {
        self.records.values().map(|r| r.hash.as_str()).collect()
    }

    pub fn records(&self) -> impl Iterator<Item = &SyncRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
