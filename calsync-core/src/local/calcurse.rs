//! calcurse as a local store.
//!
//! Every operation shells out to the calcurse binary. calcurse identifies
//! items by a SHA1 of their serialized form, which is exactly the content
//! hash the engine needs.

use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info};

use super::{LocalStore, is_valid_hash};
use crate::config::SyncFilter;
use crate::constants::MIN_CALCURSE_VERSION;
use crate::error::{CalSyncError, CalSyncResult};

const CALCURSE_TIMEOUT: Duration = Duration::from_secs(60);

/// Print one hash per line for every item type.
const HASH_FORMATS: [&str; 5] = [
    "--format-apt=%(hash)\\n",
    "--format-recur-apt=%(hash)\\n",
    "--format-event=%(hash)\\n",
    "--format-recur-event=%(hash)\\n",
    "--format-todo=%(hash)\\n",
];

/// Filter that matches no item; combined with `-F` it empties the store.
const MATCH_NOTHING_FILTER: &str = "--filter-hash=XXX";

pub struct Calcurse {
    binary: PathBuf,
    datadir: Option<PathBuf>,
    sync_filter: SyncFilter,
}

impl Calcurse {
    pub fn new(binary: &str, datadir: Option<&Path>, sync_filter: &SyncFilter) -> CalSyncResult<Self> {
        let binary = which::which(binary)
            .map_err(|_| CalSyncError::StoreNotInstalled(binary.to_string()))?;

        Ok(Calcurse {
            binary,
            datadir: datadir.map(Path::to_path_buf),
            sync_filter: sync_filter.clone(),
        })
    }

    fn args<I, S>(&self, extra: I) -> Vec<OsString>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let mut args: Vec<OsString> = Vec::new();
        if let Some(dir) = &self.datadir {
            args.push("-D".into());
            args.push(dir.clone().into_os_string());
        }
        args.extend(extra.into_iter().map(Into::into));
        args
    }

    /// Run calcurse with `args`, feeding `input` on stdin, and return stdout.
    async fn run(&self, args: Vec<OsString>, input: Option<&str>) -> CalSyncResult<String> {
        debug!("Running command: {} {:?}", self.binary.display(), args);

        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdin(if input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| {
                CalSyncError::LocalStore(format!(
                    "Failed to spawn {}: {}",
                    self.binary.display(),
                    e
                ))
            })?;

        if let (Some(input), Some(mut stdin)) = (input, child.stdin.take()) {
            stdin.write_all(input.as_bytes()).await?;
            drop(stdin);
        }

        let output = timeout(CALCURSE_TIMEOUT, child.wait_with_output())
            .await
            .map_err(|_| {
                CalSyncError::LocalStore(format!(
                    "calcurse did not finish within {}s",
                    CALCURSE_TIMEOUT.as_secs()
                ))
            })??;

        if !output.status.success() {
            return Err(CalSyncError::LocalStore(format!(
                "calcurse exited with status: {}",
                output.status.code().unwrap_or(-1)
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim_end().to_string())
    }

    pub async fn version(&self) -> CalSyncResult<Option<(u32, u32, u32, u32)>> {
        let output = self.run(self.args(["--version"]), None).await?;
        Ok(parse_calcurse_version(&output))
    }
}

impl LocalStore for Calcurse {
    async fn check_compatible(&self) -> CalSyncResult<()> {
        match self.version().await {
            Ok(Some(version)) if version >= MIN_CALCURSE_VERSION => Ok(()),
            Ok(Some(_)) => Err(CalSyncError::IncompatibleStore(
                "Incompatible calcurse binary detected. Version >=4.1.0 is required \
                to synchronize with CalDAV servers."
                    .into(),
            )),
            Ok(None) | Err(_) => Err(CalSyncError::IncompatibleStore(format!(
                "Invalid calcurse binary {}. Make sure that the file specified in the \
                configuration is a valid and up-to-date calcurse binary.",
                self.binary.display()
            ))),
        }
    }

    async fn list_hashes(&self) -> CalSyncResult<HashSet<String>> {
        let mut extra = vec![
            "-G".to_string(),
            "--filter-type".to_string(),
            self.sync_filter.as_arg(),
        ];
        extra.extend(HASH_FORMATS.iter().map(|f| f.to_string()));

        let output = self.run(self.args(extra), None).await?;
        Ok(output
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect())
    }

    async fn export(&self, hash: &str) -> CalSyncResult<String> {
        let filter = format!("--filter-hash={}", hash);
        self.run(self.args(["-xical", "--export-uid", filter.as_str()]), None)
            .await
    }

    async fn import(&self, data: &str) -> CalSyncResult<Option<String>> {
        let mut extra = vec!["-i", "-", "--dump-imported", "-q"];
        extra.extend(HASH_FORMATS);

        let output = self.run(self.args(extra), Some(data)).await?;
        let hash = output.trim();

        // Several hashes (one object holding multiple items) or an error
        // message both count as a failed import.
        Ok(is_valid_hash(hash).then(|| hash.to_string()))
    }

    async fn remove(&self, hash: &str) -> CalSyncResult<()> {
        let filter = format!("--filter-hash=!{}", hash);
        self.run(self.args(["-F", filter.as_str()]), None).await?;
        Ok(())
    }

    async fn wipe(&self) -> CalSyncResult<()> {
        info!("Removing all local calcurse objects...");
        self.run(self.args(["-F", MATCH_NOTHING_FILTER]), None).await?;
        Ok(())
    }
}

/// Parse `calcurse 4.8.1` or a development build such as
/// `calcurse 4.0.0-96-g1a2b3c` into `(major, minor, patch, commits)`.
pub fn parse_calcurse_version(output: &str) -> Option<(u32, u32, u32, u32)> {
    let token = output
        .trim_start()
        .strip_prefix("calcurse ")?
        .split_whitespace()
        .next()?;

    let mut parts = token.splitn(3, '-');
    let mut numbers = parts.next()?.split('.');

    let major = numbers.next()?.parse().ok()?;
    let minor = numbers.next()?.parse().ok()?;
    let patch = numbers.next()?.parse().ok()?;

    // The commit count only counts when followed by another dash.
    let commits = match (parts.next(), parts.next()) {
        (Some(count), Some(_)) => count.parse().unwrap_or(0),
        _ => 0,
    };

    Some((major, minor, patch, commits))
}
