//! Configuration for a synchronization run.
//!
//! The configuration is read once per invocation from
//! ~/.config/calsync/config.toml (or the `--config` override), layered with
//! command line overrides, and then passed by reference to the engine, the
//! CalDAV client and the local store adapter.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use ::config::builder::{ConfigBuilder, DefaultState};
use ::config::{File, FileFormat};
use serde::{Deserialize, Deserializer};

use crate::constants::{
    APP_DIR, CONFIG_FILE, DEFAULT_ETAG_POLL_ATTEMPTS, DEFAULT_ETAG_POLL_INTERVAL,
    DEFAULT_REQUEST_TIMEOUT, DEFAULT_SYNC_FILTER, HOOK_DIR, LOCK_FILE, SYNC_DB_FILE,
};
use crate::error::{CalSyncError, CalSyncResult};

/// Item types understood by calcurse's `--filter-type` option.
const VALID_SYNC_FILTER_VALUES: [&str; 7] = [
    "event",
    "apt",
    "recur-event",
    "recur-apt",
    "todo",
    "recur",
    "cal",
];

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub general: GeneralConfig,

    #[serde(default)]
    pub local: LocalConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    /// Extra headers sent with every request.
    #[serde(default)]
    pub custom_headers: BTreeMap<String, String>,

    #[serde(default)]
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneralConfig {
    pub hostname: String,

    /// Collection path on the server, e.g. `/calendars/alice/personal/`.
    pub path: String,

    #[serde(default = "default_true")]
    pub https: bool,

    #[serde(default)]
    pub insecure_ssl: bool,

    /// Simulate the pass without touching either store. On by default so a
    /// fresh configuration never modifies anything until explicitly enabled.
    #[serde(default = "default_true")]
    pub dry_run: bool,

    #[serde(default)]
    pub verbose: bool,

    #[serde(default)]
    pub debug: bool,

    /// Log request headers without removing credentials.
    #[serde(default)]
    pub debug_raw: bool,

    #[serde(default)]
    pub auth_method: AuthMethod,

    #[serde(
        default = "default_request_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub request_timeout: Duration,

    #[serde(default = "default_etag_poll_attempts")]
    pub etag_poll_attempts: u32,

    #[serde(
        default = "default_etag_poll_interval",
        deserialize_with = "deserialize_duration"
    )]
    pub etag_poll_interval: Duration,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    #[default]
    Basic,
    Bearer,
    None,
}

/// Which local store to synchronize.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LocalConfig {
    Calcurse {
        #[serde(default = "default_calcurse_binary")]
        binary: String,

        #[serde(default)]
        datadir: Option<PathBuf>,

        #[serde(default)]
        sync_filter: SyncFilter,
    },
    Directory {
        path: PathBuf,
    },
}

impl Default for LocalConfig {
    fn default() -> Self {
        LocalConfig::Calcurse {
            binary: default_calcurse_binary(),
            datadir: None,
            sync_filter: SyncFilter::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthConfig {
    pub username: Option<String>,
    pub password: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    pub lock_file: Option<PathBuf>,
    pub sync_db: Option<PathBuf>,
    pub hook_dir: Option<PathBuf>,
}

/// Fully resolved file locations for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPaths {
    pub lock_file: PathBuf,
    pub sync_db: PathBuf,
    pub hook_dir: PathBuf,
}

/// Comma separated list of calcurse item types to synchronize.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct SyncFilter(Vec<String>);

impl SyncFilter {
    pub fn parse(value: &str) -> CalSyncResult<Self> {
        let values: Vec<String> = value
            .split(',')
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect();

        let mut invalid: Vec<&str> = values
            .iter()
            .map(String::as_str)
            .filter(|v| !VALID_SYNC_FILTER_VALUES.contains(v))
            .collect();

        if !invalid.is_empty() {
            invalid.sort_unstable();
            invalid.dedup();
            return Err(CalSyncError::Config(format!(
                "Invalid value(s) in sync_filter option: {}",
                invalid.join(", ")
            )));
        }

        if values.is_empty() {
            return Err(CalSyncError::Config("sync_filter must not be empty".into()));
        }

        Ok(SyncFilter(values))
    }

    /// The value passed to `--filter-type`.
    pub fn as_arg(&self) -> String {
        self.0.join(",")
    }
}

impl Default for SyncFilter {
    fn default() -> Self {
        SyncFilter(DEFAULT_SYNC_FILTER.split(',').map(String::from).collect())
    }
}

impl TryFrom<String> for SyncFilter {
    type Error = CalSyncError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        SyncFilter::parse(&value)
    }
}

impl fmt::Display for SyncFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_arg())
    }
}

/// Values given on the command line that take precedence over the file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub lock_file: Option<PathBuf>,
    pub sync_db: Option<PathBuf>,
    pub hook_dir: Option<PathBuf>,
    pub datadir: Option<PathBuf>,
    pub dry_run: bool,
    pub verbose: bool,
    pub debug: bool,
    pub debug_raw: bool,
}

impl Config {
    /// ~/.config/calsync
    pub fn config_dir() -> CalSyncResult<PathBuf> {
        Ok(dirs::config_dir()
            .ok_or_else(|| CalSyncError::Config("Could not determine config directory".into()))?
            .join(APP_DIR))
    }

    pub fn default_path() -> CalSyncResult<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE))
    }

    /// Load the configuration file at `path`.
    ///
    /// A missing file is replaced by a commented template and reported as an
    /// error, since there is no sensible server to talk to by default.
    pub fn load(path: &Path, overrides: &ConfigOverrides) -> CalSyncResult<Self> {
        if !path.exists() {
            Self::create_default_config(path)?;
            return Err(CalSyncError::Config(format!(
                "Configuration file not found. A template was written to {}; \
                fill in the [general] section and run again.",
                path.display()
            )));
        }

        let source = File::new(&path.to_string_lossy(), FileFormat::Toml).required(true);
        Self::build(::config::Config::builder().add_source(source), overrides)
    }

    /// Parse a configuration from TOML text.
    pub fn from_toml_str(contents: &str, overrides: &ConfigOverrides) -> CalSyncResult<Self> {
        let source = File::from_str(contents, FileFormat::Toml);
        Self::build(::config::Config::builder().add_source(source), overrides)
    }

    fn build(
        builder: ConfigBuilder<DefaultState>,
        overrides: &ConfigOverrides,
    ) -> CalSyncResult<Self> {
        let mut builder = builder;

        let path_overrides = [
            ("paths.lock_file", &overrides.lock_file),
            ("paths.sync_db", &overrides.sync_db),
            ("paths.hook_dir", &overrides.hook_dir),
        ];
        for (key, value) in path_overrides {
            if let Some(path) = value {
                builder = builder
                    .set_override(key, path.to_string_lossy().into_owned())
                    .map_err(|e| CalSyncError::Config(e.to_string()))?;
            }
        }

        let flag_overrides = [
            ("general.dry_run", overrides.dry_run),
            ("general.verbose", overrides.verbose),
            ("general.debug", overrides.debug),
            ("general.debug_raw", overrides.debug_raw),
        ];
        for (key, enabled) in flag_overrides {
            // Flags can only switch a setting on.
            if enabled {
                builder = builder
                    .set_override(key, true)
                    .map_err(|e| CalSyncError::Config(e.to_string()))?;
            }
        }

        let mut config: Config = builder
            .build()
            .map_err(|e| CalSyncError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| CalSyncError::Config(e.to_string()))?;

        if let Some(datadir) = &overrides.datadir {
            match &mut config.local {
                LocalConfig::Calcurse { datadir: dir, .. } => *dir = Some(datadir.clone()),
                LocalConfig::Directory { path } => *path = datadir.clone(),
            }
        }

        config.normalize()?;
        Ok(config)
    }

    fn normalize(&mut self) -> CalSyncResult<()> {
        self.general.hostname = self.general.hostname.trim().to_string();
        if self.general.hostname.is_empty() {
            return Err(CalSyncError::Config("general.hostname must not be empty".into()));
        }

        self.general.path = normalize_collection_path(&self.general.path);

        if self.general.etag_poll_attempts == 0 {
            return Err(CalSyncError::Config(
                "general.etag_poll_attempts must be at least 1".into(),
            ));
        }

        match &mut self.local {
            LocalConfig::Calcurse { datadir, .. } => {
                if let Some(dir) = datadir {
                    let expanded = expand_path(dir);
                    if !expanded.is_dir() {
                        return Err(CalSyncError::Config(format!(
                            "invalid directory: {}",
                            expanded.display()
                        )));
                    }
                    *dir = expanded;
                }
            }
            LocalConfig::Directory { path } => *path = expand_path(path),
        }

        Ok(())
    }

    /// Resolve lock, database and hook locations, falling back to the
    /// calsync config directory.
    pub fn sync_paths(&self) -> CalSyncResult<SyncPaths> {
        let resolve = |configured: &Option<PathBuf>, default: &str| -> CalSyncResult<PathBuf> {
            match configured {
                Some(path) => Ok(expand_path(path)),
                None => Ok(Self::config_dir()?.join(default)),
            }
        };

        Ok(SyncPaths {
            lock_file: resolve(&self.paths.lock_file, LOCK_FILE)?,
            sync_db: resolve(&self.paths.sync_db, SYNC_DB_FILE)?,
            hook_dir: resolve(&self.paths.hook_dir, HOOK_DIR)?,
        })
    }

    /// Scheme and host, e.g. `https://caldav.example.com`.
    pub fn server_url(&self) -> String {
        let scheme = if self.general.https { "https" } else { "http" };
        format!("{}://{}", scheme, self.general.hostname)
    }

    /// Absolute URL of the calendar collection.
    pub fn collection_url(&self) -> String {
        format!("{}{}", self.server_url(), self.general.path)
    }

    /// Create a default config file with the required options left blank.
    pub fn create_default_config(path: &Path) -> CalSyncResult<()> {
        let contents = "\
# calsync configuration

[general]
# CalDAV server and calendar collection to synchronize with:
hostname = \"\"
path = \"\"
# https = true
# insecure_ssl = false

# Nothing is imported or exported until this is set to false:
dry_run = true

# auth_method = \"basic\"   # basic, bearer or none
# request_timeout = \"30s\"
# etag_poll_attempts = 10
# etag_poll_interval = \"500ms\"

[local]
kind = \"calcurse\"
# binary = \"calcurse\"
# datadir = \"~/.local/share/calcurse\"
# sync_filter = \"cal,todo\"

[auth]
# username = \"\"
# password = \"\"   # or set CALSYNC_PASSWORD

# [custom_headers]
# User-Agent = \"calsync\"
";

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                CalSyncError::Config(format!("Could not create config directory: {e}"))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| CalSyncError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }
}

/// `calendars/alice/` and `/calendars/alice` both become `/calendars/alice/`.
pub fn normalize_collection_path(path: &str) -> String {
    let trimmed = path.trim().trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{}/", trimmed)
    }
}

fn expand_path(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned())
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    humantime::parse_duration(&value).map_err(serde::de::Error::custom)
}

fn default_true() -> bool {
    true
}

fn default_calcurse_binary() -> String {
    "calcurse".to_string()
}

fn default_request_timeout() -> Duration {
    DEFAULT_REQUEST_TIMEOUT
}

fn default_etag_poll_attempts() -> u32 {
    DEFAULT_ETAG_POLL_ATTEMPTS
}

fn default_etag_poll_interval() -> Duration {
    DEFAULT_ETAG_POLL_INTERVAL
}
