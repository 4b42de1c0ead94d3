use std::time::Duration;

/// Directory name used under the platform config directory.
pub const APP_DIR: &str = "calsync";

pub const CONFIG_FILE: &str = "config.toml";
pub const LOCK_FILE: &str = "lock";
pub const SYNC_DB_FILE: &str = "sync.db";
pub const HOOK_DIR: &str = "hooks";

pub const PRE_SYNC_HOOK: &str = "pre-sync";
pub const POST_SYNC_HOOK: &str = "post-sync";

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_ETAG_POLL_ATTEMPTS: u32 = 10;
pub const DEFAULT_ETAG_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Oldest calcurse build (4.0.0, 96 commits in) that supports the
/// `--dump-imported` and `--filter-hash` options.
pub const MIN_CALCURSE_VERSION: (u32, u32, u32, u32) = (4, 0, 0, 96);

pub const DEFAULT_SYNC_FILTER: &str = "cal,todo";

/// Environment variables consulted by the credential resolver.
pub const PASSWORD_ENV: &str = "CALSYNC_PASSWORD";
pub const TOKEN_ENV: &str = "CALSYNC_TOKEN";
