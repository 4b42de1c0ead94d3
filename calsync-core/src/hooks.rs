//! Pre- and post-sync hook scripts.

use std::path::Path;

use tokio::process::Command;
use tracing::{info, warn};

/// Run `<hook_dir>/<name>` through the shell if it exists.
///
/// Hooks belong to the user; a failing hook is reported but never stops
/// the synchronization.
pub async fn run_hook(hook_dir: &Path, name: &str) {
    let hook_path = hook_dir.join(name);
    if !hook_path.exists() {
        return;
    }

    info!("Running {} hook {}...", name, hook_path.display());

    let status = Command::new("sh")
        .arg("-c")
        .arg(hook_path.as_os_str())
        .status()
        .await;

    match status {
        Ok(status) if status.success() => {}
        Ok(status) => warn!(
            "{} hook exited with status {}",
            name,
            status.code().unwrap_or(-1)
        ),
        Err(e) => warn!("Failed to run {} hook: {}", name, e),
    }
}
