use anyhow::{Context, Result};
use calsync_core::constants::{POST_SYNC_HOOK, PRE_SYNC_HOOK};
use calsync_core::hooks::run_hook;
use calsync_core::local::{AnyStore, LocalStore};
use calsync_core::remote::CalDavClient;
use calsync_core::{Config, InitMode, Synchronizer};
use owo_colors::OwoColorize;

use crate::credentials;
use crate::render::Render;
use crate::utils::tui;

const DRY_RUN_WARNING: &str = "Dry run; nothing is imported or exported. \
    Add \"dry_run = false\" to the [general] section of the configuration \
    file to enable synchronization.";

pub async fn run(config: &Config, init: Option<InitMode>) -> Result<()> {
    if config.general.dry_run {
        eprintln!("{}", DRY_RUN_WARNING.yellow());
    }

    let credentials = credentials::resolve(config)?;
    let remote = CalDavClient::new(config, credentials).context("Failed to set up the CalDAV client")?;

    let local = AnyStore::from_config(config)?;
    local.check_compatible().await?;

    let synchronizer = Synchronizer::new(config, &remote, &local)?;
    let hook_dir = synchronizer.paths().hook_dir.clone();

    run_hook(&hook_dir, PRE_SYNC_HOOK).await;

    // Only shown while the log is limited to warnings.
    let quiet = !config.general.verbose && !config.general.debug;
    let spinner = quiet.then(|| tui::create_spinner(format!("Synchronizing {}", config.collection_url())));

    let result = synchronizer.run(init).await;

    if let Some(spinner) = spinner {
        tui::finish_spinner(spinner);
    }
    let summary = result?;

    run_hook(&hook_dir, POST_SYNC_HOOK).await;

    println!("{}", summary.render());

    Ok(())
}
