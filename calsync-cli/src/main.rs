mod commands;
mod credentials;
mod render;
mod utils;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use calsync_core::config::GeneralConfig;
use calsync_core::{Config, ConfigOverrides, InitMode};
use clap::{Parser, ValueEnum};
use owo_colors::OwoColorize;
use tracing_subscriber::EnvFilter;

use crate::utils::tui;

#[derive(Parser)]
#[command(name = "calsync")]
#[command(about = "Synchronize a local calendar store with a CalDAV collection")]
struct Cli {
    /// Create the sync database, reconciling both sides first
    #[arg(long, value_enum)]
    init: Option<InitArg>,

    /// Configuration file (default: ~/.config/calsync/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    lockfile: Option<PathBuf>,

    #[arg(long)]
    syncdb: Option<PathBuf>,

    #[arg(long)]
    hookdir: Option<PathBuf>,

    /// Local data directory (calcurse datadir or .ics directory)
    #[arg(long)]
    datadir: Option<PathBuf>,

    /// Report what would change without changing anything
    #[arg(long)]
    dry_run: bool,

    #[arg(short, long)]
    verbose: bool,

    #[arg(long)]
    debug: bool,

    /// Log HTTP headers including credentials (implies --debug)
    #[arg(long)]
    debug_raw: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum InitArg {
    /// Remove all local items and import the server's
    KeepRemote,
    /// Remove all remote objects and export the local ones
    KeepLocal,
    /// Copy local items to the server and vice versa
    TwoWay,
}

impl From<InitArg> for InitMode {
    fn from(arg: InitArg) -> Self {
        match arg {
            InitArg::KeepRemote => InitMode::KeepRemote,
            InitArg::KeepLocal => InitMode::KeepLocal,
            InitArg::TwoWay => InitMode::TwoWay,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", "error:".red(), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let overrides = ConfigOverrides {
        lock_file: cli.lockfile,
        sync_db: cli.syncdb,
        hook_dir: cli.hookdir,
        datadir: cli.datadir,
        dry_run: cli.dry_run,
        verbose: cli.verbose,
        debug: cli.debug || cli.debug_raw,
        debug_raw: cli.debug_raw,
    };

    let config_path = match cli.config {
        Some(path) => path,
        None => Config::default_path()?,
    };
    let config = Config::load(&config_path, &overrides)?;

    init_logging(&config.general);

    commands::sync::run(&config, cli.init.map(InitMode::from)).await
}

/// Log to stderr around the progress spinner. `RUST_LOG` takes precedence over the configured level.
fn init_logging(general: &GeneralConfig) {
    let level = if general.debug || general.debug_raw {
        "debug"
    } else if general.verbose {
        "info"
    } else {
        "warn"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(|| tui::SpinnerAwareStderr)
        .with_target(false)
        .init();
}
