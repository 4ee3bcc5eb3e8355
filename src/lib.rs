pub mod core;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::core::config::{SyncConfig, DEFAULT_CONFIG_FILE};
use crate::core::error::SyncResult;
use crate::core::state::{logs_dir_in, resolve_data_dir, AppContext};
use crate::core::sync::SyncReport;

/// Set to `1` to also write a daily rolling log under `<data_dir>/logs`.
pub const LOG_TO_FILE_ENV: &str = "MOD_SYNC_LOG_TO_FILE";
const LOG_FILE_PREFIX: &str = "mod-sync.log";

#[derive(Parser, Debug)]
#[command(name = "mod-sync", version)]
#[command(about = "Download and install the mods you are subscribed to")]
struct Args {
    /// Path to the JSON config file
    #[arg(default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Sync this game instead of the one named in the config
    #[arg(long)]
    game: Option<String>,

    /// Enable debug logging for every crate
    #[arg(short, long)]
    debug: bool,
}

/// Install the global subscriber. Keep the returned guard alive for as long
/// as the file log should be flushed.
///
/// A log directory that cannot be used downgrades to console-only logging.
pub fn init_logging(debug: bool, log_dir: Option<PathBuf>) -> Option<WorkerGuard> {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,mod_sync_lib=debug"))
    };
    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false));

    match log_dir.and_then(|dir| file_appender(&dir)) {
        Some(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = registry
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .try_init();
            Some(guard)
        }
        None => {
            let _ = registry.try_init();
            None
        }
    }
}

fn file_appender(dir: &Path) -> Option<RollingFileAppender> {
    if let Err(e) = std::fs::create_dir_all(dir) {
        eprintln!("mod-sync: cannot create log directory {:?}: {}", dir, e);
        return None;
    }
    match RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .build(dir)
    {
        Ok(appender) => Some(appender),
        Err(e) => {
            eprintln!("mod-sync: cannot open log file in {:?}: {}", dir, e);
            None
        }
    }
}

fn log_to_file_requested() -> bool {
    std::env::var(LOG_TO_FILE_ENV)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// One sync cycle for the configured game.
pub async fn run_sync(config: SyncConfig) -> SyncResult<SyncReport> {
    let ctx = AppContext::new(config)?;
    info!("Data directory: {:?}", ctx.data_dir);

    let mut store = ctx.open_storage().await?;
    let synchronizer = ctx.synchronizer()?;
    synchronizer.sync_game(&mut store, &ctx.config.game).await
}

/// Binary entry point. Exit code 0 on a clean run, 2 when some mods failed,
/// 1 when the cycle itself could not complete.
pub fn run() -> ExitCode {
    let args = Args::parse();

    let mut config = match SyncConfig::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("mod-sync: cannot load {:?}: {}", args.config, e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(game) = args.game {
        config.game = game;
    }

    let log_dir = log_to_file_requested().then(|| logs_dir_in(&resolve_data_dir(&config)));
    let _log_guard = init_logging(args.debug, log_dir);

    info!("ModSync {} starting...", env!("CARGO_PKG_VERSION"));

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Could not start the async runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run_sync(config)) {
        Ok(report) if report.has_failures() => {
            warn!("Sync finished with failures: {}", report);
            ExitCode::from(2)
        }
        Ok(report) => {
            info!("Sync finished: {}", report);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Sync failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
