//! dvbfe-daemon: keeps DVB frontends tuned and reports signal quality.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use dvbfe::{Adapter, DemuxTables, DvbFrontend, FrontendDevice, LnbConfig, TargetRef, TargetState};
use log::{debug, error, info, warn};
use parking_lot::RwLock;

mod config;
mod logging;
mod monitor;

use config::{AdapterSection, ConfigFile};
use monitor::RunningAdapter;

const DEFAULT_STATUS_INTERVAL: u64 = 10;

/// dvbfe-daemon - frontend tuning daemon for Linux DVB adapters
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short = 'f', long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Directory where log files are stored
    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,

    /// Number of days to keep log files
    #[arg(long, default_value = "7")]
    log_retention_days: u64,

    /// Seconds between signal status reports
    #[arg(long)]
    status_interval: Option<u64>,
}

/// Open the frontend, start its worker and tune the first mux marked `tune`.
fn start_adapter(
    section: &AdapterSection,
    lnb: &Arc<RwLock<LnbConfig>>,
) -> Result<RunningAdapter, Box<dyn std::error::Error>> {
    let frontend = DvbFrontend::open(&section.path, section.frontend)?;
    let kind = match section.kind {
        Some(kind) => kind,
        None => frontend.kind()?,
    };
    match frontend.info() {
        Ok(info) => info!(
            "\"{}\": {} ({}, {}..{})",
            frontend.path(),
            info.name,
            kind,
            info.frequency_min,
            info.frequency_max
        ),
        Err(e) => warn!("\"{}\" failed to read frontend info: {}", frontend.path(), e),
    }

    let mut muxes = Vec::with_capacity(section.muxes.len());
    let mut startup = None;
    for mux in &section.muxes {
        if let Err(e) = mux.validate(&section.path, kind) {
            warn!("Skipping mux: {}", e);
            continue;
        }
        let target = TargetRef::new(mux.to_target());
        if mux.tune {
            if startup.is_none() {
                startup = Some(target.clone());
            } else {
                warn!(
                    "\"{}\" has more than one mux marked tune, ignoring \"{}\"",
                    section.path, *target
                );
            }
        }
        muxes.push(target);
    }

    let lnb_source: Arc<RwLock<LnbConfig>> = Arc::clone(lnb);
    let adapter = Adapter::builder(section.path.clone(), kind, Arc::new(frontend))
        .lnb(lnb_source)
        .tables(Arc::new(DemuxTables::new(section.path.clone())))
        .on_state_change(|target| debug!("\"{}\" is now {:?}", target, target.state()))
        .build();
    adapter.start()?;

    if let Some(target) = startup {
        adapter.request_tune(&target, true, TargetState::Active)?;
    }

    Ok(RunningAdapter { adapter, muxes })
}

/// Re-read the `[lnb]` section. Takes effect on the next satellite tune.
fn reload_lnb(config_path: Option<&PathBuf>, lnb: &RwLock<LnbConfig>) {
    let Some(path) = config_path else {
        debug!("No configuration file to reload");
        return;
    };
    match config::load_config(path) {
        Ok(file) => {
            *lnb.write() = file.lnb;
            info!(
                "Reloaded LNB settings: low={} high={} switch={}",
                file.lnb.low, file.lnb.high, file.lnb.switch
            );
        }
        Err(e) => error!("Failed to reload configuration: {}", e),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Load config file: explicit path > auto-detect > default
    let config_path = config::resolve_config_path(args.config.clone());
    let file_config = if let Some(config_path) = &config_path {
        match config::load_config(config_path) {
            Ok(c) => {
                eprintln!("Loaded config from: {}", config_path.display());
                c
            }
            Err(e) => {
                eprintln!("Failed to load config file: {}", e);
                return Err(e.into());
            }
        }
    } else {
        ConfigFile::default()
    };

    // Command line takes precedence over the file
    let log_dir = if args.log_dir.to_string_lossy() != "logs" {
        args.log_dir.clone()
    } else {
        PathBuf::from(file_config.logging.log_dir.as_deref().unwrap_or("logs"))
    };
    let log_retention_days = if args.log_retention_days != 7 {
        args.log_retention_days
    } else {
        file_config.logging.retention_days.unwrap_or(7)
    };
    logging::init_logging(
        &log_dir,
        log_retention_days,
        args.verbose,
        file_config.logging.level.as_deref(),
    )?;

    let status_interval = args
        .status_interval
        .or(file_config.monitor.status_interval)
        .unwrap_or(DEFAULT_STATUS_INTERVAL)
        .max(1);

    info!("dvbfe-daemon starting...");
    info!(
        "  LNB: low={} high={} switch={}",
        file_config.lnb.low, file_config.lnb.high, file_config.lnb.switch
    );
    info!("  Status interval: {}s", status_interval);

    if file_config.adapters.is_empty() {
        warn!("No adapters configured");
    }

    let lnb = Arc::new(RwLock::new(file_config.lnb));
    let mut adapters = Vec::new();
    for section in &file_config.adapters {
        match start_adapter(section, &lnb) {
            Ok(running) => adapters.push(running),
            Err(e) => error!("Failed to start adapter \"{}\": {}", section.path, e),
        }
    }
    info!("{} adapter(s) running", adapters.len());

    #[cfg(unix)]
    let mut hangup =
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::hangup())?;

    let mut ticker = tokio::time::interval(Duration::from_secs(status_interval));
    loop {
        #[cfg(unix)]
        let reload = hangup.recv();
        #[cfg(not(unix))]
        let reload = std::future::pending::<Option<()>>();

        tokio::select! {
            _ = ticker.tick() => monitor::report(&adapters),
            _ = reload => reload_lnb(config_path.as_ref(), &lnb),
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    error!("Failed to listen for ctrl-c: {}", e);
                }
                break;
            }
        }
    }

    info!("Shutting down...");
    // Joining workers may block for a full tune sequence.
    tokio::task::spawn_blocking(move || {
        for running in &adapters {
            running.adapter.shutdown();
        }
    })
    .await?;

    Ok(())
}
