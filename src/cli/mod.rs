/*
* machine-monitor command line
* ----------------------------
* machine-monitor [--config DIR]
* ├── run (default)   sample the fleet every interval until Ctrl-C
* │     --dashboard        live charts in the terminal's alternate screen (off by default)
* │     --store PATH       CSV file rows are appended to
* │     --interval SECS    pause between cycles
* │     --batch-size N     machines sampled per cycle
* │     --seed N           replayable readings
* │     --cycles N         stop after N cycles
* └── init [--force]  write DIR/default.toml with the defaults
*/

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{error, info, Level};

use crate::config::{generate_default_config, LoggingSettings, Settings, DEFAULT_DASHBOARD_LOG_FILE};
use crate::core::CycleDriver;
use crate::dashboard::spawn_terminal_dashboard;
use crate::errors::MonitorResult;

#[derive(Parser)]
#[command(name = "machine-monitor")]
#[command(about = "Samples a simulated machine fleet and flags out-of-range readings", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Directory holding default.toml / local.toml
    #[arg(short, long, value_name = "DIR", global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Sample, evaluate and persist readings until interrupted
    ///
    /// Console report only unless --dashboard (or dashboard.enabled) is set.
    Run(RunArgs),
    /// Generate default configuration
    Init {
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Args, Debug, Default, Clone, PartialEq)]
pub struct RunArgs {
    /// Draw live charts in the terminal (off by default)
    #[arg(long)]
    pub dashboard: bool,
    #[arg(long, value_name = "PATH")]
    pub store: Option<PathBuf>,
    #[arg(long, value_name = "SECS")]
    pub interval: Option<u64>,
    #[arg(long, value_name = "N")]
    pub batch_size: Option<usize>,
    #[arg(long)]
    pub seed: Option<u64>,
    #[arg(long, value_name = "N")]
    pub cycles: Option<u64>,
}

impl RunArgs {
    /// Flags win over file and environment settings.
    pub fn apply(&self, settings: &mut Settings) {
        if self.dashboard {
            settings.dashboard.enabled = true;
        }
        if let Some(store) = &self.store {
            settings.storage.path = store.clone();
        }
        if let Some(interval) = self.interval {
            settings.sampling.interval_secs = interval;
        }
        if let Some(batch_size) = self.batch_size {
            settings.sampling.batch_size = batch_size;
        }
        if let Some(seed) = self.seed {
            settings.sampling.seed = Some(seed);
        }
    }
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Run(RunArgs::default())) {
        Commands::Run(args) => {
            let mut settings = load_settings(cli.config.as_deref())?;
            args.apply(&mut settings);
            settings.validate()?;

            init_logging(&settings.logging, settings.dashboard.enabled)?;
            run_monitor(settings, args.cycles).await
        }
        Commands::Init { force } => {
            let dir = cli.config.unwrap_or_else(|| PathBuf::from("config"));
            handle_init_command(&dir, force)
        }
    }
}

fn load_settings(config_dir: Option<&Path>) -> MonitorResult<Settings> {
    let settings = match config_dir {
        Some(dir) => Settings::new_from_dir(dir)?,
        None => Settings::new()?,
    };
    Ok(settings)
}

fn init_logging(logging: &LoggingSettings, dashboard: bool) -> anyhow::Result<()> {
    let level: Level = logging
        .level
        .parse()
        .with_context(|| format!("invalid log level '{}'", logging.level))?;

    // The dashboard owns the screen, so its logs always go to a file.
    let file = logging
        .file
        .clone()
        .or_else(|| dashboard.then(|| PathBuf::from(DEFAULT_DASHBOARD_LOG_FILE)));

    let builder = tracing_subscriber::fmt().with_max_level(level);
    match file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("cannot open log file {}", path.display()))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None => builder.with_writer(io::stderr).init(),
    }
    Ok(())
}

async fn run_monitor(settings: Settings, max_cycles: Option<u64>) -> anyhow::Result<()> {
    let driver = CycleDriver::from_settings(&settings)?;
    info!(store = %settings.storage.path.display(), "Starting machine monitor");

    let cycles = if settings.dashboard.enabled {
        let (handle, dashboard_task) = spawn_terminal_dashboard(settings.dashboard.queue_capacity)?;
        let mut driver = driver.with_dashboard(handle).with_output(io::sink());
        let outcome = driver.run(shutdown_signal(), max_cycles).await;

        // Dropping the last handle lets the dashboard restore the terminal.
        drop(driver);
        match dashboard_task.await {
            Ok(Err(e)) => error!(error = %e, "Failed to restore terminal"),
            Err(e) => error!(error = %e, "Dashboard task panicked"),
            Ok(Ok(())) => {}
        }
        outcome?
    } else {
        let mut driver = driver;
        driver.run(shutdown_signal(), max_cycles).await?
    };

    info!(cycles, "Machine monitor stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Cannot listen for Ctrl-C, running until killed");
        std::future::pending::<()>().await;
    }
}

fn handle_init_command(config_dir: &Path, force: bool) -> anyhow::Result<()> {
    let path = config_dir.join("default.toml");
    if path.exists() && !force {
        bail!(
            "{} already exists. Use --force to overwrite.",
            path.display()
        );
    }

    std::fs::create_dir_all(config_dir)?;
    let config_str = toml::to_string_pretty(&generate_default_config())?;
    std::fs::write(&path, config_str)?;

    println!("{} Default configuration written to {}", "✓".green(), path.display());
    Ok(())
}
