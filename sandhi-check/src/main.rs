//! Sandhi Check - encoder consistency checks for robot parts
//!
//! ```text
//! sandhi-check [--config <path>] consistency [--plot] [--output <dir>]
//! sandhi-check [--config <path>] sign-check
//! ```
//!
//! The device, the tested joints and the polling constants come from the TOML
//! configuration (default `sandhi-check.toml`).

use clap::{Parser, Subcommand};
use sandhi_check::devices::create_device;
use sandhi_check::{Config, ConsistencyCheck, Result, SharedClock, SignCheck, SystemClock};
use std::path::PathBuf;
use std::sync::Arc;

/// Joint/motor encoder checks
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "sandhi-check.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Sweep the joints and export the consistency series
    Consistency {
        /// Launch the analysis script after export
        #[arg(long)]
        plot: bool,

        /// Directory for the exported series
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check the motor encoder sign of each joint with a PWM ramp
    SignCheck,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut config = Config::load(&args.config)?;

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();

    log::info!("Sandhi Check v{} starting...", env!("CARGO_PKG_VERSION"));
    log::info!("Using config: {}", args.config.display());
    log::info!(
        "Device: {} ({})",
        config.device.name,
        config.device.device_type
    );

    let clock: SharedClock = Arc::new(SystemClock::new());
    let driver = create_device(&config.device, clock.clone())?;

    match args.command {
        Commands::Consistency { plot, output } => {
            if plot {
                config.test.plot_enabled = true;
            }
            if let Some(dir) = output {
                config.output.directory = dir;
            }

            let mut check = ConsistencyCheck::setup(&config, driver, clock)?;
            let report = check.run()?;
            check.tear_down();

            log::info!(
                "Collected {} frames over {} cycles, {} files written",
                report.frames,
                report.cycles,
                report.files.len()
            );
        }
        Commands::SignCheck => {
            let mut check = SignCheck::setup(&config, driver, clock)?;
            let results = check.run()?;
            log::info!("Motor encoder sign correct on {} joints", results.len());
        }
    }

    log::info!("Sandhi Check finished");
    Ok(())
}
