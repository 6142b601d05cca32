//! KVPulse CLI entry point

use anyhow::{Context, Result};
use kvpulse::config::{cli::Cli, toml::build_config, validator::validate_config, Config};
use kvpulse::store::memory::MemoryBackend;
use kvpulse::Runner;
use std::fs::{self, OpenOptions};
use std::process::ExitCode;
use std::sync::Mutex;
use tracing::error;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{:#}", err);
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse_args();
    cli.validate()?;

    let config = build_config(&cli)?;
    validate_config(&config).context("Configuration validation failed")?;

    if cli.dry_run {
        println!("{}", config);
        println!("Dry run mode - configuration validated successfully");
        return Ok(());
    }

    fs::create_dir_all(&config.store.home)
        .with_context(|| format!("Failed to create home directory: {}", config.store.home.display()))?;
    init_logging(&config)?;

    if config.output.verbose > 1 {
        print!("{}", config);
    }

    let backend = MemoryBackend::with_home(&config.store.home);
    Runner::new(config).run(&backend)?;
    Ok(())
}

/// Console logging at the configured verbosity, mirrored to `<home>/<table>.stat`
fn init_logging(config: &Config) -> Result<()> {
    let level = match config.output.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let path = config
        .store
        .home
        .join(format!("{}.stat", config.store.table_name));
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file: {}", path.display()))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(Mutex::new(file)),
        )
        .try_init()
        .context("Failed to initialize logging")?;
    Ok(())
}
