//! CLI argument parsing using clap

use clap::{ArgGroup, Parser};
use std::path::PathBuf;

/// KVPulse - key/value store load generator and latency profiler
#[derive(Parser, Debug, Default)]
#[command(name = "kvpulse")]
#[command(version, about, long_about = None)]
#[command(group(ArgGroup::new("preset").args(["small", "medium", "large"])))]
pub struct Cli {
    /// Database home directory (reports, logs and snapshots are written here)
    #[arg(short = 'H', long)]
    pub home: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short = 'O', long = "config")]
    pub config: Option<PathBuf>,

    /// Option override as section.key=value (repeatable, comma-separated lists allowed)
    #[arg(short = 'o', long = "option", value_name = "KEY=VALUE")]
    pub options: Vec<String>,

    /// Connection configuration string appended to the configured one
    #[arg(short = 'C', long)]
    pub conn_config: Option<String>,

    /// Table configuration string appended to the configured one
    #[arg(short = 'T', long)]
    pub table_config: Option<String>,

    // === Presets ===
    /// Small preset: 500K records, 8 readers, 20 seconds
    #[arg(short = 'S', long)]
    pub small: bool,

    /// Medium preset: 50M records, 16 readers, 100 seconds
    #[arg(short = 'M', long)]
    pub medium: bool,

    /// Large preset: 500M records, 16 readers, 600 seconds
    #[arg(short = 'L', long)]
    pub large: bool,

    /// Increase verbosity (repeatable)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Dry run - print and validate the configuration without executing
    #[arg(long)]
    pub dry_run: bool,
}

/// Built-in configuration presets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    Small,
    Medium,
    Large,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Selected preset, if any
    pub fn preset(&self) -> Option<Preset> {
        if self.small {
            Some(Preset::Small)
        } else if self.medium {
            Some(Preset::Medium)
        } else if self.large {
            Some(Preset::Large)
        } else {
            None
        }
    }

    /// Validate CLI arguments
    pub fn validate(&self) -> anyhow::Result<()> {
        for option in &self.options {
            for pair in option.split(',').filter(|p| !p.trim().is_empty()) {
                if !pair.contains('=') {
                    anyhow::bail!("option '{}' must have the form section.key=value", pair.trim());
                }
            }
        }
        Ok(())
    }
}
