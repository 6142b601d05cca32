//! TOML configuration file parsing and layering
//!
//! Configuration is assembled in layers, later layers overriding earlier ones:
//!
//! 1. Built-in defaults
//! 2. Preset (`-S`, `-M`, `-L`)
//! 3. TOML configuration file (`-O`)
//! 4. Option lines (`-o section.key=value`)
//! 5. Direct flags (`--home`, `-C`, `-T`, `-v`)
//!
//! Every layer is merged at the TOML table level, so a layer only needs to name
//! the keys it changes.

use super::cli::{Cli, Preset};
use super::Config;
use anyhow::{Context, Result};
use std::fs;
use toml::{Table, Value};

const SMALL_PRESET: &str = r#"
[store]
conn_config = "cache_size=500MB"
table_config = "lsm_chunk_size=5MB"

[populate]
icount = 500000
threads = 1

[workload]
data_sz = 100
key_sz = 20
run_time = 20
read_threads = 8

[output]
report_interval = 5
"#;

const MEDIUM_PRESET: &str = r#"
[store]
conn_config = "cache_size=1GB"
table_config = "lsm_chunk_size=20MB"

[populate]
icount = 50000000
threads = 1

[workload]
data_sz = 100
key_sz = 20
run_time = 100
read_threads = 16

[output]
report_interval = 5
"#;

const LARGE_PRESET: &str = r#"
[store]
conn_config = "cache_size=2GB"
table_config = "lsm_chunk_size=50MB"

[populate]
icount = 500000000
threads = 1

[workload]
data_sz = 100
key_sz = 20
run_time = 600
read_threads = 16

[output]
report_interval = 5
"#;

/// Parse TOML configuration from string
pub fn parse_toml_string(contents: &str) -> Result<Config> {
    let config: Config = ::toml::from_str(contents)
        .context("Failed to parse TOML configuration")?;

    Ok(config)
}

/// TOML text of a built-in preset
pub fn preset_toml(preset: Preset) -> &'static str {
    match preset {
        Preset::Small => SMALL_PRESET,
        Preset::Medium => MEDIUM_PRESET,
        Preset::Large => LARGE_PRESET,
    }
}

/// Build the effective configuration from CLI arguments
pub fn build_config(cli: &Cli) -> Result<Config> {
    let mut table = to_table(&Config::default())?;

    if let Some(preset) = cli.preset() {
        let overlay: Table = ::toml::from_str(preset_toml(preset))
            .context("Failed to parse preset")?;
        merge_tables(&mut table, overlay);
    }

    if let Some(ref path) = cli.config {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let overlay: Table = ::toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        merge_tables(&mut table, overlay);
    }

    for option in &cli.options {
        for pair in option.split(',').filter(|p| !p.trim().is_empty()) {
            let overlay = parse_option_line(pair)
                .with_context(|| format!("Invalid option: {}", pair.trim()))?;
            merge_tables(&mut table, overlay);
        }
    }

    let mut config: Config = Value::Table(table)
        .try_into()
        .context("Failed to build configuration")?;

    if let Some(ref home) = cli.home {
        config.store.home = home.clone();
    }
    if let Some(ref extra) = cli.conn_config {
        config.store.conn_config = append_config_string(&config.store.conn_config, extra);
    }
    if let Some(ref extra) = cli.table_config {
        config.store.table_config = append_config_string(&config.store.table_config, extra);
    }
    if cli.verbose > 0 {
        config.output.verbose = config.output.verbose.max(cli.verbose + 1);
    }

    Ok(config)
}

/// Parse a single `section.key=value` option into a TOML table
///
/// Values that are not valid TOML (bare words, paths) are taken as strings.
pub fn parse_option_line(pair: &str) -> Result<Table> {
    let (key, value) = pair
        .split_once('=')
        .ok_or_else(|| anyhow::anyhow!("expected section.key=value"))?;
    let key = key.trim();
    let value = value.trim();
    if key.is_empty() {
        anyhow::bail!("empty option key");
    }

    let literal = match ::toml::from_str::<Table>(&format!("v = {}", value)) {
        Ok(_) => value.to_string(),
        Err(_) => Value::String(value.to_string()).to_string(),
    };

    let table: Table = ::toml::from_str(&format!("{} = {}", key, literal))?;
    Ok(table)
}

fn to_table(config: &Config) -> Result<Table> {
    match Value::try_from(config).context("Failed to serialize configuration")? {
        Value::Table(table) => Ok(table),
        other => anyhow::bail!("configuration serialized to {}, expected a table", other.type_str()),
    }
}

/// Recursively merge `overlay` into `base`; scalar values in `overlay` win
fn merge_tables(base: &mut Table, overlay: Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(Value::Table(existing)), Value::Table(nested)) => merge_tables(existing, nested),
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

fn append_config_string(base: &str, extra: &str) -> String {
    if base.is_empty() {
        extra.to_string()
    } else {
        format!("{},{}", base, extra)
    }
}
