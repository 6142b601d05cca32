//! Configuration validation

use super::*;
use anyhow::Result;

/// Validate complete configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_store(&config.store)?;
    validate_populate(config)?;
    validate_workload(&config.workload)?;
    validate_checkpoint(&config.checkpoint)?;
    validate_output(&config.output)?;
    validate_key_width(config)?;

    Ok(())
}

/// Validate store configuration
pub fn validate_store(store: &StoreConfig) -> Result<()> {
    if store.table_name.is_empty() {
        anyhow::bail!("table_name must not be empty");
    }
    if store.home.as_os_str().is_empty() {
        anyhow::bail!("home must not be empty");
    }
    Ok(())
}

/// Validate populate configuration
pub fn validate_populate(config: &Config) -> Result<()> {
    if !config.store.create {
        return Ok(());
    }
    if config.populate.icount == 0 {
        anyhow::bail!("icount must be at least 1 when creating the table");
    }
    if config.populate.threads == 0 {
        anyhow::bail!("populate threads must be at least 1 when creating the table");
    }
    Ok(())
}

/// Validate workload configuration
pub fn validate_workload(workload: &WorkloadConfig) -> Result<()> {
    if workload.key_sz == 0 {
        anyhow::bail!("key_sz must be at least 1");
    }
    if workload.data_sz == 0 {
        anyhow::bail!("data_sz must be at least 1");
    }

    let mix = workload.run_mix_inserts as u32 + workload.run_mix_updates as u32;
    if mix > 100 {
        anyhow::bail!(
            "run_mix_inserts ({}) + run_mix_updates ({}) must not exceed 100",
            workload.run_mix_inserts,
            workload.run_mix_updates
        );
    }

    let threads = workload.read_threads + workload.insert_threads + workload.update_threads;
    if mix > 0 && threads == 0 {
        anyhow::bail!("a run mix requires at least one read, insert or update thread");
    }

    Ok(())
}

/// Validate checkpoint configuration
pub fn validate_checkpoint(checkpoint: &CheckpointConfig) -> Result<()> {
    if checkpoint.threads > 0 && checkpoint.interval == 0 {
        anyhow::bail!("checkpoint interval must be at least 1 second when checkpoint threads are configured");
    }
    Ok(())
}

/// Validate output configuration
pub fn validate_output(output: &OutputConfig) -> Result<()> {
    if output.latency_aggregate == 0 {
        anyhow::bail!("latency_aggregate must be at least 1");
    }
    Ok(())
}

/// Keys are zero-padded decimal strings; the widest key must fit
fn validate_key_width(config: &Config) -> Result<()> {
    let largest = config
        .populate
        .icount
        .saturating_add(config.workload.random_range);
    let digits = decimal_digits(largest);
    if digits > config.workload.key_sz {
        anyhow::bail!(
            "key_sz ({}) is too small for keys up to {} ({} digits)",
            config.workload.key_sz,
            largest,
            digits
        );
    }
    Ok(())
}

fn decimal_digits(mut value: u64) -> usize {
    let mut digits = 1;
    while value >= 10 {
        value /= 10;
        digits += 1;
    }
    digits
}
