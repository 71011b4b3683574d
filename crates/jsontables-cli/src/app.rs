//! Resolving the store from flags, environment and config.

use std::path::{Path, PathBuf};

use jsontables_core::{JsonTables, Outcome, StoreConfig};

use crate::cli::Cli;
use crate::config::{default_config_path, read_config};

/// Environment variable holding the encryption salt.
pub const SALT_ENV: &str = "JSONTABLES_SALT";

/// Resolve the config file path from `--config`/JSONTABLES_CONFIG, then the
/// XDG default.
pub fn resolve_config_path(cli: &Cli) -> anyhow::Result<PathBuf> {
    if let Some(value) = &cli.config {
        if !value.trim().is_empty() {
            return Ok(PathBuf::from(value));
        }
    }
    default_config_path()
}

/// Build the store settings from CLI args, falling back to the config file.
pub fn resolve_store_config(cli: &Cli) -> anyhow::Result<StoreConfig> {
    let config_path = resolve_config_path(cli)?;
    let file_config = if config_path.exists() {
        Some(read_config(&config_path)?)
    } else {
        None
    };

    let path = match (&cli.file, &file_config) {
        (Some(path), _) => path.clone(),
        (None, Some(config)) => config.store.path.clone(),
        (None, None) => return Err(anyhow::anyhow!(missing_config_message(&config_path))),
    };
    let dataset = cli
        .dataset
        .clone()
        .or_else(|| file_config.as_ref().and_then(|c| c.store.dataset.clone()))
        .unwrap_or_default();
    let use_utc = !cli.local_time && file_config.as_ref().map_or(true, |c| c.store.use_utc);

    let mut store = StoreConfig::new(path, dataset).with_utc(use_utc);
    if let Ok(salt) = std::env::var(SALT_ENV) {
        if !salt.is_empty() {
            store = store.with_salt(salt);
        }
    }
    Ok(store)
}

/// Open the store, refusing to run against a data file that does not exist.
pub fn open_store(cli: &Cli) -> anyhow::Result<JsonTables> {
    let config = resolve_store_config(cli)?;
    if !config.path().is_file() {
        return Err(anyhow::anyhow!(missing_data_message(config.path())));
    }
    tracing::debug!(path = %config.path().display(), "Opening store");
    let store = finish(JsonTables::connect(config), cli.quiet)?;
    store.ok_or_else(|| anyhow::anyhow!("Failed to open data file"))
}

/// Print warnings to stderr and turn errors into a failed command.
pub fn finish<T>(outcome: Outcome<T>, quiet: bool) -> anyhow::Result<T> {
    let (_, value, diagnostics) = outcome.into_parts();
    if !quiet {
        for warning in diagnostics.warnings() {
            eprintln!("Warning: {}", warning);
        }
    }
    if diagnostics.has_errors() {
        return Err(anyhow::anyhow!(diagnostics.all_errors()));
    }
    Ok(value)
}

/// Error message when no config file exists and no data file was given.
pub fn missing_config_message(config_path: &Path) -> String {
    format!(
        "No config found at {}\n\nRun:\n  jsontables config init --path /path/to/data.json\n\nOr specify a data file:\n  JSONTABLES_FILE=/path/to/data.json jsontables tables",
        config_path.display()
    )
}

/// Error message when the data file is missing.
pub fn missing_data_message(path: &Path) -> String {
    format!("No data file found at {}", path.display())
}
