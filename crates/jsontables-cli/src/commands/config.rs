use std::path::PathBuf;

use crate::app::resolve_config_path;
use crate::cli::Cli;
use crate::config::{default_data_path, write_config, JsonTablesConfig};

pub fn handle_config_init(cli: &Cli, path: Option<String>, force: bool) -> anyhow::Result<()> {
    let config_path = resolve_config_path(cli)?;
    if config_path.exists() && !force {
        return Err(anyhow::anyhow!(
            "Config already exists at {}. Use --force to overwrite.",
            config_path.display()
        ));
    }

    let data_path = match path.or_else(|| cli.file.clone()) {
        Some(path) => PathBuf::from(path),
        None => default_data_path()?,
    };
    let mut config = JsonTablesConfig::new(data_path, cli.dataset.clone());
    config.store.use_utc = !cli.local_time;
    write_config(&config_path, &config)?;

    if !cli.quiet {
        println!("Wrote config to {}", config_path.display());
        println!("Data file: {}", config.store.path);
    }
    Ok(())
}

pub fn handle_config_path(cli: &Cli) -> anyhow::Result<()> {
    println!("{}", resolve_config_path(cli)?.display());
    Ok(())
}
