//! JsonTables CLI - inspect and maintain JSON-backed table files
//!
//! Thin command-line front end over `jsontables-core`: list tables, dump or
//! count rows with where/order-by clauses, delete rows, and mint salts.

mod app;
mod cli;
mod commands;
mod config;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands, ConfigSubcommand};

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    match &cli.command {
        Commands::Tables => commands::handle_tables(&cli),
        Commands::Schema { table } => commands::handle_schema(&cli, table),
        Commands::Rows(args) => commands::handle_rows(&cli, args),
        Commands::Count(args) => commands::handle_count(&cli, args),
        Commands::Delete(args) => commands::handle_delete(&cli, args),
        Commands::DropTable { table } => commands::handle_drop_table(&cli, table),
        Commands::Keygen { kind } => commands::handle_keygen(*kind),
        Commands::Config { command } => match command {
            ConfigSubcommand::Init { path, force } => {
                commands::handle_config_init(&cli, path.clone(), *force)
            }
            ConfigSubcommand::Path => commands::handle_config_path(&cli),
        },
    }
}
