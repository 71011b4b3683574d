use crate::app::{finish, open_store};
use crate::cli::Cli;
use crate::output::schema_table;

pub fn handle_tables(cli: &Cli) -> anyhow::Result<()> {
    let store = open_store(cli)?;
    let names = finish(store.table_names(), cli.quiet)?;
    if names.is_empty() && !cli.quiet {
        eprintln!("No tables in dataset '{}'", store.config().dataset_name());
    }
    for name in names {
        println!("{}", name);
    }
    Ok(())
}

pub fn handle_schema(cli: &Cli, table: &str) -> anyhow::Result<()> {
    let store = open_store(cli)?;
    let table = finish(store.get_table(table), cli.quiet)?
        .ok_or_else(|| anyhow::anyhow!("Table \"{}\" not found", table))?;
    println!("{}", schema_table(table.columns()));
    Ok(())
}

pub fn handle_drop_table(cli: &Cli, table: &str) -> anyhow::Result<()> {
    let store = open_store(cli)?;
    if !finish(store.remove_table(table), cli.quiet)? {
        return Err(anyhow::anyhow!("Table \"{}\" not found", table));
    }
    finish(store.flush(), cli.quiet)?;
    if !cli.quiet {
        println!("Dropped table {}", table);
    }
    Ok(())
}
