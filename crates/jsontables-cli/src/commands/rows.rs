use crate::app::{finish, open_store};
use crate::cli::{Cli, CountArgs, DeleteArgs, RowsArgs};
use crate::output::{rows_json, rows_table};

pub fn handle_rows(cli: &Cli, args: &RowsArgs) -> anyhow::Result<()> {
    let store = open_store(cli)?;
    let table = finish(store.get_table(&args.table), cli.quiet)?
        .ok_or_else(|| anyhow::anyhow!("Table \"{}\" not found", args.table))?;
    let rows = finish(
        store.get_records(&args.table, &args.where_clause, &args.order_by),
        cli.quiet,
    )?;

    if args.json {
        let json = rows_json(table.columns(), &rows, args.reveal);
        println!("{}", serde_json::to_string_pretty(&json)?);
        return Ok(());
    }

    if rows.is_empty() {
        if !cli.quiet {
            eprintln!("No rows found.");
        }
        return Ok(());
    }
    println!("{}", rows_table(table.columns(), &rows, args.reveal));
    Ok(())
}

pub fn handle_count(cli: &Cli, args: &CountArgs) -> anyhow::Result<()> {
    let store = open_store(cli)?;
    let count = finish(store.record_count(&args.table, &args.where_clause), cli.quiet)?;
    println!("{}", count);
    Ok(())
}

pub fn handle_delete(cli: &Cli, args: &DeleteArgs) -> anyhow::Result<()> {
    if args.where_clause.trim().is_empty() {
        return Err(anyhow::anyhow!(
            "Refusing to delete without a where clause. Use drop-table to remove a whole table."
        ));
    }
    let store = open_store(cli)?;
    let deleted = finish(
        store.delete_records(&args.table, &args.where_clause),
        cli.quiet,
    )?;
    if !cli.quiet {
        println!("Deleted {} row(s) from {}", deleted, args.table);
    }
    Ok(())
}
