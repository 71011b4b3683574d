use clap::{Args, Parser, Subcommand, ValueEnum};

use jsontables_core::VERSION;

/// JsonTables - inspect and maintain JSON-backed table files
#[derive(Parser)]
#[command(name = "jsontables")]
#[command(author, version = VERSION, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the data file
    #[arg(short, long, global = true, env = "JSONTABLES_FILE")]
    pub file: Option<String>,

    /// Dataset name stored in the file
    #[arg(short, long, global = true, env = "JSONTABLES_DATASET")]
    pub dataset: Option<String>,

    /// Path to the config file
    #[arg(short, long, global = true, env = "JSONTABLES_CONFIG")]
    pub config: Option<String>,

    /// Stamp CreatedDate/ModifiedDate in local time instead of UTC
    #[arg(long, global = true)]
    pub local_time: bool,

    #[command(subcommand)]
    pub command: Commands,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the tables in the dataset
    Tables,

    /// Show the columns of a table
    Schema {
        /// Table name
        #[arg(value_name = "TABLE")]
        table: String,
    },

    /// Print the rows of a table
    Rows(RowsArgs),

    /// Count the rows of a table
    Count(CountArgs),

    /// Delete the rows matching a where clause
    Delete(DeleteArgs),

    /// Remove a table and all of its rows
    DropTable {
        /// Table name
        #[arg(value_name = "TABLE")]
        table: String,
    },

    /// Generate random key material
    Keygen {
        /// What to generate
        #[arg(value_enum, default_value_t = KeygenKind::Salt)]
        kind: KeygenKind,
    },

    /// Manage the config file
    Config {
        #[command(subcommand)]
        command: ConfigSubcommand,
    },
}

/// Arguments for the `rows` command
#[derive(Args)]
pub struct RowsArgs {
    /// Table name
    #[arg(value_name = "TABLE")]
    pub table: String,

    /// Filter rows (e.g. "Age > 30 AND Name LIKE 'A%'")
    #[arg(short = 'w', long = "where", value_name = "CLAUSE", default_value = "")]
    pub where_clause: String,

    /// Sort rows (e.g. "Age DESC, Name")
    #[arg(short, long, value_name = "CLAUSE", default_value = "")]
    pub order_by: String,

    /// Output rows as JSON
    #[arg(long)]
    pub json: bool,

    /// Show plaintext of secure columns
    #[arg(long)]
    pub reveal: bool,
}

/// Arguments for the `count` command
#[derive(Args)]
pub struct CountArgs {
    /// Table name
    #[arg(value_name = "TABLE")]
    pub table: String,

    /// Count only rows matching this clause
    #[arg(short = 'w', long = "where", value_name = "CLAUSE", default_value = "")]
    pub where_clause: String,
}

/// Arguments for the `delete` command
#[derive(Args)]
pub struct DeleteArgs {
    /// Table name
    #[arg(value_name = "TABLE")]
    pub table: String,

    /// Rows to delete; an empty clause is refused
    #[arg(short = 'w', long = "where", value_name = "CLAUSE")]
    pub where_clause: String,
}

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Write a config file recording the data file and `--dataset`
    Init {
        /// Data file to record in the config
        #[arg(long, value_name = "PATH")]
        path: Option<String>,

        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Print the config file location
    Path,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum KeygenKind {
    /// 32-byte AES-256 key as hex
    Key,
    /// 16-byte initialization vector as hex
    Iv,
    /// 32-character alphanumeric salt
    Salt,
}
