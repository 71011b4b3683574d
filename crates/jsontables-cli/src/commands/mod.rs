pub mod config;
pub mod keygen;
pub mod rows;
pub mod tables;

pub use config::{handle_config_init, handle_config_path};
pub use keygen::handle_keygen;
pub use rows::{handle_count, handle_delete, handle_rows};
pub use tables::{handle_drop_table, handle_schema, handle_tables};
