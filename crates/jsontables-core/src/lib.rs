//! # JsonTables Core
//!
//! An embedded, file-backed table store. A dataset of schema-typed tables
//! lives in memory and is persisted as one JSON document; columns declared
//! `Secure` are encrypted at rest.
//!
//! ## Architecture
//!
//! - **handle**: `JsonTables`, the CRUD and query surface
//! - **storage**: tables, rows, the wire document and the data file
//! - **query**: where and order-by clause evaluation
//! - **coerce**: conversions between column types and their text form
//! - **crypto**: AES-256-CBC field encryption and key generation
//! - **diagnostics**: the errors/warnings record every operation returns

pub mod coerce;
pub mod config;
pub mod crypto;
pub mod diagnostics;
pub mod error;
pub mod fs;
pub mod handle;
pub mod query;
pub mod storage;

pub use config::StoreConfig;
pub use diagnostics::{Diagnostics, Outcome, Status};
pub use error::{Result, StoreError};
pub use handle::{HandleState, JsonTables};
pub use storage::{Column, ColumnType, DataSet, Row, SecureText, Table, Value};

/// Core version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
