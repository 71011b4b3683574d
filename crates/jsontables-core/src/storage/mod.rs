//! Table model and its persistence.
//!
//! This module provides:
//! - **types**: column types, values, columns and rows
//! - **table**: the in-memory `Table` and `DataSet`
//! - **wire**: the serde model of the JSON data file
//! - **converter**: typed dataset to wire document and back, encrypting
//!   secure columns on the way out
//! - **file**: locked load and atomic save of the data file

pub mod converter;
pub mod file;
pub mod table;
pub mod types;
pub mod wire;

pub use converter::{Converter, SECURE_MARKER};
pub use file::{JsonFile, DEFAULT_DATASET_NAME};
pub use table::{DataSet, Table};
pub use types::{Column, ColumnType, Row, SecureText, Value, CREATED_DATE, MODIFIED_DATE};
pub use wire::{WireColumn, WireDataSet, WireRow, WireTable};
