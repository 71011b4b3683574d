//! The `JsonTables` handle: the public CRUD and query surface.
//!
//! Every operation returns an [`Outcome`]. Lower-layer errors are folded into
//! its diagnostics; nothing panics or returns `Err` for data-level problems.
//!
//! Locking: `state` guards the open/close state machine and is always taken
//! before `dataset`. Operations other than `open`/`close` only touch
//! `dataset`: readers share it, mutations hold it for writing, and record
//! writes keep it through their implicit flush.

use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, warn};

use crate::config::StoreConfig;
use crate::diagnostics::{Diagnostics, Outcome};
use crate::error::{Result, StoreError};
use crate::query::{clean_query, Filter, OrderBy};
use crate::storage::{Column, Converter, DataSet, JsonFile, Row, Table};

/// Initialization state of a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    Uninitialized,
    Initializing,
    Initialized,
}

/// A typed table store backed by one JSON file.
///
/// ```no_run
/// use jsontables_core::{Column, ColumnType, JsonTables, Row, StoreConfig, Value};
///
/// let config = StoreConfig::new("people.json", "People").with_salt("YU7icKHkVp5aARqK");
/// let Some(db) = JsonTables::connect(config).value else {
///     return;
/// };
///
/// db.add_column("People", Column::new("Name", ColumnType::String));
/// db.add_column("People", Column::new("Secret", ColumnType::Secure));
///
/// let row = Row::new().with("Name", "A").with("Secret", Value::secure("pw1"));
/// let saved = db.save_record("People", row, "");
/// assert!(saved.success, "{}", saved.diagnostics);
/// ```
#[derive(Debug)]
pub struct JsonTables {
    config: StoreConfig,
    file: JsonFile,
    converter: Converter,
    state: Mutex<HandleState>,
    dataset: RwLock<Option<DataSet>>,
}

impl JsonTables {
    /// Build an unopened handle. Call [`JsonTables::open`] before use.
    pub fn new(config: StoreConfig) -> Self {
        let file = JsonFile::new(config.path());
        let converter = Converter::new(config.crypto_engine());
        Self {
            config,
            file,
            converter,
            state: Mutex::new(HandleState::Uninitialized),
            dataset: RwLock::new(None),
        }
    }

    /// Build and open a handle in one step.
    ///
    /// The value is `Some` only if the handle ended up initialized; the
    /// diagnostics from opening are returned either way.
    pub fn connect(config: StoreConfig) -> Outcome<Option<JsonTables>> {
        let handle = Self::new(config);
        let (opened, _, diagnostics) = handle.open().into_parts();
        let value = opened.then_some(handle);
        Outcome::new(opened, value, diagnostics)
    }

    /// Load the backing file into memory.
    ///
    /// Returns at once if already initialized. A missing file yields an empty
    /// dataset; a blank file yields an empty dataset plus a warning. Parse
    /// errors, a dataset name mismatch, or any decode error leave the handle
    /// uninitialized.
    pub fn open(&self) -> Outcome<bool> {
        let mut diagnostics = Diagnostics::new();
        let mut state = match self.lock_state() {
            Ok(state) => state,
            Err(e) => {
                diagnostics.error(e);
                return Outcome::flag(false, diagnostics);
            }
        };
        if *state == HandleState::Initialized {
            return Outcome::flag(true, diagnostics);
        }

        *state = HandleState::Initializing;
        let loaded = self
            .load(&mut diagnostics)
            .and_then(|data| self.install(data));
        *state = match loaded {
            Ok(true) => HandleState::Initialized,
            Ok(false) => HandleState::Uninitialized,
            Err(e) => {
                diagnostics.error(e);
                HandleState::Uninitialized
            }
        };

        let initialized = *state == HandleState::Initialized;
        debug!(
            path = %self.config.path().display(),
            initialized,
            "Opened handle"
        );
        Outcome::flag(initialized, diagnostics)
    }

    fn load(&self, diagnostics: &mut Diagnostics) -> Result<Option<DataSet>> {
        if self.config.path().as_os_str().is_empty() {
            return Err(StoreError::ArgumentMissing("file path"));
        }

        let name = self.config.dataset_name();
        if !self.file.exists() {
            return Ok(Some(DataSet::new(name)));
        }

        let (_, document, load_diagnostics) = self.file.load(name).into_parts();
        let failed = load_diagnostics.has_errors();
        diagnostics.merge(load_diagnostics);
        if failed {
            return Ok(None);
        }
        let Some(document) = document else {
            return Ok(Some(DataSet::new(name)));
        };

        let (_, data, decode_diagnostics) = self
            .converter
            .decode_dataset(&document, name)
            .into_parts();
        let failed = decode_diagnostics.has_errors();
        diagnostics.merge(decode_diagnostics);
        Ok(if failed { None } else { Some(data) })
    }

    fn install(&self, data: Option<DataSet>) -> Result<bool> {
        let Some(data) = data else {
            return Ok(false);
        };
        *self.write_slot()? = Some(data);
        Ok(true)
    }

    /// Drop the in-memory dataset. A later [`JsonTables::open`] re-reads the
    /// file.
    pub fn close(&self) -> Outcome<bool> {
        self.run(false, |_| {
            let mut state = self.lock_state()?;
            *self.write_slot()? = None;
            *state = HandleState::Uninitialized;
            Ok((true, true))
        })
    }

    pub fn state(&self) -> HandleState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_initialized(&self) -> bool {
        self.state() == HandleState::Initialized
    }

    pub fn file_exists(&self) -> bool {
        self.file.exists()
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Encode the dataset (encrypting secure columns) and write it out.
    pub fn flush(&self) -> Outcome<()> {
        self.run((), |diagnostics| {
            let guard = self.read_slot()?;
            let data = guard.as_ref().ok_or(StoreError::NotInitialized)?;
            Ok((self.flush_locked(data, diagnostics), ()))
        })
    }

    fn flush_locked(&self, data: &DataSet, diagnostics: &mut Diagnostics) -> bool {
        let document = self.converter.encode_dataset(data);
        let (saved, _, save_diagnostics) = self.file.save(&document).into_parts();
        diagnostics.merge(save_diagnostics);
        saved
    }

    // --- Table operations ---

    pub fn table_exists(&self, name: &str) -> Outcome<bool> {
        self.read(false, |data, _| {
            require(name, "table name")?;
            let exists = data.contains(name);
            Ok((exists, exists))
        })
    }

    /// Snapshot of a table. Missing tables are a warning.
    pub fn get_table(&self, name: &str) -> Outcome<Option<Table>> {
        self.read(None, |data, diagnostics| {
            require(name, "table name")?;
            match data.table(name) {
                Some(table) => Ok((true, Some(table.clone()))),
                None => {
                    diagnostics.warning(StoreError::TableMissing(name.to_string()));
                    Ok((false, None))
                }
            }
        })
    }

    /// Add a table, or replace one of the same name when `replace_if_exists`.
    pub fn add_table(&self, table: Table, replace_if_exists: bool) -> Outcome<bool> {
        self.write(false, |data, diagnostics| {
            require(table.name(), "table name")?;
            if data.contains(table.name()) && !replace_if_exists {
                diagnostics.warning(StoreError::TableExists(table.name().to_string()));
                return Ok((false, false));
            }
            data.replace(table);
            Ok((true, true))
        })
    }

    pub fn update_table(&self, table: Table) -> Outcome<bool> {
        self.add_table(table, true)
    }

    pub fn remove_table(&self, name: &str) -> Outcome<bool> {
        self.write(false, |data, diagnostics| {
            require(name, "table name")?;
            if data.remove(name).is_none() {
                diagnostics.warning(StoreError::TableMissing(name.to_string()));
                return Ok((false, false));
            }
            Ok((true, true))
        })
    }

    pub fn table_names(&self) -> Outcome<Vec<String>> {
        self.read(Vec::new(), |data, _| Ok((true, data.table_names())))
    }

    // --- Column operations ---

    pub fn column_exists(&self, table: &str, column: &str) -> Outcome<bool> {
        self.read(false, |data, diagnostics| {
            require(table, "table name")?;
            require(column, "column name")?;
            let Some(found) = data.table(table) else {
                diagnostics.warning(StoreError::TableMissing(table.to_string()));
                return Ok((false, false));
            };
            let exists = found.has_column(column);
            Ok((exists, exists))
        })
    }

    /// Add a column, creating the table if needed. An existing column is a
    /// warning and returns `false`.
    pub fn add_column(&self, table: &str, column: Column) -> Outcome<bool> {
        self.write(false, |data, diagnostics| {
            require(table, "table name")?;
            let added = add_column_to(data, table, column, diagnostics)?;
            Ok((added, added))
        })
    }

    /// Add several columns under one lock.
    ///
    /// A duplicate is a warning and is skipped. Any error removes every
    /// column this call already added and the call returns `false`.
    pub fn add_columns(&self, table: &str, columns: Vec<Column>) -> Outcome<bool> {
        self.write(false, |data, diagnostics| {
            require(table, "table name")?;
            let mut added: Vec<String> = Vec::new();

            for column in columns {
                let name = column.name.clone();
                match add_column_to(data, table, column, diagnostics) {
                    Ok(true) => added.push(name),
                    Ok(false) => {}
                    Err(e) => {
                        warn!(table, column = %name, error = %e, "Rolling back column batch");
                        if let Some(target) = data.table_mut(table) {
                            for done in &added {
                                target.remove_column(done);
                            }
                        }
                        diagnostics.error(e);
                        return Ok((false, false));
                    }
                }
            }
            Ok((true, true))
        })
    }

    pub fn remove_column(&self, table: &str, column: &str) -> Outcome<bool> {
        self.write(false, |data, diagnostics| {
            require(table, "table name")?;
            require(column, "column name")?;
            let Some(target) = data.table_mut(table) else {
                diagnostics.warning(StoreError::TableMissing(table.to_string()));
                return Ok((false, false));
            };
            if !target.remove_column(column) {
                diagnostics.warning(StoreError::column_missing(table, column));
                return Ok((false, false));
            }
            Ok((true, true))
        })
    }

    /// Whether the column is declared `Secure`.
    pub fn is_secured(&self, table: &str, column: &str) -> Outcome<bool> {
        self.read(false, |data, diagnostics| {
            require(table, "table name")?;
            require(column, "column name")?;
            let Some(found) = data.table(table) else {
                diagnostics.warning(StoreError::TableMissing(table.to_string()));
                return Ok((false, false));
            };
            let secured = found
                .column(column)
                .ok_or_else(|| StoreError::column_missing(table, column))?
                .is_secure();
            Ok((secured, secured))
        })
    }

    // --- Record operations ---

    /// An empty row shaped after the table's columns, not yet stored.
    pub fn create_new_row(&self, table: &str) -> Outcome<Row> {
        self.read(Row::new(), |data, _| {
            require(table, "table name")?;
            Ok((true, existing(data, table)?.new_row()))
        })
    }

    /// Update rows matching `where_clause` with the supplied columns of
    /// `row`, or insert `row` when nothing matches. Ends with a flush.
    ///
    /// The value is the number of rows affected in memory. `success` is
    /// false if the flush fails, even when the rows changed.
    pub fn save_record(&self, table: &str, row: Row, where_clause: &str) -> Outcome<usize> {
        self.write(0, |data, diagnostics| {
            require(table, "table name")?;
            let now = self.config.now();
            let clause = clean_query(where_clause);
            let target = data
                .table_mut(table)
                .ok_or_else(|| StoreError::TableMissing(table.to_string()))?;

            let matched = if clause.is_empty() {
                Vec::new()
            } else {
                target.select(&Filter::parse(clause)?, &OrderBy::none())?
            };

            let affected = if matched.is_empty() {
                if !clause.is_empty() {
                    diagnostics.warning(format!(
                        "No rows in '{}' matched \"{}\"; inserting a new row",
                        table, clause
                    ));
                }
                let mut row = row;
                target.stamp_insert(&mut row, now);
                target.insert(row)?;
                1
            } else {
                target.update_rows(&matched, &row, Some(now))?
            };

            let flushed = self.flush_locked(data, diagnostics);
            Ok((flushed, affected))
        })
    }

    /// Rows matching `where_clause` (all rows if blank), in `order_by` order.
    pub fn get_records(
        &self,
        table: &str,
        where_clause: &str,
        order_by: &str,
    ) -> Outcome<Vec<Row>> {
        self.read(Vec::new(), |data, _| {
            require(table, "table name")?;
            let target = existing(data, table)?;
            let filter = Filter::parse(clean_query(where_clause))?;
            let order = OrderBy::parse(clean_query(order_by))?;
            let rows = target
                .select(&filter, &order)?
                .into_iter()
                .map(|i| target.rows()[i].clone())
                .collect();
            Ok((true, rows))
        })
    }

    /// Delete rows matching `where_clause` (all rows if blank). Deleting
    /// nothing is a success; deleting anything ends with a flush.
    pub fn delete_records(&self, table: &str, where_clause: &str) -> Outcome<usize> {
        self.write(0, |data, diagnostics| {
            require(table, "table name")?;
            let target = data
                .table_mut(table)
                .ok_or_else(|| StoreError::TableMissing(table.to_string()))?;
            let clause = clean_query(where_clause);
            let matched = target.select(&Filter::parse(clause)?, &OrderBy::none())?;
            if matched.is_empty() {
                diagnostics.warning(format!("No rows in '{}' matched \"{}\"", table, clause));
                return Ok((true, 0));
            }

            let deleted = target.delete_rows(&matched);
            let flushed = self.flush_locked(data, diagnostics);
            Ok((flushed, deleted))
        })
    }

    pub fn record_count(&self, table: &str, where_clause: &str) -> Outcome<usize> {
        self.read(0, |data, _| {
            require(table, "table name")?;
            let target = existing(data, table)?;
            let filter = Filter::parse(clean_query(where_clause))?;
            Ok((true, target.select(&filter, &OrderBy::none())?.len()))
        })
    }

    // --- Internals ---

    fn lock_state(&self) -> Result<MutexGuard<'_, HandleState>> {
        self.state
            .lock()
            .map_err(|_| StoreError::Other("Handle state lock poisoned".to_string()))
    }

    fn read_slot(&self) -> Result<RwLockReadGuard<'_, Option<DataSet>>> {
        self.dataset
            .read()
            .map_err(|_| StoreError::Other("Dataset lock poisoned".to_string()))
    }

    fn write_slot(&self) -> Result<RwLockWriteGuard<'_, Option<DataSet>>> {
        self.dataset
            .write()
            .map_err(|_| StoreError::Other("Dataset lock poisoned".to_string()))
    }

    fn run<T>(
        &self,
        fallback: T,
        op: impl FnOnce(&mut Diagnostics) -> Result<(bool, T)>,
    ) -> Outcome<T> {
        let mut diagnostics = Diagnostics::new();
        match op(&mut diagnostics) {
            Ok((success, value)) => Outcome::new(success, value, diagnostics),
            Err(e) => {
                diagnostics.error(e);
                Outcome::new(false, fallback, diagnostics)
            }
        }
    }

    fn read<T>(
        &self,
        fallback: T,
        op: impl FnOnce(&DataSet, &mut Diagnostics) -> Result<(bool, T)>,
    ) -> Outcome<T> {
        self.run(fallback, |diagnostics| {
            let guard = self.read_slot()?;
            let data = guard.as_ref().ok_or(StoreError::NotInitialized)?;
            op(data, diagnostics)
        })
    }

    fn write<T>(
        &self,
        fallback: T,
        op: impl FnOnce(&mut DataSet, &mut Diagnostics) -> Result<(bool, T)>,
    ) -> Outcome<T> {
        self.run(fallback, |diagnostics| {
            let mut guard = self.write_slot()?;
            let data = guard.as_mut().ok_or(StoreError::NotInitialized)?;
            op(data, diagnostics)
        })
    }
}

fn require(value: &str, what: &'static str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(StoreError::ArgumentMissing(what));
    }
    Ok(())
}

fn existing<'a>(data: &'a DataSet, table: &str) -> Result<&'a Table> {
    data.table(table)
        .ok_or_else(|| StoreError::TableMissing(table.to_string()))
}

/// Add a column, creating the table first if it is missing.
fn add_column_to(
    data: &mut DataSet,
    table: &str,
    column: Column,
    diagnostics: &mut Diagnostics,
) -> Result<bool> {
    if !data.contains(table) {
        data.add(Table::new(table))?;
    }
    let target = data
        .table_mut(table)
        .ok_or_else(|| StoreError::TableMissing(table.to_string()))?;

    let name = column.name.clone();
    let added = target.add_column(column)?;
    if !added {
        diagnostics.warning(StoreError::column_exists(table, &name));
    }
    Ok(added)
}
