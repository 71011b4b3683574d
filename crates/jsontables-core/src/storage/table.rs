//! In-memory tables and datasets.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};

use crate::coerce;
use crate::error::{Result, StoreError};
use crate::query::{Filter, OrderBy};
use crate::storage::types::{Column, ColumnType, Row, Value, CREATED_DATE, MODIFIED_DATE};

/// A named, schema-typed list of rows.
///
/// Rows stored in a table carry a value (possibly `Null`) for every column,
/// already converted to the column's declared type.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    name: String,
    columns: Vec<Column>,
    rows: Vec<Row>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Builder form of [`Table::add_column`]. Duplicate names are ignored.
    pub fn with_column(mut self, column: Column) -> Self {
        if !column.name.trim().is_empty() && !self.has_column(&column.name) {
            self.columns.push(column);
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Add a column, filling existing rows with `Null`.
    ///
    /// Returns `Ok(false)` if a column of that name already exists.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::ArgumentMissing` for a blank column name.
    pub fn add_column(&mut self, column: Column) -> Result<bool> {
        if column.name.trim().is_empty() {
            return Err(StoreError::ArgumentMissing("column name"));
        }
        if self.has_column(&column.name) {
            return Ok(false);
        }

        for row in &mut self.rows {
            row.set(column.name.clone(), Value::Null);
        }
        self.columns.push(column);
        Ok(true)
    }

    /// Remove a column and its value from every row.
    pub fn remove_column(&mut self, name: &str) -> bool {
        let before = self.columns.len();
        self.columns.retain(|c| c.name != name);
        if self.columns.len() == before {
            return false;
        }
        for row in &mut self.rows {
            row.forget_column(name);
        }
        true
    }

    /// An empty row shaped after this table's columns.
    pub fn new_row(&self) -> Row {
        Row::with_columns(self.column_names())
    }

    /// Insert a row.
    ///
    /// Supplied values are converted to the declared column types; columns
    /// not supplied become `Null`.
    ///
    /// # Errors
    ///
    /// - `ColumnMissing` if the row names a column the table lacks
    /// - `Conversion` if a value does not fit its column type
    /// - `ConstraintViolation` if a unique column already holds the value
    pub fn insert(&mut self, row: Row) -> Result<()> {
        let mut values = self.normalize(&row)?;
        for column in &self.columns {
            values.entry(column.name.clone()).or_insert(Value::Null);
        }

        for column in self.columns.iter().filter(|c| c.unique) {
            let value = &values[&column.name];
            if self
                .rows
                .iter()
                .any(|existing| collides(existing.get(&column.name), value))
            {
                return Err(self.violation(column, value));
            }
        }

        let shape = self.column_names().map(str::to_string).collect();
        self.rows.push(Row::from_parts(shape, values));
        Ok(())
    }

    /// Fill unset or `Null` `CreatedDate`/`ModifiedDate` DateTime columns.
    pub(crate) fn stamp_insert(&self, row: &mut Row, now: DateTime<FixedOffset>) {
        for name in [CREATED_DATE, MODIFIED_DATE] {
            let is_timestamp = self
                .column(name)
                .is_some_and(|c| c.data_type == ColumnType::DateTime);
            if is_timestamp && row.get(name).map_or(true, Value::is_null) {
                row.set(name, now);
            }
        }
    }

    /// Indices of rows matching the filter, in the requested order.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Query` if either clause names an unknown column
    /// or uses `LIKE` on a non-text column.
    pub fn select(&self, filter: &Filter, order: &OrderBy) -> Result<Vec<usize>> {
        let predicate = filter.bind(&self.columns)?;
        order.validate(&self.columns)?;

        let mut indices: Vec<usize> = self
            .rows
            .iter()
            .enumerate()
            .filter(|(_, row)| predicate.matches(row))
            .map(|(i, _)| i)
            .collect();
        order.sort_indices(&self.rows, &mut indices);
        Ok(indices)
    }

    /// Copy every supplied column of `changes` onto the rows at `indices`.
    ///
    /// With `now` set, a DateTime `ModifiedDate` column is stamped too. The
    /// update is all-or-nothing: on error no row is changed.
    pub fn update_rows(
        &mut self,
        indices: &[usize],
        changes: &Row,
        now: Option<DateTime<FixedOffset>>,
    ) -> Result<usize> {
        let mut values = self.normalize(changes)?;
        if let Some(now) = now {
            let stamps_modified = self
                .column(MODIFIED_DATE)
                .is_some_and(|c| c.data_type == ColumnType::DateTime);
            if stamps_modified {
                values.insert(MODIFIED_DATE.to_string(), Value::DateTime(now));
            }
        }

        let mut updated = self.rows.clone();
        for &i in indices {
            if let Some(row) = updated.get_mut(i) {
                row.overlay(&values);
            }
        }

        for column in self
            .columns
            .iter()
            .filter(|c| c.unique && values.contains_key(&c.name))
        {
            let cells: Vec<&Value> = updated
                .iter()
                .filter_map(|row| row.get(&column.name))
                .collect();
            for (i, value) in cells.iter().enumerate() {
                if cells[..i].iter().any(|prior| collides(Some(prior), value)) {
                    return Err(self.violation(column, value));
                }
            }
        }

        self.rows = updated;
        Ok(indices.iter().filter(|&&i| i < self.rows.len()).count())
    }

    /// Remove the rows at `indices`, returning how many were removed.
    pub fn delete_rows(&mut self, indices: &[usize]) -> usize {
        let mut sorted = indices.to_vec();
        sorted.sort_unstable();
        sorted.dedup();

        let mut removed = 0;
        for &i in sorted.iter().rev() {
            if i < self.rows.len() {
                self.rows.remove(i);
                removed += 1;
            }
        }
        removed
    }

    fn normalize(&self, row: &Row) -> Result<BTreeMap<String, Value>> {
        let mut values = BTreeMap::new();
        for (name, value) in row.values() {
            let column = self
                .column(name)
                .ok_or_else(|| StoreError::column_missing(&self.name, name))?;
            let converted = coerce::convert(value, column.data_type).map_err(|e| match e {
                StoreError::Conversion(reason) => StoreError::Conversion(format!(
                    "column '{}' of '{}': {}",
                    name, self.name, reason
                )),
                other => other,
            })?;
            values.insert(name.clone(), converted);
        }
        Ok(values)
    }

    fn violation(&self, column: &Column, value: &Value) -> StoreError {
        StoreError::ConstraintViolation {
            table: self.name.clone(),
            column: column.name.clone(),
            value: coerce::to_wire(value).unwrap_or_default(),
        }
    }
}

/// Two unique-column values clash. `Null` never clashes.
fn collides(existing: Option<&Value>, candidate: &Value) -> bool {
    match existing {
        Some(existing) if !existing.is_null() && !candidate.is_null() => {
            existing.compare(candidate) == Some(Ordering::Equal)
        }
        _ => false,
    }
}

/// A named collection of tables.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSet {
    name: String,
    tables: Vec<Table>,
}

impl DataSet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tables: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn table_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.tables.iter_mut().find(|t| t.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.table(name).is_some()
    }

    /// Add a table.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::TableExists` if the name is taken.
    pub fn add(&mut self, table: Table) -> Result<()> {
        if self.contains(&table.name) {
            return Err(StoreError::TableExists(table.name));
        }
        self.tables.push(table);
        Ok(())
    }

    /// Add a table, replacing one of the same name in place.
    pub fn replace(&mut self, table: Table) {
        match self.tables.iter_mut().find(|t| t.name == table.name) {
            Some(existing) => *existing = table,
            None => self.tables.push(table),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Table> {
        let index = self.tables.iter().position(|t| t.name == name)?;
        Some(self.tables.remove(index))
    }

    pub fn table_names(&self) -> Vec<String> {
        self.tables.iter().map(|t| t.name.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn people() -> Table {
        Table::new("People")
            .with_column(Column::new("ID", ColumnType::Uuid).unique())
            .with_column(Column::new("Name", ColumnType::String))
            .with_column(Column::new("Age", ColumnType::Integer))
    }

    #[test]
    fn test_insert_converts_and_fills_nulls() {
        let mut table = people();
        table
            .insert(Row::new().with("ID", Uuid::new_v4().to_string()).with("Age", "41"))
            .unwrap();

        let row = &table.rows()[0];
        assert!(matches!(row.get("ID"), Some(Value::Uuid(_))));
        assert_eq!(row.get("Age"), Some(&Value::Integer(41)));
        assert_eq!(row.get("Name"), Some(&Value::Null));
        assert_eq!(row.columns().len(), 3);
    }

    #[test]
    fn test_insert_unknown_column_rejected() {
        let mut table = people();
        let err = table.insert(Row::new().with("Nope", "x")).unwrap_err();
        assert!(matches!(err, StoreError::ColumnMissing { .. }));
        assert!(table.is_empty());
    }

    #[test]
    fn test_unique_insert_rejected_but_nulls_allowed() {
        let mut table = people();
        let id = Uuid::new_v4();
        table.insert(Row::new().with("ID", id)).unwrap();
        let err = table.insert(Row::new().with("ID", id)).unwrap_err();
        assert!(matches!(err, StoreError::ConstraintViolation { .. }));
        assert_eq!(table.len(), 1);

        table.insert(Row::new().with("Name", "a")).unwrap();
        table.insert(Row::new().with("Name", "b")).unwrap();
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_update_is_all_or_nothing_on_violation() {
        let mut table = people();
        let first = Uuid::new_v4();
        table.insert(Row::new().with("ID", first).with("Name", "a")).unwrap();
        table
            .insert(Row::new().with("ID", Uuid::new_v4()).with("Name", "b"))
            .unwrap();

        let changes = Row::new().with("ID", first).with("Name", "clash");
        assert!(table.update_rows(&[1], &changes, None).is_err());
        assert_eq!(table.rows()[1].get_str("Name"), Some("b"));

        let changes = Row::new().with("Name", "renamed");
        assert_eq!(table.update_rows(&[0, 1], &changes, None).unwrap(), 2);
        assert!(table
            .rows()
            .iter()
            .all(|r| r.get_str("Name") == Some("renamed")));
    }

    #[test]
    fn test_stamps_timestamps() {
        let table = Table::new("T")
            .with_column(Column::new(CREATED_DATE, ColumnType::DateTime))
            .with_column(Column::new(MODIFIED_DATE, ColumnType::DateTime));
        let now = Utc::now().fixed_offset();
        let earlier = now - chrono::Duration::days(3);

        let mut row = table.new_row();
        row.set(CREATED_DATE, earlier);
        table.stamp_insert(&mut row, now);

        assert_eq!(row.get(CREATED_DATE), Some(&Value::DateTime(earlier)));
        assert_eq!(row.get(MODIFIED_DATE), Some(&Value::DateTime(now)));
    }

    #[test]
    fn test_insert_keeps_supplied_modified_date() {
        let table = Table::new("T").with_column(Column::new(MODIFIED_DATE, ColumnType::DateTime));
        let now = Utc::now().fixed_offset();
        let earlier = now - chrono::Duration::days(3);

        let mut row = table.new_row();
        row.set(MODIFIED_DATE, earlier);
        table.stamp_insert(&mut row, now);

        assert_eq!(row.get(MODIFIED_DATE), Some(&Value::DateTime(earlier)));
    }

    #[test]
    fn test_update_stamps_modified_date() {
        let mut table = Table::new("T")
            .with_column(Column::new("Name", ColumnType::String))
            .with_column(Column::new(MODIFIED_DATE, ColumnType::DateTime));
        table.insert(Row::new().with("Name", "a")).unwrap();
        let now = Utc::now().fixed_offset();

        table
            .update_rows(&[0], &Row::new().with("Name", "b"), Some(now))
            .unwrap();

        assert_eq!(table.rows()[0].get(MODIFIED_DATE), Some(&Value::DateTime(now)));
    }

    #[test]
    fn test_add_and_remove_column() {
        let mut table = people();
        table.insert(Row::new().with("Name", "a")).unwrap();

        assert!(table
            .add_column(Column::new("Email", ColumnType::String))
            .unwrap());
        assert!(!table
            .add_column(Column::new("Email", ColumnType::String))
            .unwrap());
        assert_eq!(table.rows()[0].get("Email"), Some(&Value::Null));
        assert!(table.add_column(Column::new(" ", ColumnType::String)).is_err());

        assert!(table.remove_column("Email"));
        assert!(!table.remove_column("Email"));
        assert!(!table.rows()[0].is_supplied("Email"));
    }

    #[test]
    fn test_select_filters_and_orders() {
        let mut table = people();
        for (name, age) in [("c", 30i64), ("a", 20), ("b", 40)] {
            table.insert(Row::new().with("Name", name).with("Age", age)).unwrap();
        }

        let filter = Filter::parse("Age >= 25").unwrap();
        let order = OrderBy::parse("Name").unwrap();
        let indices = table.select(&filter, &order).unwrap();
        let names: Vec<_> = indices
            .iter()
            .map(|&i| table.rows()[i].get_str("Name").unwrap())
            .collect();
        assert_eq!(names, vec!["b", "c"]);

        assert_eq!(table.delete_rows(&indices), 2);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_dataset_add_replace_remove() {
        let mut data = DataSet::new("People");
        data.add(people()).unwrap();
        assert!(matches!(data.add(people()), Err(StoreError::TableExists(_))));

        let replacement = Table::new("People").with_column(Column::new("X", ColumnType::String));
        data.replace(replacement);
        assert_eq!(data.tables().len(), 1);
        assert!(data.table("People").unwrap().has_column("X"));

        assert!(data.remove("People").is_some());
        assert!(data.remove("People").is_none());
        assert!(data.table_names().is_empty());
    }
}
