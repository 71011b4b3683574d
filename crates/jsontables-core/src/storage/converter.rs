//! Translation between the typed [`DataSet`] and its wire document.
//!
//! Encoding stringifies every value and encrypts secure columns. Decoding
//! rebuilds the schema and types every cell. A cell that fails to decode is
//! reported and left `Null`; only a table whose schema is unusable is skipped
//! as a whole.

use std::collections::BTreeMap;

use tracing::warn;

use crate::coerce;
use crate::crypto::CryptoEngine;
use crate::diagnostics::{Diagnostics, Outcome};
use crate::error::StoreError;
use crate::storage::table::{DataSet, Table};
use crate::storage::types::{Column, ColumnType, Row, Value};
use crate::storage::wire::{WireColumn, WireDataSet, WireRow, WireTable};

/// Prefix marking a wire value as ciphertext.
pub const SECURE_MARKER: &str = "#B64AES#";

#[derive(Debug, Clone, Default)]
pub struct Converter {
    crypto: CryptoEngine,
}

impl Converter {
    pub fn new(crypto: CryptoEngine) -> Self {
        Self { crypto }
    }

    pub fn encode_dataset(&self, data: &DataSet) -> WireDataSet {
        WireDataSet {
            data_set_name: data.name().to_string(),
            data_tables: data.tables().iter().map(|t| self.encode_table(t)).collect(),
        }
    }

    pub fn encode_table(&self, table: &Table) -> WireTable {
        let schema = table
            .columns()
            .iter()
            .map(|c| WireColumn {
                column_name: c.name.clone(),
                data_type: c.data_type.wire_name().to_string(),
                unique: c.unique,
            })
            .collect();

        let rows = table
            .rows()
            .iter()
            .map(|row| {
                table
                    .columns()
                    .iter()
                    .map(|column| {
                        let cell = row.get(&column.name).unwrap_or(&Value::Null);
                        (column.name.clone(), self.encode_cell(column, cell))
                    })
                    .collect::<WireRow>()
            })
            .collect();

        WireTable {
            table_name: table.name().to_string(),
            schema,
            table: rows,
        }
    }

    fn encode_cell(&self, column: &Column, value: &Value) -> serde_json::Value {
        let Some(text) = coerce::to_wire(value) else {
            return serde_json::Value::Null;
        };
        if !column.is_secure() || text.starts_with(SECURE_MARKER) {
            return serde_json::Value::String(text);
        }
        serde_json::Value::String(format!("{}{}", SECURE_MARKER, self.crypto.encrypt(&text)))
    }

    /// Decode a wire document. A blank dataset name falls back to
    /// `fallback_name`.
    pub fn decode_dataset(&self, document: &WireDataSet, fallback_name: &str) -> Outcome<DataSet> {
        let name = if document.data_set_name.trim().is_empty() {
            fallback_name
        } else {
            document.data_set_name.as_str()
        };

        let mut data = DataSet::new(name);
        let mut diagnostics = Diagnostics::new();
        for wire_table in &document.data_tables {
            let decoded = self.decode_table(wire_table);
            let (_, table, table_diagnostics) = decoded.into_parts();
            diagnostics.merge(table_diagnostics);
            if let Some(table) = table {
                if let Err(e) = data.add(table) {
                    diagnostics.error(e);
                }
            }
        }

        let success = !diagnostics.has_errors();
        Outcome::new(success, data, diagnostics)
    }

    /// Decode one table. The value is `None` when the schema is empty or
    /// names an unknown type.
    pub fn decode_table(&self, wire: &WireTable) -> Outcome<Option<Table>> {
        let mut diagnostics = Diagnostics::new();
        let name = wire.table_name.as_str();

        if name.trim().is_empty() {
            diagnostics.error(StoreError::MalformedDocument(
                "Table without a TableName".to_string(),
            ));
            return Outcome::new(false, None, diagnostics);
        }
        if wire.schema.is_empty() {
            diagnostics.error(StoreError::MalformedDocument(format!(
                "Table '{}' has no schema",
                name
            )));
            return Outcome::new(false, None, diagnostics);
        }

        let mut table = Table::new(name);
        for wire_column in &wire.schema {
            let Some(data_type) = ColumnType::from_wire_name(&wire_column.data_type) else {
                diagnostics.error(StoreError::MalformedDocument(format!(
                    "Column '{}' of table '{}' has unknown type '{}'",
                    wire_column.column_name, name, wire_column.data_type
                )));
                return Outcome::new(false, None, diagnostics);
            };
            let mut column = Column::new(wire_column.column_name.clone(), data_type);
            column.unique = wire_column.unique;
            match table.add_column(column) {
                Ok(true) => {}
                Ok(false) => diagnostics.warning(format!(
                    "Duplicate column '{}' in schema of table '{}' ignored",
                    wire_column.column_name, name
                )),
                Err(e) => {
                    diagnostics.error(e);
                    return Outcome::new(false, None, diagnostics);
                }
            }
        }

        for (index, wire_row) in wire.table.iter().enumerate() {
            let row = self.decode_row(&table, index, wire_row, &mut diagnostics);
            if let Err(e) = table.insert(row) {
                warn!(table = name, row = index, error = %e, "Rejected row while decoding");
                diagnostics.error(format!("Row {} of table '{}' rejected: {}", index, name, e));
            }
        }

        let success = !diagnostics.has_errors();
        Outcome::new(success, Some(table), diagnostics)
    }

    fn decode_row(
        &self,
        table: &Table,
        index: usize,
        wire_row: &WireRow,
        diagnostics: &mut Diagnostics,
    ) -> Row {
        let mut values = BTreeMap::new();
        for column in table.columns() {
            let value = match wire_row.get(&column.name) {
                None | Some(serde_json::Value::Null) => Value::Null,
                Some(cell) => match self.decode_cell(table.name(), column, cell, diagnostics) {
                    Ok(value) => value,
                    Err(e) => {
                        diagnostics.error(format!(
                            "Row {} of table '{}', column '{}': {}",
                            index,
                            table.name(),
                            column.name,
                            e
                        ));
                        Value::Null
                    }
                },
            };
            values.insert(column.name.clone(), value);
        }

        let unknown: Vec<&str> = wire_row
            .keys()
            .filter(|key| !table.has_column(key))
            .map(String::as_str)
            .collect();
        if !unknown.is_empty() {
            diagnostics.warning(format!(
                "Row {} of table '{}' has values for unknown columns: {}",
                index,
                table.name(),
                unknown.join(", ")
            ));
        }

        let shape = table.column_names().map(str::to_string).collect();
        Row::from_parts(shape, values)
    }

    fn decode_cell(
        &self,
        table: &str,
        column: &Column,
        cell: &serde_json::Value,
        diagnostics: &mut Diagnostics,
    ) -> crate::Result<Value> {
        let text = match cell {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::Bool(b) => b.to_string(),
            other => {
                return Err(StoreError::MalformedDocument(format!(
                    "expected a string, found {}",
                    other
                )))
            }
        };

        if !column.is_secure() {
            return coerce::from_wire(&text, column.data_type);
        }

        match text.strip_prefix(SECURE_MARKER) {
            Some(ciphertext) => self.crypto.decrypt(ciphertext).map(Value::secure),
            None => {
                warn!(table, column = %column.name, "Secure value without marker; reading as legacy");
                diagnostics.warning(format!(
                    "Secure column '{}' of table '{}' holds a value without the {} marker",
                    column.name, table, SECURE_MARKER
                ));
                Ok(Value::secure(self.crypto.decrypt(&text).unwrap_or(text)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn converter() -> Converter {
        Converter::new(CryptoEngine::with_salt("YU7icKHkVp5aARqK"))
    }

    fn people() -> DataSet {
        let mut table = Table::new("People")
            .with_column(Column::new("ID", ColumnType::Uuid).unique())
            .with_column(Column::new("Name", ColumnType::String))
            .with_column(Column::new("Secret", ColumnType::Secure));
        table
            .insert(
                Row::new()
                    .with("ID", Uuid::new_v4())
                    .with("Name", "A")
                    .with("Secret", Value::secure("pw1")),
            )
            .unwrap();
        let mut data = DataSet::new("People");
        data.add(table).unwrap();
        data
    }

    #[test]
    fn test_round_trip_preserves_schema_and_values() {
        let converter = converter();
        let data = people();

        let wire = converter.encode_dataset(&data);
        let decoded = converter.decode_dataset(&wire, "ignored");

        assert!(decoded.success, "{}", decoded.diagnostics);
        assert_eq!(decoded.value, data);
    }

    #[test]
    fn test_secure_values_are_encrypted_with_marker() {
        let wire = converter().encode_dataset(&people());
        let cell = wire.data_tables[0].table[0]["Secret"].as_str().unwrap().to_string();

        assert!(cell.starts_with(SECURE_MARKER));
        assert!(!cell.contains("pw1"));
        assert_eq!(wire.data_tables[0].schema[2].data_type, "System.Security.SecureString");
    }

    #[test]
    fn test_already_marked_value_written_as_is() {
        let table = Table::new("T").with_column(Column::new("S", ColumnType::Secure));
        let column = &table.columns()[0];
        let marked = format!("{}ABCDEF", SECURE_MARKER);

        let cell = converter().encode_cell(column, &Value::secure(marked.clone()));
        assert_eq!(cell, serde_json::Value::String(marked));
    }

    #[test]
    fn test_legacy_unmarked_secure_value_warns_and_is_kept() {
        let wire: WireTable = serde_json::from_str(
            r#"{"TableName": "T",
                "Schema": [{"ColumnName": "S", "DataType": "System.Security.SecureString"}],
                "Table": [{"S": "plain"}]}"#,
        )
        .unwrap();

        let decoded = converter().decode_table(&wire);
        assert!(decoded.success);
        assert!(decoded.has_warnings());
        let table = decoded.value.unwrap();
        assert_eq!(table.rows()[0].get_str("S"), Some("plain"));
    }

    #[test]
    fn test_undecryptable_marked_value_is_error_and_null() {
        let wire: WireTable = serde_json::from_str(
            r##"{"TableName": "T",
                "Schema": [{"ColumnName": "S", "DataType": "System.Security.SecureString"},
                           {"ColumnName": "N", "DataType": "System.String"}],
                "Table": [{"S": "#B64AES#ZZ", "N": "kept"}]}"##,
        )
        .unwrap();

        let decoded = converter().decode_table(&wire);
        assert!(decoded.has_errors());
        let table = decoded.value.unwrap();
        assert_eq!(table.rows()[0].get("S"), Some(&Value::Null));
        assert_eq!(table.rows()[0].get_str("N"), Some("kept"));
    }

    #[test]
    fn test_numbers_and_bools_accepted_as_cells() {
        let wire: WireTable = serde_json::from_str(
            r#"{"TableName": "T",
                "Schema": [{"ColumnName": "Age", "DataType": "System.Int32"},
                           {"ColumnName": "On", "DataType": "System.Boolean"}],
                "Table": [{"Age": 41, "On": true, "Extra": "x"}]}"#,
        )
        .unwrap();

        let decoded = converter().decode_table(&wire);
        assert!(decoded.success);
        assert!(decoded.diagnostics.last_warning().unwrap().contains("Extra"));
        let table = decoded.value.unwrap();
        let row = &table.rows()[0];
        assert_eq!(row.get("Age"), Some(&Value::Integer(41)));
        assert_eq!(row.get("On"), Some(&Value::Boolean(true)));
    }

    #[test]
    fn test_bad_schema_skips_table() {
        let empty: WireTable = serde_json::from_str(r#"{"TableName": "T"}"#).unwrap();
        let decoded = converter().decode_table(&empty);
        assert!(decoded.has_errors());
        assert!(decoded.value.is_none());

        let unknown: WireTable = serde_json::from_str(
            r#"{"TableName": "T", "Schema": [{"ColumnName": "C", "DataType": "System.Drawing.Color"}]}"#,
        )
        .unwrap();
        assert!(converter().decode_table(&unknown).value.is_none());
    }

    #[test]
    fn test_blank_dataset_name_falls_back() {
        let decoded = converter().decode_dataset(&WireDataSet::default(), "People");
        assert_eq!(decoded.value.name(), "People");
    }
}
