//! Rendering tables and rows for the terminal.

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, ContentArrangement, Table as ComfyTable};

use jsontables_core::coerce::to_wire;
use jsontables_core::{Column, Row, Value};

fn new_table() -> ComfyTable {
    let mut table = ComfyTable::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn header_cells<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<Cell> {
    names
        .into_iter()
        .map(|name| Cell::new(name).add_attribute(Attribute::Bold))
        .collect()
}

/// Text for one cell. Secure values stay masked unless `reveal` is set.
pub fn cell_text(value: &Value, reveal: bool) -> String {
    match value {
        Value::Secure(_) if !reveal => value.to_string(),
        _ => to_wire(value).unwrap_or_default(),
    }
}

/// Render the rows of a table under its column headers.
pub fn rows_table(columns: &[Column], rows: &[Row], reveal: bool) -> String {
    let mut table = new_table();
    table.set_header(header_cells(columns.iter().map(|c| c.name.as_str())));
    for row in rows {
        table.add_row(columns.iter().map(|column| {
            let text = row
                .get(&column.name)
                .map(|value| cell_text(value, reveal))
                .unwrap_or_default();
            Cell::new(text)
        }));
    }
    table.to_string()
}

/// Render a table's column definitions.
pub fn schema_table(columns: &[Column]) -> String {
    let mut table = new_table();
    table.set_header(header_cells(["Column", "Type", "Unique"]));
    for column in columns {
        table.add_row(vec![
            Cell::new(&column.name),
            Cell::new(column.data_type.name()),
            Cell::new(if column.unique { "yes" } else { "" }),
        ]);
    }
    table.to_string()
}

/// Convert one value to JSON for output.
pub fn value_json(value: &Value, reveal: bool) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Integer(i) => serde_json::json!(i),
        Value::Float(f) => serde_json::json!(f),
        Value::Boolean(b) => serde_json::json!(b),
        other => serde_json::json!(cell_text(other, reveal)),
    }
}

/// Convert a row to a JSON object keyed by column name, in schema order.
pub fn row_json(columns: &[Column], row: &Row, reveal: bool) -> serde_json::Value {
    let mut object = serde_json::Map::new();
    for column in columns {
        let value = row.get(&column.name).cloned().unwrap_or_default();
        object.insert(column.name.clone(), value_json(&value, reveal));
    }
    serde_json::Value::Object(object)
}

/// Convert multiple rows to a JSON array for output.
pub fn rows_json(columns: &[Column], rows: &[Row], reveal: bool) -> serde_json::Value {
    serde_json::Value::Array(
        rows.iter()
            .map(|row| row_json(columns, row, reveal))
            .collect(),
    )
}
