//! Core data types for the table model.
//!
//! A [`Value`] is a closed sum over the supported column types, so every
//! conversion and comparison is an exhaustive `match` rather than a runtime
//! type lookup.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, Utc};
use uuid::Uuid;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::StoreError;

/// Column that receives the insertion timestamp when left unset.
pub const CREATED_DATE: &str = "CreatedDate";

/// Column stamped on insert when left unset, and refreshed on every update.
pub const MODIFIED_DATE: &str = "ModifiedDate";

/// Semantic type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Uuid,
    String,
    Integer,
    Float,
    Boolean,
    DateTime,
    /// Plaintext in memory, encrypted at rest
    Secure,
}

impl ColumnType {
    pub const ALL: [ColumnType; 7] = [
        ColumnType::Uuid,
        ColumnType::String,
        ColumnType::Integer,
        ColumnType::Float,
        ColumnType::Boolean,
        ColumnType::DateTime,
        ColumnType::Secure,
    ];

    /// Short name used in messages and accepted when parsing.
    pub fn name(self) -> &'static str {
        match self {
            ColumnType::Uuid => "Uuid",
            ColumnType::String => "String",
            ColumnType::Integer => "Integer",
            ColumnType::Float => "Float",
            ColumnType::Boolean => "Boolean",
            ColumnType::DateTime => "DateTime",
            ColumnType::Secure => "Secure",
        }
    }

    /// Fully-qualified type name written into the `Schema` of a data file.
    pub fn wire_name(self) -> &'static str {
        match self {
            ColumnType::Uuid => "System.Guid",
            ColumnType::String => "System.String",
            ColumnType::Integer => "System.Int64",
            ColumnType::Float => "System.Double",
            ColumnType::Boolean => "System.Boolean",
            ColumnType::DateTime => "System.DateTime",
            ColumnType::Secure => "System.Security.SecureString",
        }
    }

    /// Resolve a schema type name, accepting both the fully-qualified wire
    /// names (including the narrower integral and floating variants) and the
    /// short names, case-insensitively.
    pub fn from_wire_name(name: &str) -> Option<Self> {
        let name = name.trim();
        let resolved = match name {
            "System.Guid" => ColumnType::Uuid,
            "System.String" | "System.Char" => ColumnType::String,
            "System.Byte" | "System.SByte" | "System.Int16" | "System.UInt16" | "System.Int32"
            | "System.UInt32" | "System.Int64" | "System.UInt64" => ColumnType::Integer,
            "System.Single" | "System.Double" | "System.Decimal" => ColumnType::Float,
            "System.Boolean" => ColumnType::Boolean,
            "System.DateTime" | "System.DateTimeOffset" => ColumnType::DateTime,
            "System.Security.SecureString" => ColumnType::Secure,
            _ => {
                return ColumnType::ALL
                    .into_iter()
                    .find(|ty| ty.name().eq_ignore_ascii_case(name));
            }
        };
        Some(resolved)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ColumnType {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ColumnType::from_wire_name(s)
            .ok_or_else(|| StoreError::Conversion(format!("Unknown column type '{}'", s)))
    }
}

/// Plaintext of a secure column.
///
/// The text is wiped from memory on drop and never shows up in `Debug`
/// output. Use [`SecureText::expose`] to read it.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SecureText(String);

impl SecureText {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// Borrow the plaintext.
    ///
    /// Avoid storing or logging this value.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecureText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecureText([REDACTED])")
    }
}

/// A typed cell value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Uuid(Uuid),
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    DateTime(DateTime<FixedOffset>),
    Secure(SecureText),
}

impl Value {
    /// Wrap plaintext as a secure value.
    pub fn secure(text: impl Into<String>) -> Self {
        Value::Secure(SecureText::new(text))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Column type this value naturally belongs to (`None` for `Null`).
    pub fn column_type(&self) -> Option<ColumnType> {
        match self {
            Value::Null => None,
            Value::Uuid(_) => Some(ColumnType::Uuid),
            Value::String(_) => Some(ColumnType::String),
            Value::Integer(_) => Some(ColumnType::Integer),
            Value::Float(_) => Some(ColumnType::Float),
            Value::Boolean(_) => Some(ColumnType::Boolean),
            Value::DateTime(_) => Some(ColumnType::DateTime),
            Value::Secure(_) => Some(ColumnType::Secure),
        }
    }

    /// Text of a `String` value, or the plaintext of a `Secure` value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            Value::Secure(s) => Some(s.expose()),
            _ => None,
        }
    }

    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            Value::Uuid(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<DateTime<FixedOffset>> {
        match self {
            Value::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    /// Order two values of compatible types.
    ///
    /// `Null` sorts before everything else. Integers and floats compare
    /// numerically. Returns `None` for incompatible types.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            (Value::Null, _) => Some(Ordering::Less),
            (_, Value::Null) => Some(Ordering::Greater),
            (Value::Uuid(a), Value::Uuid(b)) => Some(a.cmp(b)),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Integer(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
            (Value::Float(a), Value::Integer(b)) => a.partial_cmp(&(*b as f64)),
            (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
            (Value::DateTime(a), Value::DateTime(b)) => Some(a.cmp(b)),
            (Value::Secure(a), Value::Secure(b)) => Some(a.expose().cmp(b.expose())),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Uuid(id) => write!(f, "{}", id),
            Value::String(s) => f.write_str(s),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::DateTime(dt) => write!(f, "{}", dt.to_rfc3339()),
            Value::Secure(_) => f.write_str("********"),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<Uuid> for Value {
    fn from(value: Uuid) -> Self {
        Value::Uuid(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(value: DateTime<FixedOffset>) -> Self {
        Value::DateTime(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::DateTime(value.fixed_offset())
    }
}

impl From<SecureText> for Value {
    fn from(value: SecureText) -> Self {
        Value::Secure(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

/// A column definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Column name (unique within its table)
    pub name: String,

    /// Declared semantic type
    pub data_type: ColumnType,

    /// Whether values must be distinct across all rows
    pub unique: bool,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            data_type,
            unique: false,
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn is_secure(&self) -> bool {
        self.data_type == ColumnType::Secure
    }
}

/// A row: column name to value, plus the schema shape it was created from.
///
/// A key that was never set is "not supplied", which is different from an
/// explicit [`Value::Null`]. Partial updates only copy supplied columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: BTreeMap<String, Value>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty row shaped after the given column names.
    pub fn with_columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            values: BTreeMap::new(),
        }
    }

    /// Set a column value.
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        let column = column.into();
        if !self.columns.contains(&column) {
            self.columns.push(column.clone());
        }
        self.values.insert(column, value.into());
        self
    }

    /// Builder form of [`Row::set`].
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(column, value);
        self
    }

    /// Value of a supplied column.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }

    /// Whether a value (possibly `Null`) was supplied for the column.
    pub fn is_supplied(&self, column: &str) -> bool {
        self.values.contains_key(column)
    }

    /// Forget a supplied value, returning it.
    pub fn unset(&mut self, column: &str) -> Option<Value> {
        self.values.remove(column)
    }

    /// Column names this row is shaped after.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Supplied values in column-name order.
    pub fn values(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Plaintext/text of a column, if it holds a string or secure value.
    pub fn get_str(&self, column: &str) -> Option<&str> {
        self.get(column).and_then(Value::as_str)
    }

    pub(crate) fn from_parts(columns: Vec<String>, values: BTreeMap<String, Value>) -> Self {
        Self { columns, values }
    }

    pub(crate) fn forget_column(&mut self, column: &str) {
        self.columns.retain(|c| c != column);
        self.values.remove(column);
    }

    pub(crate) fn overlay(&mut self, changes: &BTreeMap<String, Value>) {
        for (column, value) in changes {
            self.values.insert(column.clone(), value.clone());
        }
    }
}
