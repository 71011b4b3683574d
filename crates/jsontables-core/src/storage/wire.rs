//! Serde model of the JSON data file.
//!
//! Every cell is carried as text (or `null`); typing happens in the
//! converter against the `Schema`.

use serde::{Deserialize, Deserializer, Serialize};

/// One row on the wire: column name to string or `null`.
pub type WireRow = serde_json::Map<String, serde_json::Value>;

/// Root document of a data file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireDataSet {
    #[serde(default)]
    pub data_set_name: String,

    #[serde(default)]
    pub data_tables: Vec<WireTable>,
}

impl WireDataSet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            data_set_name: name.into(),
            data_tables: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireTable {
    pub table_name: String,

    #[serde(default)]
    pub schema: Vec<WireColumn>,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub table: Vec<WireRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireColumn {
    pub column_name: String,

    /// Type name, e.g. `System.Guid`
    pub data_type: String,

    #[serde(default, with = "bool_text")]
    pub unique: bool,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<WireRow>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<WireRow>>::deserialize(deserializer)?.unwrap_or_default())
}

/// `"true"`/`"false"` on write; a string or a JSON boolean on read.
mod bool_text {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(if *value { "true" } else { "false" })
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        match Option::<Flag>::deserialize(deserializer)? {
            None => Ok(false),
            Some(Flag::Bool(b)) => Ok(b),
            Some(Flag::Text(text)) => match text.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(true),
                "false" | "" => Ok(false),
                other => Err(D::Error::custom(format!(
                    "invalid Unique flag '{}', expected true or false",
                    other
                ))),
            },
        }
    }
}
