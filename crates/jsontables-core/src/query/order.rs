//! Order-by clauses.

use std::cmp::Ordering;

use crate::error::{Result, StoreError};
use crate::query::lexer::{tokenize, Token};
use crate::storage::types::{Column, Row, Value};

/// One `Column [ASC|DESC]` term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub column: String,
    pub descending: bool,
}

/// Parsed order-by clause. Empty keeps table order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderBy {
    keys: Vec<SortKey>,
}

impl OrderBy {
    pub fn none() -> Self {
        Self::default()
    }

    /// Parse `Column [ASC|DESC] (, Column [ASC|DESC])*`.
    pub fn parse(text: &str) -> Result<Self> {
        let mut keys = Vec::new();
        let mut tokens = tokenize(text)?.into_iter().peekable();

        while let Some(token) = tokens.next() {
            let column = match token {
                Token::Ident { text, .. } => text,
                other => {
                    return Err(StoreError::Query(format!(
                        "Expected a column name in ORDER BY, found {:?}",
                        other
                    )))
                }
            };

            let mut descending = false;
            if let Some(direction) = tokens.next_if(|t| t.is_keyword("ASC") || t.is_keyword("DESC"))
            {
                descending = direction.is_keyword("DESC");
            }
            keys.push(SortKey { column, descending });

            match tokens.next() {
                None => break,
                Some(Token::Comma) if tokens.peek().is_some() => continue,
                Some(other) => {
                    return Err(StoreError::Query(format!(
                        "Expected ',' between ORDER BY terms, found {:?}",
                        other
                    )))
                }
            }
        }

        Ok(Self { keys })
    }

    pub fn keys(&self) -> &[SortKey] {
        &self.keys
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Check every key names a column of the schema.
    pub fn validate(&self, columns: &[Column]) -> Result<()> {
        for key in &self.keys {
            if !columns.iter().any(|c| c.name == key.column) {
                return Err(StoreError::Query(format!(
                    "Unknown column '{}' in ORDER BY",
                    key.column
                )));
            }
        }
        Ok(())
    }

    /// Stable-sort row indices by the keys. `Null` sorts first ascending.
    pub fn sort_indices(&self, rows: &[Row], indices: &mut [usize]) {
        if self.keys.is_empty() {
            return;
        }
        indices.sort_by(|&a, &b| self.compare(&rows[a], &rows[b]));
    }

    fn compare(&self, a: &Row, b: &Row) -> Ordering {
        for key in &self.keys {
            let left = a.get(&key.column).unwrap_or(&Value::Null);
            let right = b.get(&key.column).unwrap_or(&Value::Null);
            let ordering = left.compare(right).unwrap_or(Ordering::Equal);
            let ordering = if key.descending {
                ordering.reverse()
            } else {
                ordering
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}
