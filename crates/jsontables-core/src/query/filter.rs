//! Where-clause parsing and evaluation.

use std::cmp::Ordering;

use crate::coerce;
use crate::error::{Result, StoreError};
use crate::query::lexer::{tokenize, CompareOp, Token};
use crate::storage::types::{Column, ColumnType, Row, Value};

/// Deepest parenthesis nesting a where clause may use.
pub const MAX_NESTING: usize = 128;

/// A parsed where clause, not yet tied to a schema.
///
/// An empty clause matches every row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    expr: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Or(Vec<Expr>),
    And(Vec<Expr>),
    Not(Box<Expr>),
    Compare {
        column: String,
        op: CompareOp,
        literal: Literal,
    },
    Like {
        column: String,
        pattern: String,
    },
    IsNull {
        column: String,
        negated: bool,
    },
}

#[derive(Debug, Clone, PartialEq)]
enum Literal {
    Text(String),
    Number(String),
    Bool(bool),
    Null,
}

impl Filter {
    /// Filter that matches every row.
    pub fn all() -> Self {
        Self::default()
    }

    /// Parse a where clause (without the leading `WHERE`).
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Query` for malformed expressions, including
    /// parentheses nested deeper than [`MAX_NESTING`].
    pub fn parse(text: &str) -> Result<Self> {
        let tokens = tokenize(text)?;
        if tokens.is_empty() {
            return Ok(Self::all());
        }

        let mut parser = Parser {
            tokens,
            pos: 0,
            depth: 0,
        };
        let expr = parser.or()?;
        if let Some(token) = parser.peek() {
            return Err(StoreError::Query(format!(
                "Unexpected {} after end of expression",
                describe(token)
            )));
        }
        Ok(Self { expr: Some(expr) })
    }

    pub fn is_empty(&self) -> bool {
        self.expr.is_none()
    }

    /// Resolve column references and coerce literals against a schema.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Query` for unknown columns or `LIKE` on a non-text
    /// column. A literal that does not convert to the column's type is not an
    /// error: no cell can equal it, so `=` never matches and `<>` always does
    /// (for non-null cells), while ordering comparisons never match.
    pub fn bind(&self, columns: &[Column]) -> Result<Predicate> {
        let node = self
            .expr
            .as_ref()
            .map(|expr| bind_expr(expr, columns))
            .transpose()?;
        Ok(Predicate { node })
    }
}

/// A where clause bound to a table schema, ready to test rows.
#[derive(Debug, Clone)]
pub struct Predicate {
    node: Option<Bound>,
}

#[derive(Debug, Clone)]
enum Bound {
    Or(Vec<Bound>),
    And(Vec<Bound>),
    Not(Box<Bound>),
    Compare {
        column: String,
        op: CompareOp,
        value: Value,
    },
    /// Comparison against a literal that is not a value of the column's type
    Incomparable {
        column: String,
        op: CompareOp,
    },
    Like {
        column: String,
        pattern: String,
    },
    IsNull {
        column: String,
        negated: bool,
    },
}

impl Predicate {
    pub fn matches(&self, row: &Row) -> bool {
        self.node.as_ref().map_or(true, |node| node.matches(row))
    }
}

impl Bound {
    fn matches(&self, row: &Row) -> bool {
        match self {
            Bound::Or(terms) => terms.iter().any(|term| term.matches(row)),
            Bound::And(terms) => terms.iter().all(|term| term.matches(row)),
            Bound::Not(inner) => !inner.matches(row),
            Bound::Compare { column, op, value } => {
                let cell = row.get(column).unwrap_or(&Value::Null);
                if cell.is_null() || value.is_null() {
                    return false;
                }
                match cell.compare(value) {
                    Some(ordering) => op_holds(*op, ordering),
                    None => false,
                }
            }
            Bound::Incomparable { column, op } => {
                *op == CompareOp::Ne && row.get(column).is_some_and(|cell| !cell.is_null())
            }
            Bound::Like { column, pattern } => row
                .get(column)
                .and_then(Value::as_str)
                .is_some_and(|text| like(text, pattern)),
            Bound::IsNull { column, negated } => {
                let is_null = row.get(column).map_or(true, Value::is_null);
                is_null != *negated
            }
        }
    }
}

fn op_holds(op: CompareOp, ordering: Ordering) -> bool {
    match op {
        CompareOp::Eq => ordering == Ordering::Equal,
        CompareOp::Ne => ordering != Ordering::Equal,
        CompareOp::Lt => ordering == Ordering::Less,
        CompareOp::Le => ordering != Ordering::Greater,
        CompareOp::Gt => ordering == Ordering::Greater,
        CompareOp::Ge => ordering != Ordering::Less,
    }
}

/// Case-sensitive match where `%` and `*` stand for any run of characters.
fn like(text: &str, pattern: &str) -> bool {
    let parts: Vec<&str> = pattern.split(['%', '*']).collect();
    if parts.len() == 1 {
        return text == pattern;
    }

    let (first, rest) = (parts[0], &parts[1..]);
    let Some(mut remaining) = text.strip_prefix(first) else {
        return false;
    };

    let (last, middle) = match rest.split_last() {
        Some((last, middle)) => (*last, middle),
        None => ("", &[][..]),
    };
    for part in middle {
        match remaining.find(part) {
            Some(at) => remaining = &remaining[at + part.len()..],
            None => return false,
        }
    }
    remaining.len() >= last.len() && remaining.ends_with(last)
}

fn find_column<'a>(columns: &'a [Column], name: &str) -> Result<&'a Column> {
    columns
        .iter()
        .find(|c| c.name == name)
        .ok_or_else(|| StoreError::Query(format!("Unknown column '{}'", name)))
}

fn bind_expr(expr: &Expr, columns: &[Column]) -> Result<Bound> {
    Ok(match expr {
        Expr::Or(terms) => Bound::Or(bind_all(terms, columns)?),
        Expr::And(terms) => Bound::And(bind_all(terms, columns)?),
        Expr::Not(inner) => Bound::Not(Box::new(bind_expr(inner, columns)?)),
        Expr::Compare {
            column,
            op,
            literal,
        } => {
            let target = find_column(columns, column)?;
            match bind_literal(literal, target) {
                Some(value) => Bound::Compare {
                    column: target.name.clone(),
                    op: *op,
                    value,
                },
                None => Bound::Incomparable {
                    column: target.name.clone(),
                    op: *op,
                },
            }
        }
        Expr::Like { column, pattern } => {
            let target = find_column(columns, column)?;
            if !matches!(target.data_type, ColumnType::String | ColumnType::Secure) {
                return Err(StoreError::Query(format!(
                    "LIKE needs a text column, '{}' is {}",
                    target.name, target.data_type
                )));
            }
            Bound::Like {
                column: target.name.clone(),
                pattern: pattern.clone(),
            }
        }
        Expr::IsNull { column, negated } => Bound::IsNull {
            column: find_column(columns, column)?.name.clone(),
            negated: *negated,
        },
    })
}

fn bind_all(terms: &[Expr], columns: &[Column]) -> Result<Vec<Bound>> {
    terms.iter().map(|term| bind_expr(term, columns)).collect()
}

/// The literal as a value of the column's type, `None` if it has no such form.
fn bind_literal(literal: &Literal, column: &Column) -> Option<Value> {
    let converted = match literal {
        Literal::Null => return Some(Value::Null),
        Literal::Text(text) | Literal::Number(text) => coerce::from_wire(text, column.data_type),
        Literal::Bool(b) => coerce::convert(&Value::Boolean(*b), column.data_type),
    };
    converted.ok()
}

fn describe(token: &Token) -> String {
    match token {
        Token::Ident { text, .. } => format!("'{}'", text),
        Token::Text(text) => format!("string '{}'", text),
        Token::Number(n) => format!("number {}", n),
        Token::Op(op) => format!("operator {:?}", op),
        Token::LParen => "'('".to_string(),
        Token::RParen => "')'".to_string(),
        Token::Comma => "','".to_string(),
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.peek().is_some_and(|t| t.is_keyword(keyword)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn or(&mut self) -> Result<Expr> {
        let mut terms = vec![self.and()?];
        while self.eat_keyword("OR") {
            terms.push(self.and()?);
        }
        Ok(if terms.len() == 1 {
            terms.remove(0)
        } else {
            Expr::Or(terms)
        })
    }

    fn and(&mut self) -> Result<Expr> {
        let mut terms = vec![self.not()?];
        while self.eat_keyword("AND") {
            terms.push(self.not()?);
        }
        Ok(if terms.len() == 1 {
            terms.remove(0)
        } else {
            Expr::And(terms)
        })
    }

    fn not(&mut self) -> Result<Expr> {
        let mut negations = 0usize;
        while self.eat_keyword("NOT") {
            negations += 1;
        }
        let inner = self.primary()?;
        Ok(if negations % 2 == 1 {
            Expr::Not(Box::new(inner))
        } else {
            inner
        })
    }

    fn primary(&mut self) -> Result<Expr> {
        match self.next() {
            Some(Token::LParen) => {
                if self.depth >= MAX_NESTING {
                    return Err(StoreError::Query(format!(
                        "Expression nested deeper than {} parentheses",
                        MAX_NESTING
                    )));
                }
                self.depth += 1;
                let inner = self.or();
                self.depth -= 1;
                let inner = inner?;
                match self.next() {
                    Some(Token::RParen) => Ok(inner),
                    Some(other) => Err(StoreError::Query(format!(
                        "Expected ')' but found {}",
                        describe(&other)
                    ))),
                    None => Err(StoreError::Query("Missing ')'".to_string())),
                }
            }
            Some(Token::Ident { text, .. }) => self.condition(text),
            Some(other) => Err(StoreError::Query(format!(
                "Expected a column name but found {}",
                describe(&other)
            ))),
            None => Err(StoreError::Query("Unexpected end of expression".to_string())),
        }
    }

    fn condition(&mut self, column: String) -> Result<Expr> {
        if self.eat_keyword("IS") {
            let negated = self.eat_keyword("NOT");
            if !self.eat_keyword("NULL") {
                return Err(StoreError::Query(format!(
                    "Expected NULL after IS for column '{}'",
                    column
                )));
            }
            return Ok(Expr::IsNull { column, negated });
        }

        let negated_like = self.eat_keyword("NOT");
        if self.eat_keyword("LIKE") {
            let pattern = match self.next() {
                Some(Token::Text(pattern)) => pattern,
                _ => {
                    return Err(StoreError::Query(format!(
                        "LIKE on '{}' needs a quoted pattern",
                        column
                    )))
                }
            };
            let like = Expr::Like { column, pattern };
            return Ok(if negated_like {
                Expr::Not(Box::new(like))
            } else {
                like
            });
        }
        if negated_like {
            return Err(StoreError::Query(format!(
                "Expected LIKE after NOT for column '{}'",
                column
            )));
        }

        let op = match self.next() {
            Some(Token::Op(op)) => op,
            Some(other) => {
                return Err(StoreError::Query(format!(
                    "Expected a comparison after '{}' but found {}",
                    column,
                    describe(&other)
                )))
            }
            None => {
                return Err(StoreError::Query(format!(
                    "Expected a comparison after '{}'",
                    column
                )))
            }
        };
        let literal = self.literal()?;
        Ok(Expr::Compare {
            column,
            op,
            literal,
        })
    }

    fn literal(&mut self) -> Result<Literal> {
        match self.next() {
            Some(Token::Text(text)) => Ok(Literal::Text(text)),
            Some(Token::Number(n)) => Ok(Literal::Number(n)),
            Some(token) if token.is_keyword("TRUE") => Ok(Literal::Bool(true)),
            Some(token) if token.is_keyword("FALSE") => Ok(Literal::Bool(false)),
            Some(token) if token.is_keyword("NULL") => Ok(Literal::Null),
            Some(other) => Err(StoreError::Query(format!(
                "Expected a value but found {}",
                describe(&other)
            ))),
            None => Err(StoreError::Query("Expected a value".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn schema() -> Vec<Column> {
        vec![
            Column::new("ID", ColumnType::Uuid),
            Column::new("Name", ColumnType::String),
            Column::new("Age", ColumnType::Integer),
            Column::new("Active", ColumnType::Boolean),
            Column::new("Secret", ColumnType::Secure),
        ]
    }

    fn person(name: &str, age: i64) -> Row {
        Row::new()
            .with("ID", Uuid::new_v4())
            .with("Name", name)
            .with("Age", age)
            .with("Active", true)
            .with("Secret", Value::secure("pw"))
    }

    fn matches(clause: &str, row: &Row) -> bool {
        Filter::parse(clause)
            .unwrap()
            .bind(&schema())
            .unwrap()
            .matches(row)
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        assert!(Filter::parse("   ").unwrap().is_empty());
        assert!(matches("", &person("Ann", 30)));
    }

    #[test]
    fn test_typed_comparisons() {
        let ann = person("Ann", 30);
        assert!(matches("Age >= 18", &ann));
        assert!(matches("Age = '30'", &ann));
        assert!(!matches("Age < 30", &ann));
        assert!(matches("Name <> 'Bob'", &ann));
        assert!(matches("Active = TRUE", &ann));
    }

    #[test]
    fn test_uuid_literal_compares_as_uuid() {
        let id = Uuid::new_v4();
        let row = Row::new().with("ID", id);
        let clause = format!("ID='{}'", id.to_string().to_uppercase());
        assert!(matches(&clause, &row));
    }

    #[test]
    fn test_boolean_logic_and_precedence() {
        let ann = person("Ann", 30);
        assert!(matches("Name = 'Bob' OR Age = 30 AND Active = TRUE", &ann));
        assert!(!matches("(Name = 'Bob' OR Age = 30) AND Active = FALSE", &ann));
        assert!(matches("NOT Name = 'Bob'", &ann));
    }

    #[test]
    fn test_like_wildcards() {
        let ann = person("Annabel", 30);
        assert!(matches("Name LIKE 'Ann%'", &ann));
        assert!(matches("Name LIKE '*bel'", &ann));
        assert!(matches("Name LIKE '%nab%'", &ann));
        assert!(matches("Name NOT LIKE 'Bob%'", &ann));
        assert!(!matches("Name LIKE 'Ann'", &ann));
        assert!(matches("Secret LIKE 'p%'", &ann));
    }

    #[test]
    fn test_null_handling() {
        let row = Row::new().with("Name", Value::Null).with("Age", 3i64);
        assert!(matches("Name IS NULL", &row));
        assert!(!matches("Name IS NOT NULL", &row));
        assert!(!matches("Name = 'x'", &row));
        assert!(!matches("Name <> 'x'", &row));
        assert!(!matches("Age = NULL", &row));
    }

    #[test]
    fn test_secure_compares_on_plaintext() {
        let ann = person("Ann", 30);
        assert!(matches("Secret = 'pw'", &ann));
        assert!(!matches("Secret = 'nope'", &ann));
    }

    #[test]
    fn test_bracketed_column() {
        let columns = vec![Column::new("First Name", ColumnType::String)];
        let row = Row::new().with("First Name", "Ann");
        let predicate = Filter::parse("[First Name] = 'Ann'")
            .unwrap()
            .bind(&columns)
            .unwrap();
        assert!(predicate.matches(&row));
    }

    #[test]
    fn test_bind_errors() {
        let bind = |clause: &str| Filter::parse(clause).unwrap().bind(&schema());
        assert!(matches!(bind("Missing = 1"), Err(StoreError::Query(_))));
        assert!(matches!(bind("Age LIKE '1%'"), Err(StoreError::Query(_))));
    }

    #[test]
    fn test_incomparable_literal_never_equals() {
        let ann = person("Ann", 30);
        assert!(!matches("ID = 'does-not-exist'", &ann));
        assert!(matches("ID <> 'does-not-exist'", &ann));
        assert!(!matches("Age > 'old'", &ann));
        assert!(!matches("Age = 'old'", &ann));
    }

    #[test]
    fn test_parse_errors() {
        for clause in [
            "Name =",
            "Name 'Ann'",
            "(Name = 'Ann'",
            "Name = 'Ann' Age = 1",
            "Name IS 'x'",
            "= 'x'",
        ] {
            assert!(
                matches!(Filter::parse(clause), Err(StoreError::Query(_))),
                "{} should not parse",
                clause
            );
        }
    }

    #[test]
    fn test_deep_nesting_is_a_query_error() {
        let unclosed = "(".repeat(200_000);
        assert!(matches!(Filter::parse(&unclosed), Err(StoreError::Query(_))));

        let balanced = format!(
            "{}Name = 'Ann'{}",
            "(".repeat(MAX_NESTING + 1),
            ")".repeat(MAX_NESTING + 1)
        );
        assert!(matches!(Filter::parse(&balanced), Err(StoreError::Query(_))));

        let allowed = format!(
            "{}Name = 'Ann'{}",
            "(".repeat(MAX_NESTING),
            ")".repeat(MAX_NESTING)
        );
        assert!(matches(&allowed, &person("Ann", 30)));
    }

    #[test]
    fn test_long_or_chain_evaluates() {
        let clause = vec!["Age = 2"; 200_000].join(" OR ") + " OR Age = 30";
        assert!(matches(&clause, &person("Ann", 30)));
        assert!(!matches(&clause, &person("Bob", 31)));

        let clause = vec!["Active = TRUE"; 200_000].join(" AND ");
        assert!(matches(&clause, &person("Ann", 30)));
    }

    #[test]
    fn test_stacked_not_cancels() {
        let ann = person("Ann", 30);
        let clause = format!("{}Name = 'Ann'", "NOT ".repeat(100_001));
        assert!(!matches(&clause, &ann));
        let clause = format!("{}Name = 'Ann'", "NOT ".repeat(100_000));
        assert!(matches(&clause, &ann));
    }

    #[test]
    fn test_like_matcher() {
        assert!(like("abc", "abc"));
        assert!(like("abc", "%"));
        assert!(like("abc", "a%c"));
        assert!(!like("ab", "a%bc"));
        assert!(!like("abc", "abd%"));
    }
}
