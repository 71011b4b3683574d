//! Where and order-by clauses evaluated against in-memory rows.
//!
//! This is a full-scan evaluator for a small SQL-like subset, not a planner:
//!
//! ```text
//! ID = '6f1c…' AND (Age >= 18 OR Name LIKE 'A%')
//! Name DESC, CreatedDate
//! ```
//!
//! Literals are coerced to the declared type of the column they are compared
//! with, so comparisons happen on typed values rather than on text.

mod filter;
mod lexer;
mod order;

pub use filter::{Filter, Predicate, MAX_NESTING};
pub use order::{OrderBy, SortKey};

/// Trim a clause and strip a leading `WHERE ` or `ORDER BY ` keyword.
pub fn clean_query(query: &str) -> &str {
    let trimmed = query.trim();
    for keyword in ["WHERE ", "ORDER BY "] {
        if trimmed.len() >= keyword.len()
            && trimmed.is_char_boundary(keyword.len())
            && trimmed[..keyword.len()].eq_ignore_ascii_case(keyword)
        {
            return trimmed[keyword.len()..].trim();
        }
    }
    trimmed
}
