//! Per-call error and warning aggregation.
//!
//! Every public operation on [`JsonTables`](crate::JsonTables) returns an
//! [`Outcome`]: a success flag, a value, and the [`Diagnostics`] collected
//! while producing it. Warnings describe conditions that were already
//! recovered from ("column already exists", "no rows matched"); errors mean
//! the operation did not achieve its effect.

use std::fmt;

/// Overall status derived from a [`Diagnostics`] record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// No errors and no warnings
    Success,
    /// Warnings only
    Warning,
    /// At least one error
    Error,
}

/// Errors and warnings gathered during a single operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error.
    pub fn error(&mut self, message: impl fmt::Display) {
        self.errors.push(message.to_string());
    }

    /// Record a warning.
    pub fn warning(&mut self, message: impl fmt::Display) {
        self.warnings.push(message.to_string());
    }

    /// Absorb everything recorded by another operation.
    pub fn merge(&mut self, other: Diagnostics) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn has_errors_or_warnings(&self) -> bool {
        self.has_errors() || self.has_warnings()
    }

    pub fn status(&self) -> Status {
        if self.has_errors() {
            Status::Error
        } else if self.has_warnings() {
            Status::Warning
        } else {
            Status::Success
        }
    }

    /// The most recently recorded error, if any.
    pub fn last_error(&self) -> Option<&str> {
        self.errors.last().map(String::as_str)
    }

    /// The most recently recorded warning, if any.
    pub fn last_warning(&self) -> Option<&str> {
        self.warnings.last().map(String::as_str)
    }

    /// All errors, one per line.
    pub fn all_errors(&self) -> String {
        self.errors.join("\n")
    }

    /// All warnings, one per line.
    pub fn all_warnings(&self) -> String {
        self.warnings.join("\n")
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for error in &self.errors {
            writeln!(f, "error: {}", error)?;
        }
        for warning in &self.warnings {
            writeln!(f, "warning: {}", warning)?;
        }
        Ok(())
    }
}

/// Result of a public operation: success flag, value, and diagnostics.
///
/// `success == false` with no errors means "nothing to do" (for example the
/// column already existed); check [`Diagnostics::has_errors`] before treating
/// it as a failure.
#[derive(Debug, Clone)]
pub struct Outcome<T> {
    pub success: bool,
    pub value: T,
    pub diagnostics: Diagnostics,
}

impl<T> Outcome<T> {
    pub fn new(success: bool, value: T, diagnostics: Diagnostics) -> Self {
        Self {
            success,
            value,
            diagnostics,
        }
    }

    pub fn status(&self) -> Status {
        self.diagnostics.status()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.has_errors()
    }

    pub fn has_warnings(&self) -> bool {
        self.diagnostics.has_warnings()
    }

    /// Transform the value, keeping the flag and diagnostics.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        Outcome {
            success: self.success,
            value: f(self.value),
            diagnostics: self.diagnostics,
        }
    }

    /// Split into the value and diagnostics.
    pub fn into_parts(self) -> (bool, T, Diagnostics) {
        (self.success, self.value, self.diagnostics)
    }
}

impl Outcome<bool> {
    /// Outcome for predicate-style operations where the answer is the flag.
    pub fn flag(value: bool, diagnostics: Diagnostics) -> Self {
        Self::new(value, value, diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_derivation() {
        let mut diagnostics = Diagnostics::new();
        assert_eq!(diagnostics.status(), Status::Success);

        diagnostics.warning("column already exists");
        assert_eq!(diagnostics.status(), Status::Warning);

        diagnostics.error("disk full");
        assert_eq!(diagnostics.status(), Status::Error);
        assert!(diagnostics.has_errors_or_warnings());
    }

    #[test]
    fn test_last_and_all_messages() {
        let mut diagnostics = Diagnostics::new();
        assert_eq!(diagnostics.last_error(), None);
        assert_eq!(diagnostics.all_errors(), "");

        diagnostics.error("first");
        diagnostics.error("second");
        assert_eq!(diagnostics.last_error(), Some("second"));
        assert_eq!(diagnostics.all_errors(), "first\nsecond");
    }

    #[test]
    fn test_merge_keeps_both_sides() {
        let mut a = Diagnostics::new();
        a.warning("w1");
        let mut b = Diagnostics::new();
        b.error("e1");
        b.warning("w2");

        a.merge(b);
        assert_eq!(a.errors(), ["e1".to_string()]);
        assert_eq!(a.warnings().len(), 2);
    }

    #[test]
    fn test_outcome_map_keeps_diagnostics() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.warning("no rows matched");
        let outcome = Outcome::new(true, vec![1, 2, 3], diagnostics).map(|v| v.len());

        assert!(outcome.success);
        assert_eq!(outcome.value, 3);
        assert_eq!(outcome.status(), Status::Warning);
    }
}
