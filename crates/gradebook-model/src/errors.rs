use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Closed set of error kinds in the consumer contract.
///
/// Translating kinds to transport-level status codes is the API
/// layer's job; the core only classifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Malformed, unknown, missing, or extra column/row reference;
    /// schema-kind violations; unknown course id.
    BadArg,
    /// A legitimate score-column value outside its declared bounds.
    Range,
    /// A row that must exist does not.
    NotFound,
    /// Backing-store communication or operational failure.
    Db,
}

impl ErrorKind {
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::BadArg => "BAD_ARG",
            ErrorKind::Range => "RANGE",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Db => "DB",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One classified error entry.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct GradeError {
    pub kind: ErrorKind,
    pub message: String,
}

impl GradeError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// One or more accumulated [`GradeError`] entries; never empty.
///
/// Batch operations collect every violation before failing so a caller
/// can fix all problems in one round trip; single-error call sites
/// return a one-entry set so the consumer contract stays uniform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GradeErrors(Vec<GradeError>);

impl GradeErrors {
    pub fn single(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self(vec![GradeError::new(kind, message)])
    }

    pub fn errors(&self) -> &[GradeError] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if any entry has the given kind.
    pub fn contains(&self, kind: ErrorKind) -> bool {
        self.0.iter().any(|e| e.kind == kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = ErrorKind> + '_ {
        self.0.iter().map(|e| e.kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = &GradeError> {
        self.0.iter()
    }
}

impl fmt::Display for GradeErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for GradeErrors {}

impl From<GradeError> for GradeErrors {
    fn from(err: GradeError) -> Self {
        Self(vec![err])
    }
}

/// Result of every public table/store operation: success carrying a
/// value, or failure carrying one or more `(kind, message)` entries.
pub type TableResult<T> = Result<T, GradeErrors>;

/// Collect-all builder used by batch validation.
///
/// Validation walks the entire batch, recording every violation, and
/// only then decides success or failure; nothing short-circuits on the
/// first problem.
#[derive(Debug, Default)]
pub struct ErrorAccumulator {
    errors: Vec<GradeError>,
}

impl ErrorAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, kind: ErrorKind, message: impl Into<String>) {
        self.errors.push(GradeError::new(kind, message));
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Fail with everything collected, or succeed with `()` so the
    /// caller can go on to build the success value.
    pub fn finish(self) -> TableResult<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(GradeErrors(self.errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_have_stable_wire_codes() {
        assert_eq!(
            serde_json::to_string(&ErrorKind::BadArg).unwrap(),
            "\"BAD_ARG\""
        );
        assert_eq!(
            serde_json::from_str::<ErrorKind>("\"RANGE\"").unwrap(),
            ErrorKind::Range
        );
    }

    #[test]
    fn accumulator_collects_everything() {
        let mut acc = ErrorAccumulator::new();
        acc.add(ErrorKind::BadArg, "unknown column x");
        acc.add(ErrorKind::Range, "hw1 value 150 out of range [0, 100]");
        let errs = acc.finish().unwrap_err();
        assert_eq!(errs.len(), 2);
        assert!(errs.contains(ErrorKind::BadArg));
        assert!(errs.contains(ErrorKind::Range));
        assert_eq!(
            errs.to_string(),
            "BAD_ARG: unknown column x; RANGE: hw1 value 150 out of range [0, 100]"
        );
    }

    #[test]
    fn empty_accumulator_finishes_ok() {
        assert!(ErrorAccumulator::new().finish().is_ok());
    }
}
