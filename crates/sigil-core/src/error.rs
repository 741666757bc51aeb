use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorKind {
    /// A name was read from the environment before anything wrote it.
    Unbound,
    /// A capability offset or identifier did not resolve on the target.
    Capability,
    Type,
    Arity,
    /// Accumulator stages used out of order (initialize -> accumulate* -> finalize).
    Accumulator,
    /// Hex payload or its decoded text is malformed.
    Payload,
    Eval,
    Budget,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeError {
    pub kind: ErrorKind,
    pub message: String,
}

impl RuntimeError {
    pub fn new(kind: ErrorKind, message: String) -> Self {
        Self { kind, message }
    }

    pub(crate) fn arity(what: &str, expected: &str, got: usize) -> Self {
        Self::new(
            ErrorKind::Arity,
            format!("{what} expects {expected} argument(s), got {got}"),
        )
    }

    pub(crate) fn type_mismatch(what: &str, expected: &str, got: &str) -> Self {
        Self::new(
            ErrorKind::Type,
            format!("{what} expects {expected}, got {got}"),
        )
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for RuntimeError {}

pub type Result<T> = std::result::Result<T, RuntimeError>;
