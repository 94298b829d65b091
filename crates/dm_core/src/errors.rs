//! crates/dm_core/src/errors.rs
//! Error set shared by graph construction, seeding, and both samplers.

use core::fmt;

/// Failure taxonomy. Validation failures surface from constructors, before any
/// stateful loop begins; there is no partial-success result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CoreError {
    /// Bad graph/district combination, unknown energy type, out-of-range parameter.
    InvalidArgument(String),
    /// No feasible seed districting (block tiling or bounded region growth).
    Unsatisfiable(String),
    /// The chain cannot move: `k == 1`, no legal move left, no swappable pair.
    DegenerateChain(String),
    /// Internal bookkeeping disagreed with itself. Fatal.
    InvariantViolation(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        CoreError::InvalidArgument(msg.into())
    }

    pub fn unsatisfiable(msg: impl Into<String>) -> Self {
        CoreError::Unsatisfiable(msg.into())
    }

    pub fn degenerate(msg: impl Into<String>) -> Self {
        CoreError::DegenerateChain(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        CoreError::InvariantViolation(msg.into())
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::InvalidArgument(m) => write!(f, "invalid argument: {m}"),
            CoreError::Unsatisfiable(m) => write!(f, "unsatisfiable: {m}"),
            CoreError::DegenerateChain(m) => write!(f, "degenerate chain: {m}"),
            CoreError::InvariantViolation(m) => write!(f, "invariant violation: {m}"),
        }
    }
}

impl std::error::Error for CoreError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_prefixed_by_kind() {
        assert_eq!(CoreError::invalid("k = 0").to_string(), "invalid argument: k = 0");
        assert_eq!(
            CoreError::degenerate("no further moves").to_string(),
            "degenerate chain: no further moves"
        );
    }
}
