//! Error types for strata-index.

use strata_core::Rect;
use thiserror::Error;

/// Errors returned by [`SpatialIndex`](crate::SpatialIndex) operations.
///
/// Keys are carried in their `Debug` form so the error stays independent of
/// the key type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpatialError {
    /// Bounds with a negative width or height.
    #[error("Invalid bounds: {0:?}")]
    InvalidBounds(Rect),

    /// The key is already indexed.
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// The key is not indexed.
    #[error("Unknown key: {0}")]
    UnknownKey(String),

    /// A structural invariant of the tree does not hold.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
}

impl SpatialError {
    pub(crate) fn duplicate(key: &impl std::fmt::Debug) -> Self {
        Self::DuplicateKey(format!("{key:?}"))
    }

    pub(crate) fn unknown(key: &impl std::fmt::Debug) -> Self {
        Self::UnknownKey(format!("{key:?}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spatial_error_display() {
        let err = SpatialError::InvalidBounds(Rect::new(0, 0, -1, 2));
        assert!(err.to_string().starts_with("Invalid bounds"));

        let err = SpatialError::duplicate(&42u32);
        assert_eq!(err.to_string(), "Duplicate key: 42");

        let err = SpatialError::unknown(&"modal");
        assert_eq!(err.to_string(), "Unknown key: \"modal\"");
    }

    #[test]
    fn test_spatial_error_is_std_error() {
        fn assert_error<E: std::error::Error>(_: &E) {}
        assert_error(&SpatialError::InvariantViolation("x".into()));
    }
}
