//! Error types for strata-terminal.

use strata_index::SpatialError;
use thiserror::Error;

/// Errors that can occur while applying patches and rendering frames.
#[derive(Debug, Error)]
pub enum StrataError {
    /// A patch could not be applied to the element registry.
    #[error("Cannot apply patch at {path:?}: {reason}")]
    PatchApplication {
        /// Structural path the patch addressed.
        path: Vec<usize>,
        /// What went wrong.
        reason: String,
    },

    /// Spatial index rejected an operation.
    #[error("Spatial index error: {0}")]
    Spatial(#[from] SpatialError),

    /// IO error from terminal operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration.
    #[error("Invalid config: {0}")]
    Config(String),

    /// The scheduler is already running.
    #[error("Scheduler already running")]
    SchedulerRunning,

    /// A frame failed on the render thread.
    #[error("Frame failed: {0}")]
    FrameFailed(String),
}

impl StrataError {
    pub(crate) fn patch(path: &[usize], reason: impl Into<String>) -> Self {
        Self::PatchApplication {
            path: path.to_vec(),
            reason: reason.into(),
        }
    }
}

/// Result alias for strata-terminal operations.
pub type Result<T> = std::result::Result<T, StrataError>;

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::Rect;

    #[test]
    fn test_strata_error_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: StrataError = io_err.into();
        assert!(matches!(err, StrataError::Io(_)));
        assert!(err.to_string().contains("IO error"));
    }

    #[test]
    fn test_strata_error_spatial() {
        let err: StrataError = SpatialError::InvalidBounds(Rect::new(0, 0, -1, 1)).into();
        assert!(matches!(err, StrataError::Spatial(_)));
        assert!(err.to_string().contains("Invalid bounds"));
    }

    #[test]
    fn test_patch_error_display() {
        let err = StrataError::patch(&[0, 2], "index 5 out of range");
        assert_eq!(
            err.to_string(),
            "Cannot apply patch at [0, 2]: index 5 out of range"
        );
    }

    #[test]
    fn test_misc_errors_display() {
        assert_eq!(
            StrataError::SchedulerRunning.to_string(),
            "Scheduler already running"
        );
        assert!(StrataError::Config("bad".into()).to_string().contains("bad"));
        assert!(StrataError::FrameFailed("x".into()).to_string().contains("x"));
    }
}
