//! Error handling for BoardKit
//!
//! Provides the root error type shared by all crates of the workspace.
//! Crate-specific errors convert into it with `#[from]`.

use thiserror::Error;

use crate::event_bus::EventBusError;

/// Geometry error type
///
/// Raised when input geometry cannot be used for the requested operation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// A polygon needs at least three vertices
    #[error("Polygon needs at least 3 vertices, got {count}")]
    TooFewVertices {
        /// The number of vertices that were supplied.
        count: usize,
    },

    /// A length or diameter was zero, negative or not finite
    #[error("Invalid {what}: {value}")]
    InvalidDimension {
        /// Name of the dimension.
        what: String,
        /// The rejected value.
        value: f64,
    },
}

/// Main error type for BoardKit
#[derive(Error, Debug)]
pub enum Error {
    /// Geometry error
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    /// Event bus error
    #[error(transparent)]
    EventBus(#[from] EventBusError),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Check if this error came from the file system
    pub fn is_io(&self) -> bool {
        matches!(self, Error::Io(_))
    }
}

/// Result type alias using BoardKit's error type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_error_display() {
        let err = GeometryError::TooFewVertices { count: 2 };
        assert_eq!(err.to_string(), "Polygon needs at least 3 vertices, got 2");

        let err = GeometryError::InvalidDimension {
            what: "drill".to_string(),
            value: -0.3,
        };
        assert_eq!(err.to_string(), "Invalid drill: -0.3");
    }

    #[test]
    fn test_error_conversion() {
        let err: Error = GeometryError::TooFewVertices { count: 0 }.into();
        assert!(matches!(err, Error::Geometry(_)));

        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io.into();
        assert!(err.is_io());
        assert_eq!(err.to_string(), "I/O error: missing");
    }

    #[test]
    fn test_other() {
        let err = Error::other("boom");
        assert_eq!(err.to_string(), "boom");
        assert!(!err.is_io());
    }
}
