//! Error types for the board editor.

use boardkit_core::{ItemId, NetId};
use thiserror::Error;

use crate::model::LayerId;

/// Errors raised by document, undo log and tool operations
#[derive(Error, Debug)]
pub enum EditorError {
    #[error("A command group is already active")]
    GroupAlreadyActive,

    #[error("No command group is active")]
    NoActiveGroup,

    #[error("Cannot {0} while a command group is active")]
    GroupActive(&'static str),

    #[error("Nothing to {0}")]
    NothingTo(&'static str),

    #[error("Unknown item {0}")]
    UnknownItem(ItemId),

    #[error("Unknown net {0}")]
    UnknownNet(NetId),

    #[error("Layer {0} is not available here")]
    InvalidLayer(LayerId),

    #[error("Net is not available here")]
    InvalidNet,

    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: &'static str, reason: String },

    #[error("Setting {0} is not supported by the active tool")]
    UnsupportedSetting(&'static str),

    #[error("Failed to access {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Document format error: {0}")]
    Format(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Store(String),
}

impl EditorError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        EditorError::InvalidValue {
            name,
            reason: reason.into(),
        }
    }
}

impl From<EditorError> for boardkit_core::Error {
    fn from(err: EditorError) -> Self {
        match err {
            EditorError::Io { source, .. } => boardkit_core::Error::Io(source),
            EditorError::Format(e) => boardkit_core::Error::Json(e),
            other => boardkit_core::Error::other(other.to_string()),
        }
    }
}

pub type EditorResult<T> = std::result::Result<T, EditorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            EditorError::GroupActive("undo").to_string(),
            "Cannot undo while a command group is active"
        );
        assert_eq!(
            EditorError::invalid("width", "must be > 0").to_string(),
            "Invalid value for width: must be > 0"
        );
    }

    #[test]
    fn test_conversion_to_core_error() {
        let io = EditorError::Io {
            path: "x".into(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        let core: boardkit_core::Error = io.into();
        assert!(core.is_io());
    }
}
