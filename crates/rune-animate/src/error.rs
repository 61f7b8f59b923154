//! Error types for the animation engine.
//!
//! The engine itself never fails an `animate` call: "cannot animate" resolves the
//! runner successfully. These errors cover the edges around it: document
//! manipulation, event parsing and scenarios.

use thiserror::Error;

use crate::document::ElementId;

/// Result type for animation operations.
pub type Result<T> = std::result::Result<T, AnimateError>;

/// Errors that can occur around the animation engine.
#[derive(Error, Debug)]
pub enum AnimateError {
    /// Element id does not belong to the document.
    #[error("unknown element: {0:?}")]
    UnknownElement(ElementId),

    /// Element was removed from the document.
    #[error("element has been destroyed: {0:?}")]
    Destroyed(ElementId),

    /// Tree operation would create a cycle or otherwise break the tree.
    #[error("invalid tree operation: {0}")]
    InvalidTree(String),

    /// Event name is empty or malformed.
    #[error("invalid animation event: {0:?}")]
    InvalidEvent(String),

    /// Scenario file is inconsistent.
    #[error("invalid scenario: {0}")]
    Scenario(String),

    /// JSON (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
