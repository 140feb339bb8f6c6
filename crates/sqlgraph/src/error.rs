//! Error types for graph construction.
//!
//! Errors are split the same way the build itself is:
//!
//! - **`Error`**: fatal conditions that stop a run (bad caller input,
//!   unreadable files, broken configuration)
//! - **`Diagnostic`** (see [`crate::diagnostics`]): problems with one object's
//!   SQL that are recorded and reported next to the graph
//!
//! Nothing that originates in the SQL text of an object is ever an `Error`.
//! A malformed procedure body costs that procedure its outgoing edges, not the
//! whole run.

use thiserror::Error;

/// Result type for sqlgraph operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal errors that prevent a graph from being produced.
#[derive(Debug, Error)]
pub enum Error {
    /// An input object cannot be identified (empty name)
    #[error("invalid object: {0}")]
    InvalidObject(String),

    /// Traversal was requested without a current object
    #[error("no current object set for traversal")]
    NoCurrentObject,

    /// Invalid configuration or arguments
    #[error("configuration error: {0}")]
    Config(String),

    /// File system operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Object input could not be decoded
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_convert() {
        let err: Error = std::io::Error::new(std::io::ErrorKind::NotFound, "objects.json").into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("objects.json"));
    }

    #[test]
    fn invalid_object_message_names_the_problem() {
        let err = Error::InvalidObject("object name is empty".to_string());
        assert_eq!(err.to_string(), "invalid object: object name is empty");
    }
}
