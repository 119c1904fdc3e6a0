//! Error types for the stencil template engine.
//!
//! Uses thiserror for derive macros. Errors fall into two kinds: structural
//! errors raised while resolving and compiling a view (a missing source or
//! partial file, a malformed block structure) and runtime errors raised
//! while a compiled artifact executes (unknown filter name, a filter's own
//! precondition failure). Nothing is retried and nothing is cached for a
//! failed compile.

use thiserror::Error;

/// HTTP-equivalent status for structural "missing file" errors.
pub const STATUS_NOT_FOUND: u16 = 404;

/// HTTP-equivalent status for every other failure.
pub const STATUS_INTERNAL: u16 = 500;

/// Main error type for stencil operations.
#[derive(Error, Debug)]
pub enum StencilError {
    /// A referenced view or partial file is absent from the filesystem.
    #[error("template file {0} does not exist")]
    NotFound(String),

    /// The parser found a malformed block structure.
    #[error("template syntax error: {0}")]
    Syntax(String),

    /// A filter chain referenced a name the registry does not know.
    /// Raised at execution time, not compile time.
    #[error("unknown filter '{0}'")]
    UnknownFilter(String),

    /// A filter rejected its input or arguments.
    #[error("filter '{name}' failed: {message}")]
    Filter { name: String, message: String },

    /// Filesystem failure while reading a source or persisting an artifact.
    #[error("io error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A compiled artifact on disk could not be decoded.
    #[error("corrupt cached artifact {path}: {message}")]
    CorruptArtifact { path: String, message: String },
}

impl StencilError {
    /// Returns the HTTP-equivalent status carried by this error.
    ///
    /// Structural "file is missing" errors map to 404; everything else,
    /// including runtime filter failures, maps to 500.
    pub fn status_code(&self) -> u16 {
        match self {
            StencilError::NotFound(_) => STATUS_NOT_FOUND,
            _ => STATUS_INTERNAL,
        }
    }

    /// Helper for wrapping io errors with the path they occurred on.
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        StencilError::Io { path: path.display().to_string(), source }
    }
}

/// Result type alias for stencil operations.
pub type Result<T> = std::result::Result<T, StencilError>;
