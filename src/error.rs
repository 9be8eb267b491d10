//! Error types for chart generation

use thiserror::Error;

/// Result type alias for chart operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while validating, rendering, or saving a chart
#[derive(Error, Debug)]
pub enum Error {
    /// The chart configuration failed a structural check
    #[error("{0}")]
    InvalidConfig(String),

    /// The rendering engine rejected the configuration
    #[error("Rendering failed: {0}")]
    RenderError(String),

    /// The drawing surface could not be encoded as PNG
    #[error("PNG encoding failed: {0}")]
    EncodeError(String),

    /// Writing a rendered artifact to disk failed
    #[error("Failed to save chart: {0}")]
    PersistenceError(String),

    /// Malformed message on the tool protocol
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Transport-level I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// The bare reason, without the category prefix used by `Display`.
    ///
    /// This is what callers see as the error detail of a failed render.
    pub fn detail(&self) -> String {
        match self {
            Error::InvalidConfig(msg)
            | Error::RenderError(msg)
            | Error::EncodeError(msg)
            | Error::PersistenceError(msg)
            | Error::Protocol(msg) => msg.clone(),
            Error::Io(err) => err.to_string(),
        }
    }
}
