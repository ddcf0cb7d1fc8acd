//! Error types for meshsmooth

use thiserror::Error;

/// Main error type for meshsmooth operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed mesh: {0}")]
    MalformedMesh(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("Reconstruction failed: {0}")]
    ReconstructionFailure(String),

    #[error("Format error: {0}")]
    Format(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Result type alias for meshsmooth operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether the error came from the file layer rather than geometry processing
    pub fn is_io(&self) -> bool {
        matches!(self, Error::Io(_) | Error::Format(_) | Error::UnsupportedFormat(_))
    }
}
