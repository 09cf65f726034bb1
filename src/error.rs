//! Error types for the render pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading, rendering or emitting an image.
///
/// Every variant is fatal to the invocation; nothing is retried.
#[derive(Error, Debug)]
pub enum Error {
    /// No path was given and standard input was empty
    #[error("Input unavailable: {0}")]
    InputUnavailable(String),

    /// The DICOM payload could not be decoded
    #[error("Decode failed: {0}")]
    DecodeError(String),

    /// The rendering backend could not be initialized
    #[error("Backend initialization failed: {0}")]
    InitializationError(String),

    /// The backend failed while rendering
    #[error("Rendering failed: {0}")]
    RenderError(String),

    /// The render completion signal never fired
    #[error("Render timed out after {0}ms")]
    Timeout(u64),

    /// A reader primitive received something other than a binary blob
    #[error("Unsupported input shape: {0}")]
    UnsupportedInput(String),

    /// The output image encoder failed
    #[error("Encoding failed: {0}")]
    EncodeError(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// A second render was requested on a host context that already rendered
    #[error("Host context already rendered an image; one render per context is supported")]
    AlreadyRendered,

    /// Grayscale transcoding found a pixel whose color channels differ
    #[error("Grayscale pixel {pixel} has unequal color channels")]
    ChannelMismatch { pixel: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

#[cfg(feature = "jpeg")]
impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::EncodeError(err.to_string())
    }
}
