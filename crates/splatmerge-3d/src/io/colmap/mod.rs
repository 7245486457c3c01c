mod text;
mod types;

pub use text::*;
pub use types::*;

/// Error types for the COLMAP module.
#[derive(Debug, thiserror::Error)]
pub enum ColmapError {
    /// Error reading or writing file
    #[error("error reading or writing file")]
    Io(#[from] std::io::Error),

    /// A camera declares the wrong number of parameters for its model
    #[error("camera model {model} expects {expected} parameters, found {actual}")]
    InvalidNumCameraParams {
        /// Name of the camera model.
        model: &'static str,
        /// Parameter count required by the model.
        expected: usize,
        /// Parameter count found on the line.
        actual: usize,
    },

    /// An unrecognized camera model name
    #[error("invalid camera model `{0}`")]
    InvalidCameraModel(String),

    /// A malformed line in one of the model text files
    #[error("parse error: {0}")]
    ParseError(String),
}
