//! Error types for model loading and request classification

use std::path::PathBuf;
use thiserror::Error;

/// Failure while bringing the model up. The service must not start serving.
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("model artifact not found at '{0}'")]
    ModelNotFound(PathBuf),

    #[error("failed to load model at '{path}': {reason}")]
    ModelLoad { path: PathBuf, reason: String },

    #[error("model at '{path}' is incompatible: {reason}")]
    IncompatibleModel { path: PathBuf, reason: String },
}

/// Request-scoped failure of the classification path, one variant per stage
#[derive(Error, Debug)]
pub enum ClassifyError {
    /// Declared content type is absent or not `image/*`
    #[error("File must be an image.")]
    UnsupportedMediaType,

    /// Bytes could not be decoded as an image
    #[error("Invalid image file: {0}")]
    InvalidImage(String),

    /// Decoding succeeded but the tensor could not be produced
    #[error("Preprocessing error: {0}")]
    PreprocessingFailed(String),

    /// The model rejected the input or produced unusable output
    #[error("Model prediction error: {0}")]
    InferenceFailed(String),
}

impl ClassifyError {
    /// Whether the failure is the caller's fault
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ClassifyError::UnsupportedMediaType | ClassifyError::InvalidImage(_)
        )
    }

    /// Short stable name used as a metrics key
    pub fn kind(&self) -> &'static str {
        match self {
            ClassifyError::UnsupportedMediaType => "unsupported_media_type",
            ClassifyError::InvalidImage(_) => "invalid_image",
            ClassifyError::PreprocessingFailed(_) => "preprocessing_failed",
            ClassifyError::InferenceFailed(_) => "inference_failed",
        }
    }
}

impl From<image::ImageError> for ClassifyError {
    fn from(err: image::ImageError) -> Self {
        use image::ImageError;

        match &err {
            // Limits covers headers declaring dimensions too large to allocate
            ImageError::Decoding(_)
            | ImageError::Unsupported(_)
            | ImageError::IoError(_)
            | ImageError::Limits(_) => ClassifyError::InvalidImage(err.to_string()),
            _ => ClassifyError::PreprocessingFailed(err.to_string()),
        }
    }
}
