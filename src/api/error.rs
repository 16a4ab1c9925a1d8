//! HTTP error responses

use crate::error::ClassifyError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Name of the multipart field carrying the image
pub const FILE_FIELD: &str = "file";

/// JSON error body, `{"detail": "..."}`
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
}

/// Failure of a `/predict` request
#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Classify(#[from] ClassifyError),

    #[error("Field 'file' is required.")]
    MissingFile,

    /// The body could not be read as a multipart form
    #[error("{message}")]
    Upload { status: StatusCode, message: String },
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Classify(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            ApiError::Classify(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::MissingFile => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Upload { status, .. } => *status,
        }
    }

    /// Short stable name used as a metrics key
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::Classify(e) => e.kind(),
            ApiError::MissingFile => "missing_file",
            ApiError::Upload { .. } => "malformed_upload",
        }
    }
}

impl From<axum::extract::multipart::MultipartError> for ApiError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        ApiError::Upload {
            status: err.status(),
            message: format!("Malformed multipart body: {}", err.body_text()),
        }
    }
}

impl From<axum::extract::multipart::MultipartRejection> for ApiError {
    fn from(rejection: axum::extract::multipart::MultipartRejection) -> Self {
        ApiError::Upload {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            detail: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::from(ClassifyError::UnsupportedMediaType).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(ClassifyError::InvalidImage("x".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(ClassifyError::PreprocessingFailed("x".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(ClassifyError::InferenceFailed("x".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(ApiError::MissingFile.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_detail_is_the_classify_message() {
        let err = ApiError::from(ClassifyError::UnsupportedMediaType);
        assert_eq!(err.to_string(), "File must be an image.");
        assert_eq!(ApiError::MissingFile.to_string(), "Field 'file' is required.");
    }
}
