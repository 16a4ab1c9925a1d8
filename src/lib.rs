//! Traffic Sign Classification Service Library
//!
//! Serves a pre-trained traffic sign classifier over HTTP: uploaded images
//! are decoded, normalized to the model's input tensor, classified and
//! returned with human-readable sign metadata.

pub mod api;
pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod preprocess;
pub mod types;

#[cfg(test)]
mod test_support;

pub use config::AppConfig;
pub use error::{ClassifyError, StartupError};
pub use metrics::ServiceMetrics;
pub use models::inference::InferenceEngine;
pub use preprocess::{ImagePreprocessor, InputShape, InputTensor};
pub use types::{ClassRegistry, Prediction};
