//! Classifier model loading and inference

pub mod inference;
pub mod loader;

pub use inference::{Classifier, InferenceEngine};
pub use loader::{ModelLoader, OnnxClassifier};
