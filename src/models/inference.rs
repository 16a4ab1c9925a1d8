//! Classification engine: request validation, preprocessing, inference and labeling

use crate::config::AppConfig;
use crate::error::{ClassifyError, StartupError};
use crate::metrics::ServiceMetrics;
use crate::models::loader::ModelLoader;
use crate::preprocess::{ImagePreprocessor, InputShape, InputTensor};
use crate::types::{ClassRegistry, Prediction};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// A loaded model that maps one `(1, H, W, C)` tensor to class scores
pub trait Classifier: Send + Sync {
    /// Input geometry the model was trained on
    fn input_shape(&self) -> InputShape;

    /// Class probabilities for the single batch entry
    fn predict(&self, input: &InputTensor) -> anyhow::Result<Vec<f32>>;
}

/// Index and score of the highest-scoring class.
///
/// The first index wins ties and NaN scores never win, so the result is
/// stable for a given vector. Returns `None` when no score is comparable.
pub fn top_class(scores: &[f32]) -> Option<(usize, f32)> {
    scores
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, s)| !s.is_nan())
        .fold(None, |best, (i, s)| match best {
            Some((_, b)) if s <= b => best,
            _ => Some((i, s)),
        })
}

/// Whether a declared upload content type denotes an image
pub fn is_image_content_type(content_type: Option<&str>) -> bool {
    content_type
        .map(|ct| ct.trim().to_ascii_lowercase().starts_with("image/"))
        .unwrap_or(false)
}

/// Orchestrates the per-request classification path over shared, read-only state
pub struct InferenceEngine {
    /// Loaded model
    classifier: Arc<dyn Classifier>,
    /// Bytes → tensor conversion matching the model's input
    preprocessor: ImagePreprocessor,
    /// Class index → metadata
    registry: ClassRegistry,
    /// Shared service metrics
    metrics: Arc<ServiceMetrics>,
}

impl InferenceEngine {
    /// Load the configured model. Errors here must abort startup.
    pub fn new(config: &AppConfig, metrics: Arc<ServiceMetrics>) -> Result<Self, StartupError> {
        let loader = ModelLoader::from_config(&config.model);
        let classifier = loader.load(&config.model.path)?;

        let engine = Self::with_classifier(Arc::new(classifier), ClassRegistry::builtin(), metrics);

        info!(
            input_shape = %engine.input_shape(),
            classes = engine.registry.len(),
            "Inference engine initialized"
        );

        Ok(engine)
    }

    /// Build an engine around an already loaded classifier
    pub fn with_classifier(
        classifier: Arc<dyn Classifier>,
        registry: ClassRegistry,
        metrics: Arc<ServiceMetrics>,
    ) -> Self {
        let preprocessor = ImagePreprocessor::new(classifier.input_shape());
        Self {
            classifier,
            preprocessor,
            registry,
            metrics,
        }
    }

    /// Expected model input geometry
    pub fn input_shape(&self) -> InputShape {
        self.preprocessor.shape()
    }

    pub fn registry(&self) -> &ClassRegistry {
        &self.registry
    }

    /// Classify one uploaded image.
    ///
    /// Each stage fails with its own [`ClassifyError`] variant; nothing is retried.
    pub fn classify(
        &self,
        content_type: Option<&str>,
        bytes: &[u8],
    ) -> Result<Prediction, ClassifyError> {
        let tensor = self.prepare(content_type, bytes)?;
        self.infer(&tensor)
    }

    /// Validate the declared content type and turn the upload into a model input
    pub fn prepare(
        &self,
        content_type: Option<&str>,
        bytes: &[u8],
    ) -> Result<InputTensor, ClassifyError> {
        if !is_image_content_type(content_type) {
            return Err(ClassifyError::UnsupportedMediaType);
        }

        self.preprocessor.preprocess(bytes)
    }

    /// Run the model on a prepared tensor and label the winning class
    pub fn infer(&self, tensor: &InputTensor) -> Result<Prediction, ClassifyError> {
        let started = Instant::now();
        let scores = self
            .classifier
            .predict(tensor)
            .map_err(|e| ClassifyError::InferenceFailed(format!("{e:#}")))?;
        self.metrics.record_inference(started.elapsed());

        let (class_index, confidence) = top_class(&scores).ok_or_else(|| {
            ClassifyError::InferenceFailed("model returned no usable class scores".to_string())
        })?;

        let record = self.registry.lookup(class_index);

        debug!(
            class_index = class_index,
            confidence = confidence,
            title = %record.title,
            num_classes = scores.len(),
            "Classification complete"
        );

        Ok(Prediction::new(record, confidence))
    }
}
