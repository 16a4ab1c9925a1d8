//! ONNX model loader

use crate::config::ModelConfig;
use crate::error::StartupError;
use crate::models::inference::Classifier;
use crate::preprocess::{InputShape, InputTensor};
use anyhow::{Context, Result};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::{Tensor, ValueType};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{info, warn};

/// Channel count assumed when the model leaves it dynamic
const DEFAULT_CHANNELS: usize = 3;

/// Loaded ONNX classifier with its resolved input geometry
pub struct OnnxClassifier {
    /// Model name (file stem), used in logs
    pub name: String,
    /// Artifact location
    pub path: PathBuf,
    /// ONNX Runtime session; `run` needs exclusive access
    session: Mutex<Session>,
    /// Input name for the model
    input_name: String,
    /// Output name for class probabilities
    output_name: String,
    /// Expected NHWC input size
    input_shape: InputShape,
}

impl std::fmt::Debug for OnnxClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxClassifier")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("input_name", &self.input_name)
            .field("output_name", &self.output_name)
            .field("input_shape", &self.input_shape)
            .finish()
    }
}

impl Classifier for OnnxClassifier {
    fn input_shape(&self) -> InputShape {
        self.input_shape
    }

    fn predict(&self, input: &InputTensor) -> Result<Vec<f32>> {
        let (shape, data) = input.clone().into_parts();
        let dims: Vec<i64> = shape.iter().map(|&d| d as i64).collect();
        let input_tensor =
            Tensor::from_array((dims, data)).context("Failed to create input tensor")?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?;

        let outputs = session.run(ort::inputs![self.input_name.as_str() => input_tensor])?;

        let output = outputs
            .get(self.output_name.as_str())
            .with_context(|| format!("Model produced no '{}' output", self.output_name))?;
        let (out_shape, scores) = output
            .try_extract_tensor::<f32>()
            .context("Output is not an f32 tensor")?;

        let out_dims: Vec<i64> = out_shape.iter().copied().collect();
        class_scores(&out_dims, scores)
    }
}

/// Accept a `(1, num_classes)` or `(num_classes,)` output and return its scores
pub fn class_scores(dims: &[i64], scores: &[f32]) -> Result<Vec<f32>> {
    match dims {
        [1, n] | [n] if usize::try_from(*n).ok() == Some(scores.len()) => Ok(scores.to_vec()),
        other => anyhow::bail!("unexpected output shape {:?}, expected (1, num_classes)", other),
    }
}

/// Loader for the classifier artifact
pub struct ModelLoader {
    /// Number of threads for ONNX inference
    intra_threads: usize,
    /// Fallback height for models with a dynamic height
    height_override: Option<usize>,
    /// Fallback width for models with a dynamic width
    width_override: Option<usize>,
}

impl ModelLoader {
    /// Create a loader with default settings (1 thread, no overrides)
    pub fn new() -> Self {
        Self::with_threads(1)
    }

    /// Create a loader with the specified number of intra-op threads
    pub fn with_threads(intra_threads: usize) -> Self {
        Self {
            intra_threads: intra_threads.max(1),
            height_override: None,
            width_override: None,
        }
    }

    /// Create a loader from the model section of the configuration
    pub fn from_config(config: &ModelConfig) -> Self {
        Self {
            height_override: config.input_height,
            width_override: config.input_width,
            ..Self::with_threads(config.intra_threads)
        }
    }

    /// Load the classifier and resolve its input shape.
    ///
    /// Any failure here is fatal for the service.
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<OnnxClassifier, StartupError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(StartupError::ModelNotFound(path.to_path_buf()));
        }

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "model".to_string());

        info!(model = %name, path = %path.display(), threads = self.intra_threads, "Loading ONNX model");

        let session = self.build_session(path).map_err(|e| StartupError::ModelLoad {
            path: path.to_path_buf(),
            reason: format!("{e:#}"),
        })?;

        let incompatible = |reason: String| StartupError::IncompatibleModel {
            path: path.to_path_buf(),
            reason,
        };

        let input = session
            .inputs
            .first()
            .ok_or_else(|| incompatible("model declares no inputs".to_string()))?;
        let dims: Vec<i64> = match &input.input_type {
            ValueType::Tensor { shape, .. } => shape.iter().copied().collect(),
            other => return Err(incompatible(format!("input is not a tensor: {:?}", other))),
        };
        let input_name = input.name.clone();

        let input_shape = resolve_input_shape(&dims, self.height_override, self.width_override)
            .map_err(incompatible)?;

        let output_name = session
            .outputs
            .iter()
            .find(|o| o.name.contains("prob"))
            .or_else(|| session.outputs.first())
            .map(|o| o.name.clone())
            .ok_or_else(|| incompatible("model declares no outputs".to_string()))?;

        info!(
            model = %name,
            input = %input_name,
            output = %output_name,
            input_shape = %input_shape,
            "Model loaded successfully"
        );

        Ok(OnnxClassifier {
            name,
            path: path.to_path_buf(),
            session: Mutex::new(session),
            input_name,
            output_name,
            input_shape,
        })
    }

    fn build_session(&self, path: &Path) -> Result<Session> {
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(self.intra_threads)?
            .commit_from_file(path)
            .context(format!("Failed to load model from {:?}", path))?;
        Ok(session)
    }
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve the NHWC input dimensions a model declares.
///
/// Non-positive entries are dynamic. Height and width fall back to the
/// configured overrides; channels fall back to RGB.
pub fn resolve_input_shape(
    dims: &[i64],
    height_override: Option<usize>,
    width_override: Option<usize>,
) -> std::result::Result<InputShape, String> {
    let [batch, height, width, channels] = dims else {
        return Err(format!(
            "expected a 4-dimensional (N, H, W, C) input, got {:?}",
            dims
        ));
    };

    if *batch > 1 {
        return Err(format!("fixed batch size {} is not supported", batch));
    }

    let height = resolve_dim("height", *height, height_override)?;
    let width = resolve_dim("width", *width, width_override)?;

    let channels = if *channels > 0 {
        *channels as usize
    } else {
        DEFAULT_CHANNELS
    };
    if channels != 1 && channels != 3 {
        return Err(format!(
            "unsupported channel count {}, expected 1 or 3",
            channels
        ));
    }

    Ok(InputShape::new(height, width, channels))
}

fn resolve_dim(
    label: &str,
    declared: i64,
    fallback: Option<usize>,
) -> std::result::Result<usize, String> {
    match (declared, fallback) {
        (d, Some(f)) if d > 0 && d as usize != f => {
            warn!(dimension = label, declared = d, configured = f, "Ignoring override for fixed model dimension");
            Ok(d as usize)
        }
        (d, _) if d > 0 => Ok(d as usize),
        (_, Some(f)) if f > 0 => Ok(f),
        _ => Err(format!(
            "model input {} is dynamic and no override is configured",
            label
        )),
    }
}
