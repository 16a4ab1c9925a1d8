//! Image preprocessing for classifier inference.
//!
//! Turns uploaded image bytes into the NHWC `f32` tensor the model was
//! trained on: RGB, bilinear-resized to the model's input size, scaled to
//! `[0, 1]`, with a leading batch axis of 1.

use crate::error::ClassifyError;
use image::imageops::{self, FilterType};
use image::ImageReader;
use std::fmt;
use std::io::Cursor;

const RGB_CHANNELS: usize = 3;
const GRAY_CHANNELS: usize = 1;

/// Spatial input size and channel count expected by the model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputShape {
    pub height: usize,
    pub width: usize,
    pub channels: usize,
}

impl InputShape {
    pub fn new(height: usize, width: usize, channels: usize) -> Self {
        Self {
            height,
            width,
            channels,
        }
    }

    /// Channel count to produce; unknown (zero) falls back to RGB
    pub fn expected_channels(&self) -> usize {
        if self.channels > 0 {
            self.channels
        } else {
            RGB_CHANNELS
        }
    }

    /// Full batched tensor shape `[1, H, W, C]`
    pub fn batched(&self) -> [usize; 4] {
        [1, self.height, self.width, self.expected_channels()]
    }
}

impl fmt::Display for InputShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(H={}, W={}, C={})", self.height, self.width, self.channels)
    }
}

/// Dense NHWC tensor handed to the model
#[derive(Debug, Clone, PartialEq)]
pub struct InputTensor {
    shape: [usize; 4],
    data: Vec<f32>,
}

impl InputTensor {
    pub fn new(shape: [usize; 4], data: Vec<f32>) -> Result<Self, ClassifyError> {
        let expected: usize = shape.iter().product();
        if data.len() != expected {
            return Err(ClassifyError::PreprocessingFailed(format!(
                "tensor data length {} does not match shape {:?}",
                data.len(),
                shape
            )));
        }
        Ok(Self { shape, data })
    }

    pub fn shape(&self) -> [usize; 4] {
        self.shape
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Value at `(h, w, c)` of the single batch entry
    pub fn get(&self, h: usize, w: usize, c: usize) -> f32 {
        let [_, _, width, channels] = self.shape;
        self.data[(h * width + w) * channels + c]
    }

    pub fn into_parts(self) -> ([usize; 4], Vec<f32>) {
        (self.shape, self.data)
    }
}

/// Converts raw upload bytes into model input tensors
#[derive(Debug, Clone)]
pub struct ImagePreprocessor {
    shape: InputShape,
}

impl ImagePreprocessor {
    /// Create a preprocessor targeting the given model input shape
    pub fn new(shape: InputShape) -> Self {
        Self { shape }
    }

    pub fn shape(&self) -> InputShape {
        self.shape
    }

    /// Decode, resize and normalize an image.
    ///
    /// Decoder failures become [`ClassifyError::InvalidImage`]; anything that
    /// goes wrong after a successful decode is
    /// [`ClassifyError::PreprocessingFailed`].
    pub fn preprocess(&self, bytes: &[u8]) -> Result<InputTensor, ClassifyError> {
        let decoded = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| ClassifyError::InvalidImage(e.to_string()))?
            .decode()?;

        // Palette, grayscale and alpha sources all go through RGB first
        let rgb = decoded.to_rgb8();

        let (width, height) = (to_u32(self.shape.width)?, to_u32(self.shape.height)?);
        let resized = imageops::resize(&rgb, width, height, FilterType::Triangle);

        let expected_channels = self.shape.expected_channels();
        let rgb_values: Vec<f32> = resized.as_raw().iter().map(|&v| v as f32).collect();
        let mut values = adapt_channels(rgb_values, RGB_CHANNELS, expected_channels)?;

        for v in values.iter_mut() {
            *v /= 255.0;
        }

        InputTensor::new(self.shape.batched(), values)
    }
}

fn to_u32(dim: usize) -> Result<u32, ClassifyError> {
    match u32::try_from(dim) {
        Ok(d) if d > 0 => Ok(d),
        _ => Err(ClassifyError::PreprocessingFailed(format!(
            "invalid target dimension {dim}"
        ))),
    }
}

/// Convert interleaved pixel values between 1 and 3 channels.
///
/// 3 → 1 takes the per-pixel channel mean; 1 → 3 replicates the single channel.
fn adapt_channels(values: Vec<f32>, have: usize, want: usize) -> Result<Vec<f32>, ClassifyError> {
    match (have, want) {
        (h, w) if h == w => Ok(values),
        (RGB_CHANNELS, GRAY_CHANNELS) => Ok(values
            .chunks_exact(RGB_CHANNELS)
            .map(|px| px.iter().sum::<f32>() / RGB_CHANNELS as f32)
            .collect()),
        (GRAY_CHANNELS, RGB_CHANNELS) => Ok(values
            .iter()
            .flat_map(|&v| [v; RGB_CHANNELS])
            .collect()),
        (h, w) => Err(ClassifyError::PreprocessingFailed(format!(
            "cannot convert {h}-channel image to {w} channels"
        ))),
    }
}
