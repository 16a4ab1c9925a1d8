//! Shared fixtures for unit tests

use crate::models::inference::Classifier;
use crate::preprocess::{InputShape, InputTensor};
use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use std::io::Cursor;
use std::sync::Mutex;

/// Deterministic RGB gradient
pub fn rgb_image(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            ((x + y) % 256) as u8,
        ])
    })
}

/// Deterministic single-channel gradient
pub fn gray_image(width: u32, height: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| image::Luma([((x * 7 + y * 13) % 256) as u8]))
}

/// Encode an image as PNG bytes
pub fn encode_png(image: &DynamicImage) -> Vec<u8> {
    encode_as(image, ImageFormat::Png)
}

/// Encode an image in the given container format
pub fn encode_as(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), format)
        .expect("image encoding");
    bytes
}

/// Well-formed 1x1 PNG whose IHDR claims `width` x `height` pixels
pub fn png_with_declared_size(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = encode_png(&DynamicImage::ImageRgb8(rgb_image(1, 1)));

    // Signature (8), IHDR length (4), then "IHDR" at 12..16 and its data at 16..29
    bytes[16..20].copy_from_slice(&width.to_be_bytes());
    bytes[20..24].copy_from_slice(&height.to_be_bytes());
    let crc = crc32(&bytes[12..29]);
    bytes[29..33].copy_from_slice(&crc.to_be_bytes());
    bytes
}

fn crc32(data: &[u8]) -> u32 {
    let mut crc = 0xFFFF_FFFFu32;
    for &byte in data {
        crc ^= byte as u32;
        for _ in 0..8 {
            let mask = (crc & 1).wrapping_neg();
            crc = (crc >> 1) ^ (0xEDB8_8320 & mask);
        }
    }
    !crc
}

/// Classifier double returning fixed scores and recording the shapes it was fed
pub struct StubClassifier {
    shape: InputShape,
    outcome: Result<Vec<f32>, String>,
    seen: Mutex<Vec<[usize; 4]>>,
}

impl StubClassifier {
    pub fn with_scores(shape: InputShape, scores: Vec<f32>) -> Self {
        Self {
            shape,
            outcome: Ok(scores),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// `num_classes` scores sharing `1 - peak` evenly, with `peak` at `index`
    pub fn peaked(shape: InputShape, num_classes: usize, index: usize, peak: f32) -> Self {
        let rest = (1.0 - peak) / (num_classes - 1) as f32;
        let mut scores = vec![rest; num_classes];
        scores[index] = peak;
        Self::with_scores(shape, scores)
    }

    pub fn failing(shape: InputShape, message: &str) -> Self {
        Self {
            shape,
            outcome: Err(message.to_string()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn seen_shapes(&self) -> Vec<[usize; 4]> {
        self.seen.lock().unwrap().clone()
    }
}

impl Classifier for StubClassifier {
    fn input_shape(&self) -> InputShape {
        self.shape
    }

    fn predict(&self, input: &InputTensor) -> anyhow::Result<Vec<f32>> {
        self.seen.lock().unwrap().push(input.shape());
        anyhow::ensure!(
            input.shape() == self.shape.batched(),
            "input shape {:?} does not match model shape {:?}",
            input.shape(),
            self.shape.batched()
        );
        self.outcome.clone().map_err(|e| anyhow::anyhow!(e))
    }
}
