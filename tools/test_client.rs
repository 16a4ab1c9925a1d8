//! Test Image Client
//!
//! Generates synthetic uploads and posts them to a running service for smoke testing.

use image::{DynamicImage, ImageFormat, RgbImage};
use rand::Rng;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::io::Cursor;
use std::time::Duration;
use tracing::{info, warn};

/// Kinds of upload the generator produces
#[derive(Debug, Clone, Copy)]
enum UploadKind {
    Valid,
    Corrupt,
    NotAnImage,
}

/// A generated multipart upload
struct Upload {
    kind: UploadKind,
    file_name: String,
    content_type: &'static str,
    bytes: Vec<u8>,
}

/// Prediction as returned by `/predict`
#[derive(Debug, Deserialize)]
struct PredictionResponse {
    class_index: usize,
    title: String,
    confidence: f64,
}

/// Upload generator for testing
struct UploadGenerator {
    rng: rand::rngs::ThreadRng,
    upload_counter: u64,
}

impl UploadGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
            upload_counter: 0,
        }
    }

    /// Random-noise RGB PNG of random size
    fn generate_valid(&mut self) -> anyhow::Result<Upload> {
        self.upload_counter += 1;

        let width = self.rng.gen_range(16..256);
        let height = self.rng.gen_range(16..256);
        let mut image = RgbImage::new(width, height);
        for pixel in image.pixels_mut() {
            *pixel = image::Rgb([self.rng.gen(), self.rng.gen(), self.rng.gen()]);
        }

        let mut bytes = Vec::new();
        DynamicImage::ImageRgb8(image).write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;

        Ok(Upload {
            kind: UploadKind::Valid,
            file_name: format!("sign_{:06}.png", self.upload_counter),
            content_type: "image/png",
            bytes,
        })
    }

    /// Valid PNG cut short, declared as an image
    fn generate_corrupt(&mut self) -> anyhow::Result<Upload> {
        let mut upload = self.generate_valid()?;
        let keep = self.rng.gen_range(8..upload.bytes.len().min(64));
        upload.bytes.truncate(keep);
        upload.kind = UploadKind::Corrupt;
        Ok(upload)
    }

    /// Plain text upload
    fn generate_text(&mut self) -> Upload {
        self.upload_counter += 1;
        Upload {
            kind: UploadKind::NotAnImage,
            file_name: format!("notes_{:06}.txt", self.upload_counter),
            content_type: "text/plain",
            bytes: b"this is not a traffic sign".to_vec(),
        }
    }

    fn generate(&mut self) -> anyhow::Result<Upload> {
        match self.rng.gen_range(0..10) {
            0 => self.generate_corrupt(),
            1 => Ok(self.generate_text()),
            _ => self.generate_valid(),
        }
    }
}

async fn post_upload(
    client: &reqwest::Client,
    base_url: &str,
    upload: Upload,
) -> anyhow::Result<()> {
    let kind = upload.kind;
    let part = Part::bytes(upload.bytes)
        .file_name(upload.file_name.clone())
        .mime_str(upload.content_type)?;
    let form = Form::new().part("file", part);

    let response = client
        .post(format!("{}/predict", base_url))
        .multipart(form)
        .send()
        .await?;
    let status = response.status();

    if status.is_success() {
        let prediction: PredictionResponse = response.json().await?;
        info!(
            file = %upload.file_name,
            class_index = prediction.class_index,
            title = %prediction.title,
            confidence = prediction.confidence,
            "Prediction"
        );
    } else {
        let body = response.text().await.unwrap_or_default();
        info!(
            file = %upload.file_name,
            kind = ?kind,
            status = status.as_u16(),
            body = %body,
            "Rejected"
        );
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("test_client=info".parse()?),
        )
        .init();

    info!("Starting Test Image Client");

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let base_url = args
        .get(1)
        .map(|s| s.trim_end_matches('/').to_string())
        .unwrap_or_else(|| "http://localhost:8000".to_string());
    let count: u64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(10);
    let delay_ms: u64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(100);

    info!(
        base_url = %base_url,
        count = count,
        delay_ms = delay_ms,
        "Configuration loaded"
    );

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()?;

    match client.get(format!("{}/health", base_url)).send().await {
        Ok(response) if response.status().is_success() => info!("Service is healthy"),
        Ok(response) => {
            warn!(status = response.status().as_u16(), "Health check failed. Running in dry-run mode.");
            return run_dry_mode(count, delay_ms).await;
        }
        Err(e) => {
            warn!(error = %e, "Service unreachable. Running in dry-run mode.");
            return run_dry_mode(count, delay_ms).await;
        }
    }

    let mut generator = UploadGenerator::new();

    // One of each failure mode up front, then a random mix
    post_upload(&client, &base_url, generator.generate_text()).await?;
    post_upload(&client, &base_url, generator.generate_corrupt()?).await?;

    for i in 0..count {
        let upload = generator.generate()?;
        if let Err(e) = post_upload(&client, &base_url, upload).await {
            warn!(error = %e, "Request failed");
        }

        if (i + 1) % 10 == 0 {
            info!("Sent {}/{} uploads", i + 1, count);
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    info!("Completed! Sent {} uploads", count + 2);

    Ok(())
}

async fn run_dry_mode(count: u64, delay_ms: u64) -> anyhow::Result<()> {
    info!("Running in dry-run mode (no service connection)");

    let mut generator = UploadGenerator::new();

    for i in 0..count {
        let upload = generator.generate()?;

        if (i + 1) % 10 == 0 || i == 0 {
            info!(
                kind = ?upload.kind,
                file = %upload.file_name,
                content_type = upload.content_type,
                bytes = upload.bytes.len(),
                "Sample upload {}",
                i + 1
            );
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    Ok(())
}
