//! Request handlers for `/health` and `/predict`

use crate::api::error::{ApiError, FILE_FIELD};
use crate::api::SharedState;
use crate::error::ClassifyError;
use crate::types::Prediction;
use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    Json,
};
use serde::Serialize;
use std::time::Instant;
use tracing::{error, info, info_span, warn, Span};
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// GET /health - liveness probe
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Image upload pulled out of the multipart form
struct Upload {
    file_name: Option<String>,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

async fn read_upload(multipart: &mut Multipart) -> Result<Upload, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field.file_name().map(str::to_owned);
        let content_type = field.content_type().map(str::to_owned);
        let bytes = field.bytes().await?.to_vec();

        return Ok(Upload {
            file_name,
            content_type,
            bytes,
        });
    }

    Err(ApiError::MissingFile)
}

/// POST /predict - classify one uploaded image
pub async fn predict(
    State(state): State<SharedState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Prediction>, ApiError> {
    let request_id = Uuid::new_v4();
    let started = Instant::now();

    let result = classify_upload(&state, request_id, multipart).await;
    let elapsed = started.elapsed();

    match &result {
        Ok(prediction) => {
            state
                .metrics
                .record_prediction(elapsed, prediction.class_index, prediction.confidence);
            info!(
                request_id = %request_id,
                class_index = prediction.class_index,
                confidence = prediction.confidence,
                elapsed_us = elapsed.as_micros() as u64,
                "Prediction served"
            );
        }
        Err(e) => {
            state.metrics.record_failure(e.kind(), elapsed);
            if e.status().is_server_error() {
                error!(request_id = %request_id, error = %e, "Prediction failed");
            } else {
                warn!(request_id = %request_id, error = %e, "Prediction rejected");
            }
        }
    }

    result.map(Json)
}

async fn classify_upload(
    state: &SharedState,
    request_id: Uuid,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Prediction, ApiError> {
    let mut multipart = multipart?;
    let upload = read_upload(&mut multipart).await?;

    let span = info_span!(
        "classify",
        request_id = %request_id,
        file_name = upload.file_name.as_deref().unwrap_or(""),
        bytes = upload.bytes.len()
    );

    // Decode, resize and inference are CPU-bound
    let engine = state.engine.clone();
    let tensor = run_blocking(span.clone(), ClassifyError::PreprocessingFailed, move || {
        engine.prepare(upload.content_type.as_deref(), &upload.bytes)
    })
    .await?;

    let engine = state.engine.clone();
    let prediction = run_blocking(span, ClassifyError::InferenceFailed, move || {
        engine.infer(&tensor)
    })
    .await?;

    Ok(prediction)
}

/// Run one classification stage on the blocking pool.
///
/// A task that panics or is cancelled is reported through `on_abort`, so the
/// failure is attributed to the stage it happened in.
async fn run_blocking<T, F>(
    span: Span,
    on_abort: fn(String) -> ClassifyError,
    stage: F,
) -> Result<T, ClassifyError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ClassifyError> + Send + 'static,
{
    let outcome = tokio::task::spawn_blocking(move || span.in_scope(stage))
        .await
        .map_err(|e| on_abort(format!("worker task failed: {e}")))?;

    outcome
}
