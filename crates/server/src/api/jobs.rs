//! Job submission and status polling handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use glbforge_core::{ConversionJob, JobKind, JobStatusView, QueueError, QueuedJob, StorageError};

use crate::metrics::{JOBS_REJECTED_TOTAL, JOBS_SUBMITTED_TOTAL};
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for submitting a job
#[derive(Debug, Deserialize)]
pub struct SubmitJobBody {
    /// Job kind, `convert-skp-to-glb` or `store-glb`
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub payload: ConversionJob,
}

/// Response for an accepted submission
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitJobResponse {
    pub job_id: String,
    pub status: String,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: impl Into<String>) -> (StatusCode, Json<ErrorResponse>) {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
}

fn queue_error_response(e: QueueError) -> (StatusCode, Json<ErrorResponse>) {
    match e {
        QueueError::InvalidPayload(msg) => error_response(StatusCode::BAD_REQUEST, msg),
        QueueError::NotFound(id) => {
            error_response(StatusCode::NOT_FOUND, format!("Conversion not found: {}", id))
        }
        other => {
            error!(error = %other, "Queue operation failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, other.to_string())
        }
    }
}

fn input_error_response(e: StorageError) -> (StatusCode, Json<ErrorResponse>) {
    match e {
        StorageError::InputOutsideUploadRoot { .. } => {
            error_response(StatusCode::BAD_REQUEST, e.to_string())
        }
        other => {
            error!(error = %other, "Failed to resolve job input");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, other.to_string())
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Submit a job.
///
/// POST /api/v1/jobs
///
/// The job id is the `conversionId`; resubmitting an existing id returns the
/// existing job unchanged. `inputPath` must resolve to a file under
/// `storage.upload_root`.
pub async fn submit_job(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SubmitJobBody>,
) -> Result<(StatusCode, Json<SubmitJobResponse>), impl IntoResponse> {
    let kind: JobKind = match body.kind.parse() {
        Ok(kind) => kind,
        Err(e) => {
            JOBS_REJECTED_TOTAL.with_label_values(&["unknown_type"]).inc();
            return Err(queue_error_response(e));
        }
    };

    if let Err(e) = body.payload.validate() {
        JOBS_REJECTED_TOTAL.with_label_values(&["invalid_payload"]).inc();
        return Err(queue_error_response(e));
    }

    if let Err(e) = state.storage().confine_input(&body.payload.input_path).await {
        JOBS_REJECTED_TOTAL.with_label_values(&["input_outside_upload_root"]).inc();
        return Err(input_error_response(e));
    }

    let job = state
        .queue()
        .enqueue(kind, body.payload, None)
        .await
        .map_err(queue_error_response)?;

    JOBS_SUBMITTED_TOTAL.with_label_values(&[kind.as_str()]).inc();
    info!(
        job_id = %job.id,
        file_id = %job.payload.file_id,
        kind = %kind,
        "Job submitted"
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitJobResponse {
            job_id: job.id,
            status: job.state.to_string(),
        }),
    ))
}

/// Poll the status of a conversion.
///
/// GET /api/v1/conversions/{id}
pub async fn get_conversion(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JobStatusView>, impl IntoResponse> {
    match state.queue().status(&id).await {
        Ok(Some(view)) => Ok(Json(view)),
        Ok(None) => Err(queue_error_response(QueueError::NotFound(id))),
        Err(e) => Err(queue_error_response(e)),
    }
}

/// Full job record, including attempts and the stored result.
///
/// GET /api/v1/jobs/{id}
pub async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<QueuedJob>, impl IntoResponse> {
    match state.queue().get_job(&id).await {
        Ok(Some(job)) => Ok(Json(job)),
        Ok(None) => Err(queue_error_response(QueueError::NotFound(id))),
        Err(e) => Err(queue_error_response(e)),
    }
}
