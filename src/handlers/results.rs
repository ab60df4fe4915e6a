// src/handlers/results.rs

use std::sync::Arc;

use axum::{body::Bytes, extract::State, http::StatusCode, response::IntoResponse};

use crate::{error::AppError, models::result_entry::Submission, recorder::ResultRecorder};

/// Records one quiz attempt.
///
/// * Parses the raw body itself so malformed JSON gets a plain-text 400.
/// * Appends the entry to `results/<token>_results.json`.
/// * Returns 201 Created with body `OK`.
pub async fn save_result(
    State(recorder): State<Arc<ResultRecorder>>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let submission = Submission::from_body(&body)?;

    recorder.append(&submission).await?;

    Ok((StatusCode::CREATED, "OK"))
}

/// Fallback for unknown routes and unsupported methods.
pub async fn not_found() -> AppError {
    AppError::NotFound("Not Found".to_string())
}
