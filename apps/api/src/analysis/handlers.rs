//! Axum route handlers for the Analysis API.

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;

use crate::analysis::pipeline::validate_input;
use crate::errors::AppError;
use crate::models::analysis::{AnalysisKind, AnalysisKindInfo, AnalysisRequest, AnalysisResult};
use crate::state::AppState;

const PDF_CONTENT_TYPE: &str = "application/pdf";
const PDF_MAGIC: &[u8] = b"%PDF";
pub const DOWNLOAD_FILE_NAME: &str = "resume_analysis.txt";

// ────────────────────────────────────────────────────────────────────────────
// Form parsing
// ────────────────────────────────────────────────────────────────────────────

/// Reads the `resume`, `job_description` and `kind` parts. Unknown parts are
/// ignored; `kind` defaults to the full analysis.
async fn read_analysis_form(mut multipart: Multipart) -> Result<AnalysisRequest, AppError> {
    let mut resume: Option<(Bytes, Option<String>)> = None;
    let mut job_description = String::new();
    let mut kind = AnalysisKind::FullAnalysis;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "resume" => {
                let content_type = field.content_type().map(str::to_string);
                let data = field.bytes().await.map_err(multipart_error)?;
                resume = Some((data, content_type));
            }
            "job_description" => {
                job_description = field.text().await.map_err(multipart_error)?;
            }
            "kind" => {
                let raw = field.text().await.map_err(multipart_error)?;
                kind = raw.parse().map_err(AppError::Validation)?;
            }
            _ => {}
        }
    }

    let (resume, content_type) = resume.unwrap_or_default();
    validate_input(&resume, &job_description)?;

    let looks_like_pdf = content_type.as_deref() == Some(PDF_CONTENT_TYPE)
        || resume.starts_with(PDF_MAGIC);
    if !looks_like_pdf {
        return Err(AppError::Validation(
            "resume must be a PDF document".to_string(),
        ));
    }

    Ok(AnalysisRequest {
        resume,
        job_description,
        kind,
    })
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(err.body_text())
    } else {
        AppError::Validation(format!("invalid multipart form: {}", err.body_text()))
    }
}

async fn run_analysis(
    state: &AppState,
    multipart: Multipart,
) -> Result<AnalysisResult, AppError> {
    let request = read_analysis_form(multipart).await?;
    let result = state
        .pipeline
        .analyze(&request.resume, &request.job_description, request.kind)
        .await?;
    Ok(result)
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/analyses/kinds
///
/// Lists the analysis kinds with the labels the UI shows for them.
pub async fn handle_list_kinds() -> Json<Vec<AnalysisKindInfo>> {
    Json(
        AnalysisKind::ALL
            .into_iter()
            .map(|kind| AnalysisKindInfo {
                kind,
                label: kind.label(),
            })
            .collect(),
    )
}

/// POST /api/v1/analyses
///
/// Multipart: `resume` (PDF), `job_description` (text), `kind` (optional).
/// Returns the model's analysis as JSON.
pub async fn handle_analyze(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<AnalysisResult>, AppError> {
    let result = run_analysis(&state, multipart).await?;
    Ok(Json(result))
}

/// POST /api/v1/analyses/download
///
/// Same input as `handle_analyze`; returns the analysis as a plain-text attachment.
pub async fn handle_download(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let result = run_analysis(&state, multipart).await?;
    let disposition = format!("attachment; filename=\"{DOWNLOAD_FILE_NAME}\"");

    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        result.text,
    )
        .into_response())
}
