//! Handler for downloading the latest generated report.

use std::path::Path as FsPath;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::Response;
use tokio_util::io::ReaderStream;
use vantage_core::error::CoreError;
use vantage_core::naming::report_download_filename;
use vantage_core::types::DbId;
use vantage_db::models::status::EngagementStatus;

use crate::error::{AppError, AppResult};
use crate::handlers::find_and_authorize;
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// GET /api/v1/engagements/{id}/download
///
/// Streams the highest version of the engagement's report. Only available
/// once the engagement is COMPLETE.
pub async fn download_report(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(engagement_id): Path<DbId>,
) -> AppResult<Response> {
    let engagement =
        find_and_authorize(state.store.as_ref(), engagement_id, &auth, "download").await?;

    if engagement.status() != Some(EngagementStatus::Complete) {
        let status = engagement
            .status()
            .map_or("UNKNOWN", EngagementStatus::label);
        return Err(AppError::Core(CoreError::Conflict(format!(
            "Report is not ready for download; engagement is {status}"
        ))));
    }

    let report = state
        .store
        .find_latest_report(engagement_id)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::not_found("Report for engagement", engagement_id))
        })?;

    let path = FsPath::new(&report.file_path);
    let stored = state
        .pipeline()
        .collaborators
        .storage
        .open_file(path)
        .await
        .map_err(|e| AppError::InternalError(e.to_string()))?;
    let Some(stored) = stored else {
        tracing::warn!(
            engagement_id,
            version = report.version,
            path = %report.file_path,
            "Report file missing",
        );
        return Err(AppError::Core(CoreError::not_found(
            "Report file for engagement",
            engagement_id,
        )));
    };

    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
    let filename = report_download_filename(
        &engagement.company_name,
        &engagement.report_type,
        engagement.valuation_date,
        report.version,
        extension,
    );

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type_for(extension))
        .header(header::CONTENT_LENGTH, stored.len.to_string())
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        )
        .body(Body::from_stream(ReaderStream::new(stored.reader)))
        .map_err(|e| AppError::InternalError(e.to_string()))
}

fn content_type_for(extension: &str) -> &'static str {
    match extension.to_ascii_lowercase().as_str() {
        "md" => "text/markdown; charset=utf-8",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}
