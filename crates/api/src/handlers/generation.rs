//! Handler for launching report generation.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use vantage_core::types::{DbId, JobId};
use vantage_db::models::status::EngagementStatus;

use crate::error::AppResult;
use crate::handlers::find_and_authorize;
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub engagement_id: DbId,
    pub job_id: JobId,
    pub status: &'static str,
}

/// POST /api/v1/engagements/{id}/generate
///
/// Start a report run and return its job id immediately. Progress is
/// polled through `GET /api/v1/jobs/{job_id}`.
pub async fn generate_report(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(engagement_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    find_and_authorize(state.store.as_ref(), engagement_id, &auth, "generate").await?;

    let launched = state.launcher.launch(engagement_id).await?;

    tracing::info!(
        engagement_id,
        job_id = %launched.job_id,
        user_id = auth.user_id,
        "Report generation requested",
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(GenerateResponse {
            engagement_id: launched.engagement_id,
            job_id: launched.job_id,
            status: EngagementStatus::Processing.label(),
        }),
    ))
}
