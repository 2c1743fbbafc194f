//! Handler for polling job progress.

use axum::extract::{Path, State};
use axum::Json;
use vantage_core::error::CoreError;
use vantage_core::generation::JobStatusView;
use vantage_core::types::JobId;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// GET /api/v1/jobs/{id}
///
/// Current stage, progress, message, warnings and error of a job. Unknown
/// and evicted jobs are 404. Only the engagement owner or an admin may poll.
pub async fn get_job_status(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(job_id): Path<JobId>,
) -> AppResult<Json<JobStatusView>> {
    let view = state
        .status
        .get_status(job_id)
        .await
        .ok_or_else(|| AppError::Core(CoreError::not_found("Job", job_id)))?;

    let owner_id = state
        .store
        .find_engagement(view.engagement_id)
        .await?
        .map(|e| e.owner_id);
    if !owner_id.is_some_and(|id| auth.can_access(id)) {
        return Err(AppError::Core(CoreError::Forbidden(
            "Cannot view another user's job".into(),
        )));
    }

    Ok(Json(view))
}
