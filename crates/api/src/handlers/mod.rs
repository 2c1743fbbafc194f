//! Request handlers.
//!
//! Handlers authenticate through [`AuthUser`], check engagement ownership
//! with [`find_and_authorize`] and map errors via [`AppError`].

pub mod downloads;
pub mod generation;
pub mod jobs;

use vantage_core::error::CoreError;
use vantage_core::types::DbId;
use vantage_db::models::engagement::Engagement;
use vantage_pipeline::ReportStore;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;

/// Fetch an engagement by ID and verify the caller owns it (or is admin).
///
/// Returns `NotFound` if the engagement does not exist, `Forbidden` if the
/// caller is neither the owner nor an admin. `action` is used in the error
/// message (e.g. "generate", "download").
pub(crate) async fn find_and_authorize(
    store: &dyn ReportStore,
    engagement_id: DbId,
    auth: &AuthUser,
    action: &str,
) -> AppResult<Engagement> {
    let engagement = store
        .find_engagement(engagement_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::not_found("Engagement", engagement_id)))?;

    if !auth.can_access(engagement.owner_id) {
        return Err(AppError::Core(CoreError::Forbidden(format!(
            "Cannot {action} another user's report"
        ))));
    }

    Ok(engagement)
}
