//! Route definitions for report generation on the `/engagements` resource.
//!
//! All endpoints require authentication.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{downloads, generation};
use crate::state::AppState;

/// Routes mounted at `/engagements`.
///
/// ```text
/// POST   /{id}/generate   -> generate_report
/// GET    /{id}/download   -> download_report
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}/generate", post(generation::generate_report))
        .route("/{id}/download", get(downloads::download_report))
}
