pub mod engagements;
pub mod health;
pub mod jobs;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /engagements/{id}/generate                       POST  launch a report run
/// /engagements/{id}/download                       GET   latest report version
/// /jobs/{id}                                       GET   job progress
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/engagements", engagements::router())
        .nest("/jobs", jobs::router())
}
