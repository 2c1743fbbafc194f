//! Generated report version models.

use serde::Serialize;
use sqlx::FromRow;
use vantage_core::types::{DbId, Timestamp};

/// A row from the `generated_reports` table. Immutable once inserted.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct GeneratedReport {
    pub id: DbId,
    pub engagement_id: DbId,
    pub file_path: String,
    pub version: i32,
    pub created_at: Timestamp,
    pub expires_at: Timestamp,
}

/// DTO for recording a newly saved report version.
#[derive(Debug, Clone)]
pub struct CreateGeneratedReport {
    pub engagement_id: DbId,
    pub file_path: String,
    pub version: i32,
    pub expires_at: Timestamp,
}
