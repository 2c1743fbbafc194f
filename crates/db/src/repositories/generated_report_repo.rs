//! Repository for the `generated_reports` table.

use sqlx::PgPool;
use vantage_core::types::{DbId, Timestamp};

use crate::models::generated_report::{CreateGeneratedReport, GeneratedReport};
use crate::models::status::EngagementStatus;

const COLUMNS: &str = "id, engagement_id, file_path, version, created_at, expires_at";

/// Provides version-management operations for generated reports.
pub struct GeneratedReportRepo;

impl GeneratedReportRepo {
    /// Get the next version number for an engagement (max existing + 1, or 1 if none).
    pub async fn next_version(pool: &PgPool, engagement_id: DbId) -> Result<i32, sqlx::Error> {
        sqlx::query_scalar::<_, i32>(
            "SELECT COALESCE(MAX(version), 0) + 1 \
             FROM generated_reports WHERE engagement_id = $1",
        )
        .bind(engagement_id)
        .fetch_one(pool)
        .await
    }

    /// Insert a report version.
    ///
    /// The `(engagement_id, version)` unique constraint rejects a reused
    /// version number.
    pub async fn create(
        pool: &PgPool,
        input: &CreateGeneratedReport,
    ) -> Result<GeneratedReport, sqlx::Error> {
        let query = format!(
            "INSERT INTO generated_reports (engagement_id, file_path, version, expires_at) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GeneratedReport>(&query)
            .bind(input.engagement_id)
            .bind(&input.file_path)
            .bind(input.version)
            .bind(input.expires_at)
            .fetch_one(pool)
            .await
    }

    /// Insert a report version and mark its engagement COMPLETE in one
    /// transaction.
    ///
    /// Returns `None`, with nothing written, if the engagement does not exist.
    pub async fn create_completing_engagement(
        pool: &PgPool,
        input: &CreateGeneratedReport,
    ) -> Result<Option<GeneratedReport>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE engagements \
             SET status_id = $2, error_message = NULL, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(input.engagement_id)
        .bind(EngagementStatus::Complete.id())
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            return Ok(None);
        }

        let query = format!(
            "INSERT INTO generated_reports (engagement_id, file_path, version, expires_at) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        let report = sqlx::query_as::<_, GeneratedReport>(&query)
            .bind(input.engagement_id)
            .bind(&input.file_path)
            .bind(input.version)
            .bind(input.expires_at)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(report))
    }

    /// The highest version for an engagement.
    pub async fn find_latest(
        pool: &PgPool,
        engagement_id: DbId,
    ) -> Result<Option<GeneratedReport>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM generated_reports \
             WHERE engagement_id = $1 \
             ORDER BY version DESC LIMIT 1"
        );
        sqlx::query_as::<_, GeneratedReport>(&query)
            .bind(engagement_id)
            .fetch_optional(pool)
            .await
    }

    /// List all versions for an engagement, newest first.
    pub async fn list_by_engagement(
        pool: &PgPool,
        engagement_id: DbId,
    ) -> Result<Vec<GeneratedReport>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM generated_reports \
             WHERE engagement_id = $1 \
             ORDER BY version DESC"
        );
        sqlx::query_as::<_, GeneratedReport>(&query)
            .bind(engagement_id)
            .fetch_all(pool)
            .await
    }

    /// Delete every version whose retention window ended before `now`.
    ///
    /// Returns the deleted rows so the caller can remove their files.
    pub async fn delete_expired(
        pool: &PgPool,
        now: Timestamp,
    ) -> Result<Vec<GeneratedReport>, sqlx::Error> {
        let query =
            format!("DELETE FROM generated_reports WHERE expires_at < $1 RETURNING {COLUMNS}");
        sqlx::query_as::<_, GeneratedReport>(&query)
            .bind(now)
            .fetch_all(pool)
            .await
    }
}
