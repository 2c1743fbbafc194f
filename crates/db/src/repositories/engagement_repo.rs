//! Repository for the `engagements` table.
//!
//! Status writes are single-row updates. The only guarded write is
//! [`EngagementRepo::begin_processing`], which flips to PROCESSING in one
//! conditional statement so two concurrent launches cannot both pass.

use sqlx::PgPool;
use vantage_core::types::DbId;

use crate::models::engagement::{CreateEngagement, Engagement};
use crate::models::status::EngagementStatus;

/// Column list for `engagements` queries.
const COLUMNS: &str = "\
    id, owner_id, report_type, company_name, valuation_date, \
    model_file_path, selected_approaches, qualitative_context, \
    status_id, error_message, created_at, updated_at";

/// Provides persistence operations for engagements.
pub struct EngagementRepo;

impl EngagementRepo {
    /// Insert a new DRAFT engagement.
    pub async fn create(
        pool: &PgPool,
        input: &CreateEngagement,
    ) -> Result<Engagement, sqlx::Error> {
        let query = format!(
            "INSERT INTO engagements \
                 (owner_id, report_type, company_name, valuation_date, model_file_path, \
                  selected_approaches, qualitative_context, status_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Engagement>(&query)
            .bind(input.owner_id)
            .bind(&input.report_type)
            .bind(&input.company_name)
            .bind(input.valuation_date)
            .bind(&input.model_file_path)
            .bind(&input.selected_approaches)
            .bind(&input.qualitative_context)
            .bind(EngagementStatus::Draft.id())
            .fetch_one(pool)
            .await
    }

    /// Find an engagement by its ID.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Engagement>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM engagements WHERE id = $1");
        sqlx::query_as::<_, Engagement>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Overwrite `{status, error_message}` unconditionally.
    ///
    /// Returns `false` if the engagement does not exist.
    pub async fn set_status(
        pool: &PgPool,
        id: DbId,
        status: EngagementStatus,
        error_message: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE engagements \
             SET status_id = $2, error_message = $3, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(status.id())
        .bind(error_message)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Atomically move a DRAFT or ERROR engagement to PROCESSING and clear
    /// its error message.
    ///
    /// Returns `true` only for the caller whose update actually flipped the
    /// row; a concurrent second caller sees `false`.
    pub async fn begin_processing(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE engagements \
             SET status_id = $2, error_message = NULL, updated_at = NOW() \
             WHERE id = $1 AND status_id IN ($3, $4)",
        )
        .bind(id)
        .bind(EngagementStatus::Processing.id())
        .bind(EngagementStatus::LAUNCHABLE[0].id())
        .bind(EngagementStatus::LAUNCHABLE[1].id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Move every PROCESSING engagement to ERROR with `message`.
    ///
    /// Job state is process-local, so at startup any PROCESSING row is an
    /// orphan of a previous process. Returns the number of rows reset.
    pub async fn reset_stuck_processing(pool: &PgPool, message: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE engagements \
             SET status_id = $1, error_message = $2, updated_at = NOW() \
             WHERE status_id = $3",
        )
        .bind(EngagementStatus::Error.id())
        .bind(message)
        .bind(EngagementStatus::Processing.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
