//! Durable engagement status transitions.
//!
//! Each method is one single-row write. Only [`EngagementStateMachine::begin_processing`]
//! is conditional; the other transitions rely on the pipeline calling them
//! in order. [`EngagementStateMachine::complete_with_report`] also inserts
//! the report row, in the same transaction as the COMPLETE write.

use std::sync::Arc;

use vantage_core::types::DbId;
use vantage_db::models::generated_report::{CreateGeneratedReport, GeneratedReport};
use vantage_db::models::status::EngagementStatus;

use crate::error::StoreError;
use crate::store::ReportStore;

#[derive(Clone)]
pub struct EngagementStateMachine {
    store: Arc<dyn ReportStore>,
}

impl EngagementStateMachine {
    pub fn new(store: Arc<dyn ReportStore>) -> Self {
        Self { store }
    }

    /// DRAFT/ERROR → PROCESSING, atomically. `false` means another launch
    /// won or the engagement is not launchable.
    pub async fn begin_processing(&self, engagement_id: DbId) -> Result<bool, StoreError> {
        let flipped = self.store.begin_processing(engagement_id).await?;
        if flipped {
            tracing::info!(
                engagement_id,
                status = %EngagementStatus::Processing,
                "Engagement status changed",
            );
        }
        Ok(flipped)
    }

    pub async fn mark_processing(&self, engagement_id: DbId) -> Result<(), StoreError> {
        self.write(engagement_id, EngagementStatus::Processing, None).await
    }

    pub async fn mark_complete(&self, engagement_id: DbId) -> Result<(), StoreError> {
        self.write(engagement_id, EngagementStatus::Complete, None).await
    }

    /// PROCESSING → COMPLETE together with the new report version.
    pub async fn complete_with_report(
        &self,
        input: &CreateGeneratedReport,
    ) -> Result<GeneratedReport, StoreError> {
        let report = self.store.complete_with_report(input).await?;
        tracing::info!(
            engagement_id = input.engagement_id,
            status = %EngagementStatus::Complete,
            version = report.version,
            "Engagement status changed",
        );
        Ok(report)
    }

    pub async fn mark_error(&self, engagement_id: DbId, message: &str) -> Result<(), StoreError> {
        self.write(engagement_id, EngagementStatus::Error, Some(message)).await
    }

    pub async fn reset_to_draft(&self, engagement_id: DbId) -> Result<(), StoreError> {
        self.write(engagement_id, EngagementStatus::Draft, None).await
    }

    async fn write(
        &self,
        engagement_id: DbId,
        status: EngagementStatus,
        error_message: Option<&str>,
    ) -> Result<(), StoreError> {
        self.store
            .set_engagement_status(engagement_id, status, error_message)
            .await?;
        tracing::info!(engagement_id, %status, "Engagement status changed");
        Ok(())
    }
}
