//! Completion of a successful run.
//!
//! Persisting happens while the job is in `saving_report`; any failure
//! there is a hard failure and leaves no report row or file behind. The
//! report row and the COMPLETE status are written in one transaction, so
//! once that write lands the run has succeeded and nothing after it,
//! including the notification, can fail it.

use chrono::Utc;
use vantage_core::generation::{Checkpoint, JobPatch, JobStatus, PipelineStage};
use vantage_core::naming::report_storage_filename;
use vantage_core::types::JobId;
use vantage_db::models::engagement::Engagement;
use vantage_db::models::generated_report::{CreateGeneratedReport, GeneratedReport};

use crate::context::PipelineContext;
use crate::error::StageError;

pub struct CompletionHandler {
    ctx: PipelineContext,
}

impl CompletionHandler {
    pub fn new(ctx: PipelineContext) -> Self {
        Self { ctx }
    }

    /// Save the document, record it as the engagement's next version and
    /// mark the engagement COMPLETE.
    pub async fn persist_report(
        &self,
        engagement: &Engagement,
        document: &[u8],
    ) -> Result<GeneratedReport, StageError> {
        let store = &self.ctx.store;
        let collaborators = &self.ctx.collaborators;

        let version = store
            .next_report_version(engagement.id)
            .await
            .map_err(|e| StageError::Persistence(e.to_string()))?;
        let file_name = report_storage_filename(
            engagement.id,
            version,
            collaborators.assembler.extension(),
        );

        let path = tokio::select! {
            _ = self.ctx.cancel.cancelled() => return Err(StageError::Cancelled),
            saved = collaborators.storage.save_file(
                document,
                &self.ctx.config.report_output_dir,
                &file_name,
            ) => saved.map_err(|e| StageError::Persistence(e.to_string()))?,
        };

        let expires_at = Utc::now() + chrono::Duration::days(self.ctx.config.report_retention_days);
        let input = CreateGeneratedReport {
            engagement_id: engagement.id,
            file_path: path.to_string_lossy().into_owned(),
            version,
            expires_at,
        };

        match self.ctx.engagements.complete_with_report(&input).await {
            Ok(report) => {
                tracing::info!(
                    engagement_id = engagement.id,
                    version,
                    path = %input.file_path,
                    "Report version saved",
                );
                Ok(report)
            }
            Err(e) => {
                if let Err(cleanup) = collaborators.storage.delete_file(&path).await {
                    tracing::warn!(
                        path = %input.file_path,
                        error = %cleanup,
                        "Failed to remove orphaned report file",
                    );
                }
                Err(StageError::Persistence(e.to_string()))
            }
        }
    }

    /// Mark the job complete, then notify the owner.
    pub async fn finalize(
        &self,
        job_id: JobId,
        engagement: &Engagement,
        report: &GeneratedReport,
        warnings: &[String],
    ) {
        let message = if warnings.is_empty() {
            format!("Report v{} is ready", report.version)
        } else {
            format!(
                "Report v{} is ready with {} item(s) to review",
                report.version,
                warnings.len()
            )
        };
        self.ctx
            .jobs
            .update(
                job_id,
                JobPatch::new()
                    .status(JobStatus::Complete)
                    .checkpoint(Checkpoint::enter(PipelineStage::Complete))
                    .message(message),
            )
            .await;
        tracing::info!(
            %job_id,
            engagement_id = engagement.id,
            version = report.version,
            "Report generation complete",
        );

        self.ctx
            .notifier
            .report_ready(engagement, report.version, warnings)
            .await;
    }
}
