//! Pipeline launcher.
//!
//! `launch` does only the synchronous part of starting a run: it validates
//! preconditions, reserves a pending job, flips the engagement to
//! PROCESSING and spawns the executor. The caller gets the job id back long
//! before the run ends.
//!
//! The job is reserved before the flip so a rejected launch never has to
//! write the engagement back; losing the flip only discards the job.

use tracing::Instrument;
use vantage_core::error::CoreError;
use vantage_core::report::ValuationApproach;
use vantage_core::types::{DbId, JobId};
use vantage_db::models::engagement::Engagement;
use vantage_db::models::status::EngagementStatus;

use crate::context::PipelineContext;
use crate::error::LaunchError;
use crate::executor::StageExecutor;

#[derive(Clone)]
pub struct PipelineLauncher {
    ctx: PipelineContext,
}

/// Result of a successful launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Launched {
    pub engagement_id: DbId,
    pub job_id: JobId,
}

impl PipelineLauncher {
    pub fn new(ctx: PipelineContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &PipelineContext {
        &self.ctx
    }

    /// Start a run for `engagement_id`.
    ///
    /// Must be called from within a Tokio runtime.
    pub async fn launch(&self, engagement_id: DbId) -> Result<Launched, LaunchError> {
        let engagement = self
            .ctx
            .store
            .find_engagement(engagement_id)
            .await?
            .ok_or(LaunchError::NotFound(engagement_id))?;

        if self.ctx.jobs.find_active_for(engagement_id).await.is_some() {
            return Err(LaunchError::AlreadyRunning(engagement_id));
        }
        check_eligible(&engagement)?;
        let approaches = ValuationApproach::parse_all(&engagement.selected_approaches)
            .map_err(|e| match e {
                CoreError::Validation(reason) => LaunchError::NotEligible(reason),
                other => LaunchError::NotEligible(other.to_string()),
            })?;

        let job_id = self.ctx.jobs.create(engagement_id).await?;

        // Conditional flip: of two racing launches only one gets `true`.
        match self.ctx.engagements.begin_processing(engagement_id).await {
            Ok(true) => {}
            Ok(false) => {
                self.ctx.jobs.discard(job_id).await;
                return Err(LaunchError::AlreadyRunning(engagement_id));
            }
            Err(e) => {
                self.ctx.jobs.discard(job_id).await;
                return Err(e.into());
            }
        }

        let executor = StageExecutor::new(self.ctx.clone());
        let span = tracing::info_span!("report_job", %job_id, engagement_id);
        self.ctx.tasks.spawn(
            async move { executor.run(job_id, engagement, approaches).await }.instrument(span),
        );

        tracing::info!(%job_id, engagement_id, "Report generation launched");
        Ok(Launched {
            engagement_id,
            job_id,
        })
    }
}

/// Status and input checks. Returns the current (launchable) status.
fn check_eligible(engagement: &Engagement) -> Result<EngagementStatus, LaunchError> {
    let status = engagement.status().ok_or_else(|| {
        LaunchError::NotEligible(format!(
            "Engagement has unknown status id {}",
            engagement.status_id
        ))
    })?;
    if status == EngagementStatus::Processing {
        return Err(LaunchError::AlreadyRunning(engagement.id));
    }
    if !status.is_launchable() {
        return Err(LaunchError::NotEligible(format!(
            "Engagement is {status}; only DRAFT or ERROR engagements can be generated"
        )));
    }
    if engagement.model_path().is_none() {
        return Err(LaunchError::NotEligible(
            "Upload a financial model before generating a report".to_string(),
        ));
    }
    Ok(status)
}
