//! Stage executor: runs the fixed pipeline for one job.
//!
//! Stages run strictly in order:
//! `parsing_model → researching_company → researching_industry →
//! generating_narratives → assembling_document → saving_report → complete`.
//!
//! Research and narrative calls are soft: a failure becomes a placeholder
//! section, a flag, and a job warning, and the run continues. Everything
//! else is hard: the run stops, the job fails, the engagement goes to ERROR
//! and the owner is notified.

use std::future::Future;
use std::path::Path;

use tokio::time::Instant;
use vantage_core::generation::{narrative_progress, Checkpoint, JobPatch, JobStatus, PipelineStage};
use vantage_core::report::{
    FlagType, ReportContent, ValuationApproach, SECTION_COMPANY_OVERVIEW,
    SECTION_FINANCIAL_MODEL, SECTION_INDUSTRY_OUTLOOK,
};
use vantage_core::types::JobId;
use vantage_db::models::engagement::Engagement;

use crate::collaborators::ParsedModel;
use crate::completion::CompletionHandler;
use crate::context::PipelineContext;
use crate::error::{CollaboratorError, StageError};
use crate::pacing::{CallError, RateLimitedCaller};
use crate::prompts::{self, PromptContext, SYSTEM_PROMPT};

pub struct StageExecutor {
    ctx: PipelineContext,
    completion: CompletionHandler,
}

impl StageExecutor {
    pub fn new(ctx: PipelineContext) -> Self {
        Self {
            completion: CompletionHandler::new(ctx.clone()),
            ctx,
        }
    }

    /// Run the pipeline to a terminal state. Never returns an error; every
    /// outcome is recorded on the job and the engagement.
    pub async fn run(
        &self,
        job_id: JobId,
        engagement: Engagement,
        approaches: Vec<ValuationApproach>,
    ) {
        tracing::info!(
            %job_id,
            engagement_id = engagement.id,
            approaches = approaches.len(),
            "Report generation started",
        );

        if let Err(err) = self.execute(job_id, &engagement, &approaches).await {
            self.fail(job_id, &engagement, err).await;
        }
    }

    async fn execute(
        &self,
        job_id: JobId,
        engagement: &Engagement,
        approaches: &[ValuationApproach],
    ) -> Result<(), StageError> {
        let started = Instant::now();

        // --- parsing_model ---
        self.advance(
            job_id,
            JobPatch::new().status(JobStatus::Running),
            PipelineStage::ParsingModel,
            "Parsing financial model",
        )
        .await;
        let model = self.parse(job_id, engagement).await?;

        let mut content = ReportContent::new(
            engagement.company_name.clone(),
            engagement.report_type.clone(),
            engagement.valuation_date,
        );
        for warning in &model.warnings {
            content.flag(SECTION_FINANCIAL_MODEL, FlagType::Review, warning.clone());
            content.warnings.push(format!("Financial model: {warning}"));
        }

        let prompt_ctx = PromptContext {
            company_name: &engagement.company_name,
            report_type: &engagement.report_type,
            valuation_date: engagement.valuation_date,
            qualitative_context: engagement.qualitative_context.as_deref(),
            model: &model,
        };
        let mut caller = RateLimitedCaller::new(self.ctx.pacer.clone(), self.ctx.cancel.clone());

        // --- researching_company ---
        self.advance(
            job_id,
            JobPatch::new(),
            PipelineStage::ResearchingCompany,
            "Researching company",
        )
        .await;
        self.write_section(
            job_id,
            &mut caller,
            &mut content,
            SECTION_COMPANY_OVERVIEW,
            "Company Overview",
            prompts::company_research(&prompt_ctx),
        )
        .await?;

        // --- researching_industry ---
        self.advance(
            job_id,
            JobPatch::new(),
            PipelineStage::ResearchingIndustry,
            "Researching industry",
        )
        .await;
        self.write_section(
            job_id,
            &mut caller,
            &mut content,
            SECTION_INDUSTRY_OUTLOOK,
            "Industry Outlook",
            prompts::industry_research(&prompt_ctx),
        )
        .await?;

        // --- generating_narratives ---
        self.advance(
            job_id,
            JobPatch::new(),
            PipelineStage::GeneratingNarratives,
            "Writing valuation narratives",
        )
        .await;
        let total = approaches.len();
        for (index, approach) in approaches.iter().enumerate() {
            self.write_section(
                job_id,
                &mut caller,
                &mut content,
                approach.section_key(),
                approach.title(),
                prompts::approach_narrative(&prompt_ctx, *approach),
            )
            .await?;

            let progress = narrative_progress(index + 1, total);
            self.ctx
                .jobs
                .update(
                    job_id,
                    JobPatch::new()
                        .checkpoint(Checkpoint::at(PipelineStage::GeneratingNarratives, progress))
                        .message(format!(
                            "Wrote {} narrative ({}/{total})",
                            approach.title(),
                            index + 1
                        )),
                )
                .await;
        }
        if total == 0 {
            self.ctx
                .jobs
                .update(
                    job_id,
                    JobPatch::new().checkpoint(Checkpoint::at(
                        PipelineStage::GeneratingNarratives,
                        narrative_progress(0, 0),
                    )),
                )
                .await;
        }

        // --- assembling_document ---
        self.advance(
            job_id,
            JobPatch::new(),
            PipelineStage::AssemblingDocument,
            "Assembling document",
        )
        .await;
        content.duration = started.elapsed();
        let document = self
            .guard(self.ctx.collaborators.assembler.assemble_document(&content))
            .await?
            .map_err(|e| StageError::Assembly(e.to_string()))?;

        // --- saving_report ---
        self.advance(job_id, JobPatch::new(), PipelineStage::SavingReport, "Saving report")
            .await;
        let report = self.completion.persist_report(engagement, &document).await?;

        self.completion
            .finalize(job_id, engagement, &report, &content.warnings)
            .await;
        Ok(())
    }

    async fn parse(
        &self,
        job_id: JobId,
        engagement: &Engagement,
    ) -> Result<ParsedModel, StageError> {
        let path = engagement.model_path().ok_or(StageError::MissingModelPath)?;
        let model = self
            .guard(self.ctx.collaborators.parser.parse_model(Path::new(path)))
            .await?
            .map_err(|e| StageError::ModelUnreadable(e.to_string()))?;

        if !model.errors.is_empty() {
            return Err(StageError::ModelInvalid(model.errors.join("; ")));
        }
        if !model.warnings.is_empty() {
            tracing::info!(
                %job_id,
                count = model.warnings.len(),
                "Financial model parsed with warnings",
            );
            self.ctx
                .jobs
                .update(
                    job_id,
                    JobPatch::new().warnings(
                        model
                            .warnings
                            .iter()
                            .map(|w| format!("Financial model: {w}")),
                    ),
                )
                .await;
        }
        Ok(model)
    }

    /// One paced text-generation call filling section `key`. Only
    /// cancellation escapes as an error.
    async fn write_section(
        &self,
        job_id: JobId,
        caller: &mut RateLimitedCaller,
        content: &mut ReportContent,
        key: &str,
        title: &str,
        prompt: String,
    ) -> Result<(), StageError> {
        let generator = &self.ctx.collaborators.generator;
        match caller
            .call(|| generator.generate_text(&prompt, SYSTEM_PROMPT))
            .await
        {
            Ok(text) => {
                content.push_section(key, title, text);
                Ok(())
            }
            Err(CallError::Cancelled) => Err(StageError::Cancelled),
            Err(CallError::Failed(err)) => {
                self.record_soft_failure(job_id, content, key, title, &err).await;
                Ok(())
            }
        }
    }

    async fn record_soft_failure(
        &self,
        job_id: JobId,
        content: &mut ReportContent,
        key: &str,
        title: &str,
        err: &CollaboratorError,
    ) {
        tracing::warn!(
            %job_id,
            section = key,
            error = %err,
            "Section generation failed, using placeholder",
        );
        content.push_placeholder(
            key,
            title,
            FlagType::Error,
            format!("generation failed ({err})"),
        );
        if let Some(warning) = content.warnings.last() {
            self.ctx
                .jobs
                .update(job_id, JobPatch::new().warning(warning.clone()))
                .await;
        }
    }

    /// Enter `stage` at its standard progress.
    async fn advance(&self, job_id: JobId, patch: JobPatch, stage: PipelineStage, message: &str) {
        let job = self
            .ctx
            .jobs
            .update(job_id, patch.checkpoint(Checkpoint::enter(stage)).message(message))
            .await;
        if let Some(job) = job {
            tracing::info!(%job_id, stage = %job.stage, progress = job.progress, "Stage entered");
        }
    }

    /// Await a collaborator call unless shutdown comes first.
    async fn guard<T>(&self, call: impl Future<Output = T>) -> Result<T, StageError> {
        tokio::select! {
            _ = self.ctx.cancel.cancelled() => Err(StageError::Cancelled),
            result = call => Ok(result),
        }
    }

    async fn fail(&self, job_id: JobId, engagement: &Engagement, err: StageError) {
        let message = err.to_string();
        tracing::error!(
            %job_id,
            engagement_id = engagement.id,
            error = %message,
            "Report generation failed",
        );

        if let Err(e) = self.ctx.engagements.mark_error(engagement.id, &message).await {
            tracing::error!(
                engagement_id = engagement.id,
                error = %e,
                "Failed to mark engagement as errored",
            );
        }
        self.ctx
            .jobs
            .update(
                job_id,
                JobPatch::new()
                    .status(JobStatus::Failed)
                    .checkpoint(Checkpoint::enter(PipelineStage::Failed))
                    .message("Report generation failed")
                    .error(message.clone()),
            )
            .await;

        self.ctx.notifier.report_failed(engagement, &message).await;
    }
}
