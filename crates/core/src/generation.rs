//! Report generation job model.
//!
//! A [`Job`] is the ephemeral, process-local execution record of one
//! pipeline run for an engagement. It is never persisted; the durable
//! outcome lives on the engagement row and in `generated_reports`.
//!
//! Stage and progress always move together through a [`Checkpoint`], and
//! [`Job::apply`] refuses to move progress backwards or to leave a
//! terminal status, so every observer sees a monotonic run.

use serde::{Deserialize, Serialize};

use crate::types::{DbId, JobId, Timestamp};

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle status of a generation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Complete,
    Failed,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Complete => "complete",
            JobStatus::Failed => "failed",
        }
    }

    /// `complete` and `failed` are absorbing.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Complete | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// Ordered phases of the report pipeline.
///
/// `Failed` sits outside the order and may follow any stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    ParsingModel,
    ResearchingCompany,
    ResearchingIndustry,
    GeneratingNarratives,
    AssemblingDocument,
    SavingReport,
    Complete,
    Failed,
}

/// Progress when the narrative stage starts.
pub const NARRATIVE_PROGRESS_START: u8 = 55;

/// Progress once every approach narrative has been attempted.
pub const NARRATIVE_PROGRESS_END: u8 = 80;

impl PipelineStage {
    /// The fixed execution order, excluding `Failed`.
    pub const ORDER: [PipelineStage; 7] = [
        PipelineStage::ParsingModel,
        PipelineStage::ResearchingCompany,
        PipelineStage::ResearchingIndustry,
        PipelineStage::GeneratingNarratives,
        PipelineStage::AssemblingDocument,
        PipelineStage::SavingReport,
        PipelineStage::Complete,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PipelineStage::ParsingModel => "parsing_model",
            PipelineStage::ResearchingCompany => "researching_company",
            PipelineStage::ResearchingIndustry => "researching_industry",
            PipelineStage::GeneratingNarratives => "generating_narratives",
            PipelineStage::AssemblingDocument => "assembling_document",
            PipelineStage::SavingReport => "saving_report",
            PipelineStage::Complete => "complete",
            PipelineStage::Failed => "failed",
        }
    }

    /// Index in [`Self::ORDER`]; `None` for `Failed`.
    pub fn position(self) -> Option<usize> {
        Self::ORDER.iter().position(|s| *s == self)
    }

    /// Progress value recorded when the pipeline enters this stage.
    ///
    /// `Failed` keeps whatever progress the run had reached, so it has no
    /// value of its own.
    pub fn entry_progress(self) -> Option<u8> {
        match self {
            PipelineStage::ParsingModel => Some(10),
            PipelineStage::ResearchingCompany => Some(25),
            PipelineStage::ResearchingIndustry => Some(40),
            PipelineStage::GeneratingNarratives => Some(NARRATIVE_PROGRESS_START),
            PipelineStage::AssemblingDocument => Some(85),
            PipelineStage::SavingReport => Some(92),
            PipelineStage::Complete => Some(100),
            PipelineStage::Failed => None,
        }
    }

    /// Whether moving from `self` to `next` respects the fixed order.
    ///
    /// Staying on the same stage is allowed (incremental narrative
    /// progress); `Failed` is reachable from anywhere but `Complete`.
    pub fn can_advance_to(self, next: PipelineStage) -> bool {
        match (self.position(), next.position()) {
            (Some(current), Some(target)) => target >= current,
            (Some(_), None) => self != PipelineStage::Complete,
            (None, _) => false,
        }
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress after `completed` of `total` approach narratives were attempted.
///
/// Interpolates linearly between [`NARRATIVE_PROGRESS_START`] and
/// [`NARRATIVE_PROGRESS_END`].
pub fn narrative_progress(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return NARRATIVE_PROGRESS_END;
    }
    let completed = completed.min(total);
    let span = usize::from(NARRATIVE_PROGRESS_END - NARRATIVE_PROGRESS_START);
    NARRATIVE_PROGRESS_START + (span * completed / total) as u8
}

// ---------------------------------------------------------------------------
// Checkpoint / patch
// ---------------------------------------------------------------------------

/// A stage together with the progress reached in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint {
    pub stage: PipelineStage,
    pub progress: u8,
}

impl Checkpoint {
    /// Checkpoint for entering `stage` at its standard progress value.
    pub fn enter(stage: PipelineStage) -> Self {
        Self {
            stage,
            progress: stage.entry_progress().unwrap_or(0),
        }
    }

    pub fn at(stage: PipelineStage, progress: u8) -> Self {
        Self {
            stage,
            progress: progress.min(100),
        }
    }
}

/// Partial update applied atomically to a [`Job`].
#[derive(Debug, Clone, Default)]
pub struct JobPatch {
    pub status: Option<JobStatus>,
    pub checkpoint: Option<Checkpoint>,
    pub message: Option<String>,
    pub warnings: Vec<String>,
    pub error: Option<String>,
}

impl JobPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: JobStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn checkpoint(mut self, checkpoint: Checkpoint) -> Self {
        self.checkpoint = Some(checkpoint);
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    pub fn warnings(mut self, warnings: impl IntoIterator<Item = String>) -> Self {
        self.warnings.extend(warnings);
        self
    }

    pub fn error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

/// Ephemeral execution record for one pipeline run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    pub engagement_id: DbId,
    pub status: JobStatus,
    pub stage: PipelineStage,
    pub progress: u8,
    pub message: String,
    pub warnings: Vec<String>,
    pub error: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub finished_at: Option<Timestamp>,
}

impl Job {
    /// A fresh `pending` job positioned at the first stage with 0% progress.
    pub fn new(engagement_id: DbId) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: uuid::Uuid::new_v4(),
            engagement_id,
            status: JobStatus::Pending,
            stage: PipelineStage::ParsingModel,
            progress: 0,
            message: "Queued".to_string(),
            warnings: Vec::new(),
            error: None,
            created_at: now,
            updated_at: now,
            finished_at: None,
        }
    }

    /// Pending or running.
    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }

    /// Apply a patch, enforcing the run invariants.
    ///
    /// - A terminal job is frozen; the patch is dropped and `false` returned.
    /// - Progress never decreases; a lower checkpoint value is clamped up.
    /// - A checkpoint that would move the stage backwards is ignored.
    pub fn apply(&mut self, patch: JobPatch) -> bool {
        if self.status.is_terminal() {
            return false;
        }

        if let Some(checkpoint) = patch.checkpoint {
            if self.stage.can_advance_to(checkpoint.stage) {
                self.stage = checkpoint.stage;
                self.progress = self.progress.max(checkpoint.progress);
            }
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(message) = patch.message {
            self.message = message;
        }
        self.warnings.extend(patch.warnings);
        if patch.error.is_some() {
            self.error = patch.error;
        }

        let now = chrono::Utc::now();
        self.updated_at = now;
        if self.status.is_terminal() {
            self.finished_at = Some(now);
        }
        true
    }

    /// Read-only projection served to polling clients.
    pub fn status_view(&self) -> JobStatusView {
        JobStatusView {
            job_id: self.id,
            engagement_id: self.engagement_id,
            status: self.status,
            stage: self.stage,
            progress: self.progress,
            message: self.message.clone(),
            warnings: self.warnings.clone(),
            error: self.error.clone(),
        }
    }
}

/// Payload of the status query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatusView {
    pub job_id: JobId,
    pub engagement_id: DbId,
    pub status: JobStatus,
    pub stage: PipelineStage,
    pub progress: u8,
    pub message: String,
    pub warnings: Vec<String>,
    pub error: Option<String>,
}
