//! Error types for the report pipeline.
//!
//! - [`LaunchError`]: a launch was rejected before any job existed.
//! - [`StageError`]: a run aborted. Its display text is what the user sees
//!   on the job and on the engagement.
//! - [`CollaboratorError`]: an external call failed. Research and narrative
//!   call sites downgrade it to a flagged placeholder.
//! - [`StoreError`]: the durable store failed.

use vantage_core::types::DbId;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A row violated an invariant the store relies on.
    #[error("Inconsistent record: {0}")]
    Inconsistent(String),
}

#[derive(Debug, thiserror::Error)]
pub enum CollaboratorError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed data: {0}")]
    Malformed(String),

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Provider returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Provider returned no text")]
    EmptyResponse,

    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("{0}")]
    Failed(String),
}

/// Synchronous rejection of a launch request. No job is created.
#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error("Engagement with id {0} not found")]
    NotFound(DbId),

    #[error("A report is already being generated for engagement {0}")]
    AlreadyRunning(DbId),

    #[error("{0}")]
    NotEligible(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Unrecoverable failure of a pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error("No financial model has been uploaded for this engagement")]
    MissingModelPath,

    #[error("Financial model could not be read: {0}")]
    ModelUnreadable(String),

    #[error("Financial model contains errors: {0}")]
    ModelInvalid(String),

    #[error("Document assembly failed: {0}")]
    Assembly(String),

    #[error("Report could not be saved: {0}")]
    Persistence(String),

    #[error("Report generation was cancelled by server shutdown")]
    Cancelled,
}
