//! Asynchronous report-generation pipeline.
//!
//! A [`PipelineLauncher`] validates and starts a run; a [`StageExecutor`]
//! drives it through the fixed stage order on its own task, recording
//! progress in the [`JobStore`] and durable status through the
//! [`EngagementStateMachine`]; the [`CompletionHandler`] saves the document
//! as a new version and notifies the owner. [`StatusQuery`] serves
//! progress to polling clients.

pub mod collaborators;
pub mod completion;
pub mod config;
pub mod context;
pub mod error;
pub mod executor;
pub mod job_store;
pub mod launcher;
pub mod notify;
pub mod pacing;
pub mod prompts;
pub mod reconcile;
pub mod retention;
pub mod state_machine;
pub mod status;
pub mod store;

pub use collaborators::Collaborators;
pub use completion::CompletionHandler;
pub use config::{ConfigError, PipelineConfig};
pub use context::PipelineContext;
pub use error::{CollaboratorError, LaunchError, StageError, StoreError};
pub use executor::StageExecutor;
pub use job_store::JobStore;
pub use launcher::{Launched, PipelineLauncher};
pub use pacing::{FixedDelay, Pacer, RateLimitedCaller};
pub use state_machine::EngagementStateMachine;
pub use status::StatusQuery;
pub use store::{MemoryReportStore, PgReportStore, ReportStore};
