//! Shared handles for one pipeline instance.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::collaborators::Collaborators;
use crate::config::PipelineConfig;
use crate::job_store::JobStore;
use crate::notify::Notifier;
use crate::pacing::{FixedDelay, Pacer};
use crate::state_machine::EngagementStateMachine;
use crate::store::ReportStore;

/// Everything a launcher, executor and completion handler need. Cheap to
/// clone; every field is shared.
#[derive(Clone)]
pub struct PipelineContext {
    pub store: Arc<dyn ReportStore>,
    pub jobs: Arc<JobStore>,
    pub collaborators: Collaborators,
    pub pacer: Arc<dyn Pacer>,
    pub config: Arc<PipelineConfig>,
    pub engagements: EngagementStateMachine,
    pub notifier: Notifier,
    /// Cancelled on shutdown; runs abort at their next suspension point.
    pub cancel: CancellationToken,
    /// Tracks spawned runs so shutdown can wait for them to settle.
    pub tasks: TaskTracker,
}

impl PipelineContext {
    /// Wire a context with a [`FixedDelay`] pacer from `config`.
    pub fn new(
        store: Arc<dyn ReportStore>,
        collaborators: Collaborators,
        config: PipelineConfig,
        cancel: CancellationToken,
    ) -> Self {
        let pacer: Arc<dyn Pacer> = Arc::new(FixedDelay(config.generation_delay));
        let notifier = Notifier::new(
            store.clone(),
            collaborators.mailer.clone(),
            config.app_base_url.clone(),
        );
        Self {
            jobs: Arc::new(JobStore::new(config.job_ttl)),
            engagements: EngagementStateMachine::new(store.clone()),
            store,
            collaborators,
            pacer,
            config: Arc::new(config),
            notifier,
            cancel,
            tasks: TaskTracker::new(),
        }
    }

    /// Replace the pacing strategy.
    pub fn with_pacer(mut self, pacer: Arc<dyn Pacer>) -> Self {
        self.pacer = pacer;
        self
    }
}
