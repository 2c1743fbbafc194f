//! Status query for polling clients.

use std::sync::Arc;

use vantage_core::generation::JobStatusView;
use vantage_core::types::JobId;

use crate::job_store::JobStore;

/// Read-only view over the job store. Safe to call at any rate while runs
/// are in flight.
#[derive(Clone)]
pub struct StatusQuery {
    jobs: Arc<JobStore>,
}

impl StatusQuery {
    pub fn new(jobs: Arc<JobStore>) -> Self {
        Self { jobs }
    }

    /// `None` once the job is unknown, including after eviction.
    pub async fn get_status(&self, job_id: JobId) -> Option<JobStatusView> {
        self.jobs.get(job_id).await.map(|job| job.status_view())
    }
}
