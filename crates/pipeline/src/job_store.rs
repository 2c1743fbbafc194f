//! Process-local registry of generation jobs.
//!
//! The map lock is held only to find, insert, or remove entries; each job
//! has its own mutex, so updating one run never blocks readers of another.
//! A [`JobPatch`] is applied under the job's mutex, which keeps stage and
//! progress consistent for every reader.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use vantage_core::generation::{Job, JobPatch};
use vantage_core::types::{DbId, JobId, Timestamp};

use crate::error::LaunchError;

pub struct JobStore {
    jobs: RwLock<HashMap<JobId, Arc<Mutex<Job>>>>,
    ttl: Duration,
}

impl JobStore {
    /// `ttl` is how long a finished job stays queryable.
    pub fn new(ttl: Duration) -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Register a new pending job for `engagement_id`.
    ///
    /// The active-job check and the insert happen under one write lock, so
    /// two concurrent callers cannot both succeed.
    pub async fn create(&self, engagement_id: DbId) -> Result<JobId, LaunchError> {
        let mut jobs = self.jobs.write().await;
        for entry in jobs.values() {
            let job = entry.lock().await;
            if job.engagement_id == engagement_id && job.is_active() {
                return Err(LaunchError::AlreadyRunning(engagement_id));
            }
        }

        let job = Job::new(engagement_id);
        let job_id = job.id;
        jobs.insert(job_id, Arc::new(Mutex::new(job)));
        tracing::debug!(%job_id, engagement_id, "Job registered");
        Ok(job_id)
    }

    /// Snapshot of a job, or `None` if it never existed or was evicted.
    pub async fn get(&self, job_id: JobId) -> Option<Job> {
        let entry = self.entry(job_id).await?;
        let job = entry.lock().await;
        Some(job.clone())
    }

    /// Apply `patch` and return the resulting snapshot.
    ///
    /// Returns `None` for an unknown job. Patches to a finished job are
    /// dropped; the unchanged snapshot is returned.
    pub async fn update(&self, job_id: JobId, patch: JobPatch) -> Option<Job> {
        let entry = self.entry(job_id).await?;
        let mut job = entry.lock().await;
        if !job.apply(patch) {
            tracing::warn!(%job_id, status = %job.status, "Ignoring update to finished job");
        }
        Some(job.clone())
    }

    /// The pending or running job of an engagement, if any.
    pub async fn find_active_for(&self, engagement_id: DbId) -> Option<Job> {
        let jobs = self.jobs.read().await;
        for entry in jobs.values() {
            let job = entry.lock().await;
            if job.engagement_id == engagement_id && job.is_active() {
                return Some(job.clone());
            }
        }
        None
    }

    /// Drop a job that was registered but never started.
    pub async fn discard(&self, job_id: JobId) {
        if self.jobs.write().await.remove(&job_id).is_some() {
            tracing::debug!(%job_id, "Job discarded");
        }
    }

    /// Remove finished jobs whose TTL has elapsed at `now`. Active jobs are
    /// never evicted. Returns the number removed.
    pub async fn evict_expired(&self, now: Timestamp) -> usize {
        let ttl = chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::MAX);
        let mut jobs = self.jobs.write().await;

        let mut expired = Vec::new();
        for (id, entry) in jobs.iter() {
            let job = entry.lock().await;
            let due = job
                .finished_at
                .and_then(|finished| finished.checked_add_signed(ttl))
                .is_some_and(|deadline| deadline <= now);
            if due {
                expired.push(*id);
            }
        }

        for id in &expired {
            jobs.remove(id);
        }
        expired.len()
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }

    async fn entry(&self, job_id: JobId) -> Option<Arc<Mutex<Job>>> {
        self.jobs.read().await.get(&job_id).cloned()
    }
}
