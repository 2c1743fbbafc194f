//! Durable store seen by the pipeline.
//!
//! [`PgReportStore`] delegates to the `vantage-db` repositories.
//! [`MemoryReportStore`] keeps the same semantics in memory for tests and
//! local demos, including the conditional launch flip and version
//! uniqueness.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::Mutex;
use vantage_core::types::{DbId, Timestamp};
use vantage_db::models::engagement::{CreateEngagement, Engagement};
use vantage_db::models::generated_report::{CreateGeneratedReport, GeneratedReport};
use vantage_db::models::status::EngagementStatus;
use vantage_db::repositories::{EngagementRepo, GeneratedReportRepo, UserRepo};

use crate::error::StoreError;

#[async_trait]
pub trait ReportStore: Send + Sync {
    /// Verify the backing store is reachable.
    async fn health_check(&self) -> Result<(), StoreError>;

    async fn find_engagement(&self, id: DbId) -> Result<Option<Engagement>, StoreError>;

    /// Single-row write of `{status, error_message}`. No transition guard.
    async fn set_engagement_status(
        &self,
        id: DbId,
        status: EngagementStatus,
        error_message: Option<&str>,
    ) -> Result<(), StoreError>;

    /// Flip DRAFT/ERROR to PROCESSING atomically. `false` if the engagement
    /// was in any other status or does not exist.
    async fn begin_processing(&self, id: DbId) -> Result<bool, StoreError>;

    /// Move every PROCESSING engagement to ERROR with `message`.
    async fn reset_stuck_processing(&self, message: &str) -> Result<u64, StoreError>;

    /// One more than the highest version recorded for the engagement.
    async fn next_report_version(&self, engagement_id: DbId) -> Result<i32, StoreError>;

    async fn create_report(
        &self,
        input: &CreateGeneratedReport,
    ) -> Result<GeneratedReport, StoreError>;

    /// Record a report version and mark its engagement COMPLETE as one
    /// atomic write. On error neither change is visible.
    async fn complete_with_report(
        &self,
        input: &CreateGeneratedReport,
    ) -> Result<GeneratedReport, StoreError>;

    async fn find_latest_report(
        &self,
        engagement_id: DbId,
    ) -> Result<Option<GeneratedReport>, StoreError>;

    /// Delete and return every report whose `expires_at` is before `now`.
    async fn delete_expired_reports(&self, now: Timestamp)
        -> Result<Vec<GeneratedReport>, StoreError>;

    async fn find_user_email(&self, user_id: DbId) -> Result<Option<String>, StoreError>;
}

// ---------------------------------------------------------------------------
// PostgreSQL
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct PgReportStore {
    pool: PgPool,
}

impl PgReportStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReportStore for PgReportStore {
    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(vantage_db::health_check(&self.pool).await?)
    }

    async fn find_engagement(&self, id: DbId) -> Result<Option<Engagement>, StoreError> {
        Ok(EngagementRepo::find_by_id(&self.pool, id).await?)
    }

    async fn set_engagement_status(
        &self,
        id: DbId,
        status: EngagementStatus,
        error_message: Option<&str>,
    ) -> Result<(), StoreError> {
        if EngagementRepo::set_status(&self.pool, id, status, error_message).await? {
            Ok(())
        } else {
            Err(StoreError::Inconsistent(format!("engagement {id} does not exist")))
        }
    }

    async fn begin_processing(&self, id: DbId) -> Result<bool, StoreError> {
        Ok(EngagementRepo::begin_processing(&self.pool, id).await?)
    }

    async fn reset_stuck_processing(&self, message: &str) -> Result<u64, StoreError> {
        Ok(EngagementRepo::reset_stuck_processing(&self.pool, message).await?)
    }

    async fn next_report_version(&self, engagement_id: DbId) -> Result<i32, StoreError> {
        Ok(GeneratedReportRepo::next_version(&self.pool, engagement_id).await?)
    }

    async fn create_report(
        &self,
        input: &CreateGeneratedReport,
    ) -> Result<GeneratedReport, StoreError> {
        Ok(GeneratedReportRepo::create(&self.pool, input).await?)
    }

    async fn complete_with_report(
        &self,
        input: &CreateGeneratedReport,
    ) -> Result<GeneratedReport, StoreError> {
        GeneratedReportRepo::create_completing_engagement(&self.pool, input)
            .await?
            .ok_or_else(|| {
                StoreError::Inconsistent(format!(
                    "engagement {} does not exist",
                    input.engagement_id
                ))
            })
    }

    async fn find_latest_report(
        &self,
        engagement_id: DbId,
    ) -> Result<Option<GeneratedReport>, StoreError> {
        Ok(GeneratedReportRepo::find_latest(&self.pool, engagement_id).await?)
    }

    async fn delete_expired_reports(
        &self,
        now: Timestamp,
    ) -> Result<Vec<GeneratedReport>, StoreError> {
        Ok(GeneratedReportRepo::delete_expired(&self.pool, now).await?)
    }

    async fn find_user_email(&self, user_id: DbId) -> Result<Option<String>, StoreError> {
        Ok(UserRepo::find_email(&self.pool, user_id).await?)
    }
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

#[derive(Default)]
struct MemoryState {
    users: HashMap<DbId, String>,
    engagements: HashMap<DbId, Engagement>,
    reports: Vec<GeneratedReport>,
    next_id: DbId,
}

impl MemoryState {
    fn allocate_id(&mut self) -> DbId {
        self.next_id += 1;
        self.next_id
    }

    fn insert_report(
        &mut self,
        input: &CreateGeneratedReport,
    ) -> Result<GeneratedReport, StoreError> {
        let duplicate = self
            .reports
            .iter()
            .any(|r| r.engagement_id == input.engagement_id && r.version == input.version);
        if duplicate || input.version < 1 {
            return Err(StoreError::Inconsistent(format!(
                "version {} is not available for engagement {}",
                input.version, input.engagement_id
            )));
        }
        let report = GeneratedReport {
            id: self.allocate_id(),
            engagement_id: input.engagement_id,
            file_path: input.file_path.clone(),
            version: input.version,
            created_at: chrono::Utc::now(),
            expires_at: input.expires_at,
        };
        self.reports.push(report.clone());
        Ok(report)
    }
}

#[derive(Default)]
pub struct MemoryReportStore {
    state: Mutex<MemoryState>,
}

impl MemoryReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_user(&self, email: &str) -> DbId {
        let mut state = self.state.lock().await;
        let id = state.allocate_id();
        state.users.insert(id, email.to_string());
        id
    }

    /// Insert a DRAFT engagement.
    pub async fn insert_engagement(&self, input: CreateEngagement) -> Engagement {
        let mut state = self.state.lock().await;
        let id = state.allocate_id();
        let now = chrono::Utc::now();
        let engagement = Engagement {
            id,
            owner_id: input.owner_id,
            report_type: input.report_type,
            company_name: input.company_name,
            valuation_date: input.valuation_date,
            model_file_path: input.model_file_path,
            selected_approaches: input.selected_approaches,
            qualitative_context: input.qualitative_context,
            status_id: EngagementStatus::Draft.id(),
            error_message: None,
            created_at: now,
            updated_at: now,
        };
        state.engagements.insert(id, engagement.clone());
        engagement
    }

    /// All versions of an engagement, oldest first.
    pub async fn reports_for(&self, engagement_id: DbId) -> Vec<GeneratedReport> {
        let state = self.state.lock().await;
        let mut reports: Vec<_> = state
            .reports
            .iter()
            .filter(|r| r.engagement_id == engagement_id)
            .cloned()
            .collect();
        reports.sort_by_key(|r| r.version);
        reports
    }
}

#[async_trait]
impl ReportStore for MemoryReportStore {
    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn find_engagement(&self, id: DbId) -> Result<Option<Engagement>, StoreError> {
        Ok(self.state.lock().await.engagements.get(&id).cloned())
    }

    async fn set_engagement_status(
        &self,
        id: DbId,
        status: EngagementStatus,
        error_message: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let engagement = state
            .engagements
            .get_mut(&id)
            .ok_or_else(|| StoreError::Inconsistent(format!("engagement {id} does not exist")))?;
        engagement.status_id = status.id();
        engagement.error_message = error_message.map(str::to_string);
        engagement.updated_at = chrono::Utc::now();
        Ok(())
    }

    async fn begin_processing(&self, id: DbId) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        let Some(engagement) = state.engagements.get_mut(&id) else {
            return Ok(false);
        };
        let launchable = engagement
            .status()
            .is_some_and(EngagementStatus::is_launchable);
        if !launchable {
            return Ok(false);
        }
        engagement.status_id = EngagementStatus::Processing.id();
        engagement.error_message = None;
        engagement.updated_at = chrono::Utc::now();
        Ok(true)
    }

    async fn reset_stuck_processing(&self, message: &str) -> Result<u64, StoreError> {
        let mut state = self.state.lock().await;
        let now = chrono::Utc::now();
        let mut reset = 0;
        for engagement in state.engagements.values_mut() {
            if engagement.status() == Some(EngagementStatus::Processing) {
                engagement.status_id = EngagementStatus::Error.id();
                engagement.error_message = Some(message.to_string());
                engagement.updated_at = now;
                reset += 1;
            }
        }
        Ok(reset)
    }

    async fn next_report_version(&self, engagement_id: DbId) -> Result<i32, StoreError> {
        let state = self.state.lock().await;
        let max = state
            .reports
            .iter()
            .filter(|r| r.engagement_id == engagement_id)
            .map(|r| r.version)
            .max()
            .unwrap_or(0);
        Ok(max + 1)
    }

    async fn create_report(
        &self,
        input: &CreateGeneratedReport,
    ) -> Result<GeneratedReport, StoreError> {
        self.state.lock().await.insert_report(input)
    }

    async fn complete_with_report(
        &self,
        input: &CreateGeneratedReport,
    ) -> Result<GeneratedReport, StoreError> {
        let mut state = self.state.lock().await;
        if !state.engagements.contains_key(&input.engagement_id) {
            return Err(StoreError::Inconsistent(format!(
                "engagement {} does not exist",
                input.engagement_id
            )));
        }
        let report = state.insert_report(input)?;
        if let Some(engagement) = state.engagements.get_mut(&input.engagement_id) {
            engagement.status_id = EngagementStatus::Complete.id();
            engagement.error_message = None;
            engagement.updated_at = chrono::Utc::now();
        }
        Ok(report)
    }

    async fn find_latest_report(
        &self,
        engagement_id: DbId,
    ) -> Result<Option<GeneratedReport>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .reports
            .iter()
            .filter(|r| r.engagement_id == engagement_id)
            .max_by_key(|r| r.version)
            .cloned())
    }

    async fn delete_expired_reports(
        &self,
        now: Timestamp,
    ) -> Result<Vec<GeneratedReport>, StoreError> {
        let mut state = self.state.lock().await;
        let (expired, kept): (Vec<_>, Vec<_>) =
            state.reports.drain(..).partition(|r| r.expires_at < now);
        state.reports = kept;
        Ok(expired)
    }

    async fn find_user_email(&self, user_id: DbId) -> Result<Option<String>, StoreError> {
        Ok(self.state.lock().await.users.get(&user_id).cloned())
    }
}
