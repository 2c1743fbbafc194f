//! Shared fixtures for pipeline integration tests.
//!
//! Collaborators are scripted in memory so runs need no database, network
//! or filesystem.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use vantage_core::generation::JobStatusView;
use vantage_core::report::ReportContent;
use vantage_core::types::{DbId, JobId, Timestamp};
use vantage_db::models::engagement::{CreateEngagement, Engagement};
use vantage_db::models::generated_report::{CreateGeneratedReport, GeneratedReport};
use vantage_db::models::status::EngagementStatus;
use vantage_events::{EmailError, Mailer};
use vantage_pipeline::collaborators::{
    DocumentAssembler, FileStorage, MarkdownAssembler, ModelParser, ParsedModel, StoredFile,
    TextGenerator,
};
use vantage_pipeline::{
    CollaboratorError, Collaborators, MemoryReportStore, PipelineConfig, PipelineContext,
    PipelineLauncher, ReportStore, StatusQuery, StoreError,
};

pub const OWNER_EMAIL: &str = "analyst@example.com";

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct ScriptedParser {
    pub model: ParsedModel,
    pub fail_with: Option<String>,
}

#[async_trait]
impl ModelParser for ScriptedParser {
    async fn parse_model(&self, _path: &Path) -> Result<ParsedModel, CollaboratorError> {
        tokio::task::yield_now().await;
        match &self.fail_with {
            Some(msg) => Err(CollaboratorError::Failed(msg.clone())),
            None => Ok(self.model.clone()),
        }
    }
}

// ---------------------------------------------------------------------------
// Generator
// ---------------------------------------------------------------------------

/// Answers every prompt, except prompts containing one of `fail_on`.
/// Records the instant of each call.
#[derive(Default)]
pub struct ScriptedGenerator {
    pub fail_on: HashSet<String>,
    pub hang: bool,
    pub calls: Mutex<Vec<Instant>>,
}

impl ScriptedGenerator {
    pub fn failing_on(markers: &[&str]) -> Self {
        Self {
            fail_on: markers.iter().map(|m| m.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn call_instants(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate_text(
        &self,
        prompt: &str,
        _system_prompt: &str,
    ) -> Result<String, CollaboratorError> {
        self.calls.lock().unwrap().push(Instant::now());
        tokio::task::yield_now().await;
        if self.hang {
            std::future::pending::<()>().await;
        }
        if self.fail_on.iter().any(|marker| prompt.contains(marker.as_str())) {
            return Err(CollaboratorError::HttpStatus {
                status: 529,
                body: "overloaded".to_string(),
            });
        }
        Ok(format!("Generated text ({} chars of prompt).", prompt.len()))
    }
}

// ---------------------------------------------------------------------------
// Assembler
// ---------------------------------------------------------------------------

pub struct ScriptedAssembler {
    pub fail: bool,
}

#[async_trait]
impl DocumentAssembler for ScriptedAssembler {
    fn extension(&self) -> &'static str {
        "md"
    }

    async fn assemble_document(
        &self,
        content: &ReportContent,
    ) -> Result<Vec<u8>, CollaboratorError> {
        if self.fail {
            return Err(CollaboratorError::Failed("template missing".to_string()));
        }
        MarkdownAssembler.assemble_document(content).await
    }
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryStorage {
    pub fail: bool,
    pub files: Mutex<HashMap<PathBuf, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn read(&self, path: &str) -> Option<String> {
        self.files
            .lock()
            .unwrap()
            .get(Path::new(path))
            .map(|b| String::from_utf8_lossy(b).into_owned())
    }

    pub fn file_count(&self) -> usize {
        self.files.lock().unwrap().len()
    }
}

#[async_trait]
impl FileStorage for MemoryStorage {
    async fn save_file(
        &self,
        bytes: &[u8],
        dir: &Path,
        name: &str,
    ) -> Result<PathBuf, CollaboratorError> {
        if self.fail {
            return Err(CollaboratorError::Io(std::io::Error::other("disk full")));
        }
        let path = dir.join(name);
        self.files.lock().unwrap().insert(path.clone(), bytes.to_vec());
        Ok(path)
    }

    async fn open_file(&self, path: &Path) -> Result<Option<StoredFile>, CollaboratorError> {
        let files = self.files.lock().unwrap();
        Ok(files.get(path).map(|bytes| StoredFile {
            len: bytes.len() as u64,
            reader: Box::new(std::io::Cursor::new(bytes.clone())),
        }))
    }

    async fn delete_file(&self, path: &Path) -> Result<(), CollaboratorError> {
        self.files.lock().unwrap().remove(path);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Mailer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub text: String,
}

#[derive(Default)]
pub struct RecordingMailer {
    pub fail: bool,
    pub sent: Mutex<Vec<SentEmail>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_email(
        &self,
        to: &str,
        subject: &str,
        _html: &str,
        text: &str,
    ) -> Result<(), EmailError> {
        self.sent.lock().unwrap().push(SentEmail {
            to: to.to_string(),
            subject: subject.to_string(),
            text: text.to_string(),
        });
        if self.fail {
            return Err(EmailError::Build("smtp down".to_string()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreFault {
    /// Every write that would mark an engagement COMPLETE fails.
    CompleteWrite,
    /// `next_report_version` returns 1 regardless of existing versions, so
    /// the insert collides when a v1 row already exists.
    StaleVersion,
    /// The conditional PROCESSING flip reports another launch won it.
    FlipLost,
    /// The conditional PROCESSING flip errors.
    FlipFails,
}

/// Delegates to a [`MemoryReportStore`], failing the writes named by
/// `fault`.
pub struct FaultyStore {
    pub inner: Arc<MemoryReportStore>,
    pub fault: Option<StoreFault>,
}

impl FaultyStore {
    fn blip() -> StoreError {
        StoreError::Inconsistent("db blip".to_string())
    }
}

#[async_trait]
impl ReportStore for FaultyStore {
    async fn health_check(&self) -> Result<(), StoreError> {
        self.inner.health_check().await
    }

    async fn find_engagement(&self, id: DbId) -> Result<Option<Engagement>, StoreError> {
        self.inner.find_engagement(id).await
    }

    async fn set_engagement_status(
        &self,
        id: DbId,
        status: EngagementStatus,
        error_message: Option<&str>,
    ) -> Result<(), StoreError> {
        if self.fault == Some(StoreFault::CompleteWrite) && status == EngagementStatus::Complete {
            return Err(Self::blip());
        }
        self.inner.set_engagement_status(id, status, error_message).await
    }

    async fn begin_processing(&self, id: DbId) -> Result<bool, StoreError> {
        match self.fault {
            Some(StoreFault::FlipLost) => Ok(false),
            Some(StoreFault::FlipFails) => Err(Self::blip()),
            _ => self.inner.begin_processing(id).await,
        }
    }

    async fn reset_stuck_processing(&self, message: &str) -> Result<u64, StoreError> {
        self.inner.reset_stuck_processing(message).await
    }

    async fn next_report_version(&self, engagement_id: DbId) -> Result<i32, StoreError> {
        if self.fault == Some(StoreFault::StaleVersion) {
            return Ok(1);
        }
        self.inner.next_report_version(engagement_id).await
    }

    async fn create_report(
        &self,
        input: &CreateGeneratedReport,
    ) -> Result<GeneratedReport, StoreError> {
        self.inner.create_report(input).await
    }

    async fn complete_with_report(
        &self,
        input: &CreateGeneratedReport,
    ) -> Result<GeneratedReport, StoreError> {
        if self.fault == Some(StoreFault::CompleteWrite) {
            return Err(Self::blip());
        }
        self.inner.complete_with_report(input).await
    }

    async fn find_latest_report(
        &self,
        engagement_id: DbId,
    ) -> Result<Option<GeneratedReport>, StoreError> {
        self.inner.find_latest_report(engagement_id).await
    }

    async fn delete_expired_reports(
        &self,
        now: Timestamp,
    ) -> Result<Vec<GeneratedReport>, StoreError> {
        self.inner.delete_expired_reports(now).await
    }

    async fn find_user_email(&self, user_id: DbId) -> Result<Option<String>, StoreError> {
        self.inner.find_user_email(user_id).await
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub store: Arc<MemoryReportStore>,
    pub parser: Arc<ScriptedParser>,
    pub generator: Arc<ScriptedGenerator>,
    pub storage: Arc<MemoryStorage>,
    pub mailer: Arc<RecordingMailer>,
    pub launcher: PipelineLauncher,
    pub status: StatusQuery,
    pub cancel: CancellationToken,
    pub owner_id: DbId,
}

pub struct HarnessBuilder {
    parser: ScriptedParser,
    generator: ScriptedGenerator,
    assembler_fails: bool,
    storage: MemoryStorage,
    mailer: RecordingMailer,
    store_fault: Option<StoreFault>,
    delay: Duration,
}

impl HarnessBuilder {
    pub fn new() -> Self {
        Self {
            parser: ScriptedParser::default(),
            generator: ScriptedGenerator::default(),
            assembler_fails: false,
            storage: MemoryStorage::default(),
            mailer: RecordingMailer::default(),
            store_fault: None,
            delay: Duration::ZERO,
        }
    }

    pub fn parser(mut self, parser: ScriptedParser) -> Self {
        self.parser = parser;
        self
    }

    pub fn generator(mut self, generator: ScriptedGenerator) -> Self {
        self.generator = generator;
        self
    }

    pub fn failing_assembler(mut self) -> Self {
        self.assembler_fails = true;
        self
    }

    pub fn failing_storage(mut self) -> Self {
        self.storage.fail = true;
        self
    }

    pub fn failing_mailer(mut self) -> Self {
        self.mailer.fail = true;
        self
    }

    pub fn store_fault(mut self, fault: StoreFault) -> Self {
        self.store_fault = Some(fault);
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub async fn build(self) -> Harness {
        let store = Arc::new(MemoryReportStore::new());
        let owner_id = store.insert_user(OWNER_EMAIL).await;
        let parser = Arc::new(self.parser);
        let generator = Arc::new(self.generator);
        let storage = Arc::new(self.storage);
        let mailer = Arc::new(self.mailer);

        let collaborators = Collaborators {
            parser: parser.clone(),
            generator: generator.clone(),
            assembler: Arc::new(ScriptedAssembler {
                fail: self.assembler_fails,
            }),
            storage: storage.clone(),
            mailer: mailer.clone(),
        };
        let config = PipelineConfig {
            generation_delay: self.delay,
            report_output_dir: PathBuf::from("/reports"),
            ..PipelineConfig::default()
        };
        let cancel = CancellationToken::new();
        let durable = Arc::new(FaultyStore {
            inner: store.clone(),
            fault: self.store_fault,
        });
        let ctx = PipelineContext::new(durable, collaborators, config, cancel.clone());

        Harness {
            status: StatusQuery::new(ctx.jobs.clone()),
            launcher: PipelineLauncher::new(ctx),
            store,
            parser,
            generator,
            storage,
            mailer,
            cancel,
            owner_id,
        }
    }
}

impl Harness {
    pub async fn engagement(&self, approaches: &[&str], model_path: Option<&str>) -> DbId {
        self.store
            .insert_engagement(CreateEngagement {
                owner_id: self.owner_id,
                report_type: "409A".to_string(),
                company_name: "Acme Corp".to_string(),
                valuation_date: NaiveDate::from_ymd_opt(2026, 6, 30).unwrap(),
                model_file_path: model_path.map(str::to_string),
                selected_approaches: approaches.iter().map(|a| a.to_string()).collect(),
                qualitative_context: Some("Closed Series B in May.".to_string()),
            })
            .await
            .id
    }

    pub async fn default_engagement(&self) -> DbId {
        self.engagement(&["income", "market", "asset"], Some("/uploads/acme.json"))
            .await
    }

    /// Wait until every spawned run has reached a terminal state.
    pub async fn settle(&self) {
        let tasks = &self.launcher.context().tasks;
        tasks.close();
        tasks.wait().await;
        tasks.reopen();
    }

    /// Poll the job until it is terminal, collecting every distinct state.
    pub async fn observe(&self, job_id: JobId) -> Vec<JobStatusView> {
        let mut seen: Vec<JobStatusView> = Vec::new();
        loop {
            let view = self
                .status
                .get_status(job_id)
                .await
                .expect("job disappeared while observed");
            let terminal = view.status.is_terminal();
            if seen.last() != Some(&view) {
                seen.push(view);
            }
            if terminal {
                return seen;
            }
            tokio::task::yield_now().await;
        }
    }
}
