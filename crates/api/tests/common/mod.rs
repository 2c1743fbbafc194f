//! Shared fixtures for API integration tests.
//!
//! The router runs against [`MemoryReportStore`], the real JSON parser,
//! Markdown assembler and local file storage (inside a temp dir), and a
//! scripted text generator, so no database or network is needed.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use chrono::NaiveDate;
use http_body_util::BodyExt;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;
use vantage_api::auth::jwt::{generate_access_token, JwtConfig};
use vantage_api::config::ServerConfig;
use vantage_api::router::build_app_router;
use vantage_api::state::AppState;
use vantage_core::roles::{ROLE_ADMIN, ROLE_ANALYST};
use vantage_core::types::DbId;
use vantage_db::models::engagement::{CreateEngagement, Engagement};
use vantage_events::LogMailer;
use vantage_pipeline::collaborators::{
    FileStorage, JsonModelParser, LocalFileStorage, MarkdownAssembler, StoredFile, TextGenerator,
};
use vantage_pipeline::{
    CollaboratorError, Collaborators, MemoryReportStore, PipelineConfig, PipelineContext,
};

pub const COMPANY: &str = "Acme Corp";
pub const REPORT_TYPE: &str = "409A";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            access_token_expiry_mins: 15,
        },
    }
}

// ---------------------------------------------------------------------------
// Generator
// ---------------------------------------------------------------------------

/// Answers every prompt, or never answers when `hang` is set.
#[derive(Default)]
pub struct ScriptedGenerator {
    pub hang: bool,
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate_text(
        &self,
        prompt: &str,
        _system_prompt: &str,
    ) -> Result<String, CollaboratorError> {
        tokio::task::yield_now().await;
        if self.hang {
            std::future::pending::<()>().await;
        }
        Ok(format!("Drafted text ({} prompt chars).", prompt.len()))
    }
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

/// Keeps documents in memory instead of on disk.
#[derive(Default)]
pub struct MemoryStorage {
    files: Mutex<HashMap<PathBuf, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.lock().unwrap().keys().cloned().collect()
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
// Test app
// ---------------------------------------------------------------------------

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<MemoryReportStore>,
    pub cancel: CancellationToken,
    pub dir: TempDir,
    pub owner_id: DbId,
    pub other_id: DbId,
}

pub async fn build_test_app() -> TestApp {
    build_with(ScriptedGenerator::default(), Arc::new(LocalFileStorage)).await
}

/// An app whose generation calls never return, so launched runs stay live.
pub async fn build_stalled_app() -> TestApp {
    build_with(ScriptedGenerator { hang: true }, Arc::new(LocalFileStorage)).await
}

/// An app whose reports never touch the filesystem.
pub async fn build_memory_storage_app() -> (TestApp, Arc<MemoryStorage>) {
    let storage = Arc::new(MemoryStorage::default());
    let app = build_with(ScriptedGenerator::default(), storage.clone()).await;
    (app, storage)
}

async fn build_with(generator: ScriptedGenerator, storage: Arc<dyn FileStorage>) -> TestApp {
    let dir = tempfile::tempdir().expect("temp dir");
    let store = Arc::new(MemoryReportStore::new());
    let owner_id = store.insert_user("owner@example.com").await;
    let other_id = store.insert_user("other@example.com").await;

    let collaborators = Collaborators {
        parser: Arc::new(JsonModelParser),
        generator: Arc::new(generator),
        assembler: Arc::new(MarkdownAssembler),
        storage,
        mailer: Arc::new(LogMailer),
    };
    let pipeline_config = PipelineConfig {
        generation_delay: Duration::ZERO,
        report_output_dir: dir.path().join("reports"),
        ..PipelineConfig::default()
    };
    let cancel = CancellationToken::new();
    let pipeline =
        PipelineContext::new(store.clone(), collaborators, pipeline_config, cancel.clone());

    let config = test_config();
    let state = AppState::new(config.clone(), pipeline);
    let router = build_app_router(state.clone(), &config).expect("valid test router");

    TestApp {
        router,
        state,
        store,
        cancel,
        dir,
        owner_id,
        other_id,
    }
}

impl TestApp {
    /// Write a valid model export and insert a DRAFT engagement using it.
    pub async fn engagement(&self, approaches: &[&str]) -> Engagement {
        let model_path = self.write_model();
        self.insert(Some(model_path.to_string_lossy().into_owned()), approaches)
            .await
    }

    pub async fn engagement_without_model(&self) -> Engagement {
        self.insert(None, &["income"]).await
    }

    async fn insert(&self, model_file_path: Option<String>, approaches: &[&str]) -> Engagement {
        self.store
            .insert_engagement(CreateEngagement {
                owner_id: self.owner_id,
                report_type: REPORT_TYPE.to_string(),
                company_name: COMPANY.to_string(),
                valuation_date: NaiveDate::from_ymd_opt(2026, 6, 30).expect("valid date"),
                model_file_path,
                selected_approaches: approaches.iter().map(|a| a.to_string()).collect(),
                qualitative_context: Some("Series B SaaS company".to_string()),
            })
            .await
    }

    fn write_model(&self) -> PathBuf {
        let path = self.dir.path().join("model.json");
        std::fs::write(
            &path,
            r#"{"errors":[],"warnings":[],"structuredData":{"revenue":[1200000,1800000]}}"#,
        )
        .expect("write model");
        path
    }

    pub fn owner_token(&self) -> String {
        token(self.owner_id, ROLE_ANALYST)
    }

    pub fn other_token(&self) -> String {
        token(self.other_id, ROLE_ANALYST)
    }

    pub fn admin_token(&self) -> String {
        token(999, ROLE_ADMIN)
    }

    /// Wait for every spawned run to finish.
    pub async fn settle(&self) {
        let tasks = &self.state.pipeline().tasks;
        tasks.close();
        tasks.wait().await;
        tasks.reopen();
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Response<Body> {
        send(self.router.clone(), Method::GET, uri, token).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>) -> Response<Body> {
        send(self.router.clone(), Method::POST, uri, token).await
    }
}

pub fn token(user_id: DbId, role: &str) -> String {
    generate_access_token(user_id, role, &test_config().jwt).expect("token generation")
}

async fn send(app: Router, method: Method, uri: &str, token: Option<&str>) -> Response<Body> {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header("authorization", format!("Bearer {token}"));
    }
    app.oneshot(request.body(Body::empty()).expect("valid request"))
        .await
        .expect("infallible router")
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .expect("readable body")
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).expect("JSON body")
}
