use std::sync::Arc;

use vantage_pipeline::{PipelineContext, PipelineLauncher, ReportStore, StatusQuery};

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Durable engagement and report records.
    pub store: Arc<dyn ReportStore>,
    pub launcher: PipelineLauncher,
    /// Read side of the in-memory job records.
    pub status: StatusQuery,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Build the state around one pipeline instance.
    pub fn new(config: ServerConfig, pipeline: PipelineContext) -> Self {
        Self {
            store: pipeline.store.clone(),
            status: StatusQuery::new(pipeline.jobs.clone()),
            launcher: PipelineLauncher::new(pipeline),
            config: Arc::new(config),
        }
    }

    pub fn pipeline(&self) -> &PipelineContext {
        self.launcher.context()
    }
}
