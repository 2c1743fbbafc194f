use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vantage_api::background::{job_eviction, report_retention};
use vantage_api::config::ServerConfig;
use vantage_api::router::build_app_router;
use vantage_api::state::AppState;
use vantage_events::{EmailConfig, EmailDelivery, LogMailer, Mailer};
use vantage_pipeline::collaborators::{
    HttpGeneratorConfig, HttpTextGenerator, JsonModelParser, LocalFileStorage, MarkdownAssembler,
};
use vantage_pipeline::config::env_required;
use vantage_pipeline::reconcile::reconcile_interrupted;
use vantage_pipeline::{Collaborators, PgReportStore, PipelineConfig, PipelineContext, ReportStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "vantage_api=debug,vantage_pipeline=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env().context("Invalid server configuration")?;
    let pipeline_config = PipelineConfig::from_env().context("Invalid pipeline configuration")?;
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = env_required("DATABASE_URL")?;

    let pool = vantage_db::create_pool(&database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connection pool created");

    vantage_db::health_check(&pool)
        .await
        .context("Database health check failed")?;
    tracing::info!("Database health check passed");

    vantage_db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");

    let store: Arc<dyn ReportStore> = Arc::new(PgReportStore::new(pool));

    // Job records do not survive a restart; nothing can still be running.
    let reset = reconcile_interrupted(store.as_ref())
        .await
        .context("Failed to reconcile interrupted report runs")?;
    if reset > 0 {
        tracing::warn!(reset, "Moved interrupted engagements to ERROR");
    }

    // --- Collaborators ---
    let mailer: Arc<dyn Mailer> = match EmailConfig::from_env() {
        Some(email) => {
            tracing::info!(smtp_host = %email.smtp_host, "Email delivery enabled");
            Arc::new(EmailDelivery::new(email))
        }
        None => {
            tracing::warn!("SMTP_HOST not set, notification emails will only be logged");
            Arc::new(LogMailer)
        }
    };

    let generator_config = HttpGeneratorConfig::from_env().context("Invalid LLM configuration")?;
    if generator_config.api_key.is_none() {
        tracing::warn!("LLM_API_KEY not set, generated sections will be flagged placeholders");
    }
    let generator = HttpTextGenerator::new(generator_config)
        .context("Failed to build text generation client")?;

    let collaborators = Collaborators {
        parser: Arc::new(JsonModelParser),
        generator: Arc::new(generator),
        assembler: Arc::new(MarkdownAssembler),
        storage: Arc::new(LocalFileStorage),
        mailer,
    };

    // --- Pipeline ---
    let cancel = CancellationToken::new();
    let pipeline =
        PipelineContext::new(store.clone(), collaborators, pipeline_config, cancel.clone());

    let eviction_handle = tokio::spawn(job_eviction::run(
        pipeline.jobs.clone(),
        pipeline.config.job_eviction_interval,
        cancel.clone(),
    ));
    let retention_handle = tokio::spawn(report_retention::run(
        store,
        pipeline.collaborators.storage.clone(),
        report_retention::PURGE_INTERVAL,
        cancel.clone(),
    ));
    tracing::info!("Background tasks started (job eviction, report retention)");

    // --- Router ---
    let tasks = pipeline.tasks.clone();
    let shutdown_timeout = Duration::from_secs(config.shutdown_timeout_secs);
    let state = AppState::new(config.clone(), pipeline);
    let app = build_app_router(state, &config)?;

    // --- Start server ---
    let host: IpAddr = config
        .host
        .parse()
        .with_context(|| format!("Invalid HOST address '{}'", config.host))?;
    let addr = SocketAddr::new(host, config.port);
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    // In-flight runs observe the token at their next suspension point and
    // fail their job, leaving the engagement in ERROR.
    cancel.cancel();
    tasks.close();
    if tokio::time::timeout(shutdown_timeout, tasks.wait()).await.is_err() {
        tracing::warn!(
            remaining = tasks.len(),
            "Report runs did not settle before the shutdown timeout",
        );
    }

    let _ = tokio::time::timeout(Duration::from_secs(5), eviction_handle).await;
    let _ = tokio::time::timeout(Duration::from_secs(5), retention_handle).await;
    tracing::info!("Background tasks stopped");

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
