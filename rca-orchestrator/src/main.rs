use axum::http::{header, Method};
use ractor::Actor;
use rca_orchestrator::actors::investigation::{
    InvestigationActor, InvestigationArguments, Orchestrator,
};
use rca_orchestrator::api;
use rca_orchestrator::config::InvestigationConfig;
use rca_orchestrator::oracle::HttpReasoningOracle;
use rca_orchestrator::tools::http::HttpToolTransport;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

fn load_env_file() {
    let cwd = match std::env::current_dir() {
        Ok(dir) => dir,
        Err(e) => {
            tracing::warn!(error = %e, "Could not determine current directory for .env lookup");
            return;
        }
    };

    let mut current = cwd.clone();
    loop {
        let candidate = current.join(".env");
        if candidate.exists() {
            match dotenvy::from_path(&candidate) {
                Ok(_) => {
                    tracing::info!(path = %candidate.display(), "Loaded environment from .env");
                }
                Err(e) => {
                    tracing::warn!(
                        path = %candidate.display(),
                        error = %e,
                        "Failed to load .env file"
                    );
                }
            }
            return;
        }

        if !current.pop() {
            break;
        }
    }

    tracing::info!(
        cwd = %cwd.display(),
        "No .env file found in current directory or ancestors; using process environment only"
    );
}

fn startup_error(err: impl std::fmt::Display) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, err.to_string())
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load .env before config so RCA_* overrides and the oracle key are visible.
    load_env_file();

    tracing::info!("Starting RCA Orchestrator API Server");

    let config = InvestigationConfig::load().map_err(startup_error)?;
    tracing::info!(
        max_tool_calls_per_task = config.max_tool_calls_per_task,
        max_parallel_tasks = config.max_parallel_tasks_per_iteration,
        max_supervisor_iterations = config.max_supervisor_iterations,
        oracle = %config.oracle.base_url,
        tools = %config.tools.base_url,
        "Investigation config loaded"
    );

    let oracle = HttpReasoningOracle::new(&config.oracle, config.oracle_call_timeout())
        .map_err(startup_error)?;
    let tools = HttpToolTransport::new(config.tools.base_url.clone(), config.tool_call_timeout())
        .map_err(startup_error)?;
    let bind_addr = config.bind_addr.clone();

    let orchestrator = Orchestrator::new(Arc::new(oracle), Arc::new(tools), config);
    let (investigation, _handle) = Actor::spawn(
        Some("investigation.default".to_string()),
        InvestigationActor,
        InvestigationArguments { orchestrator },
    )
    .await
    .map_err(startup_error)?;

    tracing::info!("InvestigationActor started");

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::AUTHORIZATION])
        .max_age(std::time::Duration::from_secs(3600));

    let api_state = api::ApiState { investigation };
    let app = api::router()
        .with_state(api_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    tracing::info!(addr = %bind_addr, "Starting HTTP server");
    let listener = TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await
}
