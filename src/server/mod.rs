use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    http::{header, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::pipeline::PipelineController;

pub mod error;
pub mod routes_config;
pub mod routes_logs;
pub mod routes_pipeline;

pub use error::AppError;

/// Shared application context
#[derive(Clone)]
pub struct AppContext {
    pub controller: Arc<PipelineController>,
}

impl AppContext {
    pub fn new(controller: Arc<PipelineController>) -> Self {
        Self { controller }
    }
}

/// Create the Axum router with all routes
pub fn create_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

fn api_routes() -> Router<AppContext> {
    Router::new()
        .merge(routes_pipeline::pipeline_routes())
        .merge(routes_config::config_routes())
        .merge(routes_logs::log_routes())
}

async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}

/// Serve the control plane until `shutdown` resolves.
///
/// Stopping the pipeline afterwards is the caller's job.
pub async fn serve<F>(ctx: AppContext, host: &str, port: u16, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listen_addr(host, port)?;
    let app = create_router(ctx);

    tracing::info!("Starting control plane on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Socket address for `host`, which may be a bare IPv6 literal.
fn listen_addr(host: &str, port: u16) -> Result<SocketAddr> {
    let ip: IpAddr = host
        .trim_start_matches('[')
        .trim_end_matches(']')
        .parse()
        .with_context(|| format!("Invalid server address: {host}"))?;
    Ok(SocketAddr::new(ip, port))
}

/// Resolves on the first SIGINT or SIGTERM.
///
/// The handlers are installed when this is called, not when the future is
/// first polled, so a signal that arrives while the pipeline is still
/// starting is not lost. Must be called from within a Tokio runtime.
#[cfg(unix)]
pub fn shutdown_signal() -> impl Future<Output = ()> + Send + 'static {
    use signal::unix::{signal, SignalKind};

    let interrupt = signal(SignalKind::interrupt());
    let terminate = signal(SignalKind::terminate());

    async move {
        tokio::select! {
            _ = wait_for(interrupt, "SIGINT") => {},
            _ = wait_for(terminate, "SIGTERM") => {},
        }
        tracing::info!("Shutdown signal received");
    }
}

#[cfg(unix)]
async fn wait_for(sig: std::io::Result<signal::unix::Signal>, name: &str) {
    match sig {
        Ok(mut sig) => {
            sig.recv().await;
        }
        Err(e) => {
            tracing::error!("Failed to install {name} handler: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
pub fn shutdown_signal() -> impl Future<Output = ()> + Send + 'static {
    async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
        tracing::info!("Shutdown signal received");
    }
}
