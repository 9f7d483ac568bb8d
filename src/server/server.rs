use anyhow::{Context, Result};
use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    extract::State, middleware, response::IntoResponse, routing::get, Json, Router,
};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::info;

use super::admin_routes::make_admin_routes;
use super::graph_routes::make_graph_routes;
use super::metrics::metrics_handler;
use super::{log_requests, state::*, ServerConfig};
use crate::background_jobs::SchedulerHandle;
use crate::query::GraphQueryService;

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub hash: String,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        hash: state.hash.clone(),
    };
    Json(stats)
}

pub fn make_app(
    config: ServerConfig,
    query_service: Arc<GraphQueryService>,
    scheduler_handle: Option<SchedulerHandle>,
) -> Router {
    let state = ServerState::new(config, query_service, scheduler_handle);

    let home_router: Router = Router::new()
        .route("/", get(home))
        .with_state(state.clone());

    Router::new()
        .merge(home_router)
        .nest("/v1/graph", make_graph_routes(state.clone()))
        .nest("/v1/admin", make_admin_routes(state.clone()))
        .layer(CorsLayer::permissive())
        .layer(middleware::from_fn_with_state(state, log_requests))
}

pub fn make_metrics_app() -> Router {
    Router::new().route("/metrics", get(metrics_handler))
}

async fn serve(
    name: &'static str,
    port: u16,
    app: Router,
    shutdown: CancellationToken,
) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {} server to {}", name, addr))?;
    info!("{} server listening on {}", name, addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .with_context(|| format!("{} server failed", name))
}

/// Serve the graph API and the metrics endpoint until `shutdown` fires.
pub async fn run_server(
    config: ServerConfig,
    query_service: Arc<GraphQueryService>,
    scheduler_handle: Option<SchedulerHandle>,
    shutdown: CancellationToken,
) -> Result<()> {
    let port = config.port;
    let metrics_port = config.metrics_port;
    let app = make_app(config, query_service, scheduler_handle);

    let metrics_server = serve("Metrics", metrics_port, make_metrics_app(), shutdown.clone());
    let api_server = serve("HTTP", port, app, shutdown);

    tokio::try_join!(api_server, metrics_server)?;
    Ok(())
}
