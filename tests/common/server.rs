//! Test server lifecycle management
//!
//! This module manages spawning and shutting down test HTTP servers.
//! Each test gets an isolated server with its own data directory, graph
//! database and cache.

use super::constants::*;
use super::fixtures::{create_test_data_dir, pipeline_settings};
use soundweb_server::background_jobs::jobs::GraphRebuildJob;
use soundweb_server::background_jobs::{create_scheduler, JobContext};
use soundweb_server::cache::{CacheStore, InMemoryCacheStore};
use soundweb_server::export::GraphExporter;
use soundweb_server::graph_store::{GraphStore, SqliteGraphStore};
use soundweb_server::pipeline::{rebuild_graph, RebuildReport};
use soundweb_server::query::GraphQueryService;
use soundweb_server::server::{make_app, RequestsLoggingLevel, ServerConfig};
use soundweb_server::DataDir;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

const CACHE_TTL: Duration = Duration::from_secs(300);

/// Test server instance with isolated data directory and database
///
/// When dropped, the server and its scheduler shut down and temp resources
/// are cleaned up.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// The port the server is listening on
    pub port: u16,

    /// Data directory holding the seeded snapshots
    pub data_dir: DataDir,

    /// Exporter over the server's stores, for rebuilding from tests
    pub exporter: GraphExporter,

    // Private fields - keep resources alive until drop
    _temp_data_dir: TempDir,
    _temp_db_dir: TempDir,
    shutdown_token: CancellationToken,
}

impl TestServer {
    /// Spawns a test server with the seeded graph already published
    pub async fn spawn() -> Self {
        let server = Self::spawn_unpublished().await;
        server.rebuild();
        server
    }

    /// Spawns a test server on a random port without publishing a graph
    ///
    /// This function:
    /// 1. Creates a temporary data directory with the seeded snapshots
    /// 2. Opens a graph database in a second temporary directory
    /// 3. Starts a job scheduler with the graph rebuild job
    /// 4. Binds to a random port (127.0.0.1:0) and spawns the server
    /// 5. Waits for the server to be ready
    ///
    /// # Panics
    ///
    /// Panics if any resource cannot be created or the server doesn't
    /// become ready within timeout.
    pub async fn spawn_unpublished() -> Self {
        let (temp_data_dir, data_dir) =
            create_test_data_dir().expect("Failed to create test data dir");
        let temp_db_dir = TempDir::new().expect("Failed to create db dir");

        let graph_store: Arc<dyn GraphStore> = Arc::new(
            SqliteGraphStore::new(temp_db_dir.path().join("graph.db"))
                .expect("Failed to open graph store"),
        );
        let cache_store: Arc<dyn CacheStore> = Arc::new(InMemoryCacheStore::new());
        let exporter = GraphExporter::new(graph_store.clone(), cache_store.clone(), CACHE_TTL);
        let query_service = Arc::new(GraphQueryService::new(
            graph_store.clone(),
            cache_store.clone(),
            CACHE_TTL,
        ));

        // Scheduler with the rebuild job only; sources need real API keys
        let shutdown_token = CancellationToken::new();
        let (hook_sender, hook_receiver) = tokio::sync::mpsc::channel(16);
        let job_context = JobContext::new(
            shutdown_token.child_token(),
            graph_store,
            cache_store,
            tokio::runtime::Handle::current(),
            hook_sender,
        );
        let (mut scheduler, scheduler_handle) =
            create_scheduler(hook_receiver, shutdown_token.clone(), job_context);
        scheduler
            .register_job(Arc::new(GraphRebuildJob::new(
                data_dir.clone(),
                pipeline_settings(),
                CACHE_TTL,
            )))
            .await;
        tokio::spawn(async move { scheduler.run().await });

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let config = ServerConfig {
            requests_logging_level: RequestsLoggingLevel::None,
            port,
            metrics_port: 0,
        };
        let app = make_app(config, query_service, Some(scheduler_handle));

        let server_shutdown = shutdown_token.clone();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { server_shutdown.cancelled().await })
                .await
                .expect("Server failed");
        });

        let server = Self {
            base_url,
            port,
            data_dir,
            exporter,
            _temp_data_dir: temp_data_dir,
            _temp_db_dir: temp_db_dir,
            shutdown_token,
        };

        server.wait_for_ready().await;

        server
    }

    /// Runs the rebuild pipeline against the server's stores
    pub fn rebuild(&self) -> RebuildReport {
        rebuild_graph(
            &self.data_dir,
            &pipeline_settings(),
            &self.exporter,
            &CancellationToken::new(),
        )
        .expect("Rebuild failed")
    }

    /// Waits for the server to become ready by polling the / endpoint
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => {
                    return;
                }
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown_token.cancel();
        // TempDir will be cleaned up automatically
    }
}
