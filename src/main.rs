use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use std::{fmt::Debug, path::PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use soundweb_server::background_jobs::jobs::{GraphRebuildJob, SourceRefreshJob};
use soundweb_server::background_jobs::{create_scheduler, HookEvent, JobContext};
use soundweb_server::cache::{CacheStore, InMemoryCacheStore};
use soundweb_server::config;
use soundweb_server::graph_store::{GraphStore, SqliteGraphStore};
use soundweb_server::query::GraphQueryService;
use soundweb_server::server::{metrics, run_server, RequestsLoggingLevel, ServerConfig};

const CACHE_PURGE_INTERVAL: Duration = Duration::from_secs(15 * 60);

fn parse_path(s: &str) -> Result<PathBuf, String> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(format!("Error resolving path '{}': {}", s, msg));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir().map_err(|e| format!("Failed to get current dir: {}", e))?;
    Ok(cwd.join(original_path))
}

fn parse_dir(s: &str) -> Result<PathBuf, String> {
    let path = parse_path(s)?;
    if !path.exists() {
        return Err(format!("Directory does not exist: {}", s));
    }
    if !path.is_dir() {
        return Err(format!("Path is not a directory: {}", s));
    }
    Ok(path)
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to TOML configuration file. Values in the file override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Directory holding genre_map.json and the source snapshots.
    /// Can also be specified in config file.
    #[clap(long, value_parser = parse_dir)]
    pub data_dir: Option<PathBuf>,

    /// Directory for graph.db. Defaults to the data directory.
    #[clap(long, value_parser = parse_dir)]
    pub db_dir: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,

    /// The port for the metrics server (Prometheus scraping).
    #[clap(long, default_value_t = 9091)]
    pub metrics_port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Last.fm API key.
    #[clap(long, env = "LASTFM_API_KEY")]
    pub lastfm_api_key: Option<String>,

    /// Spotify client id (client-credentials flow).
    #[clap(long, env = "SPOTIFY_CLIENT_ID")]
    pub spotify_client_id: Option<String>,

    /// Spotify client secret.
    #[clap(long, env = "SPOTIFY_CLIENT_SECRET")]
    pub spotify_client_secret: Option<String>,
}

/// Convert CLI args to CliConfig for config resolution
impl From<&CliArgs> for config::CliConfig {
    fn from(args: &CliArgs) -> Self {
        config::CliConfig {
            data_dir: args.data_dir.clone(),
            db_dir: args.db_dir.clone(),
            port: args.port,
            metrics_port: args.metrics_port,
            logging_level: args.logging_level.clone(),
            lastfm_api_key: args.lastfm_api_key.clone(),
            spotify_client_id: args.spotify_client_id.clone(),
            spotify_client_secret: args.spotify_client_secret.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    // Load TOML config if provided
    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            Some(config::FileConfig::load(path)?)
        }
        None => None,
    };

    // Resolve final configuration (TOML overrides CLI)
    let cli_config: config::CliConfig = (&cli_args).into();
    let app_config = config::AppConfig::resolve(&cli_config, file_config)?;
    info!("Configuration resolved:");
    info!("  data_dir: {:?}", app_config.data_dir);
    info!("  db_dir: {:?}", app_config.db_dir);
    info!("  port: {}", app_config.port);
    info!("  cache ttl: {}s", app_config.cache.ttl_secs);

    info!("Initializing metrics...");
    metrics::init_metrics();

    info!("Opening graph database at {:?}...", app_config.graph_db_path());
    let graph_store: Arc<dyn GraphStore> =
        Arc::new(SqliteGraphStore::new(app_config.graph_db_path())?);
    let cache_store = Arc::new(InMemoryCacheStore::new());

    match graph_store.summary() {
        Ok(summary) => {
            metrics::set_graph_size(summary.artists_count, summary.links_count);
            match summary.sync_token {
                Some(token) => info!(
                    "Serving graph {} ({} artists, {} links)",
                    token, summary.artists_count, summary.links_count
                ),
                None => warn!("No graph has been published yet"),
            }
        }
        Err(e) => error!("Failed to read graph summary: {:#}", e),
    }

    let query_service = Arc::new(GraphQueryService::new(
        graph_store.clone(),
        cache_store.clone() as Arc<dyn CacheStore>,
        app_config.cache.ttl(),
    ));

    // Set up background job scheduler
    let shutdown_token = CancellationToken::new();
    let (hook_sender, hook_receiver) = tokio::sync::mpsc::channel(100);

    let job_context = JobContext::new(
        shutdown_token.child_token(),
        graph_store.clone(),
        cache_store.clone() as Arc<dyn CacheStore>,
        tokio::runtime::Handle::current(),
        hook_sender.clone(),
    );

    let (mut scheduler, scheduler_handle) =
        create_scheduler(hook_receiver, shutdown_token.clone(), job_context);

    let data_files = app_config.data_files();
    scheduler
        .register_job(Arc::new(GraphRebuildJob::new(
            data_files.clone(),
            app_config.pipeline.clone(),
            app_config.cache.ttl(),
        )))
        .await;

    if app_config.sources.has_credentials() {
        match SourceRefreshJob::new(
            app_config.sources.clone(),
            data_files,
            app_config.pipeline.refresh_interval(),
        ) {
            Ok(job) => {
                scheduler.register_job(Arc::new(job)).await;
                info!("Registered source refresh job");
            }
            Err(e) => error!("Failed to create source refresh job: {}", e),
        }
    } else {
        info!("Source API credentials not configured, source refresh disabled");
    }

    info!(
        "Job scheduler initialized with {} job(s)",
        scheduler.job_count().await
    );

    if let Err(e) = hook_sender.send(HookEvent::OnStartup).await {
        error!("Failed to send startup hook: {}", e);
    }

    // Expired cache entries are only dropped on read otherwise
    let purge_cache = cache_store.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CACHE_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            match purge_cache.purge_expired() {
                Ok(0) => {}
                Ok(count) => info!("Purged {} expired cache entries", count),
                Err(e) => error!("Failed to purge cache: {:#}", e),
            }
        }
    });

    let server_config = ServerConfig {
        requests_logging_level: app_config.logging_level.clone(),
        port: app_config.port,
        metrics_port: app_config.metrics_port,
    };

    info!("Ready to serve at port {}!", app_config.port);
    info!("Metrics available at port {}!", app_config.metrics_port);

    // Run HTTP server and job scheduler concurrently
    tokio::select! {
        result = run_server(
            server_config,
            query_service,
            Some(scheduler_handle),
            shutdown_token.clone(),
        ) => {
            info!("HTTP server stopped: {:?}", result);
            shutdown_token.cancel();
            result
        },
        _ = scheduler.run() => {
            info!("Scheduler stopped");
            Ok(())
        },
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, initiating graceful shutdown");
            shutdown_token.cancel();
            // Give the scheduler a moment to shut down gracefully
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok(())
        }
    }
}
