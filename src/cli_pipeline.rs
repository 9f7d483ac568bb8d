//! Graph Pipeline Tool
//!
//! Runs the source refresh and the graph rebuild once, outside the server.
//! A running server picks up a new graph on its next query because the
//! published sync token changes.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use soundweb_server::cache::{CacheStore, InMemoryCacheStore};
use soundweb_server::config::{self, AppConfig, CliConfig};
use soundweb_server::export::GraphExporter;
use soundweb_server::graph_store::{GraphStore, SqliteGraphStore};
use soundweb_server::pipeline::{
    rebuild_graph, refresh_sources, RebuildReport, RefreshReport, SourceClients,
};

#[derive(Parser, Debug)]
#[command(name = "soundweb-pipeline")]
#[command(about = "Fetch source snapshots and rebuild the artist graph")]
struct Args {
    /// Path to TOML configuration file. Values in the file override CLI arguments.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding genre_map.json and the source snapshots.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Directory for graph.db. Defaults to the data directory.
    #[arg(long)]
    db_dir: Option<PathBuf>,

    /// Last.fm API key.
    #[arg(long, env = "LASTFM_API_KEY")]
    lastfm_api_key: Option<String>,

    /// Spotify client id (client-credentials flow).
    #[arg(long, env = "SPOTIFY_CLIENT_ID")]
    spotify_client_id: Option<String>,

    /// Spotify client secret.
    #[arg(long, env = "SPOTIFY_CLIENT_SECRET")]
    spotify_client_secret: Option<String>,

    /// Hide progress bars.
    #[arg(long, default_value_t = false)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Fetch the three sources into snapshot files.
    Fetch,

    /// Rebuild and publish the graph from the current snapshots.
    Rebuild,

    /// Fetch, then rebuild.
    All,
}

#[derive(Serialize, Default)]
struct PipelineOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    refresh: Option<RefreshReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rebuild: Option<RebuildReport>,
}

fn create_progress_bar(quiet: bool) -> Result<ProgressBar> {
    let pb = ProgressBar::new(0);
    if quiet {
        pb.set_draw_target(indicatif::ProgressDrawTarget::hidden());
    } else {
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{msg:12} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec}, ETA: {eta})")?
                .progress_chars("=> "),
        );
    }
    Ok(pb)
}

async fn run_fetch(
    app_config: &AppConfig,
    quiet: bool,
    cancel: &CancellationToken,
) -> Result<RefreshReport> {
    if !app_config.sources.has_credentials() {
        bail!("fetch needs --lastfm-api-key, --spotify-client-id and --spotify-client-secret");
    }
    let clients = SourceClients::from_settings(&app_config.sources)?;
    let pb = create_progress_bar(quiet)?;

    let report = refresh_sources(
        &clients,
        &app_config.sources,
        &app_config.data_files(),
        cancel,
        Some(&pb),
    )
    .await;
    pb.finish_and_clear();
    Ok(report?)
}

fn run_rebuild(app_config: &AppConfig, cancel: &CancellationToken) -> Result<RebuildReport> {
    info!("Opening graph database at {:?}...", app_config.graph_db_path());
    let graph_store: Arc<dyn GraphStore> = Arc::new(
        SqliteGraphStore::new(app_config.graph_db_path()).context("Failed to open graph store")?,
    );
    let cache_store: Arc<dyn CacheStore> = Arc::new(InMemoryCacheStore::new());
    let exporter = GraphExporter::new(graph_store, cache_store, app_config.cache.ttl());

    Ok(rebuild_graph(
        &app_config.data_files(),
        &app_config.pipeline,
        &exporter,
        cancel,
    )?)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = match &args.config {
        Some(path) => Some(config::FileConfig::load(path)?),
        None => None,
    };
    let cli_config = CliConfig {
        data_dir: args.data_dir.clone(),
        db_dir: args.db_dir.clone(),
        lastfm_api_key: args.lastfm_api_key.clone(),
        spotify_client_id: args.spotify_client_id.clone(),
        spotify_client_secret: args.spotify_client_secret.clone(),
        ..Default::default()
    };
    let app_config = AppConfig::resolve(&cli_config, file_config)?;

    let cancel = CancellationToken::new();
    let ctrl_c_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Received Ctrl+C, stopping after the current stage");
            ctrl_c_token.cancel();
        }
    });

    let mut output = PipelineOutput::default();

    if matches!(args.command, Command::Fetch | Command::All) {
        output.refresh = Some(run_fetch(&app_config, args.quiet, &cancel).await?);
    }

    if matches!(args.command, Command::Rebuild | Command::All) {
        let rebuild_config = app_config.clone();
        let rebuild_cancel = cancel.clone();
        let report =
            tokio::task::spawn_blocking(move || run_rebuild(&rebuild_config, &rebuild_cancel))
                .await
                .context("Rebuild task panicked")??;
        output.rebuild = Some(report);
    }

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
