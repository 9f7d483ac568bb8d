mod file_config;

pub use file_config::{CacheConfig, FileConfig, PipelineConfig, SourcesConfig};

use crate::data_files::DataDir;
use crate::genre_map::CoordinateSpace;
use crate::server::RequestsLoggingLevel;
use anyhow::{bail, Result};
use clap::ValueEnum;
use std::path::PathBuf;
use std::time::Duration;

pub const GRAPH_DB_FILE: &str = "graph.db";
pub const DEFAULT_MUSICBRAINZ_USER_AGENT: &str = "soundweb-server/0.3";

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub data_dir: Option<PathBuf>,
    pub db_dir: Option<PathBuf>,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub lastfm_api_key: Option<String>,
    pub spotify_client_id: Option<String>,
    pub spotify_client_secret: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Core settings
    pub data_dir: PathBuf,
    pub db_dir: PathBuf,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,

    // Feature configs (with defaults)
    pub sources: SourcesSettings,
    pub pipeline: PipelineSettings,
    pub cache: CacheSettings,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let data_dir = file
            .data_dir
            .map(PathBuf::from)
            .or_else(|| cli.data_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("data_dir must be specified via --data-dir or in config file")
            })?;

        if !data_dir.exists() {
            bail!("Data directory does not exist: {:?}", data_dir);
        }
        if !data_dir.is_dir() {
            bail!("data_dir is not a directory: {:?}", data_dir);
        }

        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .unwrap_or_else(|| data_dir.clone());
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);

        let logging_level = file
            .logging_level
            .and_then(|s| parse_logging_level(&s))
            .unwrap_or_else(|| cli.logging_level.clone());

        let sources = SourcesSettings::resolve(cli, file.sources.unwrap_or_default());
        let pipeline = PipelineSettings::resolve(file.pipeline.unwrap_or_default())?;

        let cache_file = file.cache.unwrap_or_default();
        let cache = CacheSettings {
            ttl_secs: cache_file.ttl_secs.unwrap_or(3600),
        };
        if cache.ttl_secs == 0 {
            bail!("cache.ttl_secs must be greater than zero");
        }

        Ok(Self {
            data_dir,
            db_dir,
            port,
            metrics_port,
            logging_level,
            sources,
            pipeline,
            cache,
        })
    }

    pub fn graph_db_path(&self) -> PathBuf {
        self.db_dir.join(GRAPH_DB_FILE)
    }

    pub fn data_files(&self) -> DataDir {
        DataDir::new(&self.data_dir)
    }
}

#[derive(Debug, Clone)]
pub struct SourcesSettings {
    pub lastfm_api_key: Option<String>,
    pub spotify_client_id: Option<String>,
    pub spotify_client_secret: Option<String>,
    pub musicbrainz_user_agent: String,
    pub top_artist_pages: u32,
    pub max_artist_lookup: usize,
    pub similar_artists_limit: usize,
    pub fetch_concurrency: usize,
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
}

impl Default for SourcesSettings {
    fn default() -> Self {
        Self {
            lastfm_api_key: None,
            spotify_client_id: None,
            spotify_client_secret: None,
            musicbrainz_user_agent: DEFAULT_MUSICBRAINZ_USER_AGENT.to_string(),
            top_artist_pages: 20,
            max_artist_lookup: 1000,
            similar_artists_limit: 10,
            fetch_concurrency: 4,
            retry_attempts: 3,
            retry_delay_ms: 5000,
        }
    }
}

impl SourcesSettings {
    fn resolve(cli: &CliConfig, file: SourcesConfig) -> Self {
        let defaults = Self::default();
        Self {
            lastfm_api_key: file.lastfm_api_key.or_else(|| cli.lastfm_api_key.clone()),
            spotify_client_id: file
                .spotify_client_id
                .or_else(|| cli.spotify_client_id.clone()),
            spotify_client_secret: file
                .spotify_client_secret
                .or_else(|| cli.spotify_client_secret.clone()),
            musicbrainz_user_agent: file
                .musicbrainz_user_agent
                .unwrap_or(defaults.musicbrainz_user_agent),
            top_artist_pages: file.top_artist_pages.unwrap_or(defaults.top_artist_pages),
            max_artist_lookup: file.max_artist_lookup.unwrap_or(defaults.max_artist_lookup),
            similar_artists_limit: file
                .similar_artists_limit
                .unwrap_or(defaults.similar_artists_limit),
            fetch_concurrency: file
                .fetch_concurrency
                .unwrap_or(defaults.fetch_concurrency)
                .max(1),
            retry_attempts: file.retry_attempts.unwrap_or(defaults.retry_attempts),
            retry_delay_ms: file.retry_delay_ms.unwrap_or(defaults.retry_delay_ms),
        }
    }

    /// Source refresh needs Last.fm for the artist list and Spotify for the
    /// catalog; MusicBrainz is keyless.
    pub fn has_credentials(&self) -> bool {
        self.lastfm_api_key.is_some()
            && self.spotify_client_id.is_some()
            && self.spotify_client_secret.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub top_genre_count: usize,
    pub rebuild_interval_hours: u64,
    pub refresh_interval_hours: u64,
    pub rebuild_on_startup: bool,
    pub coordinate_space: CoordinateSpace,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            top_genre_count: 10,
            rebuild_interval_hours: 24,
            refresh_interval_hours: 168,
            rebuild_on_startup: true,
            coordinate_space: CoordinateSpace::default(),
        }
    }
}

impl PipelineSettings {
    fn resolve(file: PipelineConfig) -> Result<Self> {
        let defaults = Self::default();
        let space = defaults.coordinate_space;
        let coordinate_space = CoordinateSpace {
            source_max_x: file.genre_map_max_x.unwrap_or(space.source_max_x),
            source_max_y: file.genre_map_max_y.unwrap_or(space.source_max_y),
            graph_max_x: file.graph_max_x.unwrap_or(space.graph_max_x),
            graph_max_y: file.graph_max_y.unwrap_or(space.graph_max_y),
        };
        let extents = [
            coordinate_space.source_max_x,
            coordinate_space.source_max_y,
            coordinate_space.graph_max_x,
            coordinate_space.graph_max_y,
        ];
        if extents.iter().any(|v| !v.is_finite() || *v <= 0.0) {
            bail!("pipeline coordinate extents must be positive numbers");
        }

        let settings = Self {
            top_genre_count: file.top_genre_count.unwrap_or(defaults.top_genre_count),
            rebuild_interval_hours: file
                .rebuild_interval_hours
                .unwrap_or(defaults.rebuild_interval_hours),
            refresh_interval_hours: file
                .refresh_interval_hours
                .unwrap_or(defaults.refresh_interval_hours),
            rebuild_on_startup: file
                .rebuild_on_startup
                .unwrap_or(defaults.rebuild_on_startup),
            coordinate_space,
        };
        if settings.rebuild_interval_hours == 0 || settings.refresh_interval_hours == 0 {
            bail!("pipeline intervals must be at least one hour");
        }
        Ok(settings)
    }

    pub fn rebuild_interval(&self) -> Duration {
        Duration::from_secs(self.rebuild_interval_hours * 3600)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_hours * 3600)
    }
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub ttl_secs: u64,
}

impl CacheSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self { ttl_secs: 3600 }
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
