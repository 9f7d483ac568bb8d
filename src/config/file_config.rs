use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub data_dir: Option<String>,
    pub db_dir: Option<String>,
    pub port: Option<u16>,
    pub metrics_port: Option<u16>,
    pub logging_level: Option<String>,

    // Feature configs
    pub sources: Option<SourcesConfig>,
    pub pipeline: Option<PipelineConfig>,
    pub cache: Option<CacheConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct SourcesConfig {
    pub lastfm_api_key: Option<String>,
    pub spotify_client_id: Option<String>,
    pub spotify_client_secret: Option<String>,
    pub musicbrainz_user_agent: Option<String>,
    pub top_artist_pages: Option<u32>,
    pub max_artist_lookup: Option<usize>,
    pub similar_artists_limit: Option<usize>,
    pub fetch_concurrency: Option<usize>,
    pub retry_attempts: Option<u32>,
    pub retry_delay_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct PipelineConfig {
    pub top_genre_count: Option<usize>,
    pub rebuild_interval_hours: Option<u64>,
    pub refresh_interval_hours: Option<u64>,
    pub rebuild_on_startup: Option<bool>,
    /// Extent of the raw genre-map coordinates.
    pub genre_map_max_x: Option<f64>,
    pub genre_map_max_y: Option<f64>,
    /// Extent of the graph layout.
    pub graph_max_x: Option<f64>,
    pub graph_max_y: Option<f64>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_secs: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
