use super::{check_cancelled, status_label, PipelineError};
use crate::config::SourcesSettings;
use crate::data_files::DataDir;
use crate::server::metrics;
use crate::sources::{
    lookup_all, save_snapshots, ArtistLookup, FetchReport, LastFmClient, MusicBrainzClient,
    RetryPolicy, SourceArtist, SpotifyClient,
};
use anyhow::{anyhow, Context, Result};
use indicatif::ProgressBar;
use serde::Serialize;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// The three configured source clients.
pub struct SourceClients {
    pub lastfm: LastFmClient,
    pub spotify: SpotifyClient,
    pub musicbrainz: MusicBrainzClient,
}

impl SourceClients {
    pub fn from_settings(settings: &SourcesSettings) -> Result<Self> {
        let lastfm_key = settings
            .lastfm_api_key
            .as_deref()
            .ok_or_else(|| anyhow!("Last.fm API key is not configured"))?;
        let (Some(client_id), Some(client_secret)) = (
            settings.spotify_client_id.as_deref(),
            settings.spotify_client_secret.as_deref(),
        ) else {
            return Err(anyhow!("Spotify client credentials are not configured"));
        };

        Ok(Self {
            lastfm: LastFmClient::new(lastfm_key, settings.similar_artists_limit)
                .context("Failed to create Last.fm client")?,
            spotify: SpotifyClient::new(client_id, client_secret)
                .context("Failed to create Spotify client")?,
            musicbrainz: MusicBrainzClient::new(&settings.musicbrainz_user_agent)
                .context("Failed to create MusicBrainz client")?,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RefreshReport {
    pub chart_artists: usize,
    pub listening_history: FetchReport,
    pub catalog: FetchReport,
    pub registry: FetchReport,
    pub duration_ms: u128,
}

/// Collect the chart artist list from Last.fm, then fetch every source.
pub async fn refresh_sources(
    clients: &SourceClients,
    settings: &SourcesSettings,
    data_dir: &DataDir,
    cancel: &CancellationToken,
    progress: Option<&ProgressBar>,
) -> Result<RefreshReport, PipelineError> {
    let retry = RetryPolicy::new(settings);
    if let Some(pb) = progress {
        pb.set_message("Last.fm chart");
    }
    let names = clients
        .lastfm
        .top_artist_names(
            settings.top_artist_pages,
            settings.max_artist_lookup,
            &retry,
            cancel,
        )
        .await;

    fetch_snapshots(
        &names,
        &clients.lastfm,
        &clients.spotify,
        &clients.musicbrainz,
        settings,
        data_dir,
        cancel,
        progress,
    )
    .await
}

/// Fetch `names` from the three sources and replace the snapshot files.
///
/// The catalog is queried with the names the listening history resolved to;
/// the registry with the chart names. Snapshots are only written once all
/// three fetches have completed.
#[allow(clippy::too_many_arguments)]
pub async fn fetch_snapshots(
    names: &[String],
    history: &dyn ArtistLookup,
    catalog: &dyn ArtistLookup,
    registry: &dyn ArtistLookup,
    settings: &SourcesSettings,
    data_dir: &DataDir,
    cancel: &CancellationToken,
    progress: Option<&ProgressBar>,
) -> Result<RefreshReport, PipelineError> {
    let start = Instant::now();
    let result = run_fetch(
        names, history, catalog, registry, settings, data_dir, cancel, progress, start,
    )
    .await;
    metrics::record_pipeline_run("refresh", status_label(&result), start.elapsed());

    match &result {
        Ok(report) => info!(
            "Source refresh finished in {}ms: {} chart artists",
            report.duration_ms, report.chart_artists
        ),
        Err(e) if e.is_cancelled() => info!("Source refresh stopped: {}", e),
        Err(e) => warn!("Source refresh failed: {:#}", e),
    }
    result
}

#[allow(clippy::too_many_arguments)]
async fn run_fetch(
    names: &[String],
    history: &dyn ArtistLookup,
    catalog: &dyn ArtistLookup,
    registry: &dyn ArtistLookup,
    settings: &SourcesSettings,
    data_dir: &DataDir,
    cancel: &CancellationToken,
    progress: Option<&ProgressBar>,
    start: Instant,
) -> Result<RefreshReport, PipelineError> {
    check_cancelled(cancel, "listening history fetch")?;
    if names.is_empty() {
        return Err(anyhow!("No chart artists to fetch").into());
    }

    let retry = RetryPolicy::new(settings);
    let concurrency = settings.fetch_concurrency;

    let (history_artists, history_report) =
        fetch_one(history, names, concurrency, &retry, cancel, progress).await;
    check_cancelled(cancel, "catalog fetch")?;

    let history_names: Vec<String> = history_artists.iter().map(|a| a.name.clone()).collect();
    let (catalog_artists, catalog_report) =
        fetch_one(catalog, &history_names, concurrency, &retry, cancel, progress).await;
    check_cancelled(cancel, "registry fetch")?;

    let (registry_artists, registry_report) =
        fetch_one(registry, names, concurrency, &retry, cancel, progress).await;
    check_cancelled(cancel, "snapshot write")?;

    save_snapshots(
        data_dir,
        &[
            (history.source(), &history_artists[..]),
            (catalog.source(), &catalog_artists[..]),
            (registry.source(), &registry_artists[..]),
        ],
    )?;

    Ok(RefreshReport {
        chart_artists: names.len(),
        listening_history: history_report,
        catalog: catalog_report,
        registry: registry_report,
        duration_ms: start.elapsed().as_millis(),
    })
}

async fn fetch_one(
    lookup: &dyn ArtistLookup,
    names: &[String],
    concurrency: usize,
    retry: &RetryPolicy,
    cancel: &CancellationToken,
    progress: Option<&ProgressBar>,
) -> (Vec<SourceArtist>, FetchReport) {
    let source = lookup.source();
    if let Some(pb) = progress {
        pb.reset();
        pb.set_length(names.len() as u64);
        pb.set_message(source.to_string());
    }

    let (artists, report) = lookup_all(lookup, names, concurrency, retry, cancel, progress).await;
    metrics::record_source_lookups(source.as_str(), report.found, report.not_found, report.failed);
    (artists, report)
}
