use super::{check_cancelled, status_label, PipelineError};
use crate::config::PipelineSettings;
use crate::data_files::{write_json_atomic, DataDir};
use crate::export::{ExportReport, GraphExporter};
use crate::genre_analysis::annotate_counts;
use crate::genre_map::{load_genre_map, save_genre_map};
use crate::reconcile::{reconcile, ReconcileReport};
use crate::server::metrics;
use crate::sources::SourceSnapshots;
use crate::top_genres::generate_top_genres;
use anyhow::{anyhow, Context};
use serde::Serialize;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize)]
pub struct RebuildReport {
    pub skipped_source_records: usize,
    pub reconcile: ReconcileReport,
    pub top_genres: usize,
    pub export: ExportReport,
    pub duration_ms: u128,
}

/// Reconcile the current snapshots and publish them as the new graph.
///
/// `artist_data.json` and `top_genres.json` are staged before the export;
/// the annotated genre map is saved only once the export has published.
/// Each file is swapped in atomically.
pub fn rebuild_graph(
    data_dir: &DataDir,
    settings: &PipelineSettings,
    exporter: &GraphExporter,
    cancel: &CancellationToken,
) -> Result<RebuildReport, PipelineError> {
    let start = Instant::now();
    let result = run_rebuild(data_dir, settings, exporter, cancel, start);
    metrics::record_pipeline_run("rebuild", status_label(&result), start.elapsed());

    match &result {
        Ok(report) => info!(
            "Graph rebuild finished in {}ms: {} artists, {} links, token {}",
            report.duration_ms, report.export.artists, report.export.links, report.export.sync_token
        ),
        Err(e) if e.is_cancelled() => info!("Graph rebuild stopped: {}", e),
        Err(e) => warn!("Graph rebuild failed: {:#}", e),
    }
    result
}

fn run_rebuild(
    data_dir: &DataDir,
    settings: &PipelineSettings,
    exporter: &GraphExporter,
    cancel: &CancellationToken,
    start: Instant,
) -> Result<RebuildReport, PipelineError> {
    let genre_map = load_genre_map(&data_dir.genre_map_path(), settings.coordinate_space)
        .context("Failed to load genre map")?;
    let (snapshots, load_report) =
        SourceSnapshots::load(data_dir).context("Failed to load source snapshots")?;

    check_cancelled(cancel, "reconciliation")?;
    let outcome = reconcile(&snapshots, &genre_map);
    if outcome.artists.is_empty() {
        return Err(anyhow!(
            "Reconciliation produced no artists from {} catalog records",
            outcome.report.catalog_records
        )
        .into());
    }
    write_json_atomic(&data_dir.artist_data_path(), &outcome.artists)
        .context("Failed to stage artist data")?;

    check_cancelled(cancel, "genre analysis")?;
    let annotated = annotate_counts(&outcome.artists, &genre_map);

    let top_genres = generate_top_genres(&outcome.artists, &annotated, settings.top_genre_count);
    if top_genres.len() < settings.top_genre_count {
        info!(
            "Selected {} of {} requested top genres",
            top_genres.len(),
            settings.top_genre_count
        );
    }
    write_json_atomic(&data_dir.top_genres_path(), &top_genres)
        .context("Failed to write top genres")?;

    check_cancelled(cancel, "export")?;
    let export = exporter.export(&outcome.artists, &top_genres, &annotated)?;
    save_genre_map(&data_dir.genre_map_path(), &annotated)
        .context("Failed to save annotated genre map")?;

    Ok(RebuildReport {
        skipped_source_records: load_report.skipped_records,
        reconcile: outcome.report,
        top_genres: top_genres.len(),
        export,
        duration_ms: start.elapsed().as_millis(),
    })
}
