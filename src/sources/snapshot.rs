//! Per-source snapshot files in the data directory.

use super::models::{SourceArtist, SourceKind};
use crate::data_files::{read_json_records, stage_json, write_json_atomic, DataDir};
use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::{info, warn};

/// The three normalized source collections a reconciliation run consumes.
#[derive(Debug, Clone, Default)]
pub struct SourceSnapshots {
    pub listening_history: Vec<SourceArtist>,
    pub catalog: Vec<SourceArtist>,
    pub registry: Vec<SourceArtist>,
}

/// Number of malformed records dropped while loading snapshots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotLoadReport {
    pub skipped_records: usize,
}

pub fn snapshot_path(data_dir: &DataDir, source: SourceKind) -> PathBuf {
    match source {
        SourceKind::ListeningHistory => data_dir.lastfm_artists_path(),
        SourceKind::Catalog => data_dir.spotify_artists_path(),
        SourceKind::Registry => data_dir.musicbrainz_artists_path(),
    }
}

pub fn save_snapshot(data_dir: &DataDir, source: SourceKind, artists: &[SourceArtist]) -> Result<()> {
    let path = snapshot_path(data_dir, source);
    write_json_atomic(&path, artists)?;
    info!("Wrote {} {} artists to {:?}", artists.len(), source, path);
    Ok(())
}

/// Replace several snapshots as one group.
///
/// Every file is staged before any destination is replaced, so a failure
/// while writing leaves all snapshots from the previous refresh in place.
pub fn save_snapshots(data_dir: &DataDir, snapshots: &[(SourceKind, &[SourceArtist])]) -> Result<()> {
    let staged = snapshots
        .iter()
        .map(|(source, artists)| stage_json(&snapshot_path(data_dir, *source), *artists))
        .collect::<Result<Vec<_>>>()?;

    let mut replaced: Vec<&str> = Vec::with_capacity(snapshots.len());
    for ((source, artists), file) in snapshots.iter().zip(staged) {
        let path = file.path().to_path_buf();
        file.commit().with_context(|| {
            format!(
                "Failed to replace {} snapshot, already replaced: [{}]",
                source,
                replaced.join(", ")
            )
        })?;
        replaced.push(source.as_str());
        info!("Wrote {} {} artists to {:?}", artists.len(), source, path);
    }
    Ok(())
}

/// Load one snapshot. A missing file is an empty source, not an error.
pub fn load_snapshot(data_dir: &DataDir, source: SourceKind) -> Result<(Vec<SourceArtist>, usize)> {
    let path = snapshot_path(data_dir, source);
    if !path.exists() {
        warn!("No {} snapshot at {:?}, treating source as empty", source, path);
        return Ok((vec![], 0));
    }
    let (artists, skipped) = read_json_records::<SourceArtist>(&path)?;
    let artists: Vec<SourceArtist> = artists
        .into_iter()
        .filter(|a| !a.name.trim().is_empty())
        .collect();
    info!("Loaded {} {} artists from {:?}", artists.len(), source, path);
    Ok((artists, skipped))
}

impl SourceSnapshots {
    pub fn load(data_dir: &DataDir) -> Result<(Self, SnapshotLoadReport)> {
        let (listening_history, skipped_lh) = load_snapshot(data_dir, SourceKind::ListeningHistory)?;
        let (catalog, skipped_catalog) = load_snapshot(data_dir, SourceKind::Catalog)?;
        let (registry, skipped_registry) = load_snapshot(data_dir, SourceKind::Registry)?;

        let report = SnapshotLoadReport {
            skipped_records: skipped_lh + skipped_catalog + skipped_registry,
        };
        if report.skipped_records > 0 {
            warn!("Skipped {} malformed source records", report.skipped_records);
        }

        Ok((
            Self {
                listening_history,
                catalog,
                registry,
            },
            report,
        ))
    }
}
