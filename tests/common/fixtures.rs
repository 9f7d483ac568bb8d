//! Test fixture creation for the data directory

use super::constants::*;
use anyhow::Result;
use soundweb_server::config::PipelineSettings;
use soundweb_server::genre_map::CoordinateSpace;
use soundweb_server::sources::{save_snapshot, SourceArtist, SourceKind};
use soundweb_server::DataDir;
use tempfile::TempDir;

const GENRE_MAP_JSON: &str = r##"{
    "ambient": {"x": 0.0, "y": 0.0, "color": "#00aaff"},
    "drone": {"x": 300.0, "y": 0.0, "color": "#333333"},
    "slowcore": {"x": 4000.0, "y": 4000.0, "color": "#996633"},
    "rock": {"x": 9000.0, "y": 9000.0, "color": "#ff0000"}
}"##;

fn artist(name: &str, genres: &[&str]) -> SourceArtist {
    SourceArtist {
        genres: genres.iter().map(|g| g.to_string()).collect(),
        ..SourceArtist::named(name)
    }
}

/// Creates a data directory with a genre map and three source snapshots
/// that reconcile to `SEEDED_ARTIST_COUNT` artists.
/// Returns (temp_dir, data_dir)
pub fn create_test_data_dir() -> Result<(TempDir, DataDir)> {
    let dir = TempDir::new()?;
    let data_dir = DataDir::new(dir.path());
    std::fs::write(data_dir.genre_map_path(), GENRE_MAP_JSON)?;

    let mut grouper = artist(ARTIST_GROUPER, &["ambient", "drone"]);
    grouper.similar_artists = vec![ARTIST_STARS_OF_THE_LID.to_string()];
    save_snapshot(
        &data_dir,
        SourceKind::ListeningHistory,
        &[grouper, artist(ARTIST_STARS_OF_THE_LID, &["drone"])],
    )?;

    let mut catalog_grouper = artist(ARTIST_GROUPER, &["ambient"]);
    catalog_grouper.popularity = Some(55);
    let mut catalog_low = artist(ARTIST_LOW, &["slowcore"]);
    catalog_low.popularity = Some(62);
    save_snapshot(
        &data_dir,
        SourceKind::Catalog,
        &[
            catalog_grouper,
            artist(ARTIST_STARS_OF_THE_LID, &["drone"]),
            artist(ARTIST_UNCORROBORATED, &["rock"]),
            catalog_low,
        ],
    )?;

    save_snapshot(
        &data_dir,
        SourceKind::Registry,
        &[artist(ARTIST_LOW, &["slowcore", "rock"])],
    )?;

    Ok((dir, data_dir))
}

/// Pipeline settings with an identity coordinate space, so stored
/// positions equal genre map positions.
pub fn pipeline_settings() -> PipelineSettings {
    PipelineSettings {
        coordinate_space: CoordinateSpace::identity(),
        rebuild_on_startup: false,
        ..PipelineSettings::default()
    }
}
