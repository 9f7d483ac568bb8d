//! Loading and persisting `genre_map.json`.

use super::models::{CoordinateSpace, GenreMap, RawGenreEntry};
use crate::data_files::{read_json, write_json_atomic};
use anyhow::{bail, Result};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// Load the genre map file, projecting coordinates into `space`.
pub fn load_genre_map(path: &Path, space: CoordinateSpace) -> Result<GenreMap> {
    let raw: BTreeMap<String, RawGenreEntry> = read_json(path)?;
    if raw.is_empty() {
        bail!("Genre map {:?} contains no genres", path);
    }

    let map = GenreMap::from_raw(raw, space);
    info!("Loaded {} genres from {:?}", map.len(), path);
    Ok(map)
}

/// Write the snapshot back in raw coordinates.
pub fn save_genre_map(path: &Path, map: &GenreMap) -> Result<()> {
    write_json_atomic(path, &map.to_raw())
}
