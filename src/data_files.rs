//! JSON artifacts exchanged between pipeline stages.
//!
//! Every artifact lives in one data directory. Writes go through a temp file
//! in the same directory followed by an atomic rename, so readers only ever
//! observe complete files.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const GENRE_MAP_FILE: &str = "genre_map.json";
pub const LASTFM_ARTISTS_FILE: &str = "lastfm_artists.json";
pub const SPOTIFY_ARTISTS_FILE: &str = "spotify_artists.json";
pub const MUSICBRAINZ_ARTISTS_FILE: &str = "musicbrainz_artists.json";
pub const ARTIST_DATA_FILE: &str = "artist_data.json";
pub const TOP_GENRES_FILE: &str = "top_genres.json";

/// The directory holding the pipeline's JSON artifacts.
#[derive(Debug, Clone)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn genre_map_path(&self) -> PathBuf {
        self.root.join(GENRE_MAP_FILE)
    }

    pub fn lastfm_artists_path(&self) -> PathBuf {
        self.root.join(LASTFM_ARTISTS_FILE)
    }

    pub fn spotify_artists_path(&self) -> PathBuf {
        self.root.join(SPOTIFY_ARTISTS_FILE)
    }

    pub fn musicbrainz_artists_path(&self) -> PathBuf {
        self.root.join(MUSICBRAINZ_ARTISTS_FILE)
    }

    pub fn artist_data_path(&self) -> PathBuf {
        self.root.join(ARTIST_DATA_FILE)
    }

    pub fn top_genres_path(&self) -> PathBuf {
        self.root.join(TOP_GENRES_FILE)
    }
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse {:?}", path))
}

/// Read a JSON array, skipping elements that do not decode as `T`.
///
/// Returns the decoded records and the number of skipped elements.
pub fn read_json_records<T: DeserializeOwned>(path: &Path) -> Result<(Vec<T>, usize)> {
    let values: Vec<serde_json::Value> = read_json(path)?;
    let mut records = Vec::with_capacity(values.len());
    let mut skipped = 0;

    for (index, value) in values.into_iter().enumerate() {
        match serde_json::from_value::<T>(value) {
            Ok(record) => records.push(record),
            Err(e) => {
                warn!("Skipping malformed record #{} in {:?}: {}", index, path, e);
                skipped += 1;
            }
        }
    }

    Ok((records, skipped))
}

/// A JSON artifact written to a temp file beside its destination and not yet
/// visible to readers. Dropping it without `commit` discards the temp file.
pub struct StagedJson {
    tmp: tempfile::NamedTempFile,
    path: PathBuf,
}

impl StagedJson {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Move the staged file over its destination.
    pub fn commit(self) -> Result<()> {
        let path = self.path;
        self.tmp
            .persist(&path)
            .with_context(|| format!("Failed to move staged file into {:?}", path))?;
        Ok(())
    }
}

pub fn stage_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<StagedJson> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {:?}", dir))?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temp file in {:?}", dir))?;
    serde_json::to_writer_pretty(&mut tmp, value)
        .with_context(|| format!("Failed to serialize {:?}", path))?;
    tmp.as_file()
        .sync_all()
        .with_context(|| format!("Failed to flush {:?}", path))?;

    Ok(StagedJson {
        tmp,
        path: path.to_path_buf(),
    })
}

pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    stage_json(path, value)?.commit()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Record {
        name: String,
    }

    #[test]
    fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("records.json");
        let records = vec![
            Record {
                name: "a".to_string(),
            },
            Record {
                name: "b".to_string(),
            },
        ];

        write_json_atomic(&path, &records).unwrap();
        let loaded: Vec<Record> = read_json(&path).unwrap();

        assert_eq!(loaded, records);
    }

    #[test]
    fn test_read_records_skips_malformed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("records.json");
        std::fs::write(&path, r#"[{"name":"ok"},{"nome":"broken"},42,{"name":"fine"}]"#)
            .unwrap();

        let (records, skipped) = read_json_records::<Record>(&path).unwrap();

        assert_eq!(skipped, 2);
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].name, "fine");
    }

    #[test]
    fn test_uncommitted_stage_leaves_destination_untouched() {
        let dir = TempDir::new().unwrap();
        let first = dir.path().join("first.json");
        let second = dir.path().join("second.json");
        write_json_atomic(&first, &["old"]).unwrap();

        let staged = stage_json(&first, &["new"]).unwrap();
        let unserializable = HashMap::from([((1, 2), "value")]);
        assert!(stage_json(&second, &unserializable).is_err());
        drop(staged);

        let loaded: Vec<String> = read_json(&first).unwrap();
        assert_eq!(loaded, vec!["old"]);
        assert!(!second.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_read_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        let result: Result<Vec<Record>> = read_json(&dir.path().join("missing.json"));
        assert!(result.is_err());
    }
}
