//! Genre reference table types.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::warn;

/// Display color used when an artist has no known genre color.
pub const FALLBACK_COLOR: &str = "#cccccc";

/// A position in the graph coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Maps raw genre-map coordinates onto the graph coordinate space.
///
/// The raw map spans `[0, source_max_x] x [0, source_max_y]`; the graph is
/// laid out over `[0, graph_max_x] x [0, graph_max_y]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoordinateSpace {
    pub source_max_x: f64,
    pub source_max_y: f64,
    pub graph_max_x: f64,
    pub graph_max_y: f64,
}

impl Default for CoordinateSpace {
    fn default() -> Self {
        Self {
            source_max_x: 1500.0,
            source_max_y: 22500.0,
            graph_max_x: 20000.0,
            graph_max_y: 20000.0,
        }
    }
}

impl CoordinateSpace {
    /// A space where raw and graph coordinates coincide.
    pub fn identity() -> Self {
        Self {
            source_max_x: 1.0,
            source_max_y: 1.0,
            graph_max_x: 1.0,
            graph_max_y: 1.0,
        }
    }

    pub fn project(&self, x: f64, y: f64) -> Point {
        Point {
            x: x / self.source_max_x * self.graph_max_x,
            y: y / self.source_max_y * self.graph_max_y,
        }
    }

    pub fn unproject(&self, point: Point) -> (f64, f64) {
        (
            point.x / self.graph_max_x * self.source_max_x,
            point.y / self.graph_max_y * self.source_max_y,
        )
    }
}

/// One genre of the reference table, in graph coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenreEntry {
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub color: String,
    pub count: u64,
}

impl GenreEntry {
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// A genre as stored in `genre_map.json`, keyed by name, in raw coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawGenreEntry {
    pub x: f64,
    pub y: f64,
    pub color: String,
    #[serde(default)]
    pub count: u64,
}

/// Immutable snapshot of the genre reference table.
///
/// Keys are lowercase genre names. Coordinates are projected once when the
/// snapshot is built and never recomputed afterwards; annotating counts
/// produces a new snapshot. Raw coordinates read from the file are kept
/// alongside so they are written back unchanged.
#[derive(Debug, Clone, Default)]
pub struct GenreMap {
    entries: HashMap<String, GenreEntry>,
    raw_positions: HashMap<String, (f64, f64)>,
    space: CoordinateSpace,
}

impl GenreMap {
    /// Build a snapshot from raw entries, projecting their coordinates.
    ///
    /// Names are lowercased; when two raw names collide the later one wins.
    pub fn from_raw<I>(raw: I, space: CoordinateSpace) -> Self
    where
        I: IntoIterator<Item = (String, RawGenreEntry)>,
    {
        let mut entries = HashMap::new();
        let mut raw_positions = HashMap::new();
        for (raw_name, entry) in raw {
            let name = raw_name.trim().to_lowercase();
            let position = space.project(entry.x, entry.y);
            let genre = GenreEntry {
                name: name.clone(),
                x: position.x,
                y: position.y,
                color: entry.color,
                count: entry.count,
            };
            raw_positions.insert(name.clone(), (entry.x, entry.y));
            if entries.insert(name.clone(), genre).is_some() {
                warn!(
                    "Genre {:?} collides with an earlier entry as {:?}, keeping the later one",
                    raw_name, name
                );
            }
        }

        Self {
            entries,
            raw_positions,
            space,
        }
    }

    /// Build a snapshot from entries already in graph coordinates.
    pub fn from_entries<I>(entries: I, space: CoordinateSpace) -> Self
    where
        I: IntoIterator<Item = GenreEntry>,
    {
        let entries = entries
            .into_iter()
            .map(|mut entry| {
                entry.name = entry.name.to_lowercase();
                (entry.name.clone(), entry)
            })
            .collect();
        Self {
            entries,
            raw_positions: HashMap::new(),
            space,
        }
    }

    pub fn get(&self, name: &str) -> Option<&GenreEntry> {
        match self.entries.get(name) {
            Some(entry) => Some(entry),
            None => self.entries.get(&name.to_lowercase()),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn space(&self) -> CoordinateSpace {
        self.space
    }

    /// Entries ordered by name.
    pub fn sorted_entries(&self) -> Vec<&GenreEntry> {
        let mut entries: Vec<&GenreEntry> = self.entries.values().collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries
    }

    /// Returns a new snapshot where every counted genre carries its new count.
    ///
    /// Genres absent from `counts` keep their previous count.
    pub fn with_counts(&self, counts: &HashMap<String, u64>) -> GenreMap {
        let entries = self
            .entries
            .iter()
            .map(|(name, entry)| {
                let mut entry = entry.clone();
                if let Some(count) = counts.get(name) {
                    entry.count = *count;
                }
                (name.clone(), entry)
            })
            .collect();

        GenreMap {
            entries,
            raw_positions: self.raw_positions.clone(),
            space: self.space,
        }
    }

    /// Raw representation suitable for writing back to `genre_map.json`.
    ///
    /// Genres loaded from raw entries keep their original coordinates; the
    /// others are unprojected from graph space.
    pub fn to_raw(&self) -> BTreeMap<String, RawGenreEntry> {
        self.entries
            .iter()
            .map(|(name, entry)| {
                let (x, y) = match self.raw_positions.get(name) {
                    Some(position) => *position,
                    None => self.space.unproject(entry.position()),
                };
                let raw = RawGenreEntry {
                    x,
                    y,
                    color: entry.color.clone(),
                    count: entry.count,
                };
                (name.clone(), raw)
            })
            .collect()
    }
}
