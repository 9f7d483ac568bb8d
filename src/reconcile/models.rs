use serde::{Deserialize, Serialize};

pub type ArtistId = i64;

/// One reconciled artist, merged from all sources that know it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalArtist {
    pub id: ArtistId,
    pub name: String,
    /// Most significant first; every entry exists in the genre map.
    pub genres: Vec<String>,
    pub popularity: Option<u32>,
    pub spotify_id: Option<String>,
    pub spotify_url: Option<String>,
    pub mbid: Option<String>,
    pub image_url: Option<String>,
    pub color: String,
    pub x: Option<f64>,
    pub y: Option<f64>,
    /// Names from the listening-history similarity feed, resolved at export.
    pub related_artists: Vec<String>,
}

/// Counts of records dropped or trimmed during one reconciliation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub catalog_records: usize,
    pub duplicates: usize,
    pub unresolvable_names: usize,
    pub uncorroborated: usize,
    pub no_known_genres: usize,
    pub unknown_genre_tags: usize,
    pub emitted: usize,
}

#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    pub artists: Vec<CanonicalArtist>,
    pub report: ReconcileReport,
}
