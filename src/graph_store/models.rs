use crate::cache::SyncToken;
use crate::genre_map::GenreEntry;
use crate::reconcile::{ArtistId, CanonicalArtist};
use crate::top_genres::TopGenreEntry;
use serde::{Deserialize, Serialize};

/// An artist as stored in and served from the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtistNode {
    pub id: ArtistId,
    pub name: String,
    pub genres: Vec<String>,
    pub popularity: Option<u32>,
    pub spotify_id: Option<String>,
    pub spotify_url: Option<String>,
    pub mbid: Option<String>,
    pub image_url: Option<String>,
    pub color: String,
    pub x: Option<f64>,
    pub y: Option<f64>,
}

impl From<&CanonicalArtist> for ArtistNode {
    fn from(artist: &CanonicalArtist) -> Self {
        Self {
            id: artist.id,
            name: artist.name.clone(),
            genres: artist.genres.clone(),
            popularity: artist.popularity,
            spotify_id: artist.spotify_id.clone(),
            spotify_url: artist.spotify_url.clone(),
            mbid: artist.mbid.clone(),
            image_url: artist.image_url.clone(),
            color: artist.color.clone(),
            x: artist.x,
            y: artist.y,
        }
    }
}

/// Undirected similarity link; `source < target` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RelatedLink {
    pub source: ArtistId,
    pub target: ArtistId,
}

impl RelatedLink {
    /// Normalize the pair; `None` for a self link.
    pub fn new(a: ArtistId, b: ArtistId) -> Option<Self> {
        match a.cmp(&b) {
            std::cmp::Ordering::Less => Some(Self { source: a, target: b }),
            std::cmp::Ordering::Greater => Some(Self { source: b, target: a }),
            std::cmp::Ordering::Equal => None,
        }
    }

    /// Deduplication key: the sorted pair joined by `-`.
    pub fn key(&self) -> String {
        format!("{}-{}", self.source, self.target)
    }

    pub fn touches(&self, id: ArtistId) -> bool {
        self.source == id || self.target == id
    }
}

/// Everything one export publishes, swapped in as a unit.
#[derive(Debug, Clone)]
pub struct GraphSnapshot {
    pub artists: Vec<ArtistNode>,
    pub links: Vec<RelatedLink>,
    pub top_genres: Vec<TopGenreEntry>,
    pub genres: Vec<GenreEntry>,
    pub sync_token: SyncToken,
    pub checksum: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtistQuery {
    /// Only artists tagged with this genre.
    pub genre: Option<String>,
    pub min_popularity: Option<u32>,
    pub limit: usize,
}

/// Metadata of the currently published graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GraphSummary {
    pub sync_token: Option<SyncToken>,
    pub checksum: Option<String>,
    pub exported_at: Option<i64>,
    pub artists_count: usize,
    pub links_count: usize,
    pub genres_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_related_link_normalization() {
        let a = RelatedLink::new(7, 3).unwrap();
        let b = RelatedLink::new(3, 7).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.key(), "3-7");
        assert!(RelatedLink::new(5, 5).is_none());
        assert!(a.touches(7));
        assert!(!a.touches(5));
    }
}
