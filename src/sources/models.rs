//! Normalized source records.

use serde::{Deserialize, Serialize};

/// The three external sources feeding the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Listening-history service (Last.fm).
    ListeningHistory,
    /// Streaming catalog service (Spotify).
    Catalog,
    /// Music metadata registry (MusicBrainz).
    Registry,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::ListeningHistory => "lastfm",
            SourceKind::Catalog => "spotify",
            SourceKind::Registry => "musicbrainz",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One artist as reported by a single source, in the common shape.
///
/// Only `name` is required; each source fills the fields it knows about.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceArtist {
    pub name: String,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mbid: Option<String>,
    #[serde(default, alias = "imageUrl", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, alias = "similarArtists", alias = "similar")]
    pub similar_artists: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub popularity: Option<u32>,
    #[serde(default, alias = "spotifyId", skip_serializing_if = "Option::is_none")]
    pub spotify_id: Option<String>,
    #[serde(default, alias = "spotifyUrl", skip_serializing_if = "Option::is_none")]
    pub spotify_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub followers: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listeners: Option<u64>,
}

impl SourceArtist {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }
}

/// Lowercase and trim a source tag, dropping empty ones.
pub(crate) fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tags.into_iter()
        .map(|tag| tag.as_ref().trim().to_lowercase())
        .filter(|tag| !tag.is_empty())
        .collect()
}
