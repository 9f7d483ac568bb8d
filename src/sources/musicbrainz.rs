//! MusicBrainz API client for artist search.
//!
//! Rate limited to 1 request per second per MusicBrainz API policy.

use super::error::SourceError;
use super::lookup::ArtistLookup;
use super::models::{normalize_tags, SourceArtist, SourceKind};
use super::rate_limit::RateLimiter;
use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const MUSICBRAINZ_API_BASE: &str = "https://musicbrainz.org/ws/2";
const RATE_LIMIT_INTERVAL: Duration = Duration::from_millis(1100); // slightly over 1s for safety

pub struct MusicBrainzClient {
    client: Client,
    limiter: RateLimiter,
}

#[derive(Deserialize)]
struct ArtistSearchResponse {
    #[serde(default)]
    artists: Vec<MbArtist>,
}

#[derive(Deserialize)]
struct MbArtist {
    id: String,
    name: String,
    #[serde(default)]
    tags: Vec<MbTag>,
}

#[derive(Deserialize)]
struct MbTag {
    name: String,
}

impl From<MbArtist> for SourceArtist {
    fn from(artist: MbArtist) -> Self {
        SourceArtist {
            name: artist.name,
            genres: normalize_tags(artist.tags.into_iter().map(|t| t.name)),
            mbid: Some(artist.id),
            ..Default::default()
        }
    }
}

impl MusicBrainzClient {
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            limiter: RateLimiter::new(RATE_LIMIT_INTERVAL),
        })
    }

    /// Search for an artist by name; the first hit is taken as the match.
    pub async fn search_artist(&self, name: &str) -> Result<Option<SourceArtist>, SourceError> {
        self.limiter.acquire().await;

        let query = format!("artist:{}", name);
        let response = self
            .client
            .get(format!("{}/artist/", MUSICBRAINZ_API_BASE))
            .query(&[("query", query.as_str()), ("fmt", "json"), ("limit", "1")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::from_status(status, "MusicBrainz search"));
        }

        let body: ArtistSearchResponse = response.json().await?;
        Ok(body.artists.into_iter().next().map(SourceArtist::from))
    }
}

#[async_trait]
impl ArtistLookup for MusicBrainzClient {
    fn source(&self) -> SourceKind {
        SourceKind::Registry
    }

    async fn lookup(&self, name: &str) -> Result<Option<SourceArtist>, SourceError> {
        self.search_artist(name).await
    }
}
