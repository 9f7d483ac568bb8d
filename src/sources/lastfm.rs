//! Last.fm API client: chart, artist info and similar artists.
//!
//! Rate limited to 5 requests per second per Last.fm API guidelines.

use super::error::SourceError;
use super::lookup::ArtistLookup;
use super::models::{normalize_tags, SourceArtist, SourceKind};
use super::rate_limit::RateLimiter;
use super::retry::RetryPolicy;
use crate::reconcile::resolve_identity;
use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const LASTFM_API_BASE: &str = "https://ws.audioscrobbler.com/2.0/";
const RATE_LIMIT_INTERVAL: Duration = Duration::from_millis(200); // 5 req/sec
const TOP_ARTISTS_PAGE_SIZE: &str = "50";

// https://www.last.fm/api/errorcodes
const ERROR_INVALID_PARAMETERS: u32 = 6;
const ERROR_OPERATION_FAILED: u32 = 8;
const ERROR_SERVICE_OFFLINE: u32 = 11;
const ERROR_TEMPORARILY_UNAVAILABLE: u32 = 16;
const ERROR_RATE_LIMIT_EXCEEDED: u32 = 29;

pub struct LastFmClient {
    client: Client,
    api_key: String,
    similar_limit: usize,
    limiter: RateLimiter,
}

#[derive(Deserialize)]
struct TopArtistsResponse {
    artists: Option<NamedArtistList>,
    error: Option<u32>,
    message: Option<String>,
}

#[derive(Deserialize)]
struct SimilarArtistsResponse {
    similarartists: Option<NamedArtistList>,
    error: Option<u32>,
    message: Option<String>,
}

#[derive(Deserialize)]
struct NamedArtistList {
    #[serde(default)]
    artist: Vec<NamedArtist>,
}

#[derive(Deserialize)]
struct NamedArtist {
    name: Option<String>,
}

#[derive(Deserialize)]
struct ArtistInfoResponse {
    artist: Option<ArtistInfo>,
    error: Option<u32>,
    message: Option<String>,
}

#[derive(Deserialize)]
struct ArtistInfo {
    name: String,
    mbid: Option<String>,
    #[serde(default)]
    image: Vec<LastFmImage>,
    tags: Option<TagList>,
    stats: Option<ArtistStats>,
}

#[derive(Deserialize)]
struct LastFmImage {
    #[serde(rename = "#text")]
    url: String,
    size: String,
}

#[derive(Deserialize)]
struct TagList {
    #[serde(default)]
    tag: Vec<Tag>,
}

#[derive(Deserialize)]
struct Tag {
    name: String,
}

#[derive(Deserialize)]
struct ArtistStats {
    listeners: Option<String>,
}

/// Whether the API reported a missing artist.
enum ApiStatus {
    Ok,
    NotFound,
}

fn check_api_error(error: Option<u32>, message: Option<String>) -> Result<ApiStatus, SourceError> {
    let Some(code) = error else {
        return Ok(ApiStatus::Ok);
    };
    let message = format!(
        "Last.fm error {}: {}",
        code,
        message.unwrap_or_else(|| "unknown".to_string())
    );
    match code {
        ERROR_INVALID_PARAMETERS => Ok(ApiStatus::NotFound),
        ERROR_OPERATION_FAILED
        | ERROR_SERVICE_OFFLINE
        | ERROR_TEMPORARILY_UNAVAILABLE
        | ERROR_RATE_LIMIT_EXCEEDED => Err(SourceError::Transient(message)),
        _ => Err(SourceError::Permanent(message)),
    }
}

impl ArtistInfo {
    fn into_source_artist(self) -> SourceArtist {
        let image_url = self
            .image
            .into_iter()
            .find(|img| img.size == "extralarge" && !img.url.is_empty())
            .map(|img| img.url);
        let genres = normalize_tags(
            self.tags
                .map(|t| t.tag)
                .unwrap_or_default()
                .into_iter()
                .map(|t| t.name),
        );
        let listeners = self
            .stats
            .and_then(|s| s.listeners)
            .and_then(|l| l.parse().ok());

        SourceArtist {
            name: self.name,
            genres,
            mbid: self.mbid.filter(|m| !m.is_empty()),
            image_url,
            listeners,
            ..Default::default()
        }
    }
}

impl LastFmClient {
    pub fn new(api_key: &str, similar_limit: usize) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            similar_limit,
            limiter: RateLimiter::new(RATE_LIMIT_INTERVAL),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, params: &[(&str, &str)]) -> Result<T, SourceError> {
        self.limiter.acquire().await;

        let response = self
            .client
            .get(LASTFM_API_BASE)
            .query(params)
            .query(&[("api_key", self.api_key.as_str()), ("format", "json")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::from_status(status, "Last.fm"));
        }

        Ok(response.json::<T>().await?)
    }

    /// Fetch one page of the global top-artists chart.
    pub async fn get_top_artists_page(&self, page: u32) -> Result<Vec<String>, SourceError> {
        let page = page.to_string();
        let body: TopArtistsResponse = self
            .get_json(&[
                ("method", "chart.gettopartists"),
                ("page", page.as_str()),
                ("limit", TOP_ARTISTS_PAGE_SIZE),
            ])
            .await?;
        check_api_error(body.error, body.message)?;

        Ok(body
            .artists
            .map(|a| a.artist)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|a| a.name)
            .filter(|name| !name.trim().is_empty())
            .collect())
    }

    /// Collect up to `limit` distinct chart artist names over `pages` pages.
    ///
    /// Names are deduplicated by comparison key. Pages that keep failing
    /// are skipped.
    pub async fn top_artist_names(
        &self,
        pages: u32,
        limit: usize,
        retry: &RetryPolicy,
        cancel: &CancellationToken,
    ) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut names = Vec::new();

        for page in 1..=pages {
            if cancel.is_cancelled() || names.len() >= limit {
                break;
            }
            let label = format!("Last.fm chart page {}", page);
            match retry.run(&label, move || self.get_top_artists_page(page)).await {
                Ok(page_names) => {
                    for name in page_names {
                        if names.len() >= limit {
                            break;
                        }
                        if seen.insert(resolve_identity(&name)) {
                            names.push(name);
                        }
                    }
                }
                Err(e) => warn!("Skipping {}: {}", label, e),
            }
        }

        info!("Collected {} chart artists from Last.fm", names.len());
        names
    }

    pub async fn get_artist_info(&self, name: &str) -> Result<Option<SourceArtist>, SourceError> {
        let body: ArtistInfoResponse = self
            .get_json(&[("method", "artist.getinfo"), ("artist", name)])
            .await?;
        if let ApiStatus::NotFound = check_api_error(body.error, body.message)? {
            return Ok(None);
        }
        Ok(body.artist.map(ArtistInfo::into_source_artist))
    }

    pub async fn get_similar_artists(&self, name: &str) -> Result<Vec<String>, SourceError> {
        let limit = self.similar_limit.to_string();
        let body: SimilarArtistsResponse = self
            .get_json(&[
                ("method", "artist.getsimilar"),
                ("artist", name),
                ("limit", limit.as_str()),
            ])
            .await?;
        if let ApiStatus::NotFound = check_api_error(body.error, body.message)? {
            return Ok(vec![]);
        }

        Ok(body
            .similarartists
            .map(|s| s.artist)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|a| a.name)
            .collect())
    }
}

#[async_trait]
impl ArtistLookup for LastFmClient {
    fn source(&self) -> SourceKind {
        SourceKind::ListeningHistory
    }

    async fn lookup(&self, name: &str) -> Result<Option<SourceArtist>, SourceError> {
        let Some(mut artist) = self.get_artist_info(name).await? else {
            return Ok(None);
        };

        // Similar artists are optional: an artist without them is still usable.
        match self.get_similar_artists(name).await {
            Ok(similar) => artist.similar_artists = similar,
            Err(e) => debug!("No similar artists for '{}': {}", name, e),
        }

        Ok(Some(artist))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artist_info_parsing() {
        let json = r##"{
            "artist": {
                "name": "Grouper",
                "mbid": "",
                "image": [
                    {"#text": "http://small", "size": "small"},
                    {"#text": "http://xl", "size": "extralarge"}
                ],
                "tags": {"tag": [{"name": "Ambient"}, {"name": "Dream Pop"}]},
                "stats": {"listeners": "412345"}
            }
        }"##;

        let body: ArtistInfoResponse = serde_json::from_str(json).unwrap();
        let artist = body.artist.unwrap().into_source_artist();

        assert_eq!(artist.name, "Grouper");
        assert_eq!(artist.mbid, None);
        assert_eq!(artist.image_url.as_deref(), Some("http://xl"));
        assert_eq!(artist.genres, vec!["ambient", "dream pop"]);
        assert_eq!(artist.listeners, Some(412345));
    }

    #[test]
    fn test_api_error_classification() {
        assert!(matches!(
            check_api_error(Some(6), Some("The artist you supplied could not be found".into())),
            Ok(ApiStatus::NotFound)
        ));
        assert!(matches!(
            check_api_error(Some(29), None),
            Err(SourceError::Transient(_))
        ));
        assert!(matches!(
            check_api_error(Some(10), None),
            Err(SourceError::Permanent(_))
        ));
        assert!(matches!(check_api_error(None, None), Ok(ApiStatus::Ok)));
    }

    #[test]
    fn test_similar_artists_parsing() {
        let json = r#"{"similarartists": {"artist": [{"name": "Low"}, {"mbid": "x"}]}}"#;
        let body: SimilarArtistsResponse = serde_json::from_str(json).unwrap();
        let names: Vec<String> = body
            .similarartists
            .unwrap()
            .artist
            .into_iter()
            .filter_map(|a| a.name)
            .collect();
        assert_eq!(names, vec!["Low"]);
    }
}
