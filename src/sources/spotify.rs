//! Spotify Web API client using the client-credentials flow.

use super::error::SourceError;
use super::lookup::ArtistLookup;
use super::models::{normalize_tags, SourceArtist, SourceKind};
use super::rate_limit::RateLimiter;
use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

const SPOTIFY_API_BASE: &str = "https://api.spotify.com/v1";
const SPOTIFY_TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const RATE_LIMIT_INTERVAL: Duration = Duration::from_millis(100);
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

struct AccessToken {
    value: String,
    expires_at: Instant,
}

pub struct SpotifyClient {
    client: Client,
    client_id: String,
    client_secret: String,
    token: Mutex<Option<AccessToken>>,
    limiter: RateLimiter,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Deserialize)]
struct SearchResponse {
    artists: Option<SearchArtists>,
}

#[derive(Deserialize)]
struct SearchArtists {
    #[serde(default)]
    items: Vec<SpotifyArtist>,
}

#[derive(Deserialize)]
struct SpotifyArtist {
    id: String,
    name: String,
    #[serde(default)]
    genres: Vec<String>,
    popularity: Option<u32>,
    followers: Option<Followers>,
    external_urls: Option<ExternalUrls>,
    #[serde(default)]
    images: Vec<SpotifyImage>,
}

#[derive(Deserialize)]
struct Followers {
    total: Option<u64>,
}

#[derive(Deserialize)]
struct ExternalUrls {
    spotify: Option<String>,
}

#[derive(Deserialize)]
struct SpotifyImage {
    url: String,
}

impl From<SpotifyArtist> for SourceArtist {
    fn from(artist: SpotifyArtist) -> Self {
        SourceArtist {
            name: artist.name,
            genres: normalize_tags(artist.genres),
            image_url: artist.images.into_iter().next().map(|i| i.url),
            popularity: artist.popularity,
            spotify_id: Some(artist.id),
            spotify_url: artist.external_urls.and_then(|u| u.spotify),
            followers: artist.followers.and_then(|f| f.total),
            ..Default::default()
        }
    }
}

impl SpotifyClient {
    pub fn new(client_id: &str, client_secret: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            token: Mutex::new(None),
            limiter: RateLimiter::new(RATE_LIMIT_INTERVAL),
        })
    }

    /// Return a valid access token, requesting a new one when needed.
    async fn access_token(&self) -> Result<String, SourceError> {
        let mut token = self.token.lock().await;
        if let Some(current) = token.as_ref() {
            if current.expires_at > Instant::now() {
                return Ok(current.value.clone());
            }
        }

        debug!("Requesting Spotify access token");
        let response = self
            .client
            .post(SPOTIFY_TOKEN_URL)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            // Bad credentials will not fix themselves.
            if status == StatusCode::UNAUTHORIZED || status == StatusCode::BAD_REQUEST {
                return Err(SourceError::Permanent(format!(
                    "Spotify token request rejected with status {}",
                    status
                )));
            }
            return Err(SourceError::from_status(status, "Spotify token endpoint"));
        }

        let body: TokenResponse = response.json().await?;
        let lifetime = Duration::from_secs(body.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
        let value = body.access_token.clone();
        *token = Some(AccessToken {
            value: body.access_token,
            expires_at: Instant::now() + lifetime,
        });

        Ok(value)
    }

    /// Search for an artist by name and return the best match.
    pub async fn search_artist(&self, name: &str) -> Result<Option<SourceArtist>, SourceError> {
        let token = self.access_token().await?;
        self.limiter.acquire().await;

        let response = self
            .client
            .get(format!("{}/search", SPOTIFY_API_BASE))
            .bearer_auth(&token)
            .query(&[("q", name), ("type", "artist"), ("limit", "1")])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            // Token revoked or expired early; the retry will fetch a new one.
            *self.token.lock().await = None;
        }
        if !status.is_success() {
            return Err(SourceError::from_status(status, "Spotify search"));
        }

        let body: SearchResponse = response.json().await?;
        Ok(body
            .artists
            .and_then(|a| a.items.into_iter().next())
            .map(SourceArtist::from))
    }
}

#[async_trait]
impl ArtistLookup for SpotifyClient {
    fn source(&self) -> SourceKind {
        SourceKind::Catalog
    }

    async fn lookup(&self, name: &str) -> Result<Option<SourceArtist>, SourceError> {
        self.search_artist(name).await
    }
}
