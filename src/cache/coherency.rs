//! Token-based validity for cached graph payloads.
//!
//! The exporter writes a fresh sync token to the authoritative store and to
//! the cache's fixed token key. Every cached payload is stored together with
//! the token it was computed under, and is served only while that token, the
//! cached token and the authoritative token are all equal. Anything else is
//! recomputed from the authoritative store and written back pinned to the
//! token read before the computation, so an export racing the computation
//! only costs one more recompute.

use super::keys::SYNC_TOKEN_KEY;
use super::store::CacheStore;
use super::sync_token::{SyncToken, SyncTokenSource};
use crate::server::metrics;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

/// How a lookup was answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    /// Served from cache; tokens matched.
    Hit,
    /// Nothing cached for the key.
    Miss,
    /// A payload was cached under an outdated or missing token.
    Stale,
    /// The authoritative token could not be read; computed without caching.
    TokenUnavailable,
}

impl CacheOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheOutcome::Hit => "hit",
            CacheOutcome::Miss => "miss",
            CacheOutcome::Stale => "stale",
            CacheOutcome::TokenUnavailable => "token_unavailable",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedPayload {
    pub body: String,
    pub outcome: CacheOutcome,
}

fn encode_entry(token: &SyncToken, body: &str) -> String {
    format!("{}\n{}", token, body)
}

/// Split a cached entry into its pinned token and payload.
fn decode_entry(raw: String) -> Option<(SyncToken, String)> {
    let (token, body) = raw.split_once('\n')?;
    Some((SyncToken::new(token), body.to_string()))
}

/// Write the token of a fresh export to the cache.
pub fn publish_sync_token(cache: &dyn CacheStore, token: &SyncToken, ttl: Duration) -> Result<()> {
    cache.set(SYNC_TOKEN_KEY, token.as_str(), ttl)
}

/// Read-through cache whose entries are validated against an authoritative
/// sync token on every read.
pub struct CoherentCache<A: ?Sized> {
    cache: Arc<dyn CacheStore>,
    authority: Arc<A>,
    ttl: Duration,
}

impl<A: ?Sized> Clone for CoherentCache<A> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
            authority: Arc::clone(&self.authority),
            ttl: self.ttl,
        }
    }
}

impl<A: SyncTokenSource + ?Sized> CoherentCache<A> {
    pub fn new(cache: Arc<dyn CacheStore>, authority: Arc<A>, ttl: Duration) -> Self {
        Self {
            cache,
            authority,
            ttl,
        }
    }

    fn read_cache(&self, key: &str) -> Option<String> {
        match self.cache.get(key) {
            Ok(value) => value,
            Err(e) => {
                warn!("Cache read of '{}' failed, treating as absent: {}", key, e);
                None
            }
        }
    }

    /// Serve the payload cached under `key` if it is still current,
    /// otherwise compute it, cache it and return it.
    ///
    /// Errors from `compute` are returned unchanged; cache failures never
    /// are.
    pub fn get_or_compute<F, E>(&self, key: &str, compute: F) -> Result<CachedPayload, E>
    where
        F: FnOnce() -> Result<String, E>,
    {
        let cached = self.read_cache(key);
        let cached_token = self.read_cache(SYNC_TOKEN_KEY).map(SyncToken::new);
        let current_token = match self.authority.current_sync_token() {
            Ok(token) => token,
            Err(e) => {
                warn!("Could not read authoritative sync token: {}", e);
                None
            }
        };

        let had_payload = cached.is_some();
        if let (Some((pinned, body)), Some(cached_token), Some(current)) = (
            cached.and_then(decode_entry),
            cached_token.as_ref(),
            current_token.as_ref(),
        ) {
            if &pinned == current && cached_token == current {
                debug!("Cache hit for '{}' at sync token {}", key, current);
                metrics::record_cache_lookup(CacheOutcome::Hit.as_str());
                return Ok(CachedPayload {
                    body,
                    outcome: CacheOutcome::Hit,
                });
            }
        }

        let outcome = if current_token.is_none() {
            CacheOutcome::TokenUnavailable
        } else if had_payload {
            CacheOutcome::Stale
        } else {
            CacheOutcome::Miss
        };
        metrics::record_cache_lookup(outcome.as_str());

        if had_payload {
            debug!("Discarding stale cache entry '{}'", key);
            if let Err(e) = self.cache.delete(key) {
                warn!("Failed to delete stale cache entry '{}': {}", key, e);
            }
        }

        let body = compute()?;

        match current_token {
            Some(token) => {
                if let Err(e) = self.cache.set(key, &encode_entry(&token, &body), self.ttl) {
                    warn!("Failed to cache '{}': {}", key, e);
                } else if let Err(e) = publish_sync_token(self.cache.as_ref(), &token, self.ttl) {
                    warn!("Failed to cache sync token {}: {}", token, e);
                }
            }
            None => debug!(
                "Not caching '{}': authoritative sync token is unknown",
                key
            ),
        }

        Ok(CachedPayload { body, outcome })
    }
}
