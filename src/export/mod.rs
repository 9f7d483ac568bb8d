//! Publishes a reconciled graph to the authoritative store.
//!
//! The whole graph (artists, links, top genres, genre table and a new sync
//! token) is swapped in by a single `GraphStore::publish`. Only after that
//! succeeds is the token written to the cache.

use crate::cache::{publish_sync_token, CacheStore, SyncToken, SyncTokenSource};
use crate::genre_map::GenreMap;
use crate::graph_store::{ArtistNode, GraphSnapshot, GraphStore, RelatedLink};
use crate::reconcile::{resolve_identity, ArtistId, CanonicalArtist};
use crate::server::metrics;
use crate::top_genres::TopGenreEntry;
use anyhow::{bail, Context, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportReport {
    pub sync_token: SyncToken,
    pub checksum: String,
    pub artists: usize,
    pub links: usize,
    pub top_genres: usize,
    pub genres: usize,
}

/// Resolve every artist's related names to ids and build the deduplicated
/// undirected link set.
///
/// Names that match no exported artist are dropped, as are self links.
pub fn resolve_links(artists: &[CanonicalArtist]) -> Vec<RelatedLink> {
    let mut ids_by_key: HashMap<String, ArtistId> = HashMap::with_capacity(artists.len());
    for artist in artists {
        ids_by_key
            .entry(resolve_identity(&artist.name))
            .or_insert(artist.id);
    }

    let mut seen: HashSet<String> = HashSet::new();
    let mut links = Vec::new();
    for artist in artists {
        for related in &artist.related_artists {
            let key = resolve_identity(related);
            if key.is_empty() {
                continue;
            }
            let Some(&related_id) = ids_by_key.get(&key) else {
                continue;
            };
            let Some(link) = RelatedLink::new(artist.id, related_id) else {
                continue;
            };
            if seen.insert(link.key()) {
                links.push(link);
            }
        }
    }
    links
}

/// `sha256:` digest over the exported artist ids and names.
pub fn graph_checksum(artists: &[ArtistNode]) -> String {
    let mut sorted: Vec<&ArtistNode> = artists.iter().collect();
    sorted.sort_by_key(|a| a.id);

    let mut hasher = Sha256::new();
    for artist in sorted {
        hasher.update(artist.id.to_string().as_bytes());
        hasher.update(b"\t");
        hasher.update(artist.name.as_bytes());
        hasher.update(b"\n");
    }
    format!("sha256:{:x}", hasher.finalize())
}

pub struct GraphExporter {
    store: Arc<dyn GraphStore>,
    cache: Arc<dyn CacheStore>,
    cache_ttl: Duration,
}

impl GraphExporter {
    pub fn new(store: Arc<dyn GraphStore>, cache: Arc<dyn CacheStore>, cache_ttl: Duration) -> Self {
        Self {
            store,
            cache,
            cache_ttl,
        }
    }

    /// Replace the published graph and mint a new sync token.
    ///
    /// Store failures abort the export with nothing published. A failure to
    /// write the token to the cache is only logged: readers compare against
    /// the authoritative token and recompute.
    pub fn export(
        &self,
        artists: &[CanonicalArtist],
        top_genres: &[TopGenreEntry],
        genre_map: &GenreMap,
    ) -> Result<ExportReport> {
        if artists.is_empty() {
            bail!("Refusing to export an empty graph");
        }

        let previous = self
            .store
            .current_sync_token()
            .context("Failed to read previous sync token")?;

        let nodes: Vec<ArtistNode> = artists.iter().map(ArtistNode::from).collect();
        let links = resolve_links(artists);
        let checksum = graph_checksum(&nodes);
        let snapshot = GraphSnapshot {
            artists: nodes,
            links,
            top_genres: top_genres.to_vec(),
            genres: genre_map.sorted_entries().into_iter().cloned().collect(),
            sync_token: SyncToken::mint(previous.as_ref()),
            checksum,
        };

        self.store
            .publish(&snapshot)
            .context("Failed to publish graph snapshot")?;

        if let Err(e) = publish_sync_token(self.cache.as_ref(), &snapshot.sync_token, self.cache_ttl) {
            warn!(
                "Graph published but sync token {} not cached: {}",
                snapshot.sync_token, e
            );
        }

        metrics::set_graph_size(snapshot.artists.len(), snapshot.links.len());
        info!(
            "Exported {} artists and {} links with sync token {} ({})",
            snapshot.artists.len(),
            snapshot.links.len(),
            snapshot.sync_token,
            snapshot.checksum
        );

        Ok(ExportReport {
            sync_token: snapshot.sync_token,
            checksum: snapshot.checksum,
            artists: snapshot.artists.len(),
            links: snapshot.links.len(),
            top_genres: snapshot.top_genres.len(),
            genres: snapshot.genres.len(),
        })
    }
}
