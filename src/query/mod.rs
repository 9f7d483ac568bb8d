//! Online read paths over the published graph.
//!
//! Every payload goes through the coherent cache, keyed by query kind and
//! parameters, so repeated queries between two exports are served from
//! cache and the first query after an export recomputes.

use crate::cache::{cache_key, CacheStore, CachedPayload, CoherentCache};
use crate::graph_store::{ArtistNode, ArtistQuery, GraphStore, GraphSummary, RelatedLink};
use crate::reconcile::ArtistId;
use crate::top_genres::select_top_genres;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_ARTIST_LIMIT: usize = 500;
pub const MAX_ARTIST_LIMIT: usize = 5000;
pub const MAX_LIVE_TOP_GENRES: usize = 100;

const KIND_ARTISTS: &str = "artists";
const KIND_RELATED: &str = "related";
const KIND_TOP_GENRES: &str = "top-genres";
const KIND_TOP_GENRES_LIVE: &str = "top-genres-live";

#[derive(Debug, Error)]
pub enum GraphQueryError {
    #[error("graph store unavailable: {0:#}")]
    StoreUnavailable(anyhow::Error),

    #[error("artist {0} not found")]
    ArtistNotFound(ArtistId),

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),
}

fn unavailable(err: anyhow::Error) -> GraphQueryError {
    GraphQueryError::StoreUnavailable(err)
}

/// Parameters of the artist graph query, as received over HTTP.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ArtistGraphParams {
    pub genre: Option<String>,
    pub min_popularity: Option<u32>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ArtistGraphPayload {
    pub nodes: Vec<ArtistNode>,
    pub links: Vec<RelatedLink>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RelatedArtistsPayload {
    pub artist: ArtistNode,
    pub related: Vec<ArtistNode>,
}

#[derive(Clone)]
pub struct GraphQueryService {
    store: Arc<dyn GraphStore>,
    cache: CoherentCache<dyn GraphStore>,
}

impl GraphQueryService {
    pub fn new(store: Arc<dyn GraphStore>, cache_store: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        let cache = CoherentCache::new(cache_store, Arc::clone(&store), ttl);
        Self { store, cache }
    }

    /// Artists matching the filters, with the links among them.
    pub fn artist_graph(&self, params: &ArtistGraphParams) -> Result<CachedPayload, GraphQueryError> {
        let limit = params.limit.unwrap_or(DEFAULT_ARTIST_LIMIT);
        if limit == 0 || limit > MAX_ARTIST_LIMIT {
            return Err(GraphQueryError::InvalidQuery(format!(
                "limit must be between 1 and {}",
                MAX_ARTIST_LIMIT
            )));
        }
        let genre = params
            .genre
            .as_ref()
            .map(|g| g.trim().to_lowercase())
            .filter(|g| !g.is_empty());
        let query = ArtistQuery {
            genre,
            min_popularity: params.min_popularity,
            limit,
        };

        let key = cache_key(
            KIND_ARTISTS,
            &[
                ("genre", query.genre.clone()),
                ("min_popularity", query.min_popularity.map(|p| p.to_string())),
                ("limit", Some(limit.to_string())),
            ],
        );

        self.cache.get_or_compute(&key, || {
            let nodes = self.store.get_artists(&query).map_err(unavailable)?;
            let ids: Vec<ArtistId> = nodes.iter().map(|n| n.id).collect();
            let links = self.store.get_links_among(&ids).map_err(unavailable)?;
            Ok(serde_json::to_string(&ArtistGraphPayload { nodes, links })?)
        })
    }

    /// One artist and the artists linked to it.
    pub fn related_artists(&self, id: ArtistId) -> Result<CachedPayload, GraphQueryError> {
        let key = cache_key(KIND_RELATED, &[("id", Some(id.to_string()))]);
        self.cache.get_or_compute(&key, || {
            let artist = self
                .store
                .get_artist(id)
                .map_err(unavailable)?
                .ok_or(GraphQueryError::ArtistNotFound(id))?;
            let related = self.store.get_related_artists(id).map_err(unavailable)?;
            Ok(serde_json::to_string(&RelatedArtistsPayload { artist, related })?)
        })
    }

    /// The top-genre list materialized by the last rebuild.
    pub fn top_genres(&self) -> Result<CachedPayload, GraphQueryError> {
        let key = cache_key(KIND_TOP_GENRES, &[]);
        self.cache.get_or_compute(&key, || {
            let genres = self.store.get_top_genres().map_err(unavailable)?;
            Ok(serde_json::to_string(&genres)?)
        })
    }

    /// Run the spatial selector for `count` genres against the stored
    /// genre table.
    pub fn top_genres_live(&self, count: usize) -> Result<CachedPayload, GraphQueryError> {
        if count == 0 || count > MAX_LIVE_TOP_GENRES {
            return Err(GraphQueryError::InvalidQuery(format!(
                "count must be between 1 and {}",
                MAX_LIVE_TOP_GENRES
            )));
        }
        let key = cache_key(KIND_TOP_GENRES_LIVE, &[("count", Some(count.to_string()))]);
        self.cache.get_or_compute(&key, || {
            let genres = self.store.get_genres().map_err(unavailable)?;
            Ok(serde_json::to_string(&select_top_genres(&genres, count))?)
        })
    }

    /// Metadata of the published graph; always read live.
    pub fn sync_info(&self) -> Result<GraphSummary, GraphQueryError> {
        self.store.summary().map_err(unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheOutcome, InMemoryCacheStore, SyncToken, SyncTokenSource};
    use crate::genre_map::{CoordinateSpace, GenreEntry, GenreMap};
    use crate::export::GraphExporter;
    use crate::graph_store::{GraphSnapshot, SqliteGraphStore};
    use crate::reconcile::CanonicalArtist;
    use crate::top_genres::TopGenreEntry;
    use anyhow::anyhow;

    fn artist(id: ArtistId, name: &str, genre: &str, popularity: u32, related: &[&str]) -> CanonicalArtist {
        CanonicalArtist {
            id,
            name: name.to_string(),
            genres: vec![genre.to_string()],
            popularity: Some(popularity),
            spotify_id: None,
            spotify_url: None,
            mbid: None,
            image_url: None,
            color: "#cccccc".to_string(),
            x: Some(0.0),
            y: Some(0.0),
            related_artists: related.iter().map(|r| r.to_string()).collect(),
        }
    }

    fn genre_map() -> GenreMap {
        GenreMap::from_entries(
            vec![
                GenreEntry {
                    name: "ambient".to_string(),
                    x: 0.0,
                    y: 0.0,
                    color: "#00aaff".to_string(),
                    count: 2,
                },
                GenreEntry {
                    name: "rock".to_string(),
                    x: 10000.0,
                    y: 10000.0,
                    color: "#ff0000".to_string(),
                    count: 1,
                },
            ],
            CoordinateSpace::identity(),
        )
    }

    struct Fixture {
        exporter: GraphExporter,
        service: GraphQueryService,
    }

    fn fixture() -> Fixture {
        let store: Arc<dyn GraphStore> = Arc::new(SqliteGraphStore::in_memory().unwrap());
        let cache: Arc<dyn CacheStore> = Arc::new(InMemoryCacheStore::new());
        let ttl = Duration::from_secs(60);
        Fixture {
            exporter: GraphExporter::new(store.clone(), cache.clone(), ttl),
            service: GraphQueryService::new(store, cache, ttl),
        }
    }

    fn first_generation() -> Vec<CanonicalArtist> {
        vec![
            artist(1, "Grouper", "ambient", 50, &["Stars of the Lid"]),
            artist(2, "Low", "rock", 70, &[]),
            artist(3, "Stars of the Lid", "ambient", 40, &[]),
        ]
    }

    #[test]
    fn test_artist_graph_is_cached_until_next_export() {
        let f = fixture();
        f.exporter
            .export(&first_generation(), &[], &genre_map())
            .unwrap();
        let params = ArtistGraphParams {
            genre: Some("Ambient".to_string()),
            ..Default::default()
        };

        let first = f.service.artist_graph(&params).unwrap();
        let second = f.service.artist_graph(&params).unwrap();
        assert_eq!(first.outcome, CacheOutcome::Miss);
        assert_eq!(second.outcome, CacheOutcome::Hit);
        assert_eq!(first.body, second.body);

        let payload: ArtistGraphPayload = serde_json::from_str(&first.body).unwrap();
        let names: Vec<&str> = payload.nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["Grouper", "Stars of the Lid"]);
        assert_eq!(payload.links, vec![RelatedLink::new(1, 3).unwrap()]);

        let mut next = first_generation();
        next.push(artist(4, "Eno", "ambient", 90, &[]));
        f.exporter.export(&next, &[], &genre_map()).unwrap();

        let third = f.service.artist_graph(&params).unwrap();
        assert_eq!(third.outcome, CacheOutcome::Stale);
        let payload: ArtistGraphPayload = serde_json::from_str(&third.body).unwrap();
        assert_eq!(payload.nodes[0].name, "Eno");
    }

    #[test]
    fn test_related_artists_and_not_found() {
        let f = fixture();
        f.exporter
            .export(&first_generation(), &[], &genre_map())
            .unwrap();

        let payload = f.service.related_artists(3).unwrap();
        let related: RelatedArtistsPayload = serde_json::from_str(&payload.body).unwrap();
        assert_eq!(related.artist.name, "Stars of the Lid");
        assert_eq!(related.related.len(), 1);
        assert_eq!(related.related[0].name, "Grouper");

        assert!(matches!(
            f.service.related_artists(42),
            Err(GraphQueryError::ArtistNotFound(42))
        ));
    }

    #[test]
    fn test_top_genres_materialized_and_live() {
        let f = fixture();
        let top = vec![TopGenreEntry {
            name: "ambient".to_string(),
            x: 0.0,
            y: 0.0,
            color: "#00aaff".to_string(),
            count: Some(2),
        }];
        f.exporter
            .export(&first_generation(), &top, &genre_map())
            .unwrap();

        let materialized: Vec<TopGenreEntry> =
            serde_json::from_str(&f.service.top_genres().unwrap().body).unwrap();
        assert_eq!(materialized, top);

        let live: Vec<TopGenreEntry> =
            serde_json::from_str(&f.service.top_genres_live(5).unwrap().body).unwrap();
        let names: Vec<&str> = live.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["ambient", "rock"]);
    }

    #[test]
    fn test_invalid_parameters() {
        let f = fixture();
        assert!(matches!(
            f.service.top_genres_live(0),
            Err(GraphQueryError::InvalidQuery(_))
        ));
        assert!(matches!(
            f.service.artist_graph(&ArtistGraphParams {
                limit: Some(MAX_ARTIST_LIMIT + 1),
                ..Default::default()
            }),
            Err(GraphQueryError::InvalidQuery(_))
        ));
    }

    struct UnavailableStore;

    impl SyncTokenSource for UnavailableStore {
        fn current_sync_token(&self) -> anyhow::Result<Option<SyncToken>> {
            Err(anyhow!("disk I/O error"))
        }
    }

    impl GraphStore for UnavailableStore {
        fn publish(&self, _snapshot: &GraphSnapshot) -> anyhow::Result<()> {
            Err(anyhow!("disk I/O error"))
        }
        fn summary(&self) -> anyhow::Result<GraphSummary> {
            Err(anyhow!("disk I/O error"))
        }
        fn get_artists(&self, _query: &ArtistQuery) -> anyhow::Result<Vec<ArtistNode>> {
            Err(anyhow!("disk I/O error"))
        }
        fn get_artist(&self, _id: ArtistId) -> anyhow::Result<Option<ArtistNode>> {
            Err(anyhow!("disk I/O error"))
        }
        fn get_links_among(&self, _ids: &[ArtistId]) -> anyhow::Result<Vec<RelatedLink>> {
            Err(anyhow!("disk I/O error"))
        }
        fn get_related_artists(&self, _id: ArtistId) -> anyhow::Result<Vec<ArtistNode>> {
            Err(anyhow!("disk I/O error"))
        }
        fn get_top_genres(&self) -> anyhow::Result<Vec<TopGenreEntry>> {
            Err(anyhow!("disk I/O error"))
        }
        fn get_genres(&self) -> anyhow::Result<Vec<GenreEntry>> {
            Err(anyhow!("disk I/O error"))
        }
    }

    #[test]
    fn test_store_failure_surfaces_as_unavailable() {
        let service = GraphQueryService::new(
            Arc::new(UnavailableStore),
            Arc::new(InMemoryCacheStore::new()),
            Duration::from_secs(60),
        );

        assert!(matches!(
            service.top_genres(),
            Err(GraphQueryError::StoreUnavailable(_))
        ));
        assert!(matches!(
            service.sync_info(),
            Err(GraphQueryError::StoreUnavailable(_))
        ));
    }
}
