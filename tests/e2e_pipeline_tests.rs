//! End-to-end tests: fetched sources flow through a rebuild to the API

mod common;

use async_trait::async_trait;
use common::*;
use serde_json::Value;
use soundweb_server::config::SourcesSettings;
use soundweb_server::pipeline::fetch_snapshots;
use soundweb_server::sources::{ArtistLookup, SourceArtist, SourceError, SourceKind};
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

/// Source answering from a fixed table; names not in it are not found.
struct TableSource {
    kind: SourceKind,
    artists: HashMap<String, SourceArtist>,
}

impl TableSource {
    fn new(kind: SourceKind, artists: Vec<SourceArtist>) -> Self {
        Self {
            kind,
            artists: artists.into_iter().map(|a| (a.name.clone(), a)).collect(),
        }
    }
}

#[async_trait]
impl ArtistLookup for TableSource {
    fn source(&self) -> SourceKind {
        self.kind
    }

    async fn lookup(&self, name: &str) -> Result<Option<SourceArtist>, SourceError> {
        Ok(self.artists.get(name).cloned())
    }
}

fn artist(name: &str, genres: &[&str]) -> SourceArtist {
    SourceArtist {
        genres: genres.iter().map(|g| g.to_string()).collect(),
        ..SourceArtist::named(name)
    }
}

#[tokio::test]
async fn test_fetched_sources_are_served_after_rebuild() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());
    let before = client.sync_token().await.unwrap();

    let history = TableSource::new(
        SourceKind::ListeningHistory,
        vec![
            artist("Tim Hecker", &["ambient", "drone"]),
            artist("Sunn O)))", &["drone"]),
        ],
    );
    let catalog = TableSource::new(
        SourceKind::Catalog,
        vec![
            artist("Tim Hecker", &["ambient"]),
            artist("Sunn O)))", &["drone", "rock"]),
        ],
    );
    let registry = TableSource::new(SourceKind::Registry, vec![]);
    let names = vec![
        "Tim Hecker".to_string(),
        "Sunn O)))".to_string(),
        "Unknown Artist".to_string(),
    ];

    let report = fetch_snapshots(
        &names,
        &history,
        &catalog,
        &registry,
        &SourcesSettings::default(),
        &server.data_dir,
        &CancellationToken::new(),
        None,
    )
    .await
    .unwrap();

    assert_eq!(report.chart_artists, 3);
    assert_eq!(report.listening_history.found, 2);
    assert_eq!(report.listening_history.not_found, 1);
    // Catalog is only asked about artists the listening history resolved
    assert_eq!(report.catalog.requested, 2);
    assert_eq!(report.registry.requested, 3);

    // Snapshots alone do not change what is served
    assert_eq!(client.sync_token().await, Some(before.clone()));

    let rebuild = server.rebuild();
    assert_eq!(rebuild.export.artists, 2);

    let after = client.sync_token().await.unwrap();
    assert_ne!(before, after);

    let body: Value = client.get_artists("").await.json().await.unwrap();
    let mut names: Vec<&str> = body["nodes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["name"].as_str().unwrap())
        .collect();
    names.sort();
    assert_eq!(names, vec!["Sunn O)))", "Tim Hecker"]);
    assert!(!names.contains(&ARTIST_GROUPER));
}

#[tokio::test]
async fn test_cancelled_fetch_keeps_existing_snapshots() {
    let server = TestServer::spawn().await;
    let original = std::fs::read_to_string(server.data_dir.lastfm_artists_path()).unwrap();

    let source = TableSource::new(SourceKind::ListeningHistory, vec![artist("Low", &["rock"])]);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = fetch_snapshots(
        &["Low".to_string()],
        &source,
        &source,
        &source,
        &SourcesSettings::default(),
        &server.data_dir,
        &cancel,
        None,
    )
    .await;

    assert!(result.unwrap_err().is_cancelled());
    let current = std::fs::read_to_string(server.data_dir.lastfm_artists_path()).unwrap();
    assert_eq!(current, original);
}
