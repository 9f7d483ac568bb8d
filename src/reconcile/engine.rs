//! Merges the three source collections into canonical artists.

use super::identity::resolve_identity;
use super::models::{ArtistId, CanonicalArtist, ReconcileOutcome, ReconcileReport};
use crate::genre_map::{GenreMap, Point, FALLBACK_COLOR};
use crate::sources::{SourceArtist, SourceSnapshots};
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// Number of leading genres that contribute to an artist's position.
pub const MAX_POSITION_GENRES: usize = 10;

/// Reconcile the source snapshots against a genre map.
///
/// The catalog drives iteration; an artist is emitted only when the
/// listening history or the registry knows it too and at least one of its
/// tags is a known genre. Output is fully determined by the input order.
pub fn reconcile(sources: &SourceSnapshots, genre_map: &GenreMap) -> ReconcileOutcome {
    let listening_history = index_by_identity(&sources.listening_history);
    let registry = index_by_identity(&sources.registry);

    let mut report = ReconcileReport::default();
    let mut emitted_keys: HashSet<String> = HashSet::new();
    let mut artists: Vec<CanonicalArtist> = Vec::new();

    for record in &sources.catalog {
        report.catalog_records += 1;

        let key = resolve_identity(&record.name);
        if key.is_empty() {
            warn!("Cannot resolve identity of catalog artist '{}'", record.name);
            report.unresolvable_names += 1;
            continue;
        }
        if emitted_keys.contains(&key) {
            report.duplicates += 1;
            continue;
        }

        let listened = listening_history.get(key.as_str()).copied();
        let registered = registry.get(key.as_str()).copied();
        if listened.is_none() && registered.is_none() {
            debug!("Dropping uncorroborated artist '{}'", record.name);
            report.uncorroborated += 1;
            continue;
        }

        let (genres, unknown_tags) = rank_genres(&[listened, Some(record), registered], genre_map);
        report.unknown_genre_tags += unknown_tags;
        if genres.is_empty() {
            debug!("Dropping '{}': no known genres", record.name);
            report.no_known_genres += 1;
            continue;
        }

        let position = weighted_position(&genres, genre_map);
        let color = genres
            .first()
            .and_then(|genre| genre_map.get(genre))
            .map(|entry| entry.color.clone())
            .unwrap_or_else(|| FALLBACK_COLOR.to_string());

        let artist = CanonicalArtist {
            id: artists.len() as ArtistId + 1,
            name: record.name.clone(),
            genres,
            popularity: record.popularity,
            spotify_id: record.spotify_id.clone(),
            spotify_url: record.spotify_url.clone(),
            mbid: listened
                .and_then(|a| a.mbid.clone())
                .or_else(|| registered.and_then(|a| a.mbid.clone())),
            image_url: record
                .image_url
                .clone()
                .or_else(|| listened.and_then(|a| a.image_url.clone())),
            color,
            x: position.map(|p| p.x),
            y: position.map(|p| p.y),
            related_artists: listened
                .map(|a| a.similar_artists.clone())
                .unwrap_or_default(),
        };

        emitted_keys.insert(key);
        artists.push(artist);
    }

    report.emitted = artists.len();
    info!(
        "Reconciled {} catalog records into {} artists ({} duplicates, {} uncorroborated, {} without known genres, {} unknown tags)",
        report.catalog_records,
        report.emitted,
        report.duplicates,
        report.uncorroborated,
        report.no_known_genres,
        report.unknown_genre_tags
    );

    ReconcileOutcome { artists, report }
}

/// Comparison key to record; the first record for a key wins.
fn index_by_identity(records: &[SourceArtist]) -> HashMap<String, &SourceArtist> {
    let mut index = HashMap::with_capacity(records.len());
    for record in records {
        let key = resolve_identity(&record.name);
        if key.is_empty() {
            continue;
        }
        index.entry(key).or_insert(record);
    }
    index
}

/// Rank the known genres asserted by `records` by how many sources assert
/// them. Ties keep the order of first encounter.
///
/// Returns the ranked genres and the number of tags that were not in the
/// genre map.
fn rank_genres(records: &[Option<&SourceArtist>], genre_map: &GenreMap) -> (Vec<String>, usize) {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut order: Vec<String> = Vec::new();
    let mut unknown_tags = 0;

    for record in records.iter().flatten() {
        let mut asserted: HashSet<String> = HashSet::new();
        for tag in &record.genres {
            let genre = tag.trim().to_lowercase();
            if !genre_map.contains(&genre) {
                unknown_tags += 1;
                continue;
            }
            if !asserted.insert(genre.clone()) {
                continue;
            }
            match counts.entry(genre) {
                Entry::Occupied(mut e) => *e.get_mut() += 1,
                Entry::Vacant(e) => {
                    order.push(e.key().clone());
                    e.insert(1);
                }
            }
        }
    }

    // Stable sort: equal counts stay in first-encounter order.
    order.sort_by(|a, b| counts[b].cmp(&counts[a]));
    (order, unknown_tags)
}

/// Weighted centroid of the leading genres, weight `1 / (rank + 1)`.
///
/// `None` when none of the genres has a position.
pub fn weighted_position(genres: &[String], genre_map: &GenreMap) -> Option<Point> {
    let mut x = 0.0;
    let mut y = 0.0;
    let mut total_weight = 0.0;

    for (rank, genre) in genres.iter().take(MAX_POSITION_GENRES).enumerate() {
        let Some(entry) = genre_map.get(genre) else {
            continue;
        };
        let weight = 1.0 / (rank as f64 + 1.0);
        x += entry.x * weight;
        y += entry.y * weight;
        total_weight += weight;
    }

    if total_weight > 0.0 {
        Some(Point::new(x / total_weight, y / total_weight))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genre_map::{CoordinateSpace, RawGenreEntry};

    fn genre_map() -> GenreMap {
        let raw = [
            ("ambient", 0.0, 0.0, "#00aaff"),
            ("drone", 300.0, 0.0, "#333333"),
            ("rock", 1000.0, 1000.0, "#ff0000"),
            ("indie rock", 1100.0, 900.0, "#ff6600"),
            ("jazz", 500.0, 2000.0, "#ffee00"),
        ]
        .into_iter()
        .map(|(name, x, y, color)| {
            (
                name.to_string(),
                RawGenreEntry {
                    x,
                    y,
                    color: color.to_string(),
                    count: 0,
                },
            )
        });
        GenreMap::from_raw(raw, CoordinateSpace::identity())
    }

    fn artist(name: &str, genres: &[&str]) -> SourceArtist {
        SourceArtist {
            name: name.to_string(),
            genres: genres.iter().map(|g| g.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_artist_in_all_three_sources() {
        let mut listened = artist("Artist X", &["ambient", "drone"]);
        listened.similar_artists = vec!["Artist Y".to_string()];
        listened.mbid = Some("mbid-x".to_string());
        let mut catalog = artist("Artist X", &["ambient", "drone"]);
        catalog.popularity = Some(42);
        let sources = SourceSnapshots {
            listening_history: vec![listened],
            catalog: vec![catalog],
            registry: vec![artist("artist x", &["unknowntag"])],
        };

        let outcome = reconcile(&sources, &genre_map());

        assert_eq!(outcome.artists.len(), 1);
        let x = &outcome.artists[0];
        assert_eq!(x.id, 1);
        assert_eq!(x.genres, vec!["ambient", "drone"]);
        assert_eq!(x.color, "#00aaff");
        assert_eq!(x.popularity, Some(42));
        assert_eq!(x.mbid.as_deref(), Some("mbid-x"));
        assert_eq!(x.related_artists, vec!["Artist Y"]);
        // ambient at 0 with weight 1, drone at 300 with weight 1/2.
        assert!((x.x.unwrap() - 100.0).abs() < 1e-9);
        assert_eq!(x.y, Some(0.0));
        assert_eq!(outcome.report.unknown_genre_tags, 1);
    }

    #[test]
    fn test_catalog_only_artist_is_dropped() {
        let sources = SourceSnapshots {
            listening_history: vec![artist("Someone Else", &["rock"])],
            catalog: vec![artist("Lonely", &["rock"])],
            registry: vec![],
        };

        let outcome = reconcile(&sources, &genre_map());

        assert!(outcome.artists.is_empty());
        assert_eq!(outcome.report.uncorroborated, 1);
    }

    #[test]
    fn test_registry_match_alone_corroborates() {
        let sources = SourceSnapshots {
            listening_history: vec![],
            catalog: vec![artist("Low", &["rock"])],
            registry: vec![artist("LOW", &[])],
        };

        let outcome = reconcile(&sources, &genre_map());

        assert_eq!(outcome.artists.len(), 1);
    }

    #[test]
    fn test_duplicate_keys_emit_once() {
        let sources = SourceSnapshots {
            listening_history: vec![artist("AC/DC", &["rock"])],
            catalog: vec![
                artist("AC/DC", &["rock"]),
                artist("ac dc", &["rock"]),
                artist("ACDC", &["rock"]),
            ],
            registry: vec![],
        };

        let outcome = reconcile(&sources, &genre_map());

        assert_eq!(outcome.artists.len(), 1);
        assert_eq!(outcome.artists[0].name, "AC/DC");
        assert_eq!(outcome.report.duplicates, 2);
    }

    #[test]
    fn test_duplicate_after_dropped_first_occurrence_can_emit() {
        let sources = SourceSnapshots {
            listening_history: vec![artist("Low", &[])],
            catalog: vec![artist("Low", &["unknown"]), artist("low", &["rock"])],
            registry: vec![],
        };

        let outcome = reconcile(&sources, &genre_map());

        assert_eq!(outcome.artists.len(), 1);
        assert_eq!(outcome.artists[0].name, "low");
        assert_eq!(outcome.report.no_known_genres, 1);
    }

    #[test]
    fn test_unknown_genres_only_is_dropped() {
        let sources = SourceSnapshots {
            listening_history: vec![artist("Weird", &["vaporwave"])],
            catalog: vec![artist("Weird", &["hyperpop"])],
            registry: vec![],
        };

        let outcome = reconcile(&sources, &genre_map());

        assert!(outcome.artists.is_empty());
        assert_eq!(outcome.report.no_known_genres, 1);
        assert_eq!(outcome.report.unknown_genre_tags, 2);
    }

    #[test]
    fn test_genres_ranked_by_source_agreement() {
        let sources = SourceSnapshots {
            listening_history: vec![artist("Band", &["jazz", "rock"])],
            catalog: vec![artist("Band", &["Rock", "indie rock"])],
            registry: vec![artist("Band", &["indie rock", "rock", "rock"])],
        };

        let outcome = reconcile(&sources, &genre_map());

        // rock: 3 sources, indie rock: 2, jazz: 1.
        assert_eq!(outcome.artists[0].genres, vec!["rock", "indie rock", "jazz"]);
        assert_eq!(outcome.artists[0].color, "#ff0000");
    }

    #[test]
    fn test_ties_keep_first_encounter_order() {
        let sources = SourceSnapshots {
            listening_history: vec![artist("Band", &["jazz"])],
            catalog: vec![artist("Band", &["drone", "ambient"])],
            registry: vec![],
        };

        let outcome = reconcile(&sources, &genre_map());

        assert_eq!(outcome.artists[0].genres, vec!["jazz", "drone", "ambient"]);
    }

    #[test]
    fn test_ids_are_sequential_and_deterministic() {
        let sources = SourceSnapshots {
            listening_history: vec![
                artist("C", &["jazz"]),
                artist("A", &["rock"]),
                artist("B", &["drone"]),
            ],
            catalog: vec![
                artist("A", &["rock"]),
                artist("Nope", &["rock"]),
                artist("B", &["drone"]),
                artist("C", &["jazz"]),
            ],
            registry: vec![],
        };

        let first = reconcile(&sources, &genre_map());
        let second = reconcile(&sources, &genre_map());

        let ids: Vec<(ArtistId, &str)> = first
            .artists
            .iter()
            .map(|a| (a.id, a.name.as_str()))
            .collect();
        assert_eq!(ids, vec![(1, "A"), (2, "B"), (3, "C")]);
        assert_eq!(first.artists, second.artists);
    }

    #[test]
    fn test_field_fallbacks() {
        let mut listened = artist("Band", &["rock"]);
        listened.image_url = Some("lastfm-image".to_string());
        let mut registered = artist("Band", &[]);
        registered.mbid = Some("registry-mbid".to_string());
        let sources = SourceSnapshots {
            listening_history: vec![listened],
            catalog: vec![artist("Band", &["rock"])],
            registry: vec![registered],
        };

        let outcome = reconcile(&sources, &genre_map());

        let band = &outcome.artists[0];
        assert_eq!(band.image_url.as_deref(), Some("lastfm-image"));
        assert_eq!(band.mbid.as_deref(), Some("registry-mbid"));
    }

    #[test]
    fn test_centroid_within_bounding_box() {
        let genres: Vec<String> = ["rock", "jazz", "ambient", "indie rock"]
            .iter()
            .map(|g| g.to_string())
            .collect();

        let p = weighted_position(&genres, &genre_map()).unwrap();

        assert!(p.x >= 0.0 && p.x <= 1100.0);
        assert!(p.y >= 0.0 && p.y <= 2000.0);
    }

    #[test]
    fn test_centroid_of_collinear_genres_lies_on_segment() {
        // ambient (0, 0) and rock (1000, 1000) share the diagonal.
        let genres = vec!["rock".to_string(), "ambient".to_string()];

        let p = weighted_position(&genres, &genre_map()).unwrap();

        let cross = p.x * 1000.0 - p.y * 1000.0;
        assert!(cross.abs() < 1e-6);
        assert!(p.x > 0.0 && p.x < 1000.0);
        assert!((p.x - 2000.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_centroid_inside_genre_triangle() {
        let map = genre_map();
        let genres = vec!["jazz".to_string(), "drone".to_string(), "ambient".to_string()];
        let corners: Vec<Point> = genres
            .iter()
            .map(|g| map.get(g).unwrap().position())
            .collect();

        let p = weighted_position(&genres, &map).unwrap();

        let side = |a: Point, b: Point| (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x);
        let signs = [
            side(corners[0], corners[1]),
            side(corners[1], corners[2]),
            side(corners[2], corners[0]),
        ];
        assert!(signs.iter().all(|s| *s >= 0.0) || signs.iter().all(|s| *s <= 0.0));
    }

    #[test]
    fn test_centroid_uses_only_leading_genres() {
        let map = genre_map();
        let mut genres: Vec<String> = vec!["ambient".to_string(); MAX_POSITION_GENRES];
        genres.push("jazz".to_string());

        let p = weighted_position(&genres, &map).unwrap();

        assert_eq!(p, Point::new(0.0, 0.0));
        assert!(weighted_position(&[], &map).is_none());
    }
}
