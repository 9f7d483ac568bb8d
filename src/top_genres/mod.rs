//! Representative genre subsets for top-level display.
//!
//! The same selector runs offline, materializing a fixed list during the
//! graph rebuild, and online, answering "top K" queries against the stored
//! genre table. Both paths rank candidates by frequency and break ties by
//! genre name, so equal inputs give equal selections.

mod selector;

pub use selector::{
    min_distance, select_spaced, GenreCandidate, BASE_MIN_DISTANCE, REFERENCE_COUNT,
};

use crate::genre_analysis::{count_genre_frequencies, TOP_GENRE_DEPTH};
use crate::genre_map::{GenreEntry, GenreMap, Point};
use crate::reconcile::CanonicalArtist;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopGenreEntry {
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
}

fn candidates_from_entries<'a, I>(entries: I) -> Vec<GenreCandidate>
where
    I: IntoIterator<Item = (&'a GenreEntry, u64)>,
{
    let mut candidates: Vec<GenreCandidate> = entries
        .into_iter()
        .filter(|(_, frequency)| *frequency > 0)
        .map(|(entry, frequency)| GenreCandidate {
            name: entry.name.clone(),
            position: Point::new(entry.x, entry.y),
            frequency,
        })
        .collect();
    candidates.sort_by(|a, b| a.name.cmp(&b.name));
    candidates
}

fn to_entries<'a>(
    selected: Vec<GenreCandidate>,
    lookup: impl Fn(&str) -> Option<&'a GenreEntry>,
) -> Vec<TopGenreEntry> {
    selected
        .into_iter()
        .filter_map(|candidate| {
            let entry = lookup(&candidate.name)?;
            Some(TopGenreEntry {
                name: candidate.name,
                x: candidate.position.x,
                y: candidate.position.y,
                color: entry.color.clone(),
                count: Some(candidate.frequency),
            })
        })
        .collect()
}

/// Offline selection over each artist's leading genres.
pub fn generate_top_genres(
    artists: &[CanonicalArtist],
    genre_map: &GenreMap,
    count: usize,
) -> Vec<TopGenreEntry> {
    let frequencies = count_genre_frequencies(artists, genre_map, TOP_GENRE_DEPTH);
    let candidates = candidates_from_entries(
        frequencies
            .iter()
            .filter_map(|(name, frequency)| genre_map.get(name).map(|entry| (entry, *frequency))),
    );

    to_entries(select_spaced(&candidates, count), |name| genre_map.get(name))
}

/// Online selection over the stored, count-annotated genre table.
pub fn select_top_genres(genres: &[GenreEntry], count: usize) -> Vec<TopGenreEntry> {
    let candidates = candidates_from_entries(genres.iter().map(|entry| (entry, entry.count)));
    to_entries(select_spaced(&candidates, count), |name| {
        genres.iter().find(|entry| entry.name == name)
    })
}
