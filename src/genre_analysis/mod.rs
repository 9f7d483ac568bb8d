//! Observed genre frequencies over the canonical artist population.

use crate::genre_map::GenreMap;
use crate::reconcile::CanonicalArtist;
use std::collections::HashMap;
use tracing::info;

/// Leading genres per artist counted when annotating the genre map.
pub const ANALYSIS_DEPTH: usize = 5;

/// Leading genres per artist counted for offline top-genre selection.
pub const TOP_GENRE_DEPTH: usize = 3;

/// Count, for each genre, how many artists list it among their first
/// `depth` genres. Genres missing from the map are ignored.
pub fn count_genre_frequencies(
    artists: &[CanonicalArtist],
    genre_map: &GenreMap,
    depth: usize,
) -> HashMap<String, u64> {
    let mut counts: HashMap<String, u64> = HashMap::new();

    for artist in artists {
        for genre in artist.genres.iter().take(depth) {
            let genre = genre.to_lowercase();
            if genre_map.contains(&genre) {
                *counts.entry(genre).or_insert(0) += 1;
            }
        }
    }

    counts
}

/// Recount frequencies and return the annotated snapshot.
pub fn annotate_counts(artists: &[CanonicalArtist], genre_map: &GenreMap) -> GenreMap {
    let counts = count_genre_frequencies(artists, genre_map, ANALYSIS_DEPTH);
    info!(
        "Counted {} distinct genres across {} artists",
        counts.len(),
        artists.len()
    );
    genre_map.with_counts(&counts)
}
