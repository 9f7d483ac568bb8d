//! Greedy minimum-separation selection of representative genres.

use crate::genre_map::Point;
use tracing::debug;

/// Separation required between selected genres when ten are requested.
pub const BASE_MIN_DISTANCE: f64 = 2500.0;

/// Target count at which the separation equals `BASE_MIN_DISTANCE`.
pub const REFERENCE_COUNT: f64 = 10.0;

#[derive(Debug, Clone, PartialEq)]
pub struct GenreCandidate {
    pub name: String,
    pub position: Point,
    pub frequency: u64,
}

/// Minimum pairwise distance for a selection of `count` genres.
///
/// Scales with `1 / sqrt(count)` so the selection keeps roughly the same
/// spread over the plane as the requested count grows.
pub fn min_distance(count: usize) -> f64 {
    (BASE_MIN_DISTANCE * (REFERENCE_COUNT / count as f64).sqrt()).floor()
}

/// Select up to `count` candidates, most frequent first, each at least
/// `min_distance(count)` away from every genre already selected.
///
/// Greedy with no backtracking: a frequent genre can block several less
/// frequent ones, so fewer than `count` genres may come back even when a
/// full selection exists. Ties in frequency keep the candidates' order.
pub fn select_spaced(candidates: &[GenreCandidate], count: usize) -> Vec<GenreCandidate> {
    if count == 0 {
        return vec![];
    }

    let separation = min_distance(count);
    let mut ranked: Vec<&GenreCandidate> = candidates.iter().collect();
    ranked.sort_by(|a, b| b.frequency.cmp(&a.frequency));

    let mut selected: Vec<&GenreCandidate> = Vec::with_capacity(count);
    for candidate in ranked {
        if selected.len() >= count {
            break;
        }
        let far_enough = selected
            .iter()
            .all(|s| s.position.distance(&candidate.position) >= separation);
        if far_enough {
            selected.push(candidate);
        }
    }

    if selected.len() < count && candidates.len() > selected.len() {
        debug!(
            "Selected {} of {} requested genres at separation {}",
            selected.len(),
            count,
            separation
        );
    }

    selected.into_iter().cloned().collect()
}
