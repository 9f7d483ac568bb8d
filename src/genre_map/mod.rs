//! Genre reference table: genre name to coordinates, color and frequency.

mod load;
mod models;

pub use load::{load_genre_map, save_genre_map};
pub use models::{CoordinateSpace, GenreEntry, GenreMap, Point, RawGenreEntry, FALLBACK_COLOR};
