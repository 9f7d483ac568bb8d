//! Multi-source reconciliation into canonical artists.

mod engine;
mod identity;
mod models;

pub use engine::{reconcile, weighted_position, MAX_POSITION_GENRES};
pub use identity::resolve_identity;
pub use models::{ArtistId, CanonicalArtist, ReconcileOutcome, ReconcileReport};
