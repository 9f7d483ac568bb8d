//! Authoritative store of the published artist graph.

mod models;
mod schema;
mod store;
mod trait_def;

pub use models::{ArtistNode, ArtistQuery, GraphSnapshot, GraphSummary, RelatedLink};
pub use store::SqliteGraphStore;
pub use trait_def::GraphStore;
