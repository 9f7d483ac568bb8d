use super::models::{ArtistNode, ArtistQuery, GraphSnapshot, GraphSummary, RelatedLink};
use crate::cache::SyncTokenSource;
use crate::genre_map::GenreEntry;
use crate::reconcile::ArtistId;
use crate::top_genres::TopGenreEntry;
use anyhow::Result;

/// The authoritative store of the published artist graph.
pub trait GraphStore: SyncTokenSource {
    /// Replace the whole graph with `snapshot`, including its sync token.
    ///
    /// Readers observe either the previous graph or the new one, never a mix.
    fn publish(&self, snapshot: &GraphSnapshot) -> Result<()>;

    fn summary(&self) -> Result<GraphSummary>;

    /// Artists matching `query`, most popular first.
    fn get_artists(&self, query: &ArtistQuery) -> Result<Vec<ArtistNode>>;

    fn get_artist(&self, id: ArtistId) -> Result<Option<ArtistNode>>;

    /// Links whose both ends are in `ids`.
    fn get_links_among(&self, ids: &[ArtistId]) -> Result<Vec<RelatedLink>>;

    /// Artists linked to `id`, by id.
    fn get_related_artists(&self, id: ArtistId) -> Result<Vec<ArtistNode>>;

    /// The materialized top-genre list, in selection order.
    fn get_top_genres(&self) -> Result<Vec<TopGenreEntry>>;

    /// The count-annotated genre table.
    fn get_genres(&self) -> Result<Vec<GenreEntry>>;
}
